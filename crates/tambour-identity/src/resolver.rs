//! Identity resolution: handle → DID → DID document → PDS endpoint.
//!
//! Each step short-circuits on failure; no partial identity is ever
//! returned. There are no automatic retries here, callers decide what to do
//! with a failed stage. Network steps honor the per-request timeout from
//! [`ResolverOptions`]; an elapsed timeout surfaces as
//! [`IdentityError::Cancelled`], never as a generic transport error.

use std::sync::Arc;
use std::time::Duration;

use bon::Builder;
use bytes::Bytes;
use http::StatusCode;
use miette::Diagnostic;
use thiserror::Error;
use url::Url;

use crate::did::{Did, DidDocument};
use crate::handle::Handle;

/// Errors that can occur during identity resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum IdentityError {
    /// The directory answered, but no DID maps to the handle
    #[error("no DID found for handle")]
    #[diagnostic(
        code(tambour_identity::handle_not_found),
        help("check the handle spelling; the directory has no mapping for it")
    )]
    HandleNotFound,
    /// Could not reach the directory service at all
    #[error("directory service unavailable: {0}")]
    #[diagnostic(
        code(tambour_identity::directory_unavailable),
        help("check network connectivity and the configured directory URL")
    )]
    DirectoryUnavailable(String),
    /// DID document fetch failed (transport error or non-2xx status)
    #[error("could not fetch DID document: {0}")]
    #[diagnostic(code(tambour_identity::document_unresolvable))]
    DocumentUnresolvable(String),
    /// Document fetched but malformed, or it describes a different DID
    #[error("invalid DID document: {0}")]
    #[diagnostic(
        code(tambour_identity::document_invalid),
        help("the fetched document does not describe the requested DID")
    )]
    DocumentInvalid(String),
    #[error("missing PDS endpoint in DID document")]
    #[diagnostic(
        code(tambour_identity::no_pds_endpoint),
        help("ensure an AtprotoPersonalDataServer service exists")
    )]
    NoPdsEndpoint,
    /// The caller-supplied timeout elapsed mid-resolution
    #[error("resolution cancelled before completion")]
    #[diagnostic(
        code(tambour_identity::cancelled),
        help("the upstream directory was too slow; retry or raise the timeout")
    )]
    Cancelled,
    #[error("URL parse error: {0}")]
    #[diagnostic(code(tambour_identity::url))]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    #[diagnostic(code(tambour_identity::urlencoding))]
    UrlEncoding(#[from] serde_html_form::ser::Error),
}

impl IdentityError {
    pub(crate) fn directory(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Cancelled
        } else {
            Self::DirectoryUnavailable(err.to_string())
        }
    }

    pub(crate) fn document(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Cancelled
        } else {
            Self::DocumentUnresolvable(err.to_string())
        }
    }
}

pub type Result<T> = core::result::Result<T, IdentityError>;

/// Configurable resolver options.
///
/// - `directory`: host answering `com.atproto.identity.resolveHandle`.
/// - `plc_directory`: base URL for fetching `did:plc` documents.
/// - `timeout`: per-request bound on directory and document fetches.
/// - `validate_doc_id`: if true (default), the resolution chain checks the
///   fetched document `id` against the requested DID and fails with
///   `DocumentInvalid` on mismatch.
#[derive(Debug, Clone, Builder)]
#[builder(start_fn = new)]
pub struct ResolverOptions {
    /// Directory host for handle → DID lookups
    pub directory: Url,
    /// Base URL for did:plc document fetches
    pub plc_directory: Url,
    /// Per-request timeout for network steps
    pub timeout: Option<Duration>,
    /// Validate that fetched DID document id matches the requested DID
    pub validate_doc_id: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self::new()
            .directory(Url::parse("https://public.api.bsky.app").expect("valid url"))
            .plc_directory(Url::parse("https://plc.directory/").expect("valid url"))
            .timeout(Duration::from_secs(10))
            .validate_doc_id(true)
            .build()
    }
}

/// DID document fetch response, parsed on demand.
///
/// Carries the raw response bytes and HTTP status, plus the requested DID
/// to enable validation. `parse()` decodes the document; `parse_validated()`
/// also enforces that the doc `id` matches the requested DID.
#[derive(Debug, Clone)]
pub struct DidDocResponse {
    pub buffer: Bytes,
    pub status: StatusCode,
    /// DID we intended to resolve; used by validation helpers
    pub requested: Option<Did>,
}

impl DidDocResponse {
    pub fn parse(&self) -> Result<DidDocument> {
        if self.status.is_success() {
            serde_json::from_slice(&self.buffer)
                .map_err(|e| IdentityError::DocumentInvalid(e.to_string()))
        } else {
            Err(IdentityError::DocumentUnresolvable(format!(
                "HTTP status {}",
                self.status
            )))
        }
    }

    pub fn parse_validated(&self) -> Result<DidDocument> {
        let doc = self.parse()?;
        if let Some(expected) = &self.requested {
            if doc.id.as_str() != expected.as_str() {
                return Err(IdentityError::DocumentInvalid(format!(
                    "document id {} does not match requested {expected}",
                    doc.id
                )));
            }
        }
        Ok(doc)
    }
}

/// A fully resolved identity: the DID, its document, and the PDS endpoint
/// extracted from it.
#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub did: Did,
    pub document: DidDocument,
    pub pds: Url,
}

/// Trait for identity resolution, for pluggable implementations.
///
/// The provided [`PublicResolver`](crate::PublicResolver) resolves handles
/// via the public directory XRPC endpoint and fetches documents from the
/// PLC directory or did:web well-known locations.
pub trait IdentityResolver {
    /// Access options for validation decisions in default methods
    fn options(&self) -> &ResolverOptions;

    /// Resolve handle to DID
    fn resolve_handle(&self, handle: &Handle) -> impl Future<Output = Result<Did>> + Send
    where
        Self: Sync;

    /// Fetch the DID document
    fn resolve_did_doc(&self, did: &Did) -> impl Future<Output = Result<DidDocResponse>> + Send
    where
        Self: Sync;

    /// Run the full chain: handle → DID → document → PDS endpoint.
    fn resolve_identity(
        &self,
        handle: &Handle,
    ) -> impl Future<Output = Result<ResolvedIdentity>> + Send
    where
        Self: Sync,
    {
        async move {
            let did = self.resolve_handle(handle).await?;
            let resp = self.resolve_did_doc(&did).await?;
            let document = if self.options().validate_doc_id {
                resp.parse_validated()?
            } else {
                resp.parse()?
            };
            let pds = document.pds_endpoint().ok_or(IdentityError::NoPdsEndpoint)?;
            Ok(ResolvedIdentity { did, document, pds })
        }
    }
}

impl<T: IdentityResolver + Sync> IdentityResolver for Arc<T> {
    fn options(&self) -> &ResolverOptions {
        self.as_ref().options()
    }

    async fn resolve_handle(&self, handle: &Handle) -> Result<Did> {
        self.as_ref().resolve_handle(handle).await
    }

    async fn resolve_did_doc(&self, did: &Did) -> Result<DidDocResponse> {
        self.as_ref().resolve_did_doc(did).await
    }
}
