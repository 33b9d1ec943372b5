//! Identity resolution for the AT Protocol
//!
//! Handle syntax validation plus the handle → DID → DID document → PDS
//! endpoint chain behind Tambour's sign-in flow.
//!
//! ## Quick start
//!
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use tambour_identity::{Handle, PublicResolver, resolver::IdentityResolver};
//!
//! let resolver = PublicResolver::default();
//!
//! let handle = Handle::parse("alice.example.com")?;
//! let identity = resolver.resolve_identity(&handle).await?;
//! println!("{} lives at {}", identity.did, identity.pds);
//! # Ok(())
//! # }
//! ```
//!
//! ## Resolution steps
//!
//! 1. Handle → DID via XRPC `com.atproto.identity.resolveHandle` against the
//!    configured directory (default `https://public.api.bsky.app`).
//! 2. DID → Document: `did:web` via the HTTPS well-known location, `did:plc`
//!    via the PLC directory (default `https://plc.directory/`).
//! 3. Document → PDS endpoint: pure extraction of the
//!    `AtprotoPersonalDataServer` service entry.
//!
//! Validation must run before resolution: a malformed handle is rejected by
//! [`Handle::parse`] and never sent upstream.

pub mod did;
pub mod handle;
pub mod resolver;

pub use did::{Did, DidDocument, DidError, Service};
pub use handle::{Handle, HandleError};
pub use resolver::{
    DidDocResponse, IdentityError, IdentityResolver, ResolvedIdentity, ResolverOptions,
};

use bytes::Bytes;
use percent_encoding::percent_decode_str;
use reqwest::StatusCode;
use url::Url;

/// Resolver backed by public, unauthenticated directory services.
#[derive(Debug, Clone)]
pub struct PublicResolver {
    http: reqwest::Client,
    opts: ResolverOptions,
}

impl PublicResolver {
    pub fn new(http: reqwest::Client, opts: ResolverOptions) -> Self {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            directory = %opts.directory,
            plc_directory = %opts.plc_directory,
            validate_doc_id = opts.validate_doc_id,
            "public resolver created"
        );
        Self { http, opts }
    }

    /// Construct the well-known HTTPS URL for a `did:web` DID.
    ///
    /// - `did:web:example.com` → `https://example.com/.well-known/did.json`
    /// - `did:web:example.com:user:alice` → `https://example.com/user/alice/did.json`
    fn did_web_url(&self, did: &Did) -> resolver::Result<Url> {
        let rest = did.as_str().strip_prefix("did:web:").ok_or_else(|| {
            IdentityError::DocumentUnresolvable(format!("not a did:web DID: {did}"))
        })?;
        let mut parts = rest.split(':');
        let host = parts.next().unwrap_or_default();
        let mut url = Url::parse(&format!("https://{host}/"))?;
        let path: Vec<&str> = parts.collect();
        if path.is_empty() {
            url.set_path(".well-known/did.json");
        } else {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| IdentityError::Url(url::ParseError::SetHostOnCannotBeABaseUrl))?;
            for seg in path {
                // did:web path segments are percent-encoded in the identifier
                let decoded = percent_decode_str(seg).decode_utf8_lossy();
                segments.push(&decoded);
            }
            segments.push("did.json");
        }
        Ok(url)
    }

    fn plc_url(&self, did: &Did) -> resolver::Result<Url> {
        // plain concatenation; Url::join mangles `did:` path segments
        Ok(Url::parse(&format!(
            "{}{}",
            self.opts.plc_directory,
            did.as_str()
        ))?)
    }

    fn resolve_handle_url(&self, handle: &Handle) -> resolver::Result<Url> {
        #[derive(serde::Serialize)]
        struct Params<'a> {
            handle: &'a str,
        }
        let mut url = self.opts.directory.clone();
        url.set_path("/xrpc/com.atproto.identity.resolveHandle");
        let qs = serde_html_form::to_string(Params {
            handle: handle.as_str(),
        })?;
        url.set_query(Some(&qs));
        Ok(url)
    }

    async fn get_json_bytes(&self, url: Url) -> Result<(Bytes, StatusCode), reqwest::Error> {
        let mut req = self.http.get(url);
        if let Some(timeout) = self.opts.timeout {
            req = req.timeout(timeout);
        }
        let resp = req.send().await?;
        let status = resp.status();
        let buf = resp.bytes().await?;
        Ok((buf, status))
    }
}

impl Default for PublicResolver {
    /// Build a resolver with a fresh reqwest client and default options:
    /// public directory host, public PLC directory, 10 s timeout.
    fn default() -> Self {
        Self::new(reqwest::Client::new(), ResolverOptions::default())
    }
}

impl IdentityResolver for PublicResolver {
    fn options(&self) -> &ResolverOptions {
        &self.opts
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self), fields(handle = %handle)))]
    async fn resolve_handle(&self, handle: &Handle) -> resolver::Result<Did> {
        #[derive(serde::Deserialize)]
        struct Output {
            did: String,
        }
        let url = self.resolve_handle_url(handle)?;
        let (buf, status) = self
            .get_json_bytes(url)
            .await
            .map_err(IdentityError::directory)?;
        // the public directory answers 400 for unknown handles
        if status == StatusCode::BAD_REQUEST || status == StatusCode::NOT_FOUND {
            return Err(IdentityError::HandleNotFound);
        }
        if !status.is_success() {
            return Err(IdentityError::DirectoryUnavailable(format!(
                "HTTP status {status}"
            )));
        }
        let out: Output = serde_json::from_slice(&buf).map_err(|e| {
            IdentityError::DirectoryUnavailable(format!("unparseable resolveHandle response: {e}"))
        })?;
        Did::parse(&out.did).map_err(|e| {
            IdentityError::DirectoryUnavailable(format!("directory returned an invalid DID: {e}"))
        })
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self), fields(did = %did)))]
    async fn resolve_did_doc(&self, did: &Did) -> resolver::Result<DidDocResponse> {
        let url = match did.method() {
            "web" => self.did_web_url(did)?,
            "plc" => self.plc_url(did)?,
            other => {
                return Err(IdentityError::DocumentUnresolvable(format!(
                    "unsupported DID method: {other}"
                )));
            }
        };
        let (buf, status) = self
            .get_json_bytes(url)
            .await
            .map_err(IdentityError::document)?;
        Ok(DidDocResponse {
            buffer: buf,
            status,
            requested: Some(did.clone()),
        })
    }
}
