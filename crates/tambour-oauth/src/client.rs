//! The sign-in flow client.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use serde::Serialize;
use url::Url;

use tambour_identity::{Did, Handle, IdentityResolver};

use crate::error::{OAuthError, Result};
use crate::metadata::{ClientConfig, MetadataError, OAuthClientMetadata, client_metadata};
use crate::pkce::{generate_pkce, generate_state};
use crate::registry::UserRegistry;
use crate::types::{AuthorizationRequest, AuthorizationResponseType};

/// Composes handle validation, PKCE generation, and identity resolution
/// into the operations the HTTP layer exposes.
///
/// Each request runs the chain independently; the only shared mutable state
/// is the [`UserRegistry`].
pub struct AuthClient<R> {
    pub resolver: Arc<R>,
    pub config: ClientConfig,
    pub users: UserRegistry,
    http: reqwest::Client,
}

/// Everything the caller needs to continue a started flow.
///
/// The verifier must be retained until the token exchange step and then
/// discarded; it is excluded from `Debug` output and must never be logged.
pub struct FlowState {
    pub request: AuthorizationRequest,
    pub did: Did,
    pub pds: Url,
    pub verifier: String,
}

impl fmt::Debug for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowState")
            .field("request", &self.request)
            .field("did", &self.did)
            .field("pds", &self.pds)
            .field("verifier", &"<redacted>")
            .finish()
    }
}

impl FlowState {
    /// Authorization URL on the resolved PDS for the assembled request.
    pub fn authorization_url(&self) -> Result<String> {
        let mut url = self.pds.clone();
        url.set_path("/oauth/authorize");
        Ok(url.to_string() + "?" + &serde_html_form::to_string(&self.request)?)
    }
}

/// Verbatim relay of an upstream createSession response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

#[derive(Serialize)]
struct SessionCredentials<'a> {
    identifier: &'a str,
    password: &'a str,
}

fn upstream_error(err: reqwest::Error) -> OAuthError {
    if err.is_timeout() {
        OAuthError::UpstreamTimeout
    } else {
        OAuthError::Upstream(err)
    }
}

impl<R> AuthClient<R>
where
    R: IdentityResolver + Send + Sync,
{
    pub fn new(resolver: R, config: ClientConfig) -> Self {
        Self {
            resolver: Arc::new(resolver),
            config,
            users: UserRegistry::new(),
            http: reqwest::Client::new(),
        }
    }

    /// Static client metadata, served at `client-metadata.json`.
    pub fn client_metadata(&self) -> Result<OAuthClientMetadata> {
        Ok(client_metadata(&self.config)?)
    }

    /// Begin an authorization-code-with-PKCE flow for `raw_handle`.
    ///
    /// Validation and PKCE generation run before resolution, so a malformed
    /// handle never causes a network call. The first failing stage's error
    /// is surfaced as-is; nothing is retried.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self)))]
    pub async fn start_auth(&self, raw_handle: &str) -> Result<FlowState> {
        let handle = Handle::parse(raw_handle)?;
        let pkce = generate_pkce(self.config.verifier_bytes)?;
        let state = generate_state()?;
        let identity = self.resolver.resolve_identity(&handle).await?;
        let redirect_uri = self
            .config
            .redirect_uris
            .first()
            .cloned()
            .ok_or(MetadataError::EmptyRedirectUris)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(did = %identity.did, pds = %identity.pds, "authorization request assembled");
        Ok(FlowState {
            request: AuthorizationRequest {
                response_type: AuthorizationResponseType::Code,
                client_id: self.config.client_id.clone(),
                redirect_uri,
                scope: self.config.scope_or_default().to_string(),
                state,
                code_challenge: pkce.challenge,
                code_challenge_method: pkce.method,
                login_hint: Some(handle.as_str().to_string()),
            },
            did: identity.did,
            pds: identity.pds,
            verifier: pkce.verifier,
        })
    }

    /// Forward credentials to the identity provider's createSession endpoint
    /// and relay the response status and body verbatim.
    ///
    /// The call is bounded by [`ClientConfig::timeout`]; elapse surfaces as
    /// [`OAuthError::UpstreamTimeout`]. The returned token is not interpreted
    /// or cached here.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(self, password))
    )]
    pub async fn create_session(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<UpstreamResponse> {
        let handle = Handle::parse(identifier)?;
        let mut url = self.config.service.clone();
        url.set_path("/xrpc/com.atproto.server.createSession");
        let resp = self
            .http
            .post(url)
            .timeout(self.config.timeout)
            .json(&SessionCredentials {
                identifier: handle.as_str(),
                password,
            })
            .send()
            .await
            .map_err(upstream_error)?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(upstream_error)?;
        Ok(UpstreamResponse { status, body })
    }
}
