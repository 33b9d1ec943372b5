//! OAuth client metadata and configuration.
//!
//! atproto clients publish a static metadata document at their `client_id`
//! URL; [`client_metadata`] builds the fixed web-client shape from a
//! [`ClientConfig`].

use std::time::Duration;

use bon::Builder;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::pkce::DEFAULT_VERIFIER_BYTES;
use crate::types::AuthorizationResponseType;

/// OAuth scope requested by atproto web clients.
pub const ATPROTO_SCOPE: &str = "atproto transition:generic";

#[derive(Debug, Error, Diagnostic, Clone, Copy, PartialEq, Eq)]
pub enum MetadataError {
    #[error("`redirect_uris` must not be empty")]
    #[diagnostic(
        code(tambour_oauth::metadata_redirect_uris),
        help("register at least one callback URL")
    )]
    EmptyRedirectUris,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    // https://openid.net/specs/openid-connect-core-1_0.html#ClientAuthentication
    PrivateKeyJwt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    AuthorizationCode,
    RefreshToken,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationType {
    Web,
    Native,
}

/// Client metadata document served at `client-metadata.json`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OAuthClientMetadata {
    pub client_name: String,
    pub client_id: Url,
    pub client_uri: Url,
    pub redirect_uris: Vec<Url>,
    pub scope: String,
    pub grant_types: Vec<GrantType>,
    pub response_types: Vec<AuthorizationResponseType>,
    pub application_type: ApplicationType,
    pub token_endpoint_auth_method: AuthMethod,
    // https://datatracker.ietf.org/doc/html/rfc9449#section-5.2
    pub dpop_bound_access_tokens: bool,
}

/// Static client configuration, owned by the service and injected into the
/// flow client.
#[derive(Debug, Clone, Builder)]
#[builder(start_fn = new)]
pub struct ClientConfig {
    #[builder(into)]
    pub client_name: String,
    pub client_id: Url,
    pub client_uri: Url,
    pub redirect_uris: Vec<Url>,
    /// Overrides [`ATPROTO_SCOPE`] when set
    #[builder(into)]
    pub scope: Option<String>,
    /// Identity-provider host for the createSession pass-through
    #[builder(default = Url::parse("https://bsky.social").expect("valid url"))]
    pub service: Url,
    /// Per-request bound on the createSession pass-through
    #[builder(default = Duration::from_secs(30))]
    pub timeout: Duration,
    /// Random bytes behind each PKCE verifier
    #[builder(default = DEFAULT_VERIFIER_BYTES)]
    pub verifier_bytes: usize,
}

impl ClientConfig {
    pub fn scope_or_default(&self) -> &str {
        self.scope.as_deref().unwrap_or(ATPROTO_SCOPE)
    }
}

/// Build the atproto web-client metadata document for `config`.
pub fn client_metadata(config: &ClientConfig) -> Result<OAuthClientMetadata, MetadataError> {
    if config.redirect_uris.is_empty() {
        return Err(MetadataError::EmptyRedirectUris);
    }
    Ok(OAuthClientMetadata {
        client_name: config.client_name.clone(),
        client_id: config.client_id.clone(),
        client_uri: config.client_uri.clone(),
        redirect_uris: config.redirect_uris.clone(),
        scope: config.scope_or_default().to_string(),
        grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
        response_types: vec![AuthorizationResponseType::Code],
        application_type: ApplicationType::Web,
        token_endpoint_auth_method: AuthMethod::None,
        dpop_bound_access_tokens: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig::new()
            .client_name("Social data Transfer")
            .client_id(Url::parse("https://app.example/client-metadata.json").unwrap())
            .client_uri(Url::parse("https://app.example").unwrap())
            .redirect_uris(vec![
                Url::parse("https://app.example/oauth/callback").unwrap(),
            ])
            .build()
    }

    #[test]
    fn metadata_document_shape() {
        let metadata = client_metadata(&config()).unwrap();
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["scope"], "atproto transition:generic");
        assert_eq!(
            json["grant_types"],
            serde_json::json!(["authorization_code", "refresh_token"])
        );
        assert_eq!(json["response_types"], serde_json::json!(["code"]));
        assert_eq!(json["application_type"], "web");
        assert_eq!(json["token_endpoint_auth_method"], "none");
        assert_eq!(json["dpop_bound_access_tokens"], true);
    }

    #[test]
    fn empty_redirect_uris_rejected() {
        let mut config = config();
        config.redirect_uris.clear();
        assert_eq!(
            client_metadata(&config).unwrap_err(),
            MetadataError::EmptyRedirectUris
        );
    }

    #[test]
    fn scope_override_and_defaults() {
        let config = ClientConfig::new()
            .client_name("t")
            .client_id(Url::parse("https://app.example/c.json").unwrap())
            .client_uri(Url::parse("https://app.example").unwrap())
            .redirect_uris(vec![Url::parse("https://app.example/cb").unwrap()])
            .scope("atproto")
            .build();
        assert_eq!(config.scope_or_default(), "atproto");
        assert_eq!(config.service.as_str(), "https://bsky.social/");
        assert_eq!(config.verifier_bytes, DEFAULT_VERIFIER_BYTES);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
