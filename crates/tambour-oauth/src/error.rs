use http::StatusCode;
use miette::Diagnostic;
use thiserror::Error;

use tambour_identity::{HandleError, IdentityError};

use crate::metadata::MetadataError;
use crate::pkce::PkceError;
use crate::registry::RegistryError;

/// Errors emitted by the sign-in flow.
///
/// Component errors convert in via `From`; [`OAuthError::status`] gives the
/// HTTP status a route layer should answer with.
#[derive(Debug, Error, Diagnostic)]
pub enum OAuthError {
    /// Malformed handle from the caller
    #[error(transparent)]
    #[diagnostic(transparent)]
    Handle(#[from] HandleError),
    /// Entropy source failure; fatal for the request, not the process
    #[error(transparent)]
    #[diagnostic(transparent)]
    Pkce(#[from] PkceError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),
    /// createSession endpoint unreachable (no upstream status to relay)
    #[error("upstream session endpoint unreachable: {0}")]
    #[diagnostic(
        code(tambour_oauth::upstream),
        help("check the configured service URL and network path")
    )]
    Upstream(#[source] reqwest::Error),
    /// createSession call exceeded the configured timeout
    #[error("upstream session endpoint timed out")]
    #[diagnostic(
        code(tambour_oauth::upstream_timeout),
        help("raise `ClientConfig::timeout` or check the service host")
    )]
    UpstreamTimeout,
    #[error(transparent)]
    #[diagnostic(code(tambour_oauth::url))]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    #[diagnostic(code(tambour_oauth::urlencoding))]
    UrlEncoding(#[from] serde_html_form::ser::Error),
}

impl OAuthError {
    /// Suggested HTTP status for the route layer.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Handle(_) => StatusCode::BAD_REQUEST,
            Self::Pkce(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Identity(err) => match err {
                IdentityError::HandleNotFound => StatusCode::NOT_FOUND,
                IdentityError::Cancelled => StatusCode::GATEWAY_TIMEOUT,
                IdentityError::DirectoryUnavailable(_)
                | IdentityError::DocumentUnresolvable(_)
                | IdentityError::DocumentInvalid(_)
                | IdentityError::NoPdsEndpoint => StatusCode::BAD_GATEWAY,
                IdentityError::Url(_) | IdentityError::UrlEncoding(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Registry(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Metadata(_) | Self::Url(_) | Self::UrlEncoding(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

pub type Result<T> = core::result::Result<T, OAuthError>;
