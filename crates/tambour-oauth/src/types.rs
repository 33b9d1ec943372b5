//! Wire-format types for the authorization request.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::pkce::CodeChallengeMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationResponseType {
    Code,
}

/// Parameters for the authorization endpoint, serializable straight into a
/// query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    // https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.1
    pub response_type: AuthorizationResponseType,
    pub client_id: Url,
    pub redirect_uri: Url,
    pub scope: String,
    pub state: String,
    // https://datatracker.ietf.org/doc/html/rfc7636#section-4.3
    pub code_challenge: String,
    pub code_challenge_method: CodeChallengeMethod,
    // https://openid.net/specs/openid-connect-core-1_0.html#AuthRequest
    pub login_hint: Option<String>,
}
