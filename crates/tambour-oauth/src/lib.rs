//! OAuth sign-in bootstrap for the AT Protocol
//!
//! Covers the front half of an atproto login: PKCE verifier/challenge
//! generation, the static OAuth client metadata document, a concurrency-safe
//! user registry, and [`AuthClient`], which chains handle validation →
//! PKCE → identity resolution into the "initiate OAuth" operation.
//!
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use tambour_identity::PublicResolver;
//! use tambour_oauth::{AuthClient, ClientConfig};
//! use url::Url;
//!
//! let config = ClientConfig::new()
//!     .client_name("My App")
//!     .client_id(Url::parse("https://app.example/client-metadata.json")?)
//!     .client_uri(Url::parse("https://app.example")?)
//!     .redirect_uris(vec![Url::parse("https://app.example/oauth/callback")?])
//!     .build();
//!
//! let client = AuthClient::new(PublicResolver::default(), config);
//! let flow = client.start_auth("alice.example.com").await?;
//! println!("send the user to {}", flow.authorization_url()?);
//! // retain flow.verifier for the token exchange step, then discard it
//! # Ok(())
//! # }
//! ```
//!
//! Token issuance/refresh, DPoP, and session persistence are out of scope;
//! [`FlowState`] hands the caller what it needs to continue externally.

pub mod client;
pub mod error;
pub mod metadata;
pub mod pkce;
pub mod registry;
pub mod types;

pub use client::{AuthClient, FlowState, UpstreamResponse};
pub use error::{OAuthError, Result};
pub use metadata::{ATPROTO_SCOPE, ClientConfig, MetadataError, OAuthClientMetadata, client_metadata};
pub use pkce::{
    DEFAULT_VERIFIER_BYTES, Pkce, PkceError, challenge_for, generate_pkce, generate_state,
    generate_verifier,
};
pub use registry::{RegistryError, UserRecord, UserRegistry};
pub use types::{AuthorizationRequest, AuthorizationResponseType};
