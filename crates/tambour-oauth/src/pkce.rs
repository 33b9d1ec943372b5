//! PKCE verifier/challenge generation.
//!
//! Random material comes from the OS entropy source via fallible reads: a
//! short read or source failure is a [`PkceError::Entropy`] for that call,
//! never a silent fallback to a weaker generator.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use miette::Diagnostic;
use rand::rngs::OsRng;
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Default number of random bytes behind a verifier.
pub const DEFAULT_VERIFIER_BYTES: usize = 64;
/// Smallest allowed verifier input (encodes to RFC 7636's 43-char minimum).
pub const MIN_VERIFIER_BYTES: usize = 32;
/// Largest allowed verifier input (encodes to RFC 7636's 128-char maximum).
pub const MAX_VERIFIER_BYTES: usize = 96;

const STATE_BYTES: usize = 16;

#[derive(Debug, Error, Diagnostic)]
pub enum PkceError {
    #[error("verifier byte length {requested} is outside the allowed 32-96 byte range")]
    #[diagnostic(
        code(tambour_oauth::pkce_length),
        help("use 32-96 random bytes; the default is 64")
    )]
    LengthOutOfRange { requested: usize },
    /// The OS random source failed or returned short
    #[error("secure random source failure: {0}")]
    #[diagnostic(
        code(tambour_oauth::pkce_entropy),
        help("abort the request and retry once the OS entropy source is healthy")
    )]
    Entropy(#[from] rand_core::Error),
}

/// PKCE code challenge transform. Only `S256` is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeChallengeMethod {
    S256,
}

/// A verifier/challenge pair for one authorization attempt.
///
/// The challenge is always the recomputable SHA-256 digest of the verifier
/// ([`challenge_for`]). The verifier is a secret: `Debug` redacts it, and it
/// must not be logged or persisted in cleartext.
#[derive(Clone, PartialEq, Eq)]
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
    pub method: CodeChallengeMethod,
}

impl fmt::Debug for Pkce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pkce")
            .field("verifier", &"<redacted>")
            .field("challenge", &self.challenge)
            .field("method", &self.method)
            .finish()
    }
}

/// Generate a base64url (no padding) verifier from `byte_length` random bytes.
pub fn generate_verifier(byte_length: usize) -> Result<String, PkceError> {
    if !(MIN_VERIFIER_BYTES..=MAX_VERIFIER_BYTES).contains(&byte_length) {
        return Err(PkceError::LengthOutOfRange {
            requested: byte_length,
        });
    }
    let mut bytes = vec![0u8; byte_length];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(URL_SAFE_NO_PAD.encode(&bytes))
}

/// The S256 challenge for a verifier.
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Generate a fresh verifier/challenge pair.
pub fn generate_pkce(byte_length: usize) -> Result<Pkce, PkceError> {
    // https://datatracker.ietf.org/doc/html/rfc7636#section-4.1
    let verifier = generate_verifier(byte_length)?;
    let challenge = challenge_for(&verifier);
    Ok(Pkce {
        verifier,
        challenge,
        method: CodeChallengeMethod::S256,
    })
}

/// Random nonce for the authorization request `state` parameter.
pub fn generate_state() -> Result<String, PkceError> {
    let mut bytes = [0u8; STATE_BYTES];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
