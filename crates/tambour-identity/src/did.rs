//! DID and DID document types.
//!
//! Only the fields the sign-in flow needs are modeled explicitly; everything
//! else in a fetched document is ignored on parse.

use std::fmt;
use std::str::FromStr;

use miette::Diagnostic;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use smol_str::SmolStr;
use thiserror::Error;
use url::Url;

/// Service type naming a user's PDS inside a DID document.
pub const PDS_SERVICE_TYPE: &str = "AtprotoPersonalDataServer";

#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum DidError {
    #[error("DID must start with `did:`")]
    #[diagnostic(code(tambour_identity::did_scheme))]
    MissingScheme,
    #[error("unsupported DID method: {0}")]
    #[diagnostic(
        code(tambour_identity::did_method),
        help("supported DID methods: did:web, did:plc")
    )]
    UnsupportedMethod(String),
    #[error("DID method-specific id must not be empty")]
    #[diagnostic(code(tambour_identity::did_empty_id))]
    EmptyId,
}

/// A decentralized identifier, restricted to the methods atproto uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Did(SmolStr);

impl Did {
    pub fn parse(raw: &str) -> Result<Self, DidError> {
        let rest = raw.strip_prefix("did:").ok_or(DidError::MissingScheme)?;
        let (method, id) = rest
            .split_once(':')
            .ok_or_else(|| DidError::UnsupportedMethod(rest.to_string()))?;
        if method != "plc" && method != "web" {
            return Err(DidError::UnsupportedMethod(method.to_string()));
        }
        if id.is_empty() {
            return Err(DidError::EmptyId);
        }
        Ok(Self(SmolStr::from(raw)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The DID method name (`plc` or `web`).
    pub fn method(&self) -> &str {
        // shape enforced by `parse`
        self.0
            .strip_prefix("did:")
            .and_then(|rest| rest.split(':').next())
            .unwrap_or_default()
    }
}

impl FromStr for Did {
    type Err = DidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for Did {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Did {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// DID document, as served by the PLC directory or a did:web host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    /// Document identifier (e.g., `did:plc:...` or `did:web:...`)
    pub id: Did,
    /// Alternate identifiers for the subject, such as `at://<handle>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub also_known_as: Option<Vec<String>>,
    /// Services associated with this DID (e.g., AtprotoPersonalDataServer)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<Vec<Service>>,
}

/// A service entry inside a DID document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub r#type: String,
    /// Either a plain URL string or an object carrying a `url` field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_endpoint: Option<Value>,
}

impl DidDocument {
    /// Extract the PDS endpoint URL, if the document declares one.
    pub fn pds_endpoint(&self) -> Option<Url> {
        self.service.as_ref().and_then(|services| {
            services.iter().find_map(|s| {
                if s.r#type == PDS_SERVICE_TYPE {
                    match &s.service_endpoint {
                        Some(Value::String(v)) => Url::parse(v).ok(),
                        Some(Value::Object(obj)) => obj
                            .get("url")
                            .and_then(|u| u.as_str())
                            .and_then(|u| Url::parse(u).ok()),
                        _ => None,
                    }
                } else {
                    None
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn did_methods() {
        assert_eq!(Did::parse("did:plc:abc123").unwrap().method(), "plc");
        assert_eq!(Did::parse("did:web:example.com").unwrap().method(), "web");
        assert_eq!(Did::parse("plc:abc").unwrap_err(), DidError::MissingScheme);
        assert_eq!(
            Did::parse("did:key:zQ3sh").unwrap_err(),
            DidError::UnsupportedMethod("key".into())
        );
        assert_eq!(Did::parse("did:plc:").unwrap_err(), DidError::EmptyId);
    }

    #[test]
    fn pds_endpoint_string_form() {
        let doc: DidDocument = serde_json::from_value(serde_json::json!({
            "id": "did:plc:alice",
            "alsoKnownAs": ["at://alice.example.com"],
            "service": [{
                "id": "#atproto_pds",
                "type": "AtprotoPersonalDataServer",
                "serviceEndpoint": "https://pds.example"
            }]
        }))
        .unwrap();
        assert_eq!(
            doc.pds_endpoint().unwrap().as_str(),
            "https://pds.example/"
        );
    }

    #[test]
    fn pds_endpoint_object_form() {
        let doc: DidDocument = serde_json::from_value(serde_json::json!({
            "id": "did:plc:alice",
            "service": [{
                "id": "#atproto_pds",
                "type": "AtprotoPersonalDataServer",
                "serviceEndpoint": { "url": "https://pds.example" }
            }]
        }))
        .unwrap();
        assert!(doc.pds_endpoint().is_some());
    }

    #[test]
    fn pds_endpoint_absent() {
        let doc: DidDocument = serde_json::from_value(serde_json::json!({
            "id": "did:plc:alice",
            "service": [{ "id": "#other", "type": "SomethingElse" }]
        }))
        .unwrap();
        assert!(doc.pds_endpoint().is_none());
    }
}
