//! End-to-end sign-in flow tests against a stub resolver.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use url::Url;

use tambour_identity::resolver::{
    DidDocResponse, IdentityError, IdentityResolver, ResolverOptions,
};
use tambour_identity::{Did, Handle, HandleError};
use tambour_oauth::{AuthClient, ClientConfig, OAuthError, challenge_for};

/// Serves a canned DID and DID document, counting network-shaped calls.
struct StubResolver {
    opts: ResolverOptions,
    calls: AtomicUsize,
    did: &'static str,
    doc: String,
}

impl StubResolver {
    fn new(did: &'static str, doc: serde_json::Value) -> Self {
        Self {
            opts: ResolverOptions::default(),
            calls: AtomicUsize::new(0),
            did,
            doc: doc.to_string(),
        }
    }

    fn with_pds(did: &'static str, pds: &str) -> Self {
        Self::new(
            did,
            serde_json::json!({
                "id": did,
                "service": [{
                    "id": "#atproto_pds",
                    "type": "AtprotoPersonalDataServer",
                    "serviceEndpoint": pds
                }]
            }),
        )
    }
}

impl IdentityResolver for StubResolver {
    fn options(&self) -> &ResolverOptions {
        &self.opts
    }

    async fn resolve_handle(&self, _handle: &Handle) -> Result<Did, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Did::parse(self.did).map_err(|_| IdentityError::HandleNotFound)
    }

    async fn resolve_did_doc(&self, did: &Did) -> Result<DidDocResponse, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(DidDocResponse {
            buffer: Bytes::from(self.doc.clone()),
            status: StatusCode::OK,
            requested: Some(did.clone()),
        })
    }
}

fn config() -> ClientConfig {
    ClientConfig::new()
        .client_name("Tambour Test")
        .client_id(Url::parse("https://app.example/client-metadata.json").unwrap())
        .client_uri(Url::parse("https://app.example").unwrap())
        .redirect_uris(vec![
            Url::parse("https://app.example/oauth/callback").unwrap(),
        ])
        .build()
}

#[tokio::test]
async fn initiate_resolves_pds_and_binds_challenge() {
    let client = AuthClient::new(
        StubResolver::with_pds("did:plc:alice123", "https://pds.example"),
        config(),
    );

    let flow = client.start_auth("Alice.Example.COM").await.unwrap();

    assert_eq!(flow.did.as_str(), "did:plc:alice123");
    assert_eq!(flow.pds.as_str(), "https://pds.example/");
    // challenge must be the recomputable hash of the retained verifier
    assert_eq!(flow.request.code_challenge, challenge_for(&flow.verifier));
    assert_eq!(
        flow.request.login_hint.as_deref(),
        Some("alice.example.com")
    );
    assert!(!flow.request.state.is_empty());
    assert_eq!(flow.request.scope, "atproto transition:generic");

    let url = flow.authorization_url().unwrap();
    assert!(url.starts_with("https://pds.example/oauth/authorize?"));
    assert!(url.contains("code_challenge_method=S256"));
    assert!(url.contains(&format!("code_challenge={}", flow.request.code_challenge)));
}

#[tokio::test]
async fn fresh_state_and_verifier_per_attempt() {
    let client = AuthClient::new(
        StubResolver::with_pds("did:plc:alice123", "https://pds.example"),
        config(),
    );

    let a = client.start_auth("alice.example.com").await.unwrap();
    let b = client.start_auth("alice.example.com").await.unwrap();

    assert_ne!(a.verifier, b.verifier);
    assert_ne!(a.request.state, b.request.state);
}

#[tokio::test]
async fn invalid_handle_fails_before_any_network_call() {
    let resolver = StubResolver::with_pds("did:plc:alice123", "https://pds.example");
    let client = AuthClient::new(resolver, config());

    let err = client.start_auth("bad_handle!").await.unwrap_err();
    match err {
        OAuthError::Handle(kind) => assert_eq!(kind, HandleError::InvalidCharacters),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(client.resolver.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn document_for_wrong_did_is_rejected() {
    let doc = serde_json::json!({
        "id": "did:plc:mallory",
        "service": [{
            "id": "#atproto_pds",
            "type": "AtprotoPersonalDataServer",
            "serviceEndpoint": "https://pds.example"
        }]
    });
    let client = AuthClient::new(StubResolver::new("did:plc:alice123", doc), config());

    let err = client.start_auth("alice.example.com").await.unwrap_err();
    match err {
        OAuthError::Identity(IdentityError::DocumentInvalid(_)) => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn document_without_pds_is_rejected() {
    let doc = serde_json::json!({ "id": "did:plc:alice123" });
    let client = AuthClient::new(StubResolver::new("did:plc:alice123", doc), config());

    let err = client.start_auth("alice.example.com").await.unwrap_err();
    match err {
        OAuthError::Identity(IdentityError::NoPdsEndpoint) => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn stalled_session_endpoint_times_out() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    // accept and hold connections open without answering
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let config = ClientConfig::new()
        .client_name("Tambour Test")
        .client_id(Url::parse("https://app.example/client-metadata.json").unwrap())
        .client_uri(Url::parse("https://app.example").unwrap())
        .redirect_uris(vec![
            Url::parse("https://app.example/oauth/callback").unwrap(),
        ])
        .service(Url::parse(&format!("http://{addr}/")).unwrap())
        .timeout(Duration::from_millis(100))
        .build();
    let client = AuthClient::new(
        StubResolver::with_pds("did:plc:alice123", "https://pds.example"),
        config,
    );

    let err = client
        .create_session("alice.example.com", "hunter2")
        .await
        .unwrap_err();
    assert!(
        matches!(err, OAuthError::UpstreamTimeout),
        "expected UpstreamTimeout, got {err:?}"
    );
}

#[tokio::test]
async fn client_metadata_matches_config() {
    let client = AuthClient::new(
        StubResolver::with_pds("did:plc:alice123", "https://pds.example"),
        config(),
    );
    let metadata = client.client_metadata().unwrap();
    assert_eq!(metadata.client_name, "Tambour Test");
    assert_eq!(metadata.scope, "atproto transition:generic");
    assert_eq!(
        metadata.redirect_uris,
        vec![Url::parse("https://app.example/oauth/callback").unwrap()]
    );
}
