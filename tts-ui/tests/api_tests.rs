//! HTTP routing integration tests
//!
//! Drive the full router with `oneshot` requests against a scripted identity
//! provider and a counting converter; no network access.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use reqwest::Url;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tower::ServiceExt;
use tts_ui::client::{ConversionError, ConversionResult, Converter};
use tts_ui::session::{
    IdentityError, IdentityProvider, ProfileClaims, SessionProvider, SessionStatus, TokenSet,
};
use tts_ui::{build_router, AppState};

/// Identity provider that signs in anyone presenting a code
#[derive(Default)]
struct FakeIdentity {
    /// Number of upcoming `discover` calls that fail
    discover_failures: AtomicUsize,
    discover_calls: AtomicUsize,
}

impl FakeIdentity {
    fn failing_discovery(times: usize) -> Self {
        Self {
            discover_failures: AtomicUsize::new(times),
            ..Default::default()
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn discover(&self) -> Result<(), IdentityError> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .discover_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            Err(IdentityError::Discovery("provider offline".to_string()))
        } else {
            Ok(())
        }
    }

    async fn sign_in_url(&self, state: &str) -> Result<Url, IdentityError> {
        Ok(Url::parse(&format!("https://id.example/authorize?state={}", state)).unwrap())
    }

    async fn sign_out_url(&self) -> Option<Url> {
        Some(Url::parse("https://id.example/logout?client_id=test").unwrap())
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenSet, IdentityError> {
        Ok(TokenSet {
            access_token: format!("access-{}", code),
            refresh_token: None,
            expires_in: Some(3600),
        })
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenSet, IdentityError> {
        Err(IdentityError::Provider("refresh not supported".to_string()))
    }

    async fn fetch_profile(&self, _access_token: &str) -> Result<ProfileClaims, IdentityError> {
        Ok(ProfileClaims {
            name: Some("Ada Lovelace".to_string()),
            email: Some("ada@example.com".to_string()),
            picture: None,
        })
    }
}

/// Converter that records calls and returns a fixed location
///
/// A gated converter signals `started` and then waits for `release`.
#[derive(Default)]
struct CountingConverter {
    calls: AtomicUsize,
    seen: Mutex<Vec<(String, String, String)>>,
    gated: bool,
    started: Notify,
    release: Notify,
}

#[async_trait]
impl Converter for CountingConverter {
    async fn convert(
        &self,
        text: &str,
        voice: &str,
        bearer_token: &str,
    ) -> Result<ConversionResult, ConversionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push((
            text.to_string(),
            voice.to_string(),
            bearer_token.to_string(),
        ));
        if self.gated {
            self.started.notify_one();
            self.release.notified().await;
        }
        Ok(ConversionResult {
            audio_location: Url::parse("https://cdn.example/a.mp3").unwrap(),
        })
    }
}

struct TestApp {
    app: Router,
    session: Arc<SessionProvider>,
    identity: Arc<FakeIdentity>,
    converter: Arc<CountingConverter>,
}

impl TestApp {
    /// Router with a session still in `Loading`
    fn loading() -> Self {
        Self::build(FakeIdentity::default(), CountingConverter::default())
    }

    fn build(identity: FakeIdentity, converter: CountingConverter) -> Self {
        let identity = Arc::new(identity);
        let session = Arc::new(SessionProvider::new(identity.clone()));
        let converter = Arc::new(converter);
        let app = build_router(AppState::new(session.clone(), converter.clone()));
        Self {
            app,
            session,
            identity,
            converter,
        }
    }

    /// Router with a bootstrapped, signed-out session
    async fn signed_out() -> Self {
        let test = Self::loading();
        test.session.bootstrap().await;
        test
    }

    /// Router with a signed-in session (token `access-abc`)
    async fn signed_in() -> Self {
        Self::sign_in(Self::loading()).await
    }

    async fn sign_in(test: Self) -> Self {
        test.session.bootstrap().await;
        let response = test.get("/").await;
        let state = state_param(&response);
        let response = test
            .get(&format!("/dashboard?code=abc&state={}", state))
            .await;
        assert_eq!(location(&response), "/dashboard");
        assert_eq!(test.session.status().await, SessionStatus::Authenticated);
        test
    }

    async fn get(&self, uri: &str) -> axum::response::Response {
        self.app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn post_form(&self, uri: &str, body: &str) -> axum::response::Response {
        self.app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }
}

fn location(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect without location")
        .to_str()
        .unwrap()
        .to_string()
}

/// `state` query parameter of a sign-in redirect
fn state_param(response: &axum::response::Response) -> String {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let url = Url::parse(&location(response)).unwrap();
    url.query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .expect("sign-in redirect without state")
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let test = TestApp::loading();
    let response = test.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "tts-ui");
}

#[tokio::test]
async fn test_voice_list() {
    let test = TestApp::loading();
    let response = test.get("/api/voices").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["Amy", "Brian", "Joanna", "Matthew", "Aditi", "Raveena", "Mizuki", "Hans"]
    );
}

#[tokio::test]
async fn test_stylesheet_served() {
    let test = TestApp::loading();
    let response = test.get("/static/styles.css").await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
    assert!(content_type.to_str().unwrap().starts_with("text/css"));
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let test = TestApp::loading();
    let response = test.get("/settings").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_loading_shows_spinner_without_redirect() {
    let test = TestApp::loading();
    for path in ["/", "/dashboard", "/recents"] {
        let response = test.get(path).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("spinner"));
        assert!(!html.contains("Redirecting to login"));
    }
}

#[tokio::test]
async fn test_signed_out_redirects_once() {
    let test = TestApp::signed_out().await;

    let first = test.get("/").await;
    assert_eq!(first.status(), StatusCode::SEE_OTHER);
    assert!(location(&first).starts_with("https://id.example/authorize"));

    let second = test.get("/dashboard").await;
    assert_eq!(second.status(), StatusCode::OK);
    assert!(body_text(second).await.contains("Redirecting to login..."));
}

#[tokio::test]
async fn test_login_route_always_redirects() {
    let test = TestApp::signed_out().await;
    let _ = test.get("/").await;

    let response = test.get("/login").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("https://id.example/authorize"));
}

#[tokio::test]
async fn test_sign_in_callback_then_dashboard() {
    let test = TestApp::signed_in().await;

    let response = test.get("/dashboard").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Ada Lovelace"));
    assert!(html.contains("Convert to Speech"));
    assert!(html.contains("https://via.placeholder.com/40"));
}

#[tokio::test]
async fn test_callback_with_wrong_state_shows_error() {
    let test = TestApp::signed_out().await;
    let _ = test.get("/").await;

    let response = test.get("/dashboard?code=abc&state=forged").await;
    assert_eq!(location(&response), "/dashboard");
    assert_eq!(test.session.status().await, SessionStatus::Error);

    let html = body_text(test.get("/dashboard").await).await;
    assert!(html.contains("Authentication error: Sign-in state mismatch"));
}

#[tokio::test]
async fn test_discovery_failure_shows_error() {
    let test = TestApp::build(
        FakeIdentity::failing_discovery(usize::MAX),
        CountingConverter::default(),
    );
    test.session.bootstrap().await;

    let response = test.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response)
        .await
        .contains("Authentication error: Identity provider discovery failed"));
}

#[tokio::test]
async fn test_authenticated_root_goes_to_dashboard() {
    let test = TestApp::signed_in().await;
    let response = test.get("/").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn test_authenticated_recents_renders() {
    let test = TestApp::signed_in().await;
    let response = test.get("/recents").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains(r#"name="return_to" value="/recents""#));
}

#[tokio::test]
async fn test_convert_success() {
    let test = TestApp::signed_in().await;

    let response = test
        .post_form(
            "/convert",
            "text=Hello+world&voice=Amy&return_to=%2Fdashboard",
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");

    assert_eq!(test.converter.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        test.converter.seen.lock().unwrap()[0],
        (
            "Hello world".to_string(),
            "Amy".to_string(),
            "access-abc".to_string()
        )
    );

    let html = body_text(test.get("/dashboard").await).await;
    assert!(html.contains(r#"<source src="https://cdn.example/a.mp3" type="audio/mpeg">"#));
    assert!(html.contains(r#"download="converted-audio.mp3""#));
}

#[tokio::test]
async fn test_convert_blank_text_rejected() {
    let test = TestApp::signed_in().await;

    let response = test.post_form("/convert", "text=+++&voice=Amy").await;
    assert_eq!(location(&response), "/dashboard");
    assert_eq!(test.converter.calls.load(Ordering::SeqCst), 0);

    let html = body_text(test.get("/dashboard").await).await;
    assert!(html.contains("Please enter some text."));
}

#[tokio::test]
async fn test_convert_without_session_never_calls_service() {
    let test = TestApp::signed_out().await;

    let response = test.post_form("/convert", "text=Hello&voice=Amy").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(test.converter.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let test = TestApp::signed_in().await;
    let _ = test
        .post_form("/convert", "text=Hello&voice=Brian")
        .await;

    let response = test.post_form("/logout", "").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "https://id.example/logout?client_id=test"
    );
    assert_eq!(test.session.status().await, SessionStatus::Unauthenticated);

    let session = test.session.snapshot().await;
    assert!(session.bearer_token.is_none());
    assert!(session.profile.is_none());
}

#[tokio::test]
async fn test_reload_after_discovery_failure_restarts_session() {
    let test = TestApp::build(FakeIdentity::failing_discovery(1), CountingConverter::default());
    test.session.bootstrap().await;

    let first = test.get("/").await;
    assert_eq!(first.status(), StatusCode::OK);
    let html = body_text(first).await;
    assert!(html.contains("Authentication error"));
    assert!(html.contains(r#"<a href="/login">Try again</a>"#));

    let reload = test.get("/").await;
    assert_eq!(reload.status(), StatusCode::SEE_OTHER);
    assert!(location(&reload).starts_with("https://id.example/authorize"));
    assert_eq!(test.identity.discover_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_repeated_discovery_failure_keeps_offering_retry() {
    let test = TestApp::build(FakeIdentity::failing_discovery(2), CountingConverter::default());
    test.session.bootstrap().await;

    for _ in 0..2 {
        let response = test.get("/dashboard").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Authentication error"));
    }

    let response = test.get("/dashboard").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(test.identity.discover_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_login_recovers_from_discovery_failure() {
    let test = TestApp::build(FakeIdentity::failing_discovery(1), CountingConverter::default());
    test.session.bootstrap().await;
    assert_eq!(test.session.status().await, SessionStatus::Error);

    let response = test.get("/login").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("https://id.example/authorize"));
}

#[tokio::test]
async fn test_reload_after_stale_callback_starts_new_sign_in() {
    let test = TestApp::signed_out().await;
    let _ = test.get("/").await;

    let _ = test.get("/dashboard?code=used&state=old").await;
    assert!(body_text(test.get("/dashboard").await)
        .await
        .contains("Authentication error"));

    let reload = test.get("/dashboard").await;
    assert_eq!(reload.status(), StatusCode::SEE_OTHER);
    assert!(location(&reload).starts_with("https://id.example/authorize"));
}

#[tokio::test]
async fn test_submit_while_converting_keeps_fields() {
    let test = TestApp::sign_in(TestApp::build(
        FakeIdentity::default(),
        CountingConverter {
            gated: true,
            ..Default::default()
        },
    ))
    .await;

    let first = tokio::spawn({
        let app = test.app.clone();
        async move {
            app.oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/convert")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("text=First+text&voice=Amy"))
                    .unwrap(),
            )
            .await
            .unwrap()
        }
    });
    test.converter.started.notified().await;

    let second = test
        .post_form("/convert", "text=Second+text&voice=Hans")
        .await;
    assert_eq!(second.status(), StatusCode::SEE_OTHER);

    test.converter.release.notify_one();
    let first = first.await.unwrap();
    assert_eq!(first.status(), StatusCode::SEE_OTHER);

    assert_eq!(test.converter.calls.load(Ordering::SeqCst), 1);
    let html = body_text(test.get("/dashboard").await).await;
    assert!(html.contains(">First text</textarea>"));
    assert!(html.contains(r#"<option value="Amy" selected>"#));
    assert!(!html.contains(r#"<option value="Hans" selected>"#));
    assert!(html.contains("https://cdn.example/a.mp3"));
}
