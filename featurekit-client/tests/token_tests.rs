use async_trait::async_trait;
use chrono::{Duration, Utc};
use featurekit_client::{
    ClientResult, CredentialsTokenGenerator, Error, IssuedToken, ProtocolCause, Token,
    TokenGenerator, TokenState,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Issues `token-1`, `token-2`, ... each valid for `lifetime`.
struct CountingGenerator {
    calls: AtomicUsize,
    lifetime: Duration,
}

impl CountingGenerator {
    fn new(lifetime: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            lifetime,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenGenerator for CountingGenerator {
    fn key(&self) -> String {
        "counting".to_string()
    }

    async fn generate(&self) -> ClientResult<IssuedToken> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(IssuedToken::new(
            format!("token-{n}"),
            Some(Utc::now() + self.lifetime),
        ))
    }
}

struct FailingGenerator;

#[async_trait]
impl TokenGenerator for FailingGenerator {
    fn key(&self) -> String {
        "failing".to_string()
    }

    async fn generate(&self) -> ClientResult<IssuedToken> {
        Err(Error::Token("credentials revoked".to_string()))
    }
}

/// Never finishes generating.
struct StalledGenerator;

#[async_trait]
impl TokenGenerator for StalledGenerator {
    fn key(&self) -> String {
        "stalled".to_string()
    }

    async fn generate(&self) -> ClientResult<IssuedToken> {
        std::future::pending().await
    }
}

// ── Literal tokens ──────────────────────────────────────────────

#[tokio::test]
async fn literal_token_never_expires() {
    let token = Token::from_literal("abc");
    assert_eq!(token.key(), "abc");
    assert_eq!(token.state().await, TokenState::Valid);
    assert_eq!(token.value().await.unwrap(), "abc");
    assert_eq!(token.value().await.unwrap(), "abc");
}

#[test]
fn token_debug_hides_value() {
    let token = Token::from_literal("very-secret");
    assert!(!format!("{token:?}").contains("very-secret"));

    let issued = IssuedToken::new("very-secret", None);
    assert!(!format!("{issued:?}").contains("very-secret"));
}

// ── Generated tokens ────────────────────────────────────────────

#[tokio::test]
async fn generated_lazily_and_reused_while_valid() {
    let generator = CountingGenerator::new(Duration::hours(1));
    let token = Token::with_generator(generator.clone());

    assert_eq!(token.state().await, TokenState::Unpopulated);
    assert_eq!(generator.calls(), 0);

    assert_eq!(token.value().await.unwrap(), "token-1");
    assert_eq!(token.value().await.unwrap(), "token-1");
    assert_eq!(generator.calls(), 1);
    assert_eq!(token.state().await, TokenState::Valid);
}

#[tokio::test]
async fn regenerated_within_expiry_margin() {
    let generator = CountingGenerator::new(Duration::seconds(10));
    let token = Token::with_generator(generator.clone());

    assert_eq!(token.value().await.unwrap(), "token-1");
    assert_eq!(token.state().await, TokenState::Expiring);
    assert_eq!(token.value().await.unwrap(), "token-2");
    assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn concurrent_readers_share_one_generation() {
    let generator = CountingGenerator::new(Duration::hours(1));
    let token = Arc::new(Token::with_generator(generator.clone()));

    let (a, b) = tokio::join!(token.value(), token.value());
    assert_eq!(a.unwrap(), "token-1");
    assert_eq!(b.unwrap(), "token-1");
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn generation_is_notified() {
    let token = Token::with_generator(CountingGenerator::new(Duration::hours(1)));
    let mut generated = token.subscribe();

    token.value().await.unwrap();
    let issued = generated.recv().await.unwrap();
    assert_eq!(issued.value, "token-1");
    assert!(issued.expires.is_some());
}

#[tokio::test]
async fn generation_failure_is_returned() {
    let token = Token::with_generator(Arc::new(FailingGenerator));
    let err = token.value().await.unwrap_err();
    assert!(matches!(err, Error::Token(_)));
    assert_eq!(token.state().await, TokenState::Unpopulated);
}

#[tokio::test]
async fn abandoned_generation_clears_regenerating_state() {
    let token = Token::with_generator(Arc::new(StalledGenerator));

    tokio::select! {
        _ = token.value() => panic!("stalled generator produced a token"),
        state = async {
            tokio::task::yield_now().await;
            token.state().await
        } => assert_eq!(state, TokenState::Regenerating),
    }

    assert_eq!(token.state().await, TokenState::Unpopulated);
}

// ── Credentials generator ───────────────────────────────────────

#[tokio::test]
async fn credentials_are_exchanged_for_a_token() {
    let server = MockServer::start().await;
    let expires = 1_893_456_000_000_i64;

    Mock::given(method("POST"))
        .and(path("/tokens/generateToken"))
        .and(body_string_contains("username=ana"))
        .and(body_string_contains("password=s3cret"))
        .and(body_string_contains("client=requestip"))
        .and(body_string_contains("expiration=15"))
        .and(body_string_contains("f=json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token": "issued-token",
            "expires": expires
        })))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/tokens/generateToken", server.uri());
    let generator = CredentialsTokenGenerator::new(&url, "ana", "s3cret")
        .unwrap()
        .with_expiration_minutes(15);

    assert_eq!(generator.key(), format!("ana@{url}"));
    let issued = generator.generate().await.unwrap();
    assert_eq!(issued.value, "issued-token");
    assert_eq!(issued.expires.unwrap().timestamp_millis(), expires);
}

#[tokio::test]
async fn referer_binding_is_sent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generateToken"))
        .and(body_string_contains("client=referer"))
        .and(body_string_contains("referer=https%3A%2F%2Fapp.example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token": "t"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let generator = CredentialsTokenGenerator::new(
        format!("{}/generateToken", server.uri()),
        "ana",
        "s3cret",
    )
    .unwrap()
    .with_referer("https://app.example.com");

    let issued = generator.generate().await.unwrap();
    assert_eq!(issued.expires, None);
}

#[tokio::test]
async fn rejected_credentials_surface_as_service_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generateToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": {
                "code": 400,
                "message": "Unable to generate token.",
                "details": ["Invalid username or password."]
            }
        })))
        .mount(&server)
        .await;

    let generator = CredentialsTokenGenerator::new(
        format!("{}/generateToken", server.uri()),
        "ana",
        "s3cret",
    )
    .unwrap();

    let err = generator.generate().await.unwrap_err();
    let protocol = err.as_protocol().unwrap();
    match &protocol.cause {
        ProtocolCause::Service { code, details, .. } => {
            assert_eq!(*code, 400);
            assert_eq!(details, &vec!["Invalid username or password.".to_string()]);
        }
        other => panic!("unexpected cause: {other:?}"),
    }
    let body = protocol.request_body.as_deref().unwrap();
    assert!(body.contains("password=***"));
    assert!(!body.contains("s3cret"));
}
