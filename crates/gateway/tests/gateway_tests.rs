use conduit_gateway::types::{ArticleParams, CreateCommentRequest, LoginRequest};
use conduit_gateway::{ApiClient, ApiError, Invalidation, InvalidationListener, Notifier, Severity};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use wiremock::matchers::{any, body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingListener {
    calls: AtomicUsize,
    reasons: Mutex<Vec<Invalidation>>,
}

impl InvalidationListener for RecordingListener {
    fn session_invalidated(&self, reason: Invalidation) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reasons.lock().unwrap().push(reason);
    }
}

fn token_expiring_in(seconds: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + seconds;
    encode(
        &Header::default(),
        &json!({ "user_id": 1, "username": "alice", "exp": exp }),
        &EncodingKey::from_secret(b"your-secret-key"),
    )
    .unwrap()
}

fn setup_client(server_uri: &str) -> (ApiClient, Arc<RecordingListener>) {
    let client = ApiClient::new(&format!("{}/api", server_uri), reqwest::Client::new(), Notifier::new(16));
    let listener = Arc::new(RecordingListener::default());
    let weak = Arc::downgrade(&listener);
    client.set_invalidation_listener(weak as Weak<dyn InvalidationListener>);
    (client, listener)
}

fn user_body(token: &str) -> serde_json::Value {
    json!({
        "user": {
            "email": "alice@example.com",
            "token": token,
            "username": "alice",
            "bio": "",
            "image": ""
        }
    })
}

#[tokio::test]
async fn test_expired_token_short_circuits() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tags": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let (client, listener) = setup_client(&server.uri());
    let mut notifications = client.notifier().subscribe();
    let mut invalidations = client.on_session_invalidated();
    client.set_token(Some(token_expiring_in(-60)));

    let result = client.get_tags().await;

    assert!(matches!(result, Err(ApiError::AuthExpired)));
    assert_eq!(listener.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*listener.reasons.lock().unwrap(), vec![Invalidation::Expired]);
    assert_eq!(invalidations.try_recv().unwrap(), Invalidation::Expired);

    let notification = notifications.try_recv().unwrap();
    assert_eq!(notification.title, "Session Expired");
    assert_eq!(notification.severity, Severity::Error);
    assert!(notifications.try_recv().is_err());

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_undecodable_token_counts_as_expired() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (client, listener) = setup_client(&server.uri());

    for token in ["t_old", "not.a.jwt", "eyJhbGciOiJIUzI1NiJ9.%%%.sig"] {
        client.set_token(Some(token.to_string()));
        let result = client.get_articles(&ArticleParams::default()).await;
        assert!(matches!(result, Err(ApiError::AuthExpired)), "token {token}");
    }
    assert_eq!(listener.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_server_401_with_token_is_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Invalid or expired token" })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, listener) = setup_client(&server.uri());
    let mut notifications = client.notifier().subscribe();
    let mut invalidations = client.on_session_invalidated();
    client.set_token(Some(token_expiring_in(3600)));

    let result = client.get_current_user().await;

    assert!(matches!(result, Err(ApiError::AuthRejected)));
    assert_eq!(listener.calls.load(Ordering::SeqCst), 1);
    assert_eq!(invalidations.try_recv().unwrap(), Invalidation::Rejected);
    assert_eq!(notifications.try_recv().unwrap().title, "Authentication Failed");
    assert!(notifications.try_recv().is_err());
}

#[tokio::test]
async fn test_server_401_without_token_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Invalid credentials" })))
        .mount(&server)
        .await;

    let (client, listener) = setup_client(&server.uri());

    let result = client.login(&LoginRequest::new("alice@example.com", "wrong-password")).await;

    match result {
        Err(ApiError::Api { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid credentials");
        }
        other => panic!("Expected ApiError::Api, got {:?}", other),
    }
    assert_eq!(listener.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_error_body_falls_back_to_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let (client, _listener) = setup_client(&server.uri());
    let mut notifications = client.notifier().subscribe();

    let err = client.get_tags().await.unwrap_err();

    assert_eq!(err.to_string(), "HTTP 503");
    assert_eq!(err.status(), Some(503));
    let notification = notifications.try_recv().unwrap();
    assert_eq!(notification.title, "Request Failed");
    assert_eq!(notification.message, "HTTP 503");
}

#[tokio::test]
async fn test_message_field_is_used() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/articles/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Article not found" })))
        .mount(&server)
        .await;

    let (client, _listener) = setup_client(&server.uri());

    let err = client.get_article("missing").await.unwrap_err();

    assert!(matches!(err, ApiError::Api { status: 404, .. }));
    assert_eq!(err.to_string(), "Article not found");
}

#[tokio::test]
async fn test_transport_failure_is_network_error() {
    // Nothing listens on port 1
    let (client, listener) = setup_client("http://127.0.0.1:1");
    let mut notifications = client.notifier().subscribe();

    let result = client.get_tags().await;

    assert!(matches!(result, Err(ApiError::Network(_))));
    assert_eq!(notifications.try_recv().unwrap().title, "Network Error");
    assert_eq!(listener.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_success_carries_bearer_token() {
    let server = MockServer::start().await;
    let token = token_expiring_in(3600);

    Mock::given(method("GET"))
        .and(path("/api/user"))
        .and(header("Authorization", format!("Bearer {}", token).as_str()))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body(&token)))
        .expect(1)
        .mount(&server)
        .await;

    let (client, listener) = setup_client(&server.uri());
    let mut notifications = client.notifier().subscribe();
    client.set_token(Some(token.clone()));

    let response = client.get_current_user().await.unwrap();

    assert_eq!(response.user.username, "alice");
    assert_eq!(response.user.token, token);
    assert_eq!(listener.calls.load(Ordering::SeqCst), 0);
    assert!(notifications.try_recv().is_err());
}

#[tokio::test]
async fn test_anonymous_request_has_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tags": ["rust", "dragons"] })))
        .mount(&server)
        .await;

    let (client, _listener) = setup_client(&server.uri());

    let tags = client.get_tags().await.unwrap();

    assert_eq!(tags.tags, vec!["rust", "dragons"]);
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0]
        .headers
        .keys()
        .any(|name| name.as_str().eq_ignore_ascii_case("authorization")));
}

#[tokio::test]
async fn test_article_filters_become_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/articles"))
        .and(query_param("limit", "10"))
        .and(query_param("offset", "20"))
        .and(query_param("tag", "dragons"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "articles": [], "articlesCount": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _listener) = setup_client(&server.uri());
    let params = ArticleParams {
        limit: Some(10),
        offset: Some(20),
        tag: Some("dragons".to_string()),
        ..Default::default()
    };

    let response = client.get_articles(&params).await.unwrap();
    assert_eq!(response.articles_count, 0);
}

#[tokio::test]
async fn test_delete_with_empty_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/articles/how-to-train-your-dragon/comments/7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _listener) = setup_client(&server.uri());
    client.set_token(Some(token_expiring_in(3600)));

    client.delete_comment("how-to-train-your-dragon", 7).await.unwrap();
}

#[tokio::test]
async fn test_create_comment_sends_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/articles/dragons/comments"))
        .and(body_json(json!({ "comment": { "body": "Thank you so much!" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "comment": {
                "id": 1,
                "body": "Thank you so much!",
                "createdAt": "2016-02-18T03:22:56.637Z",
                "updatedAt": "2016-02-18T03:22:56.637Z",
                "author": { "username": "alice", "bio": null, "image": null, "following": false }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _listener) = setup_client(&server.uri());
    client.set_token(Some(token_expiring_in(3600)));

    let response = client
        .create_comment("dragons", &CreateCommentRequest::new("Thank you so much!"))
        .await
        .unwrap();
    assert_eq!(response.comment.author.username, "alice");
}

#[tokio::test]
async fn test_malformed_success_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/profiles/jake"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let (client, _listener) = setup_client(&server.uri());
    let mut notifications = client.notifier().subscribe();

    let result = client.get_profile("jake").await;

    assert!(matches!(result, Err(ApiError::Decode(_))));
    assert_eq!(notifications.try_recv().unwrap().title, "Request Failed");
}

#[tokio::test]
async fn test_follow_and_unfollow() {
    let server = MockServer::start().await;
    let profile = |following: bool| {
        json!({ "profile": { "username": "jake", "bio": "", "image": "", "following": following } })
    };
    Mock::given(method("POST"))
        .and(path("/api/profiles/jake/follow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile(true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/profiles/jake/follow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile(false)))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _listener) = setup_client(&server.uri());
    client.set_token(Some(token_expiring_in(3600)));

    assert!(client.follow_user("jake").await.unwrap().profile.following);
    assert!(!client.unfollow_user("jake").await.unwrap().profile.following);
}

#[tokio::test]
async fn test_replaced_listener_is_the_only_one_called() {
    let server = MockServer::start().await;
    let (client, first) = setup_client(&server.uri());

    let second = Arc::new(RecordingListener::default());
    let weak = Arc::downgrade(&second);
    client.set_invalidation_listener(weak as Weak<dyn InvalidationListener>);
    client.set_token(Some("garbage".to_string()));

    let _ = client.get_tags().await;

    assert_eq!(first.calls.load(Ordering::SeqCst), 0);
    assert_eq!(second.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_dropped_listener_is_skipped() {
    let server = MockServer::start().await;
    let (client, listener) = setup_client(&server.uri());
    let mut invalidations = client.on_session_invalidated();
    drop(listener);
    client.set_token(Some("garbage".to_string()));

    let result = client.get_tags().await;

    assert!(matches!(result, Err(ApiError::AuthExpired)));
    assert_eq!(invalidations.try_recv().unwrap(), Invalidation::Expired);
}

#[tokio::test]
async fn test_rejection_of_replaced_token_is_ignored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "error": "Invalid or expired token" }))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, listener) = setup_client(&server.uri());
    let mut invalidations = client.on_session_invalidated();
    client.set_token(Some(token_expiring_in(3600)));
    let fresh = token_expiring_in(7200);

    let (result, _) = tokio::join!(client.get_current_user(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        client.set_token(Some(fresh.clone()));
    });

    assert!(matches!(result, Err(ApiError::AuthRejected)));
    assert_eq!(listener.calls.load(Ordering::SeqCst), 0);
    assert!(invalidations.try_recv().is_err());
    assert_eq!(client.token().as_deref(), Some(fresh.as_str()));
}

#[tokio::test]
async fn test_unparsable_base_url_notifies() {
    let client = ApiClient::new("not a url", reqwest::Client::new(), Notifier::new(4));
    let mut notifications = client.notifier().subscribe();

    let result = client.get_tags().await;

    assert!(matches!(result, Err(ApiError::Url(_))));
    assert_eq!(notifications.try_recv().unwrap().title, "Request Failed");
}
