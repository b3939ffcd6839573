use std::sync::Arc;
use std::time::Duration;

use context::{QueryConfig, QueryContext};
use contract::{
    Endpoint, LoginForm, MessageResponse, PasswordChange, ProfilePhoto, ProfileUpdate,
    RegistrationResponse, RequestDescriptor, ValidationEmailRequest,
};
use serde_json::{json, Value};
use session::MemoryCookieStore;
use transport::{HttpConfig, HttpRequestExecutor};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn context_for(base_url: &str, cookies: MemoryCookieStore) -> QueryContext {
    let executor =
        HttpRequestExecutor::new(HttpConfig::new(base_url).unwrap(), Arc::new(cookies)).unwrap();
    QueryContext::new(Arc::new(executor))
}

#[tokio::test]
async fn validate_email_read_yields_status_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/validate-email"))
        .and(query_param("token", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"is_authenticated": true})))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context_for(&server.uri(), MemoryCookieStore::new());
    let endpoint = Endpoint::new("/api/auth/validate-email?token=abc").unwrap();

    let data: Value = ctx.get_data(&endpoint).await.unwrap();

    assert_eq!(data, json!({"is_authenticated": true, "status_code": 200}));
    assert_eq!(ctx.bus().published(), 0);
}

#[tokio::test]
async fn rejected_login_is_returned_and_invalidates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"email": "a@b.com", "mot_de_passe": "x"})))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"message": "Email non vérifié"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context_for(&server.uri(), MemoryCookieStore::new());
    let mut rx = ctx.bus().subscribe();
    let descriptor = LoginForm {
        email: "a@b.com".into(),
        mot_de_passe: "x".into(),
    }
    .into_descriptor()
    .unwrap();

    let reply: Value = ctx.on_mutate(descriptor).await.unwrap();

    assert_eq!(reply, json!({"message": "Email non vérifié", "status_code": 403}));
    assert_eq!(ctx.bus().published(), 1);
    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn unreachable_backend_yields_none_without_invalidation() {
    let ctx = context_for("http://127.0.0.1:9", MemoryCookieStore::new());
    let endpoint = Endpoint::new("/api/auth/login").unwrap();

    let read: Option<Value> = ctx.get_data(&endpoint).await;
    let write: Option<Value> = ctx
        .on_mutate(RequestDescriptor::mutation(endpoint).json(json!({})))
        .await;

    assert!(read.is_none());
    assert!(write.is_none());
    assert_eq!(ctx.bus().published(), 0);
}

#[tokio::test]
async fn password_change_posts_json_with_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/update-password"))
        .and(header("authorization", "Bearer session-token"))
        .and(header("content-type", "application/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": "Mot de passe changé", "status": true})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context_for(&server.uri(), MemoryCookieStore::with_auth_token("session-token"));
    let descriptor = PasswordChange {
        nouveau_de_passe: "n3w".into(),
        mot_de_passe_actuel: "old".into(),
        confirm_new_password: "n3w".into(),
    }
    .into_descriptor()
    .unwrap();

    let reply: MessageResponse = ctx.on_mutate(descriptor).await.unwrap();
    assert_eq!(reply.status_code, 200);
    assert_eq!(reply.message.as_deref(), Some("Mot de passe changé"));
}

#[tokio::test]
async fn profile_update_is_sent_as_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/update-profile/"))
        .and(|request: &Request| {
            let content_type = request
                .headers
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            let body = String::from_utf8_lossy(&request.body);
            content_type.starts_with("multipart/form-data")
                && body.contains("name=\"numero_telephone\"")
                && !body.trim_start().starts_with('{')
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context_for(&server.uri(), MemoryCookieStore::with_auth_token("t"));
    let descriptor = ProfileUpdate {
        nom_famille: "Doe".into(),
        prenom: "John".into(),
        numero_telephone: "1234567890".into(),
        photo: ProfilePhoto::Existing(String::new()),
    }
    .into_descriptor()
    .unwrap();

    let reply: MessageResponse = ctx.on_mutate(descriptor).await.unwrap();
    assert_eq!(reply.status_code, 200);
}

#[tokio::test]
async fn mutation_purges_cached_reads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/activities/activities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"histories": []})))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/activities/upload"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"message": "ok"})))
        .mount(&server)
        .await;

    let ctx = context_for(&server.uri(), MemoryCookieStore::new());
    let cache = ctx.cache(QueryConfig::new(
        Duration::from_secs(60),
        Duration::from_secs(300),
    ));
    let listener = cache.listen();
    let activity = Endpoint::new("/api/activities/activities").unwrap();

    assert!(cache.fetch("activity", &activity).await.is_success());
    assert!(cache.fetch("activity", &activity).await.is_success());

    let _: Value = ctx
        .on_mutate(
            RequestDescriptor::mutation(Endpoint::new("/api/activities/upload").unwrap())
                .json(json!({"description": "Marché"})),
        )
        .await
        .unwrap();

    let mut stale = false;
    for _ in 0..50 {
        if cache.get("activity").is_some_and(|r| r.is_stale()) {
            stale = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(stale);

    assert!(cache.fetch("activity", &activity).await.is_success());
    listener.abort();
}

#[tokio::test]
async fn session_check_returns_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/is-authenticated/"))
        .and(header("authorization", "Bearer abc"))
        .and(|request: &Request| !request.headers.contains_key("content-type"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "is_authenticated": true,
            "user": {"prenom": "Ada", "nom_famille": "Lovelace", "email": "ada@example.com"}
        })))
        .mount(&server)
        .await;

    let ctx = context_for(&server.uri(), MemoryCookieStore::with_auth_token("abc"));

    let user = ctx.session().current_user().await.unwrap();
    assert_eq!(user.initials(), "AL");
    assert_eq!(ctx.bus().published(), 0);
}

#[tokio::test]
async fn login_then_session_uses_the_stored_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "message": "Connexion réussie",
            "token": "fresh-token"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/is-authenticated/"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "is_authenticated": true,
            "user": {"prenom": "John", "nom_famille": "Doe", "email": "test@codeangel.pro"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cookies = Arc::new(MemoryCookieStore::new());
    let executor =
        HttpRequestExecutor::new(HttpConfig::new(&server.uri()).unwrap(), cookies.clone()).unwrap();
    let ctx = QueryContext::new(Arc::new(executor));

    let reply = ctx
        .login(
            cookies.as_ref(),
            LoginForm {
                email: "test@codeangel.pro".into(),
                mot_de_passe: "test".into(),
            },
        )
        .await
        .unwrap();

    assert_eq!(reply.accepted_token(), Some("fresh-token"));
    assert_eq!(ctx.session().current_user().await.unwrap().initials(), "JD");
}

#[tokio::test]
async fn validation_email_is_sent_with_encoded_address() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/send-validation-email"))
        .and(query_param("email", "john+test@example.com"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "ok",
            "email": {"to": "john+test@example.com", "is_sent": true}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context_for(&server.uri(), MemoryCookieStore::new());
    let descriptor = ValidationEmailRequest {
        email: "john+test@example.com".into(),
    }
    .into_descriptor()
    .unwrap();

    let reply: RegistrationResponse = ctx.on_mutate(descriptor).await.unwrap();
    assert!(reply.email_sent());
}

