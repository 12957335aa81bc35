#![allow(clippy::unwrap_used)]

use super::*;
use crate::{
    api::types::Registration, config::AppConfig, errors::INVALID_CREDENTIALS_MESSAGE,
    store::{MemoryTokenStore, TokenStore},
};
use serde_json::json;
use std::{net::TcpListener, path::PathBuf, time::Duration};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn manager(base: &str) -> (SessionManager, Arc<MemoryTokenStore>) {
    let store = Arc::new(MemoryTokenStore::new());
    let config = AppConfig::new(base, PathBuf::from("/tmp/portico-test")).unwrap();
    let gateway = ApiGateway::new(config, store.clone()).unwrap();
    (SessionManager::new(Arc::new(gateway)), store)
}

fn stored_token(store: &MemoryTokenStore) -> Option<String> {
    store
        .get()
        .unwrap()
        .map(|token| token.expose_secret().to_string())
}

async fn mount_current_user(server: &MockServer, token: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/current-user/"))
        .and(header("Authorization", format!("Token {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "username": "alice",
            "email": "a@x.com"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_login(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": token })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn start_without_token_skips_the_network() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let (manager, _store) = manager(&server.uri());
    assert_eq!(manager.status().await, Status::Unknown);

    manager.start().await.unwrap();
    assert_eq!(manager.status().await, Status::Unauthenticated);
}

#[tokio::test]
async fn start_with_token_rehydrates_the_user() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;
    mount_current_user(&server, "abc", 1).await;

    let (manager, store) = manager(&server.uri());
    store.set(&SecretString::from("abc"), 7).unwrap();

    manager.start().await.unwrap();
    let session = manager.snapshot().await;
    assert_eq!(session.status, Status::Authenticated);
    assert!(session.token.is_some());
    assert_eq!(session.user.map(|user| user.username), Some("alice".to_string()));
}

#[tokio::test]
async fn login_then_load_user_authenticates_alice() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;
    mount_login(&server, "abc").await;
    mount_current_user(&server, "abc", 1).await;

    let (manager, store) = manager(&server.uri());
    manager.start().await.unwrap();
    manager.login("alice", "Secret1!").await.unwrap();

    let session = manager.snapshot().await;
    assert_eq!(session.status, Status::Authenticated);
    assert_eq!(session.user.unwrap().username, "alice");
    assert_eq!(stored_token(&store), Some("abc".to_string()));
}

#[tokio::test]
async fn login_rejected_stays_unauthenticated() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Invalid credentials."
        })))
        .mount(&server)
        .await;

    let (manager, store) = manager(&server.uri());
    manager.start().await.unwrap();
    let err = manager.login("alice", "wrong").await.unwrap_err();

    assert_eq!(err.to_string(), INVALID_CREDENTIALS_MESSAGE);
    let session = manager.snapshot().await;
    assert_eq!(session.status, Status::Unauthenticated);
    assert_eq!(
        session.last_error.as_deref(),
        Some("invalid credentials or session expired")
    );
    assert_eq!(stored_token(&store), None);
    // a failed login is not an expired session
    assert_eq!(store.take_flash().unwrap(), None);
}

#[tokio::test]
async fn login_then_logout_empties_the_store() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;
    mount_login(&server, "abc").await;
    mount_current_user(&server, "abc", 1).await;

    let (manager, store) = manager(&server.uri());
    manager.login("alice", "Secret1!").await.unwrap();
    store.set_flash("one-time").unwrap();

    manager.logout().await.unwrap();

    let session = manager.snapshot().await;
    assert_eq!(session.status, Status::Unauthenticated);
    assert!(session.token.is_none());
    assert!(session.user.is_none());
    assert_eq!(stored_token(&store), None);
    assert_eq!(store.take_flash().unwrap(), None);
}

#[tokio::test]
async fn stale_token_on_start_is_cleared() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current-user/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let (manager, store) = manager(&server.uri());
    store.set(&SecretString::from("stale"), 7).unwrap();

    let err = manager.start().await.unwrap_err();
    assert!(err.is_auth());

    let session = manager.snapshot().await;
    assert_eq!(session.status, Status::Unauthenticated);
    assert_eq!(stored_token(&store), None);
    assert_eq!(manager.take_forced_redirect(), Some(Route::Login));
    assert_eq!(manager.take_forced_redirect(), None);
    assert_eq!(store.take_flash().unwrap().as_deref(), Some(EXPIRED_NOTICE));
}

#[tokio::test]
async fn unauthorized_refresh_tears_down_an_authenticated_session() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current-user/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "username": "alice" })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/current-user/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let (manager, store) = manager(&server.uri());
    store.set(&SecretString::from("abc"), 7).unwrap();
    manager.start().await.unwrap();
    assert_eq!(manager.status().await, Status::Authenticated);

    assert!(manager.refresh().await.unwrap_err().is_auth());
    assert_eq!(manager.status().await, Status::Unauthenticated);
    assert_eq!(stored_token(&store), None);
    assert_eq!(manager.take_forced_redirect(), Some(Route::Login));
}

#[tokio::test]
async fn forbidden_current_user_signs_out() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current-user/"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let (manager, store) = manager(&server.uri());
    store.set(&SecretString::from("abc"), 7).unwrap();

    let err = manager.start().await.unwrap_err();
    assert_eq!(err.to_string(), "access denied");
    assert_eq!(manager.status().await, Status::Unauthenticated);
    assert_eq!(stored_token(&store), None);
}

#[tokio::test]
async fn server_error_on_start_keeps_the_token() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current-user/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (manager, store) = manager(&server.uri());
    store.set(&SecretString::from("abc"), 7).unwrap();

    let err = manager.start().await.unwrap_err();
    assert_eq!(err.to_string(), "internal server error");
    let session = manager.snapshot().await;
    assert_eq!(session.status, Status::Unauthenticated);
    assert_eq!(session.last_error.as_deref(), Some("internal server error"));
    assert_eq!(stored_token(&store), Some("abc".to_string()));
}

#[tokio::test]
async fn concurrent_loads_issue_one_request() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current-user/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "username": "alice" }))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (manager, store) = manager(&server.uri());
    store.set(&SecretString::from("abc"), 7).unwrap();

    let (first, second) = tokio::join!(manager.start(), manager.refresh());
    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(manager.status().await, Status::Authenticated);
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 1);
}

async fn mount_slow_current_user(server: &MockServer, token: &str, username: &str, delay_ms: u64) {
    Mock::given(method("GET"))
        .and(path("/current-user/"))
        .and(header("Authorization", format!("Token {token}").as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "username": username }))
                .set_delay(Duration::from_millis(delay_ms)),
        )
        .mount(server)
        .await;
}

fn session_token(session: &Session) -> Option<String> {
    session
        .token
        .as_ref()
        .map(|token| token.expose_secret().to_string())
}

#[tokio::test]
async fn logout_during_refresh_stays_signed_out() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;
    mount_slow_current_user(&server, "abc", "alice", 200).await;

    let (manager, store) = manager(&server.uri());
    store.set(&SecretString::from("abc"), 7).unwrap();
    manager.start().await.unwrap();

    let (refreshed, logged_out) = tokio::join!(manager.refresh(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        manager.logout().await
    });
    assert!(refreshed.is_ok());
    assert!(logged_out.is_ok());

    let session = manager.snapshot().await;
    assert_eq!(session.status, Status::Unauthenticated);
    assert_eq!(session_token(&session), None);
    assert!(session.user.is_none());
    assert_eq!(stored_token(&store), None);
}

#[tokio::test]
async fn login_during_start_loads_the_new_identity() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;
    mount_slow_current_user(&server, "old", "olduser", 300).await;
    mount_current_user(&server, "new", 1).await;
    mount_login(&server, "new").await;

    let (manager, store) = manager(&server.uri());
    store.set(&SecretString::from("old"), 7).unwrap();

    let (started, logged_in) = tokio::join!(manager.start(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        manager.login("alice", "Secret1!").await
    });
    assert!(started.is_ok());
    assert!(logged_in.is_ok());

    let session = manager.snapshot().await;
    assert_eq!(session.status, Status::Authenticated);
    assert_eq!(session.user.as_ref().map(|user| user.username.as_str()), Some("alice"));
    assert_eq!(session_token(&session), Some("new".to_string()));
    assert_eq!(stored_token(&store), Some("new".to_string()));
}

#[tokio::test]
async fn preloaded_login_during_start_is_kept() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;
    mount_slow_current_user(&server, "old", "olduser", 200).await;

    let (manager, store) = manager(&server.uri());
    store.set(&SecretString::from("old"), 7).unwrap();

    let user = User {
        username: "alice".to_string(),
        ..User::default()
    };
    let (started, signed_in) = tokio::join!(manager.start(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        manager
            .login_with_preloaded_user(SecretString::from("fresh"), user)
            .await
    });
    assert!(started.is_ok());
    assert!(signed_in.is_ok());

    let session = manager.snapshot().await;
    assert_eq!(session.status, Status::Authenticated);
    assert_eq!(session.user.as_ref().map(|user| user.username.as_str()), Some("alice"));
    assert_eq!(session_token(&session), Some("fresh".to_string()));
    assert_eq!(stored_token(&store), Some("fresh".to_string()));
}

#[tokio::test]
async fn rejected_old_token_does_not_sign_out_a_new_login() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current-user/"))
        .and(header("Authorization", "Token old"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;
    mount_current_user(&server, "new", 1).await;
    mount_login(&server, "new").await;

    let (manager, store) = manager(&server.uri());
    store.set(&SecretString::from("old"), 7).unwrap();

    let (started, logged_in) = tokio::join!(manager.start(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        manager.login("alice", "Secret1!").await
    });
    assert!(started.unwrap_err().is_auth());
    assert!(logged_in.is_ok());

    let session = manager.snapshot().await;
    assert_eq!(session.status, Status::Authenticated);
    assert_eq!(session_token(&session), Some("new".to_string()));
    assert_eq!(stored_token(&store), Some("new".to_string()));
    assert_eq!(manager.take_forced_redirect(), None);
    assert_eq!(store.take_flash().unwrap(), None);
}

#[tokio::test]
async fn refresh_keeps_authenticated_status_visible() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current-user/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "username": "alice", "first_name": "Alice" }))
                .set_delay(Duration::from_millis(150)),
        )
        .mount(&server)
        .await;

    let (manager, store) = manager(&server.uri());
    store.set(&SecretString::from("abc"), 7).unwrap();
    manager.start().await.unwrap();

    let (refreshed, observed) = tokio::join!(manager.refresh(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        manager.status().await
    });
    assert!(refreshed.is_ok());
    assert_eq!(observed, Status::Authenticated);
}

#[tokio::test]
async fn refresh_failure_without_auth_error_stays_authenticated() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current-user/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "username": "alice" })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/current-user/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (manager, store) = manager(&server.uri());
    store.set(&SecretString::from("abc"), 7).unwrap();
    manager.start().await.unwrap();

    assert!(manager.refresh().await.is_err());
    let session = manager.snapshot().await;
    assert_eq!(session.status, Status::Authenticated);
    assert_eq!(session.last_error.as_deref(), Some("internal server error"));
    assert_eq!(session.user.map(|user| user.username), Some("alice".to_string()));
}

#[tokio::test]
async fn preloaded_user_skips_the_fetch() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let (manager, store) = manager(&server.uri());
    let user = User {
        username: "alice".to_string(),
        ..User::default()
    };
    manager
        .login_with_preloaded_user(SecretString::from("abc"), user)
        .await
        .unwrap();

    let session = manager.snapshot().await;
    assert_eq!(session.status, Status::Authenticated);
    assert_eq!(session.user.unwrap().username, "alice");
    assert_eq!(stored_token(&store), Some("abc".to_string()));
}

fn registration() -> Registration {
    Registration {
        first_name: "Alice".to_string(),
        last_name: "Liddell".to_string(),
        username: "alice".to_string(),
        password: "Secret1!".to_string(),
        confirm_password: "Secret1!".to_string(),
        avatar: None,
    }
}

#[tokio::test]
async fn register_with_identity_signs_in_directly() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/register/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "token": "fresh",
            "username": "alice",
            "first_name": "Alice"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/current-user/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let (manager, store) = manager(&server.uri());
    manager.register(&registration()).await.unwrap();

    assert_eq!(manager.status().await, Status::Authenticated);
    assert_eq!(stored_token(&store), Some("fresh".to_string()));
}

#[tokio::test]
async fn register_with_bare_token_loads_the_user() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/register/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "token": "fresh" })))
        .mount(&server)
        .await;
    mount_current_user(&server, "fresh", 1).await;

    let (manager, _store) = manager(&server.uri());
    manager.register(&registration()).await.unwrap();

    let session = manager.snapshot().await;
    assert_eq!(session.status, Status::Authenticated);
    assert_eq!(session.user.unwrap().email, "a@x.com");
}

#[tokio::test]
async fn register_without_token_asks_for_login() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/register/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 7 })))
        .mount(&server)
        .await;

    let (manager, store) = manager(&server.uri());
    manager.register(&registration()).await.unwrap();

    assert_eq!(manager.status().await, Status::Unauthenticated);
    assert_eq!(store.take_flash().unwrap().as_deref(), Some(REGISTERED_NOTICE));
}

#[tokio::test]
async fn register_rejection_is_kept_for_display() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/register/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "username": ["A user with that username already exists."]
        })))
        .mount(&server)
        .await;

    let (manager, _store) = manager(&server.uri());
    manager.start().await.unwrap();
    assert!(manager.register(&registration()).await.is_err());

    let session = manager.snapshot().await;
    assert_eq!(session.status, Status::Unauthenticated);
    assert_eq!(
        session.last_error.as_deref(),
        Some("username error: A user with that username already exists.")
    );
}
