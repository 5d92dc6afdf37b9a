#![allow(dead_code)]

pub mod fakes;
pub mod server;

use std::sync::Arc;

use client::api::{ApiClient, LoginRequest};
use client::auth::session::SessionStore;

/// A client wired against a fresh stub server, with its session file in a
/// throwaway directory.
pub struct TestClient {
    pub server: server::StubServer,
    pub store: Arc<SessionStore>,
    pub api: ApiClient,
    pub tmp: tempfile::TempDir,
}

pub async fn connect() -> TestClient {
    let server = server::spawn().await;
    let tmp = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(SessionStore::load(tmp.path().join("session.json")));
    let api = ApiClient::new(server.base_url(), store.clone());
    TestClient {
        server,
        store,
        api,
        tmp,
    }
}

/// Logs in through the stub and persists the session, like the login screen
/// would.
pub async fn sign_in(tc: &TestClient) {
    let resp = tc
        .api
        .login(&LoginRequest {
            username: "alice".into(),
            password: "pw".into(),
        })
        .await
        .expect("stub login");
    tc.store.login(resp.access_token, resp.user).expect("persist session");
}

pub async fn sign_in_admin(tc: &TestClient) {
    *tc.server.state.login_user.lock().unwrap() = server::admin_user();
    let resp = tc
        .api
        .login(&LoginRequest {
            username: "root".into(),
            password: "pw".into(),
        })
        .await
        .expect("stub login");
    tc.store.login(resp.access_token, resp.user).expect("persist session");
}
