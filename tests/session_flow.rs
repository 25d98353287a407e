use anyhow::{Result, anyhow};
use ledgerdesk::{
    api::ApiClient,
    auth::{ApiError, ApiRequest, ChannelListener, Dispatch, Notice, Route, SessionManager, UiEvent},
    config::ClientConfig,
    session::{CredentialStore, FileStorage},
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use std::{net::TcpListener, path::Path, sync::Arc, time::Duration};
use tokio::sync::mpsc::UnboundedReceiver;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn expired() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({
        "detail": "Given token not valid for any token type",
        "code": "token_not_valid",
        "messages": [{"token_class": "AccessToken", "token_type": "access", "message": "Token is expired"}]
    }))
}

fn connect(
    server: &MockServer,
    state_file: &Path,
) -> Result<(SessionManager, UnboundedReceiver<UiEvent>)> {
    let config = ClientConfig::new(&server.uri(), state_file)?;
    let (listener, rx) = ChannelListener::new();
    let manager = SessionManager::connect(
        config,
        Arc::new(FileStorage::new(state_file)),
        Arc::new(listener),
    )?;
    Ok((manager, rx))
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/token/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": "A1",
            "refresh": "R1",
            "user": {
                "id": 7,
                "display_name": "Asha",
                "email": "asha@example.com",
                "organizations": [{"organization_id": 1, "name": "Acme", "role": "ADMIN", "status": "ACTIVE"}]
            }
        })))
        .mount(server)
        .await;
}

async fn signed_in(
    server: &MockServer,
    state_file: &Path,
) -> Result<(SessionManager, UnboundedReceiver<UiEvent>)> {
    mount_login(server).await;
    let (manager, rx) = connect(server, state_file)?;
    manager
        .login("asha@example.com", &SecretString::from("hunter2".to_string()))
        .await?;
    Ok((manager, rx))
}

#[tokio::test]
async fn expired_token_is_renewed_and_request_retried() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let dir = tempfile::tempdir()?;
    let state_file = dir.path().join("session.json");

    Mock::given(method("GET"))
        .and(path("/api/bills/"))
        .and(header("Authorization", "Bearer A1"))
        .respond_with(expired())
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .and(body_json(json!({"refresh": "R1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/bills/"))
        .and(header("Authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, mut rx) = signed_in(&server, &state_file).await?;
    let coordinator = manager.coordinator();
    let client = ApiClient::new(coordinator.clone(), coordinator.store().subscribe());

    let bills: Value = client.get_json("/api/bills/").await?;
    assert_eq!(bills, json!([{"id": 1}]));

    let session = manager.session();
    assert!(session.is_authenticated());
    assert_eq!(session.access_token().expose_secret(), "A2");
    assert_eq!(session.refresh_token().expose_secret(), "R1");
    assert_eq!(session.user().map(|user| user.id.as_str()), Some("7"));

    // the renewed pair is what a restart sees
    let reloaded = CredentialStore::load(Arc::new(FileStorage::new(&state_file)));
    assert_eq!(reloaded.access_token().expose_secret(), "A2");
    assert_eq!(reloaded.refresh_token().expose_secret(), "R1");

    assert!(rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn concurrent_expiries_share_one_refresh() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let dir = tempfile::tempdir()?;
    let state_file = dir.path().join("session.json");

    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer A1"))
        .respond_with(expired())
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "A2", "refresh": "R2"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let (manager, _rx) = signed_in(&server, &state_file).await?;
    let coordinator = manager.coordinator().clone();

    let mut handles = Vec::new();
    for page in 0..5 {
        let coordinator = coordinator.clone();
        handles.push(tokio::spawn(async move {
            coordinator
                .dispatch(ApiRequest::get(format!("/api/bills/?page={page}")))
                .await
        }));
    }

    for handle in handles {
        let response = handle.await??;
        assert_eq!(response.status, 200);
    }

    let session = manager.session();
    assert_eq!(session.access_token().expose_secret(), "A2");
    assert_eq!(session.refresh_token().expose_secret(), "R2");
    Ok(())
}

#[tokio::test]
async fn second_expiry_after_retry_is_final() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let dir = tempfile::tempdir()?;
    let state_file = dir.path().join("session.json");

    Mock::given(method("GET"))
        .and(path("/api/bills/"))
        .respond_with(expired())
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, mut rx) = signed_in(&server, &state_file).await?;

    let err = manager
        .coordinator()
        .dispatch(ApiRequest::get("/api/bills/"))
        .await
        .err()
        .ok_or_else(|| anyhow!("expected error"))?;

    assert!(matches!(err, ApiError::RetryExhausted { status: 401, .. }));
    // the renewed session stays; only the request gives up
    assert!(manager.session().is_authenticated());
    assert!(rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn failed_refresh_signs_out_once() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let dir = tempfile::tempdir()?;
    let state_file = dir.path().join("session.json");

    Mock::given(method("GET"))
        .and(path("/api/bills/"))
        .respond_with(expired())
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "Token is invalid or expired", "code": "token_not_valid"}))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (manager, mut rx) = signed_in(&server, &state_file).await?;
    let coordinator = manager.coordinator().clone();

    let first = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            coordinator
                .dispatch(ApiRequest::get("/api/bills/"))
                .await
        })
    };
    let second = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            coordinator
                .dispatch(ApiRequest::get("/api/bills/"))
                .await
        })
    };

    for result in [first.await?, second.await?] {
        let err = result.err().ok_or_else(|| anyhow!("expected error"))?;
        assert_eq!(err.status(), Some(401));
        assert!(!matches!(err, ApiError::RetryExhausted { .. }));
    }

    assert!(manager.session().is_empty());
    assert!(!state_file.exists());

    assert_eq!(rx.try_recv()?, UiEvent::Notice(Notice::session_expired()));
    assert_eq!(rx.try_recv()?, UiEvent::Navigate(Route::SignIn));
    assert!(rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn other_failures_pass_through_untouched() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let dir = tempfile::tempdir()?;
    let state_file = dir.path().join("session.json");

    Mock::given(method("GET"))
        .and(path("/api/admin/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Authentication credentials were not provided."
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/missing/"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})))
        .expect(0)
        .mount(&server)
        .await;

    let (manager, mut rx) = signed_in(&server, &state_file).await?;
    let coordinator = manager.coordinator();

    let err = coordinator
        .dispatch(ApiRequest::get("/api/admin/"))
        .await
        .err()
        .ok_or_else(|| anyhow!("expected error"))?;
    assert_eq!(err.status(), Some(401));

    let err = coordinator
        .dispatch(ApiRequest::get("/api/missing/"))
        .await
        .err()
        .ok_or_else(|| anyhow!("expected error"))?;
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.body(), Some("not found"));

    assert!(manager.session().is_authenticated());
    assert!(rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn session_survives_restart() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let dir = tempfile::tempdir()?;
    let state_file = dir.path().join("session.json");

    Mock::given(method("GET"))
        .and(path("/api/organizations/"))
        .and(header("Authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "name": "Acme"}])))
        .expect(1)
        .mount(&server)
        .await;

    {
        let (manager, _rx) = signed_in(&server, &state_file).await?;
        assert!(manager.session().is_authenticated());
    }

    let (manager, _rx) = connect(&server, &state_file)?;
    let session = manager.session();
    assert!(session.is_authenticated());
    assert_eq!(session.user().map(|user| user.display_name.as_str()), Some("Asha"));

    let coordinator = manager.coordinator();
    let client = ApiClient::new(coordinator.clone(), coordinator.store().subscribe());
    let organizations: Value = client.get_cached("/api/organizations/").await?;
    let again: Value = client.get_cached("/api/organizations/").await?;
    assert_eq!(organizations, again);

    assert!(manager.logout());
    let (manager, _rx) = connect(&server, &state_file)?;
    assert!(manager.session().is_empty());
    Ok(())
}
