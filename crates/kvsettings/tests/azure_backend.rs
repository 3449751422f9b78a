//! Azure Key Vault backend against a mock identity provider and vault.

use kvsettings::backends::{API_VERSION, KEY_VAULT_SCOPE};
use kvsettings::{
    AuthConfig, AzureKeyVault, KeyVaultSettings, SettingsLoader, SettingsSource, VaultErrorKind,
};
use serde_json::json;
use std::io::Write;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TENANT: &str = "tenant-1";
const TOKEN: &str = "test-access-token";

fn auth(server: &MockServer) -> AuthConfig {
    AuthConfig::new("client-1", "app-secret-1", TENANT, format!("{}/", server.uri()))
}

fn backend(server: &MockServer) -> AzureKeyVault {
    AzureKeyVault::new()
        .unwrap()
        .with_authority_host(server.uri())
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("/{TENANT}/oauth2/v2.0/token")))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=client-1"))
        .and(body_string_contains("client_secret=app-secret-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3599,
            "access_token": TOKEN
        })))
        .mount(server)
        .await;
}

async fn mount_list(server: &MockServer, names: &[&str]) {
    let items: Vec<_> = names
        .iter()
        .map(|name| json!({ "id": format!("{}/secrets/{name}", server.uri()), "attributes": { "enabled": true } }))
        .collect();

    Mock::given(method("GET"))
        .and(path("/secrets"))
        .and(query_param("api-version", API_VERSION))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": items,
            "nextLink": null
        })))
        .mount(server)
        .await;
}

async fn mount_secret(server: &MockServer, name: &str, value: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/secrets/{name}")))
        .and(query_param("api-version", API_VERSION))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": value,
            "id": format!("{}/secrets/{name}/0123456789abcdef", server.uri())
        })))
        .mount(server)
        .await;
}

async fn mount_secret_error(server: &MockServer, name: &str, status: u16, code: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/secrets/{name}")))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({
            "error": { "code": code, "message": format!("{code} for {name}") }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_load_exposes_normalized_names() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_list(&server, &["foo-bar", "baz"]).await;
    mount_secret(&server, "foo-bar", "one").await;
    mount_secret(&server, "baz", "two").await;

    let settings = SettingsLoader::with_auth(auth(&server), backend(&server))
        .load()
        .await;

    assert_eq!(settings.names().collect::<Vec<_>>(), vec!["baz", "foo_bar"]);
    assert_eq!(settings.get("foo_bar"), Some("one"));
    assert_eq!(settings.get("baz"), Some("two"));
}

#[tokio::test]
async fn test_partial_fetch_failure_yields_empty_value() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_list(&server, &["ok", "locked", "gone"]).await;
    mount_secret(&server, "ok", "fine").await;
    mount_secret_error(&server, "locked", 403, "Forbidden").await;
    mount_secret_error(&server, "gone", 404, "SecretNotFound").await;

    let settings = SettingsLoader::with_auth(auth(&server), backend(&server))
        .load()
        .await;

    assert_eq!(settings.len(), 3);
    assert_eq!(settings.get("ok"), Some("fine"));
    assert_eq!(settings.get("locked"), Some(""));
    assert_eq!(settings.get("gone"), Some(""));
}

#[tokio::test]
async fn test_strict_fetch_reports_status() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_secret_error(&server, "locked", 403, "Forbidden").await;
    mount_secret_error(&server, "gone", 404, "SecretNotFound").await;

    let loader = SettingsLoader::with_auth(auth(&server), backend(&server));

    let denied = loader.try_fetch_secret("locked").await.unwrap_err();
    assert_eq!(denied.kind(), VaultErrorKind::AccessDenied);
    assert!(denied.to_string().contains("Forbidden"));

    let missing = loader.try_fetch_secret("gone").await.unwrap_err();
    assert_eq!(missing.kind(), VaultErrorKind::NotFound);
    assert!(missing.to_string().contains("SecretNotFound"));
}

#[tokio::test]
async fn test_list_failure_yields_empty_settings() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/secrets"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let settings = SettingsLoader::with_auth(auth(&server), backend(&server))
        .load()
        .await;

    assert!(settings.is_empty());
}

#[tokio::test]
async fn test_authentication_failure_is_swallowed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/{TENANT}/oauth2/v2.0/token")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "AADSTS7000215: Invalid client secret provided."
        })))
        .mount(&server)
        .await;

    let loader = SettingsLoader::with_auth(auth(&server), backend(&server));

    let err = loader.try_list_secret_names().await.unwrap_err();
    assert_eq!(err.kind(), VaultErrorKind::Authentication);
    assert!(err.to_string().contains("invalid_client"));

    assert!(loader.list_secret_names().await.is_empty());
    assert_eq!(loader.fetch_secret("anything").await, "");
}

#[tokio::test]
async fn test_list_follows_next_link() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/secrets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{ "id": format!("{}/secrets/first", server.uri()) }],
            "nextLink": format!("{}/secrets-page/2?api-version={API_VERSION}", server.uri())
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/secrets-page/2"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{ "id": format!("{}/secrets/second-one", server.uri()) }],
            "nextLink": null
        })))
        .mount(&server)
        .await;

    let loader = SettingsLoader::with_auth(auth(&server), backend(&server));
    assert_eq!(
        loader.try_list_secret_names().await.unwrap(),
        vec!["first", "second-one"]
    );
}

#[tokio::test]
async fn test_list_stops_on_repeated_next_link() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    let page_two = format!("{}/secrets-page/2?api-version={API_VERSION}", server.uri());

    Mock::given(method("GET"))
        .and(path("/secrets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{ "id": format!("{}/secrets/first", server.uri()) }],
            "nextLink": page_two
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/secrets-page/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{ "id": format!("{}/secrets/second", server.uri()) }],
            "nextLink": page_two
        })))
        .expect(1)
        .mount(&server)
        .await;

    let loader = SettingsLoader::with_auth(auth(&server), backend(&server));
    assert_eq!(
        loader.try_list_secret_names().await.unwrap(),
        vec!["first", "second"]
    );

    server.verify().await;
}

#[tokio::test]
async fn test_fetch_rejects_names_outside_key_vault_charset() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": "leaked" })))
        .expect(0)
        .mount(&server)
        .await;

    let loader = SettingsLoader::with_auth(auth(&server), backend(&server));

    for name in ["a/b", "a?x=1", "a#b", "db_url"] {
        let err = loader.try_fetch_secret(name).await.unwrap_err();
        assert_eq!(err.kind(), VaultErrorKind::NotFound);
        assert_eq!(loader.fetch_secret(name).await, "");
    }

    server.verify().await;
}

#[tokio::test]
async fn test_each_operation_requests_a_new_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/{TENANT}/oauth2/v2.0/token")))
        .and(body_string_contains("scope="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": TOKEN })))
        .expect(3)
        .mount(&server)
        .await;
    mount_list(&server, &["a"]).await;
    mount_secret(&server, "a", "1").await;

    let loader = SettingsLoader::with_auth(auth(&server), backend(&server));
    loader.list_secret_names().await;
    loader.fetch_secret("a").await;
    loader.fetch_all_secrets(&["a"]).await;

    server.verify().await;
}

#[tokio::test]
async fn test_load_from_credentials_file() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_list(&server, &["api-key"]).await;
    mount_secret(&server, "api-key", "k").await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "{}",
        json!({
            "client_id": "client-1",
            "app_secret": "app-secret-1",
            "tenant_id": TENANT,
            "key_vault_uri": server.uri()
        })
    )
    .unwrap();

    let source = SettingsSource::from_keywords([("filename", file.path().to_str().unwrap())])
        .unwrap();
    let settings = KeyVaultSettings::load(&source, backend(&server))
        .await
        .unwrap();

    assert_eq!(settings.get("api_key"), Some("k"));
    let shown = settings.to_string();
    assert!(shown.ends_with("settings: api_key"));
    assert!(!shown.contains("app-secret-1"));
    assert!(!shown.contains("client-1"));
}

#[test]
fn test_scope_targets_key_vault() {
    assert_eq!(KEY_VAULT_SCOPE, "https://vault.azure.net/.default");
}
