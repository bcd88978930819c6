//! End-to-end tests driving the router with in-process requests.

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use gateway::{build_router, GatewayState, SharedState};
use vault::config::Config;

const THRESHOLD: u64 = 256;
const CHUNK: usize = 64;

/// A vault with two group folders and a prefix-sibling folder, plus three
/// known tokens: subscriber, administrator, and a role with no mapping.
fn fixture() -> (TempDir, SharedState) {
    let dir = TempDir::new().unwrap();
    let vault_root = dir.path().join("vault");
    fs::create_dir_all(vault_root.join("group-1")).unwrap();
    fs::create_dir_all(vault_root.join("group-2")).unwrap();
    fs::create_dir_all(vault_root.join("group-10")).unwrap();
    fs::write(vault_root.join("group-1/report.pdf"), b"%PDF-1.4 tiny").unwrap();
    fs::write(
        vault_root.join("group-1/big.bin"),
        (0..THRESHOLD as usize * 4).map(|i| (i % 251) as u8).collect::<Vec<u8>>(),
    )
    .unwrap();
    fs::write(vault_root.join("group-2/other.txt"), b"for contributors").unwrap();
    fs::write(vault_root.join("group-10/leak.txt"), b"prefix sibling").unwrap();

    let mut config = Config::default();
    config.vault.root = vault_root;
    config.vault.direct_download_threshold = THRESHOLD;
    config.vault.chunk_size = CHUNK;
    config.audit.log_dir = dir.path().join("logs");
    config.identity.tokens = BTreeMap::from([
        ("tok-sub".to_string(), vec!["subscriber".to_string()]),
        ("tok-admin".to_string(), vec!["administrator".to_string()]),
        ("tok-pending".to_string(), vec!["pending".to_string()]),
    ]);
    config.validate().unwrap();

    let state = Arc::new(GatewayState::from_config(&config).unwrap());
    (dir, state)
}

async fn get(state: &SharedState, uri: &str, token: Option<&str>) -> axum::response::Response {
    let mut request = Request::builder().uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    build_router(Arc::clone(state))
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

#[tokio::test]
async fn test_healthz() {
    let (_dir, state) = fixture();
    let response = get(&state, "/healthz", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"ok");
}

#[tokio::test]
async fn test_unauthenticated_redirects_to_login() {
    let (_dir, state) = fixture();
    let response = get(&state, "/download?file=group-1/report.pdf", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");
}

#[tokio::test]
async fn test_unknown_token_redirects_to_login() {
    let (_dir, state) = fixture();
    let response = get(&state, "/download?file=group-1/report.pdf", Some("bogus")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_missing_file_param_is_invalid_filename() {
    let (_dir, state) = fixture();
    let response = get(&state, "/download", Some("tok-sub")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_bytes(response).await, b"Invalid filename");
}

#[tokio::test]
async fn test_single_segment_is_invalid_filename() {
    let (_dir, state) = fixture();
    let response = get(&state, "/download?file=report.pdf", Some("tok-sub")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_nested_path_is_invalid_filename() {
    let (_dir, state) = fixture();
    let response = get(&state, "/download?file=group-1/sub/file.txt", Some("tok-sub")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unauthorized_folder_is_forbidden() {
    let (_dir, state) = fixture();
    let response = get(&state, "/download?file=group-2/other.txt", Some("tok-sub")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_bytes(response).await, b"Forbidden");
}

#[tokio::test]
async fn test_folder_prefix_sibling_is_forbidden() {
    // subscriber maps to group-1, which must not reach group-10.
    let (_dir, state) = fixture();
    let response = get(&state, "/download?file=group-10/leak.txt", Some("tok-sub")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unmapped_role_is_forbidden() {
    let (_dir, state) = fixture();
    let response = get(&state, "/download?file=group-1/report.pdf", Some("tok-pending")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let (_dir, state) = fixture();
    let response = get(&state, "/download?file=group-1/absent.pdf", Some("tok-sub")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_bytes(response).await, b"not found");
}

#[tokio::test]
async fn test_traversal_query_cannot_escape() {
    // Sanitization strips the traversal; what remains either fails the
    // grammar or resolves to nothing inside the vault.
    let (_dir, state) = fixture();
    let response = get(
        &state,
        "/download?file=../../etc/passwd",
        Some("tok-admin"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_administrator_reaches_every_folder() {
    let (_dir, state) = fixture();
    let response = get(&state, "/download?file=group-2/other.txt", Some("tok-admin")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"for contributors");
}

#[tokio::test]
async fn test_direct_download_headers_and_body() {
    let (_dir, state) = fixture();
    let response = get(&state, "/download?file=group-1/report.pdf", Some("tok-sub")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(headers[header::CONTENT_LENGTH], "13");
    assert_eq!(
        headers[header::CACHE_CONTROL],
        "private, no-cache, no-store, must-revalidate"
    );
    assert_eq!(headers["X-Content-Type-Options"], "nosniff");
    assert_eq!(headers["X-Frame-Options"], "DENY");
    assert_eq!(headers["X-XSS-Protection"], "1; mode=block");
    assert_eq!(headers["Referrer-Policy"], "strict-origin-when-cross-origin");
    assert_eq!(headers["Content-Security-Policy"], "default-src 'self'");
    assert_eq!(
        headers["Strict-Transport-Security"],
        "max-age=31536000; includeSubDomains"
    );

    assert_eq!(body_bytes(response).await, b"%PDF-1.4 tiny");
}

#[tokio::test]
async fn test_chunked_download_reassembles() {
    let (dir, state) = fixture();
    let response = get(&state, "/download?file=group-1/big.bin", Some("tok-sub")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let expected = fs::read(dir.path().join("vault/group-1/big.bin")).unwrap();
    assert_eq!(
        response.headers()[header::CONTENT_LENGTH],
        expected.len().to_string().as_str()
    );
    assert_eq!(body_bytes(response).await, expected);
}

#[tokio::test]
async fn test_oversized_file_is_rejected() {
    let (dir, _state) = fixture();
    // Rebuild state with a cap below the big file's size.
    let mut config = Config::default();
    config.vault.root = dir.path().join("vault");
    config.vault.max_file_size = THRESHOLD;
    config.vault.direct_download_threshold = THRESHOLD;
    config.vault.chunk_size = CHUNK;
    config.audit.enabled = false;
    config.identity.tokens =
        BTreeMap::from([("tok-sub".to_string(), vec!["subscriber".to_string()])]);
    let state = Arc::new(GatewayState::from_config(&config).unwrap());

    let response = get(&state, "/download?file=group-1/big.bin", Some("tok-sub")).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_bytes(response).await, b"File too large");
}

#[tokio::test]
async fn test_session_cookie_authenticates() {
    let (_dir, state) = fixture();
    let request = Request::builder()
        .uri("/download?file=group-1/report.pdf")
        .header(header::COOKIE, "vaultgate_session=tok-sub")
        .body(Body::empty())
        .unwrap();
    let response = build_router(Arc::clone(&state)).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_allowed_and_denied_requests_are_audited() {
    let (dir, state) = fixture();

    get(&state, "/download?file=group-1/report.pdf", Some("tok-sub")).await;
    get(&state, "/download?file=group-2/other.txt", Some("tok-sub")).await;

    let log = fs::read_to_string(dir.path().join("logs/access.log")).unwrap();
    assert!(log.lines().any(|l| l.contains("allow") && l.contains("group-1/report.pdf")));
    assert!(log.lines().any(|l| l.contains("deny status=403")));
}
