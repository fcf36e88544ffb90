/// HTTP surface tests, driving the router in-process
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use doc_registry::{config::ServerConfig, context::AppContext, server::build_router};
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

const HASH: &str = "717efd549ed4fbf9327e34855a1a409dcc842fdc8adb95203f6c0c92f2fe923a";
const PDF: &[u8] = b"%PDF-1.7 signed contract";

async fn create_test_app() -> (TempDir, AppContext, Router) {
    let dir = tempdir().unwrap();
    let ctx = AppContext::new(ServerConfig::for_data_directory(dir.path()))
        .await
        .unwrap();
    let app = build_router(ctx.clone());
    (dir, ctx, app)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = send(app, Request::get(uri).body(Body::empty()).unwrap()).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn post_json(app: &Router, uri: &str, payload: Value) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let (status, _, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn upload_unsigned(app: &Router, hash: &str, doc_id: &str) -> (StatusCode, Value) {
    let uri = format!(
        "/api/upload-unsigned?fileHash={}&docIdString={}&fileName=contract.pdf",
        hash, doc_id
    );
    let (status, _, body) = send(app, Request::post(uri).body(Body::from(PDF)).unwrap()).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_health() {
    let (_dir, _ctx, app) = create_test_app().await;

    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = get_json(&app, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_upload_then_sign_flow() {
    let (dir, _ctx, app) = create_test_app().await;

    let (status, body) = upload_unsigned(&app, &format!("0x{}", HASH.to_uppercase()), "doc1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hash"], HASH);
    assert_eq!(body["status"], "uploaded");
    assert_eq!(body["pdfUrl"], format!("/uploads/{}.pdf", HASH));

    // Upload indexes the alias right away
    let uploads = dir.path().join("uploads");
    assert_eq!(std::fs::read_to_string(uploads.join("doc1.txt")).unwrap(), HASH);

    let (status, body) = get_json(&app, "/api/find-document/doc1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hash"], HASH);
    assert_eq!(body["status"], "uploaded");
    assert_eq!(body["signature"], "");
    assert_eq!(body["resolvedBy"], "mapping_lookup");

    let (status, body) = post_json(
        &app,
        "/api/update-signature",
        json!({
            "fileHash": HASH,
            "signature": "0xsig",
            "signer": "0xca01c8c68840cd1c9fdf06f124723a5339224096",
            "txHash": "0xfeed"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "signed");

    let (status, body) = get_json(&app, "/api/certificate/DOC1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["signature"], "0xsig");
    assert_eq!(body["fileName"], "contract.pdf");
    assert_eq!(body["docIdString"], "doc1");

    let (status, body) = get_json(&app, &format!("/api/tx-hash/{}", HASH)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["txHash"], "0xfeed");
    assert_eq!(body["source"], "metadata");
}

#[tokio::test]
async fn test_signed_upload() {
    let (_dir, _ctx, app) = create_test_app().await;

    let uri = format!(
        "/api/upload?hash={}&signature=0xsig&signer=0xme&docIdString=doc2&fileName=a.pdf",
        HASH
    );
    let (status, _, _) = send(&app, Request::post(uri).body(Body::from(PDF)).unwrap()).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get_json(&app, "/api/find-document/doc2").await;
    assert_eq!(body["status"], "signed");
    assert_eq!(body["signer"], "0xme");

    let (_, body) = get_json(&app, &format!("/api/tx-hash/{}", HASH)).await;
    assert_eq!(body["txHash"], "");
    assert_eq!(body["source"], "default");
}

#[tokio::test]
async fn test_upload_rejects_bad_input() {
    let (_dir, _ctx, app) = create_test_app().await;

    let (status, body) = upload_unsigned(&app, "not-a-hash", "doc1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidRequest");

    let uri = format!("/api/upload-unsigned?fileHash={}", HASH);
    let (status, _, _) = send(&app, Request::post(uri).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_signature_unknown_hash_is_404() {
    let (dir, _ctx, app) = create_test_app().await;

    let (status, body) = post_json(
        &app,
        "/api/update-signature",
        json!({"fileHash": HASH, "signature": "0xsig", "signer": "0xme"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
    assert!(!dir.path().join("uploads").join(format!("{}.json", HASH)).exists());
}

#[tokio::test]
async fn test_update_metadata_merges_fields() {
    let (_dir, _ctx, app) = create_test_app().await;
    upload_unsigned(&app, HASH, "doc1").await;

    let (status, body) = post_json(
        &app,
        "/api/update-metadata",
        json!({"hash": HASH, "metadata": {"blockNumber": 42, "reviewer": "bob"}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["blockNumber"], 42);
    assert_eq!(body["metadata"]["reviewer"], "bob");
    assert_eq!(body["metadata"]["fileName"], "contract.pdf");

    let (status, _) = post_json(
        &app,
        "/api/update-metadata",
        json!({"hash": "beef", "metadata": {}}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_alias_is_404() {
    let (_dir, ctx, app) = create_test_app().await;

    let (status, body) = get_json(&app, "/api/find-document/nothing-here").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
    assert!(ctx.mapping.is_empty().await);
}

#[tokio::test]
async fn test_qr_redirect_points_at_pdf() {
    let (_dir, _ctx, app) = create_test_app().await;
    upload_unsigned(&app, HASH, "doc1").await;

    let (status, headers, _) = send(
        &app,
        Request::get("/certificate/DOC1").body(Body::empty()).unwrap(),
    )
    .await;
    assert!(status.is_redirection());
    assert_eq!(
        headers.get(header::LOCATION).unwrap(),
        format!("/uploads/{}.pdf", HASH).as_str()
    );

    let (status, _, _) = send(
        &app,
        Request::get("/certificate/missing").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_proxy_endpoints() {
    let (_dir, _ctx, app) = create_test_app().await;
    upload_unsigned(&app, HASH, "doc1").await;

    let (status, body) = get_json(&app, "/api/proxy-view/doc1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["proxyExists"], true);
    assert_eq!(body["proxyContent"], HASH);
    assert_eq!(body["pdfExists"], true);
    assert_eq!(body["metaExists"], true);

    let (status, headers, _) = send(
        &app,
        Request::get("/api/proxy/doc1").body(Body::empty()).unwrap(),
    )
    .await;
    assert!(status.is_redirection());
    assert_eq!(
        headers.get(header::LOCATION).unwrap(),
        format!("/uploads/{}.pdf", HASH).as_str()
    );

    let (status, _) = get_json(&app, "/api/proxy-view/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_serves_pdf_with_range_and_etag() {
    let (_dir, _ctx, app) = create_test_app().await;
    upload_unsigned(&app, HASH, "doc1").await;
    let uri = format!("/uploads/{}.pdf", HASH);

    let (status, headers, body) =
        send(&app, Request::get(uri.as_str()).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, PDF);
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/pdf");
    let etag = headers.get(header::ETAG).unwrap().clone();

    let (status, headers, body) = send(
        &app,
        Request::get(uri.as_str())
            .header(header::RANGE, "bytes=0-3")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(body, b"%PDF");
    assert_eq!(
        headers.get(header::CONTENT_RANGE).unwrap(),
        format!("bytes 0-3/{}", PDF.len()).as_str()
    );

    let (status, _, _) = send(
        &app,
        Request::get(uri.as_str())
            .header(header::IF_NONE_MATCH, etag)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_MODIFIED);

    let (status, _, _) = send(
        &app,
        Request::get(format!("/uploads/{}.json", HASH))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_files_listing_and_metrics() {
    let (_dir, _ctx, app) = create_test_app().await;
    upload_unsigned(&app, HASH, "doc1").await;

    let (status, body) = get_json(&app, "/api/files").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["files"][0]["hash"], HASH);
    assert_eq!(body["files"][0]["hasMetadata"], true);
    assert_eq!(body["files"][0]["docIdString"], "doc1");

    let (status, _, body) = send(&app, Request::get("/metrics").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("document_uploads_total"));
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let (_dir, _ctx, app) = create_test_app().await;

    let (status, body) = get_json(&app, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}
