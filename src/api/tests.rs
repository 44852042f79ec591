use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use super::create_router;
use crate::storage::models::{Tier, User};
use crate::testutil;
use crate::AppState;

const BOUNDARY: &str = "komunessboundary";

fn setup(dir: &tempfile::TempDir) -> (Arc<AppState>, Router) {
    let state = testutil::test_state(dir);
    let app = create_router(Arc::clone(&state));
    (state, app)
}

async fn read_body(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = read_body(response).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (filename, mime_type, data) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"archivos\"; filename=\"{filename}\"\r\nContent-Type: {mime_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn send_multipart(app: &Router, uri: &str, token: &str, body: Vec<u8>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let value = serde_json::from_slice(&read_body(response).await).unwrap();
    (status, value)
}

fn user_with_token(state: &AppState, email: &str, tier: Tier) -> (User, String) {
    let user = testutil::make_user(state, email, tier);
    let token = testutil::token_for(state, &user);
    (user, token)
}

async fn fetch(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, read_body(response).await)
}

#[tokio::test]
async fn test_event_submission_normalizes_price() {
    let dir = tempfile::tempdir().unwrap();
    let (state, app) = setup(&dir);
    let (_, token) = user_with_token(&state, "feria@example.com", Tier::Basic);
    testutil::make_category(&state, "Arte");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/publicaciones",
        Some(&token),
        Some(json!({
            "tag": "evento",
            "titulo": "Feria",
            "descripcion": "Feria de artesanos",
            "categoria": "Arte",
            "precio": "1000",
            "fechaEvento": "2025-05-01"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["publicacion"]["precio"], 1000.0);
    assert_eq!(body["data"]["publicacion"]["status"], "draft");
}

#[tokio::test]
async fn test_event_without_price_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (state, app) = setup(&dir);
    let (user, token) = user_with_token(&state, "sinprecio@example.com", Tier::Basic);
    testutil::make_category(&state, "Arte");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/publicaciones",
        Some(&token),
        Some(json!({
            "tag": "evento",
            "titulo": "Feria",
            "descripcion": "Sin precio",
            "categoria": "Arte"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");
    assert!(body["data"]["message"].as_str().unwrap().contains("precio"));
    assert_eq!(state.db.count_publications_by_author(&user.id).unwrap(), 0);
}

#[tokio::test]
async fn test_publication_limit_blocks_submission() {
    let dir = tempfile::tempdir().unwrap();
    let (state, app) = setup(&dir);
    let (user, token) = user_with_token(&state, "limite@example.com", Tier::Basic);
    for _ in 0..state.config.limits.basic {
        testutil::make_publication(&state, &user.id, true);
    }

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/publicaciones",
        Some(&token),
        Some(json!({
            "tag": "publicacion",
            "titulo": "Una más",
            "descripcion": "x",
            "categoria": "General"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["code"], "LIMIT_EXCEEDED");
    assert_eq!(body["data"]["current"], 5);
    assert_eq!(body["data"]["limit"], 5);
    assert_eq!(body["data"]["tier"], 2);
    assert_eq!(state.db.count_publications_by_author(&user.id).unwrap(), 5);
}

#[tokio::test]
async fn test_fourth_edit_request_is_forbidden() {
    let dir = tempfile::tempdir().unwrap();
    let (state, app) = setup(&dir);
    let (user, token) = user_with_token(&state, "editor@example.com", Tier::Basic);
    let publication = testutil::make_publication(&state, &user.id, true);
    let uri = format!("/api/publicaciones/{}/solicitar-edicion", publication.id);

    for n in 1..=3 {
        let (status, body) = send(
            &app,
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({ "titulo": format!("Edición {n}") })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["editCount"], n);
    }

    let (status, _) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&token),
        Some(json!({ "titulo": "Edición 4" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = send(
        &app,
        Method::GET,
        &format!("/api/publicaciones/{}", publication.id),
        None,
        None,
    )
    .await;
    assert_eq!(body["data"]["editCount"], 3);
    assert_eq!(body["data"]["status"], "pending_edit");
}

#[tokio::test]
async fn test_failed_capture_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (state, app) = setup(&dir);
    let (user, token) = user_with_token(&state, "pago@example.com", Tier::Basic);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/paypal/capture/{}", testutil::FAILING_ORDER),
        Some(&token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert_eq!(
        body["message"],
        "The payment could not be processed. Please try again later."
    );

    let stored = state.db.get_user(&user.id).unwrap().unwrap();
    assert_eq!(stored.tier, Tier::Basic);
    assert!(state.db.list_payments(None).unwrap().is_empty());
}

#[tokio::test]
async fn test_dev_mode_exposes_error_detail() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = testutil::test_config(&dir);
    config.dev_mode = true;
    let state = testutil::state_with_config(config);
    let app = create_router(Arc::clone(&state));
    let (_, token) = user_with_token(&state, "dev@example.com", Tier::Basic);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/paypal/capture/{}", testutil::FAILING_ORDER),
        Some(&token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"].as_str().unwrap().contains("INSTRUMENT_DECLINED"));
}

#[tokio::test]
async fn test_capture_upgrades_to_premium() {
    let dir = tempfile::tempdir().unwrap();
    let (state, app) = setup(&dir);
    let (user, token) = user_with_token(&state, "vip@example.com", Tier::Basic);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/paypal/capture/ORDER789",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["usuario"]["tipoUsuario"], 3);
    assert_eq!(body["data"]["pago"]["captureId"], "CAP-ORDER789");

    let (_, body) = send(&app, Method::GET, "/api/paypal/pagos", Some(&token), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(state.db.get_user(&user.id).unwrap().unwrap().tier, Tier::Premium);
}

#[tokio::test]
async fn test_capture_replay_by_another_user_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let (state, app) = setup(&dir);
    let (alice, alice_token) = user_with_token(&state, "alice@example.com", Tier::Basic);
    let (bob, bob_token) = user_with_token(&state, "bob@example.com", Tier::Basic);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/paypal/capture/ORDERALICE",
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/paypal/capture/ORDERALICE",
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "fail");
    assert!(!body.to_string().contains("alice@example.com"));
    assert!(!body.to_string().contains(&alice.id));

    let (_, body) = send(&app, Method::GET, "/api/paypal/pagos", Some(&bob_token), None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
    assert_eq!(state.db.get_user(&bob.id).unwrap().unwrap().tier, Tier::Basic);

    // The buyer can still replay their own capture
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/paypal/capture/ORDERALICE",
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["usuario"]["email"], "alice@example.com");
}

#[tokio::test]
async fn test_approve_update_without_staged_edit() {
    let dir = tempfile::tempdir().unwrap();
    let (state, app) = setup(&dir);
    let author = testutil::make_user(&state, "autor@example.com", Tier::Basic);
    let (_, admin_token) = user_with_token(&state, "admin@example.com", Tier::Admin);
    let publication = testutil::make_publication(&state, &author.id, true);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/publicaciones/admin/{}/approve-update", publication.id),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "fail");
}

#[tokio::test]
async fn test_moderation_flow() {
    let dir = tempfile::tempdir().unwrap();
    let (state, app) = setup(&dir);
    let author = testutil::make_user(&state, "mod@example.com", Tier::Basic);
    let (_, admin_token) = user_with_token(&state, "jefa@example.com", Tier::Admin);
    let draft = testutil::make_publication(&state, &author.id, false);

    let (_, body) = send(
        &app,
        Method::GET,
        "/api/publicaciones/admin/pending",
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/publicaciones/admin/{}/approve", draft.id),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "published");

    let (_, body) = send(&app, Method::GET, "/api/publicaciones", None, None).await;
    assert_eq!(body["data"]["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_auth_and_role_guards() {
    let dir = tempfile::tempdir().unwrap();
    let (state, app) = setup(&dir);
    let (_, basic) = user_with_token(&state, "basic@example.com", Tier::Basic);
    let (admin_user, admin) = user_with_token(&state, "admin@example.com", Tier::Admin);

    let (status, _) = send(&app, Method::GET, "/api/usuario/check", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/usuario/check",
        Some("not-a-token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/publicaciones/admin/pending",
        Some(&basic),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Deleting users is reserved to super-admins
    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/usuario/{}", admin_user.id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::GET, "/api/usuario", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_login_returns_session() {
    let dir = tempfile::tempdir().unwrap();
    let (state, app) = setup(&dir);
    testutil::make_user(&state, "login@example.com", Tier::Basic);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/usuario/login",
        None,
        Some(json!({ "email": "login@example.com", "password": testutil::TEST_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::GET, "/api/usuario/check", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "login@example.com");
}

#[tokio::test]
async fn test_anonymous_sees_only_published() {
    let dir = tempfile::tempdir().unwrap();
    let (state, app) = setup(&dir);
    let author = testutil::make_user(&state, "vis@example.com", Tier::Basic);
    testutil::make_publication(&state, &author.id, true);
    let draft = testutil::make_publication(&state, &author.id, false);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/publicaciones?publicado=false",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/publicaciones/{}", draft.id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_attachment_served_until_publication_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let (state, app) = setup(&dir);
    let (_, token) = user_with_token(&state, "fotos@example.com", Tier::Basic);
    let (_, admin) = user_with_token(&state, "admin@example.com", Tier::Admin);
    testutil::make_category(&state, "Fotos");

    let body = multipart_body(
        &[
            ("tag", "publicacion"),
            ("titulo", "Con foto"),
            ("descripcion", "Una imagen"),
            ("categoria", "Fotos"),
        ],
        &[("foto.png", "image/png", b"\x89PNGdata")],
    );
    let (status, body) = send_multipart(&app, "/api/publicaciones/v2", &token, body).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let id = body["data"]["publicacion"]["id"].as_str().unwrap().to_string();
    let url = body["data"]["publicacion"]["adjuntos"][0]["url"]
        .as_str()
        .unwrap()
        .to_string();

    let request = Request::builder().uri(&url).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert!(response.headers().contains_key(header::CACHE_CONTROL));
    assert_eq!(read_body(response).await, b"\x89PNGdata");

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/publicaciones/{id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, &url, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_partial_upload_is_multi_status() {
    let dir = tempfile::tempdir().unwrap();
    let (state, app) = setup(&dir);
    let (_, token) = user_with_token(&state, "lib@example.com", Tier::Basic);

    let body = multipart_body(
        &[],
        &[
            ("acta.pdf", "application/pdf", b"%PDF-1.4"),
            ("vacio.txt", "text/plain", b""),
        ],
    );
    let (status, body) = send_multipart(&app, "/api/biblioteca/upload", &token, body).await;
    assert_eq!(status, StatusCode::MULTI_STATUS, "{body}");
    assert_eq!(body["data"]["archivos"].as_array().unwrap().len(), 1);

    let url = body["data"]["archivos"][0]["url"].as_str().unwrap().to_string();
    let request = Request::builder().uri(&url).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_body(response).await, b"%PDF-1.4");

    // Nothing stored at all
    let body = multipart_body(&[], &[("vacio.txt", "text/plain", b"")]);
    let (status, body) = send_multipart(&app, "/api/biblioteca/upload", &token, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["results"][0]["success"], false);
}

#[tokio::test]
async fn test_private_library_file_content_is_hidden() {
    let dir = tempfile::tempdir().unwrap();
    let (state, app) = setup(&dir);
    let (_, owner) = user_with_token(&state, "duena@example.com", Tier::Basic);
    let (_, stranger) = user_with_token(&state, "ajeno@example.com", Tier::Basic);
    let (_, admin) = user_with_token(&state, "admin@example.com", Tier::Admin);

    let body = multipart_body(&[], &[("privado.txt", "text/plain", b"secreto")]);
    let (status, body) = send_multipart(&app, "/api/biblioteca/upload", &owner, body).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["data"]["archivos"][0]["id"].as_str().unwrap().to_string();
    let url = body["data"]["archivos"][0]["url"].as_str().unwrap().to_string();

    let (status, data) = fetch(&app, &url, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data, b"secreto");

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/biblioteca/file/{id}"),
        Some(&owner),
        Some(json!({ "publico": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let about = url.replacen("/api/biblioteca/files/", "/api/acerca-de/files/", 1);
    for uri in [&url, &about] {
        assert_eq!(fetch(&app, uri, None).await.0, StatusCode::NOT_FOUND);
        assert_eq!(fetch(&app, uri, Some(&stranger)).await.0, StatusCode::NOT_FOUND);
    }

    let (status, data) = fetch(&app, &url, Some(&owner)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data, b"secreto");

    let request = Request::builder()
        .uri(&about)
        .header(header::AUTHORIZATION, format!("Bearer {admin}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "private, max-age=3600");
}

#[tokio::test]
async fn test_admin_update_prunes_staged_attachments() {
    let dir = tempfile::tempdir().unwrap();
    let (state, app) = setup(&dir);
    let (_, author) = user_with_token(&state, "galeria@example.com", Tier::Basic);
    let (_, admin) = user_with_token(&state, "admin@example.com", Tier::Admin);
    testutil::make_category(&state, "Fotos");

    let body = multipart_body(
        &[
            ("tag", "publicacion"),
            ("titulo", "Dos fotos"),
            ("descripcion", "Galería"),
            ("categoria", "Fotos"),
        ],
        &[
            ("a.png", "image/png", b"\x89PNGa"),
            ("b.png", "image/png", b"\x89PNGb"),
        ],
    );
    let (status, body) = send_multipart(&app, "/api/publicaciones/v2", &author, body).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["data"]["publicacion"]["id"].as_str().unwrap().to_string();
    let adjuntos = body["data"]["publicacion"]["adjuntos"].clone();
    let first = adjuntos[0].clone();
    let second_url = adjuntos[1]["url"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/publicaciones/admin/{id}/approve"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Author stages an edit that keeps both attachments
    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/publicaciones/{id}/solicitar-edicion"),
        Some(&author),
        Some(json!({ "titulo": "Dos fotos (editado)", "adjuntos": adjuntos })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    // Admin drops the second one directly
    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/publicaciones/{id}"),
        Some(&admin),
        Some(json!({ "adjuntos": [first.clone()] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(fetch(&app, &second_url, None).await.0, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/publicaciones/admin/{id}/approve-update"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, Method::GET, &format!("/api/publicaciones/{id}"), None, None).await;
    assert_eq!(body["data"]["titulo"], "Dos fotos (editado)");
    assert_eq!(body["data"]["adjuntos"], json!([first]));
}

#[tokio::test]
async fn test_library_path_traversal_is_forbidden() {
    let dir = tempfile::tempdir().unwrap();
    let (_state, app) = setup(&dir);
    std::fs::write(dir.path().join("secret.txt"), b"top secret").unwrap();

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/biblioteca/files/..%2Fsecret.txt",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let (_state, app) = setup(&dir);

    let (status, body) = send(&app, Method::GET, "/_internal/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}
