use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{self, library, moderation};
use super::response::expose_error_details;
use crate::auth::{
    enforce_publication_limit, optional_auth, require_admin, require_auth, require_super_admin,
};
use crate::AppState;

/// Multipart bodies may carry several files, each up to `max_upload_size`.
const MAX_FILES_PER_REQUEST: usize = 10;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit =
        DefaultBodyLimit::max(state.config.max_upload_size as usize * MAX_FILES_PER_REQUEST);

    // Anyone, no token looked at
    let public = Router::new()
        .route("/usuario/register", post(handlers::register))
        .route("/usuario/login", post(handlers::login))
        .route("/publicaciones/search", get(handlers::search_publications))
        .route(
            "/publicaciones/eventos/calendario",
            get(handlers::event_calendar),
        )
        .route("/categorias", get(handlers::list_categories))
        .route("/categorias/:id", get(handlers::get_category))
        .route("/files/:id", get(handlers::serve_blob));

    // Anonymous allowed; a valid token widens what is visible
    let optional = Router::new()
        .route("/publicaciones", get(handlers::list_publications))
        .route("/publicaciones/:id", get(handlers::get_publication))
        .route("/biblioteca/list/:id", get(library::list))
        .route("/biblioteca/search", get(library::search))
        .route("/biblioteca/file/:id", get(library::get_file))
        .route("/biblioteca/files/*key", get(handlers::serve_library_file))
        .route("/acerca-de/files/*key", get(handlers::serve_library_file))
        .route_layer(from_fn_with_state(Arc::clone(&state), optional_auth));

    let authed = Router::new()
        .route("/usuario/check", get(handlers::check))
        .route("/usuario/password", put(handlers::change_password))
        .route("/publicaciones/:id/comentarios", post(handlers::add_comment))
        .route(
            "/publicaciones/:id/solicitar-edicion",
            put(handlers::request_edit),
        )
        .route("/biblioteca/folder", post(library::create_folder))
        .route(
            "/biblioteca/upload",
            post(library::upload).layer(upload_limit.clone()),
        )
        .route(
            "/biblioteca/file/:id",
            put(library::update_file).delete(library::delete_file),
        )
        .route("/configuracion/mis-limites", get(handlers::my_limits))
        .route("/paypal/createorder", post(handlers::create_order))
        .route("/paypal/capture/:order_id", post(handlers::capture_order))
        .route("/paypal/pagos", get(handlers::my_payments))
        .route_layer(from_fn_with_state(Arc::clone(&state), require_auth));

    // Submissions count against the caller's quota
    let limited = Router::new()
        .route("/publicaciones", post(handlers::create_publication))
        .route(
            "/publicaciones/v2",
            post(handlers::create_publication_multipart).layer(upload_limit),
        )
        .route_layer(from_fn_with_state(
            Arc::clone(&state),
            enforce_publication_limit,
        ))
        .route_layer(from_fn_with_state(Arc::clone(&state), require_auth));

    let admin = Router::new()
        .route("/usuario", get(handlers::list_users))
        .route("/usuario/:id", put(handlers::update_user))
        .route(
            "/publicaciones/:id",
            put(handlers::update_publication).delete(handlers::delete_publication),
        )
        .route("/publicaciones/admin/pending", get(moderation::list_pending))
        .route(
            "/publicaciones/admin/pending-updates",
            get(moderation::list_pending_updates),
        )
        .route("/publicaciones/admin/:id/approve", put(moderation::approve))
        .route("/publicaciones/admin/:id/reject", put(moderation::reject))
        .route(
            "/publicaciones/admin/:id/approve-update",
            put(moderation::approve_update),
        )
        .route(
            "/publicaciones/admin/:id/reject-update",
            put(moderation::reject_update),
        )
        .route("/biblioteca/folder/:id", delete(library::delete_folder))
        .route("/categorias", post(handlers::create_category))
        .route(
            "/categorias/:id",
            put(handlers::update_category).delete(handlers::delete_category),
        )
        .route(
            "/configuracion/limites",
            get(handlers::tier_limits).put(handlers::set_tier_limit),
        )
        .route("/paypal/admin/pagos", get(handlers::all_payments))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(Arc::clone(&state), require_auth));

    let super_admin = Router::new()
        .route("/usuario/:id", delete(handlers::delete_user))
        .route_layer(from_fn(require_super_admin))
        .route_layer(from_fn_with_state(Arc::clone(&state), require_auth));

    let api = Router::new()
        .merge(public)
        .merge(optional)
        .merge(authed)
        .merge(limited)
        .merge(admin)
        .merge(super_admin);

    let mut router = Router::new()
        .nest("/api", api)
        .route("/_internal/health", get(handlers::health));

    if state.config.dev_mode {
        tracing::warn!("Dev mode enabled; internal error details are returned to clients.");
        router = router.layer(from_fn(expose_error_details));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
