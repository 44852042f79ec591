//! Shared test helpers for komuness unit and router tests.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;

use crate::config::{
    AuthConfig, Config, LimitsConfig, PaypalConfig, ServerConfig, StorageConfig,
};
use crate::file_store::{BlobFileStore, LocalFileStore, Upload};
use crate::payments::{CaptureOutcome, CreatedOrder, GatewayError, OrderRequest, PaymentGateway};
use crate::storage::models::{Category, Publication, PublicationStatus, PublicationTag, Tier, User};
use crate::storage::Database;
use crate::AppState;

/// Password of every user made by [`make_user`].
pub const TEST_PASSWORD: &str = "password123";

/// Order id the mock gateway refuses to capture.
pub const FAILING_ORDER: &str = "DECLINED0001";

/// Gateway double: every order captures as COMPLETED except [`FAILING_ORDER`].
pub struct MockGateway;

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_order(&self, _order: &OrderRequest) -> Result<CreatedOrder, GatewayError> {
        Ok(CreatedOrder {
            id: format!("ORDER{}", uuid::Uuid::new_v4().simple()),
            status: "CREATED".to_string(),
        })
    }

    async fn capture_order(&self, order_id: &str) -> Result<CaptureOutcome, GatewayError> {
        if order_id == FAILING_ORDER {
            return Err(GatewayError::Api {
                status: 422,
                body: "INSTRUMENT_DECLINED".to_string(),
            });
        }
        let raw = serde_json::json!({
            "id": order_id,
            "status": "COMPLETED",
            "purchase_units": [{
                "payments": {
                    "captures": [{
                        "id": format!("CAP-{order_id}"),
                        "status": "COMPLETED",
                        "amount": { "currency_code": "USD", "value": "10.00" }
                    }]
                }
            }]
        });
        Ok(CaptureOutcome::from_payload(order_id, raw))
    }
}

pub fn test_config(temp_dir: &tempfile::TempDir) -> Config {
    let data_dir = temp_dir.path().join("data");
    let library_dir = temp_dir.path().join("biblioteca");

    Config {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
            public_base_url: String::new(),
        },
        storage: StorageConfig {
            library_path: library_dir.to_string_lossy().to_string(),
            ..StorageConfig::default()
        },
        auth: AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: 1,
            bcrypt_cost: 4,
        },
        paypal: PaypalConfig::default(),
        limits: LimitsConfig::default(),
        bootstrap_admin: None,
        dev_mode: false,
        max_upload_size: 1024 * 1024, // 1MB for tests
    }
}

/// Create a test AppState with a temporary database, library directory and
/// a mock payment gateway.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    state_with_config(test_config(temp_dir))
}

pub fn state_with_config(config: Config) -> Arc<AppState> {
    let db = Database::open(&config.server.data_dir).expect("Failed to open test database");
    let library = LocalFileStore::new(
        &config.storage.library_path,
        config.storage.library_public_path.clone(),
    )
    .expect("Failed to create test library store");
    let attachments = BlobFileStore::new(db.clone(), config.storage.blob_public_path.clone());

    Arc::new(AppState {
        config,
        db,
        attachments: Arc::new(attachments),
        library: Arc::new(library),
        gateway: Arc::new(MockGateway),
    })
}

pub fn make_user(state: &AppState, email: &str, tier: Tier) -> User {
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        nombre: "Usuario".to_string(),
        apellido: Some("Prueba".to_string()),
        email: email.to_lowercase(),
        password_hash: crate::auth::hash_password(TEST_PASSWORD, 4).expect("hash"),
        tier,
        limite_publicaciones: None,
        premium_until: None,
        created_at: Utc::now(),
    };
    assert!(state.db.insert_user(&user).expect("insert user"), "duplicate test user");
    user
}

pub fn make_category(state: &AppState, nombre: &str) -> Category {
    let category = Category {
        id: uuid::Uuid::new_v4().to_string(),
        nombre: nombre.to_string(),
        activo: true,
        created_at: Utc::now(),
    };
    assert!(state.db.insert_category(&category).expect("insert category"));
    category
}

/// Store a plain `publicacion` in the "General" category, published or draft.
pub fn make_publication(state: &AppState, author_id: &str, published: bool) -> Publication {
    let category = match state.db.get_category_by_name("General").expect("lookup category") {
        Some(category) => category,
        None => make_category(state, "General"),
    };

    let publication = Publication {
        id: uuid::Uuid::new_v4().to_string(),
        titulo: "Publicación de prueba".to_string(),
        descripcion: "Contenido de prueba".to_string(),
        autor: author_id.to_string(),
        tag: PublicationTag::Publicacion,
        categoria: category.id,
        status: if published {
            PublicationStatus::Published
        } else {
            PublicationStatus::Draft
        },
        fecha: Utc::now(),
        fecha_evento: None,
        hora_evento: None,
        precio: None,
        adjuntos: Vec::new(),
        enlaces_externos: Vec::new(),
        comentarios: Vec::new(),
        pending_update: None,
        edit_count: 0,
        last_edit_request: None,
        last_edit_rejection: None,
    };
    state.db.put_publication(&publication).expect("put publication");
    publication
}

pub fn upload(name: &str, data: &[u8]) -> Upload {
    Upload {
        original_name: name.to_string(),
        mime_type: mime_guess::from_path(name).first_or_octet_stream().to_string(),
        data: Bytes::copy_from_slice(data),
    }
}

pub fn token_for(state: &AppState, user: &User) -> String {
    crate::auth::issue_token(&state.config.auth, user).expect("issue token")
}
