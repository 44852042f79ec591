//! komuness - community content-sharing backend
//!
//! This crate provides the REST API behind the Komuness platform:
//! - Publications (posts, events, small-business listings) with an admin
//!   approval workflow and staged post-publication edits
//! - Per-tier publication limits, categories and user management
//! - A shared document library backed by the local filesystem
//! - Publication attachments kept as blobs inside the redb database
//! - Premium upgrades paid through PayPal

pub mod api;
pub mod auth;
pub mod config;
pub mod file_store;
pub mod payments;
pub mod services;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use config::Config;
use file_store::FileStore;
use payments::PaymentGateway;
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    /// Publication attachments (blob store inside the database)
    pub attachments: Arc<dyn FileStore>,
    /// Library documents (local filesystem)
    pub library: Arc<dyn FileStore>,
    pub gateway: Arc<dyn PaymentGateway>,
}
