mod blobs;
mod categories;
pub mod db;
mod library;
pub mod models;
mod payments;
mod publications;
mod settings;
mod tables;
mod users;

pub use db::{Database, DatabaseError};
pub use publications::PublicationFilter;
pub use tables::*;
