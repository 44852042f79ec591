//! Domain operations shared by the HTTP handlers.
//!
//! Services take `&AppState` plus already-authenticated callers and return
//! [`ServiceResult`]. They never see HTTP types.

pub mod categories;
mod error;
pub mod input;
pub mod library;
pub mod limits;
pub mod payments;
pub mod publications;
pub mod uploads;
pub mod users;

pub use error::{ServiceError, ServiceResult};
