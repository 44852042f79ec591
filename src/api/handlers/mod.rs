mod admin;
mod categories;
pub mod library;
pub mod moderation;
mod paypal;
mod publications;
mod settings;
mod static_files;
mod users;

pub use admin::health;
pub use categories::{
    create_category, delete_category, get_category, list_categories, update_category,
};
pub use paypal::{all_payments, capture_order, create_order, my_payments};
pub use publications::{
    add_comment, create_publication, create_publication_multipart, delete_publication,
    event_calendar, get_publication, list_publications, request_edit, search_publications,
    update_publication,
};
pub use settings::{my_limits, set_tier_limit, tier_limits};
pub use static_files::{serve_blob, serve_library_file};
pub use users::{change_password, check, delete_user, list_users, login, register, update_user};
