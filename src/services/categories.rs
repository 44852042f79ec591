use chrono::Utc;

use super::input;
use super::{ServiceError, ServiceResult};
use crate::storage::models::Category;
use crate::AppState;

const MAX_NAME: usize = 80;

pub fn list(state: &AppState, include_inactive: bool) -> ServiceResult<Vec<Category>> {
    Ok(state
        .db
        .list_categories()?
        .into_iter()
        .filter(|c| include_inactive || c.activo)
        .collect())
}

pub fn get(state: &AppState, id: &str) -> ServiceResult<Category> {
    state
        .db
        .get_category(id)?
        .ok_or_else(|| ServiceError::not_found("Category not found"))
}

pub fn create(state: &AppState, nombre: Option<&str>) -> ServiceResult<Category> {
    let nombre = input::required_text("nombre", nombre, MAX_NAME)?;
    let category = Category {
        id: uuid::Uuid::new_v4().to_string(),
        nombre,
        activo: true,
        created_at: Utc::now(),
    };

    if !state.db.insert_category(&category)? {
        return Err(ServiceError::Conflict(format!(
            "A category named '{}' already exists",
            category.nombre
        )));
    }

    tracing::info!(category_id = %category.id, nombre = %category.nombre, "Category created");
    Ok(category)
}

pub fn update(
    state: &AppState,
    id: &str,
    nombre: Option<&str>,
    activo: Option<bool>,
) -> ServiceResult<Category> {
    let nombre = nombre
        .map(|n| input::required_text("nombre", Some(n), MAX_NAME))
        .transpose()?;
    if nombre.is_none() && activo.is_none() {
        return Err(ServiceError::validation("no changes were provided"));
    }

    match state.db.update_category(id, nombre.as_deref(), activo)? {
        None => Err(ServiceError::not_found("Category not found")),
        Some(false) => Err(ServiceError::Conflict(format!(
            "A category named '{}' already exists",
            nombre.unwrap_or_default()
        ))),
        Some(true) => {
            tracing::info!(category_id = %id, "Category updated");
            get(state, id)
        }
    }
}

/// Categories are deactivated rather than removed so existing publications
/// keep a valid reference.
pub fn deactivate(state: &AppState, id: &str) -> ServiceResult<Category> {
    update(state, id, None, Some(false))
}
