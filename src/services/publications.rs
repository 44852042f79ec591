//! Publication lifecycle: submission, moderation and staged edits.
//!
//! ```text
//! submit ──> Draft ──approve──> Published ──request_edit──> PendingEdit
//!              │                    ^                           │
//!            reject               approve_edit / reject_edit ───┘
//!              v
//!           (deleted)
//! ```
//!
//! Author edits on a `Draft` apply directly. On a published document they are
//! staged in `pending_update`. Either way each request counts against
//! [`MAX_EDIT_REQUESTS`].

use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use super::input::{self, nullable};
use super::uploads::{self, FileOutcome};
use super::{ServiceError, ServiceResult};
use crate::file_store::Upload;
use crate::storage::models::{
    Attachment, Category, Comment, ExternalLink, Patch, Publication, PublicationChanges, PublicationStatus,
    PublicationTag, User,
};
use crate::storage::PublicationFilter;
use crate::AppState;

/// Edit requests allowed per publication.
pub const MAX_EDIT_REQUESTS: u32 = 3;

const MAX_TITLE: usize = 200;
const MAX_BODY: usize = 10_000;
const MAX_COMMENT: usize = 1_000;
const MAX_PAGE_SIZE: u32 = 100;

/// Publication fields as they arrive from a client, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationInput {
    #[serde(default)]
    pub titulo: Option<String>,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub categoria: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub fecha_evento: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub hora_evento: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub precio: Option<Option<serde_json::Value>>,
    #[serde(default)]
    pub enlaces_externos: Option<Vec<ExternalLink>>,
    /// On edits: the attachments to keep (a subset of the current ones)
    #[serde(default)]
    pub adjuntos: Option<Vec<Attachment>>,
}

#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub tag: Option<PublicationTag>,
    /// 1-based
    pub page: u32,
    pub page_size: u32,
    pub categoria: Option<String>,
    pub publicado: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u32,
    pub limit: u32,
}

pub struct SubmitOutcome {
    pub publication: Publication,
    pub uploads: Vec<FileOutcome>,
}

// ============================================================================
// Validation
// ============================================================================

fn lookup_category(state: &AppState, value: &str) -> ServiceResult<Option<Category>> {
    match state.db.get_category(value)? {
        Some(c) => Ok(Some(c)),
        None => Ok(state.db.get_category_by_name(value)?),
    }
}

fn resolve_category_id(state: &AppState, value: &str) -> ServiceResult<Option<String>> {
    Ok(lookup_category(state, value)?.map(|c| c.id))
}

/// Resolve a category given by id or by name; it must be active.
fn resolve_category(state: &AppState, value: &str) -> ServiceResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::validation("categoria is required"));
    }
    match lookup_category(state, value)? {
        Some(c) if c.activo => Ok(c.id),
        Some(_) => Err(ServiceError::validation(format!(
            "categoria '{value}' is not active"
        ))),
        None => Err(ServiceError::validation(format!(
            "categoria '{value}' does not exist"
        ))),
    }
}

fn validate_links(links: Vec<ExternalLink>) -> ServiceResult<Vec<ExternalLink>> {
    links
        .into_iter()
        .map(|link| {
            let url = link.url.trim().to_string();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ServiceError::validation(format!(
                    "enlacesExternos: '{url}' is not an http(s) URL"
                )));
            }
            Ok(ExternalLink {
                nombre: link.nombre.trim().to_string(),
                url,
            })
        })
        .collect()
}

/// Validate the fields of an edit. Absent fields stay absent.
fn validate_changes(state: &AppState, form: PublicationInput) -> ServiceResult<PublicationChanges> {
    let titulo = match form.titulo {
        Some(t) => Some(input::required_text("titulo", Some(&t), MAX_TITLE)?),
        None => None,
    };
    let descripcion = match form.descripcion {
        Some(d) => Some(input::required_text("descripcion", Some(&d), MAX_BODY)?),
        None => None,
    };
    let categoria = match form.categoria {
        Some(c) => Some(resolve_category(state, &c)?),
        None => None,
    };
    let fecha_evento = match form.fecha_evento {
        Some(Some(f)) => Patch::Value(input::validate_date("fechaEvento", &f)?),
        Some(None) => Patch::Null,
        None => Patch::Absent,
    };
    let hora_evento = match form.hora_evento {
        Some(Some(h)) => Patch::Value(input::validate_time("horaEvento", &h)?),
        Some(None) => Patch::Null,
        None => Patch::Absent,
    };
    let precio = match form.precio {
        Some(Some(serde_json::Value::Null)) | Some(None) => Patch::Null,
        Some(Some(p)) => Patch::Value(input::normalize_price(&p)?),
        None => Patch::Absent,
    };
    let enlaces_externos = form.enlaces_externos.map(validate_links).transpose()?;

    if form.tag.is_some() {
        return Err(ServiceError::validation("tag cannot be changed"));
    }

    Ok(PublicationChanges {
        titulo,
        descripcion,
        categoria,
        fecha_evento,
        hora_evento,
        precio,
        adjuntos: form.adjuntos,
        enlaces_externos,
    })
}

fn check_price_invariant(publication: &Publication) -> ServiceResult<()> {
    if publication.tag.requires_price() && !publication.precio.is_some_and(f64::is_finite) {
        return Err(ServiceError::validation(format!(
            "precio is required for {} publications",
            publication.tag.as_str()
        )));
    }
    Ok(())
}

/// Check an edit against the current document: kept attachments must already
/// belong to it and the result must still satisfy the price rule.
fn check_changes_against(publication: &Publication, changes: &PublicationChanges) -> ServiceResult<()> {
    if let Some(ref keep) = changes.adjuntos {
        if let Some(foreign) = keep.iter().find(|a| !publication.adjuntos.contains(a)) {
            return Err(ServiceError::validation(format!(
                "adjuntos: '{}' is not an attachment of this publication",
                foreign.key
            )));
        }
    }

    let mut preview = publication.clone();
    if let Some(ref pending) = publication.pending_update {
        preview.apply_changes(pending.changes.clone());
    }
    preview.apply_changes(changes.clone());
    check_price_invariant(&preview)
}

fn attachment_keys(adjuntos: Vec<Attachment>) -> Vec<String> {
    adjuntos.into_iter().map(|a| a.key).collect()
}

// ============================================================================
// Submission & moderation
// ============================================================================

/// Create a new `Draft`. Attachments go to the blob store one by one; a failed
/// file is reported in the outcome and does not abort the submission.
pub async fn submit(
    state: &AppState,
    author: &User,
    form: PublicationInput,
    files: Vec<Upload>,
    mut upload_failures: Vec<FileOutcome>,
) -> ServiceResult<SubmitOutcome> {
    let tag: PublicationTag = form
        .tag
        .as_deref()
        .ok_or_else(|| ServiceError::validation("tag is required"))?
        .parse()
        .map_err(ServiceError::Validation)?;
    let titulo = input::required_text("titulo", form.titulo.as_deref(), MAX_TITLE)?;
    let descripcion = input::required_text("descripcion", form.descripcion.as_deref(), MAX_BODY)?;
    let categoria = resolve_category(
        state,
        form
            .categoria
            .as_deref()
            .ok_or_else(|| ServiceError::validation("categoria is required"))?,
    )?;

    let precio = match form.precio.flatten() {
        Some(serde_json::Value::Null) | None => None,
        Some(value) => Some(input::normalize_price(&value)?),
    };
    let fecha_evento = form
        .fecha_evento
        .flatten()
        .filter(|f| !f.trim().is_empty())
        .map(|f| input::validate_date("fechaEvento", &f))
        .transpose()?;
    let hora_evento = form
        .hora_evento
        .flatten()
        .filter(|h| !h.trim().is_empty())
        .map(|h| input::validate_time("horaEvento", &h))
        .transpose()?;
    let enlaces_externos = validate_links(form.enlaces_externos.unwrap_or_default())?;

    let mut publication = Publication {
        id: uuid::Uuid::new_v4().to_string(),
        titulo,
        descripcion,
        autor: author.id.clone(),
        tag,
        categoria,
        status: PublicationStatus::Draft,
        fecha: Utc::now(),
        fecha_evento,
        hora_evento,
        precio,
        adjuntos: Vec::new(),
        enlaces_externos,
        comentarios: Vec::new(),
        pending_update: None,
        edit_count: 0,
        last_edit_request: None,
        last_edit_rejection: None,
    };
    check_price_invariant(&publication)?;

    let (stored, mut outcomes) =
        uploads::store_each(state.attachments.as_ref(), files, Some(&publication.id)).await;
    publication.adjuntos = stored
        .into_iter()
        .map(|(_, object)| Attachment {
            url: object.url,
            key: object.key,
        })
        .collect();
    outcomes.append(&mut upload_failures);

    if let Err(e) = state.db.put_publication(&publication) {
        let keys: Vec<String> = publication.adjuntos.iter().map(|a| a.key.clone()).collect();
        uploads::discard(state.attachments.as_ref(), keys).await;
        return Err(e.into());
    }

    tracing::info!(
        publication_id = %publication.id,
        author = %author.id,
        tag = tag.as_str(),
        attachments = publication.adjuntos.len(),
        "Publication submitted"
    );

    Ok(SubmitOutcome {
        publication,
        uploads: outcomes,
    })
}

/// Drafts awaiting their first approval, oldest first.
pub fn list_pending(state: &AppState) -> ServiceResult<Vec<Publication>> {
    let mut drafts = state.db.list_publications(&PublicationFilter {
        published: Some(false),
        ..Default::default()
    })?;
    drafts.reverse();
    Ok(drafts)
}

/// Publish a draft. Approving an already published document is a no-op.
pub fn approve(state: &AppState, id: &str) -> ServiceResult<Publication> {
    let (publication, ()) = state
        .db
        .modify_publication(id, |p| -> ServiceResult<()> {
            if p.status == PublicationStatus::Draft {
                p.status = PublicationStatus::Published;
            }
            Ok(())
        })?
        .ok_or_else(|| ServiceError::not_found("Publication not found"))?;

    tracing::info!(publication_id = %id, "Publication approved");
    Ok(publication)
}

/// Hard-delete a publication and, best-effort, its attachments.
pub async fn reject(state: &AppState, id: &str) -> ServiceResult<Publication> {
    let removed = state
        .db
        .delete_publication(id)?
        .ok_or_else(|| ServiceError::not_found("Publication not found"))?;

    let keys: Vec<String> = removed.adjuntos.iter().map(|a| a.key.clone()).collect();
    uploads::discard(state.attachments.as_ref(), keys).await;

    tracing::info!(publication_id = %id, "Publication removed");
    Ok(removed)
}

// ============================================================================
// Edits
// ============================================================================

/// Author edit. Applies directly to a draft, otherwise stages it for review.
pub async fn request_edit(
    state: &AppState,
    id: &str,
    form: PublicationInput,
    requester: &User,
) -> ServiceResult<Publication> {
    let changes = validate_changes(state, form)?;
    if changes.is_empty() {
        return Err(ServiceError::validation("no changes were provided"));
    }

    let now = Utc::now();
    let (publication, dropped) = state
        .db
        .modify_publication(id, |p| -> ServiceResult<Vec<Attachment>> {
            if p.edit_count >= MAX_EDIT_REQUESTS {
                return Err(ServiceError::forbidden(format!(
                    "edit limit reached ({MAX_EDIT_REQUESTS} requests per publication)"
                )));
            }
            if p.autor != requester.id {
                return Err(ServiceError::forbidden(
                    "only the author can request changes to this publication",
                ));
            }
            check_changes_against(p, &changes)?;

            p.edit_count += 1;
            p.last_edit_request = Some(now);
            let dropped = match p.status {
                PublicationStatus::Draft => p.apply_changes(changes),
                PublicationStatus::Published | PublicationStatus::PendingEdit => {
                    p.stage_changes(changes, now);
                    Vec::new()
                }
            };
            Ok(dropped)
        })?
        .ok_or_else(|| ServiceError::not_found("Publication not found"))?;

    uploads::discard(state.attachments.as_ref(), attachment_keys(dropped)).await;

    tracing::info!(
        publication_id = %id,
        edit_count = publication.edit_count,
        staged = publication.pending_update.is_some(),
        "Edit requested"
    );
    Ok(publication)
}

/// Published documents with a staged edit, oldest request first.
pub fn list_pending_updates(state: &AppState) -> ServiceResult<Vec<Publication>> {
    let mut pending: Vec<Publication> = state
        .db
        .list_publications(&PublicationFilter::default())?
        .into_iter()
        .filter(|p| p.status == PublicationStatus::PendingEdit)
        .collect();
    pending.sort_by_key(|p| p.pending_update.as_ref().map(|u| u.requested_at));
    Ok(pending)
}

/// Merge every staged field into the live document.
pub async fn approve_edit(state: &AppState, id: &str) -> ServiceResult<Publication> {
    let (publication, dropped) = state
        .db
        .modify_publication(id, |p| -> ServiceResult<Vec<Attachment>> {
            let dropped = p
                .merge_pending()
                .ok_or_else(|| ServiceError::not_found("There is no pending update to approve"))?;
            check_price_invariant(p)?;
            Ok(dropped)
        })?
        .ok_or_else(|| ServiceError::not_found("Publication not found"))?;

    uploads::discard(state.attachments.as_ref(), attachment_keys(dropped)).await;

    tracing::info!(publication_id = %id, "Pending update approved");
    Ok(publication)
}

/// Drop the staged edit. The edit counter is not restored.
pub fn reject_edit(state: &AppState, id: &str, reason: Option<String>) -> ServiceResult<Publication> {
    let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
    let (publication, _) = state
        .db
        .modify_publication(id, |p| -> ServiceResult<_> {
            p.discard_pending(reason)
                .ok_or_else(|| ServiceError::not_found("There is no pending update to reject"))
        })?
        .ok_or_else(|| ServiceError::not_found("Publication not found"))?;

    tracing::info!(publication_id = %id, "Pending update rejected");
    Ok(publication)
}

/// Admin edit: written straight to the live document, no counters involved.
pub async fn update(state: &AppState, id: &str, form: PublicationInput) -> ServiceResult<Publication> {
    let changes = validate_changes(state, form)?;
    if changes.is_empty() {
        return Err(ServiceError::validation("no changes were provided"));
    }

    let (publication, dropped) = state
        .db
        .modify_publication(id, |p| -> ServiceResult<Vec<Attachment>> {
            if let Some(ref keep) = changes.adjuntos {
                if keep.iter().any(|a| !p.adjuntos.contains(a)) {
                    return Err(ServiceError::validation(
                        "adjuntos may only keep attachments of this publication",
                    ));
                }
            }
            let dropped = p.apply_changes(changes);
            check_price_invariant(p)?;
            Ok(dropped)
        })?
        .ok_or_else(|| ServiceError::not_found("Publication not found"))?;

    uploads::discard(state.attachments.as_ref(), attachment_keys(dropped)).await;

    tracing::info!(publication_id = %id, "Publication updated by admin");
    Ok(publication)
}

// ============================================================================
// Comments & queries
// ============================================================================

pub fn add_comment(state: &AppState, id: &str, author: &User, texto: &str) -> ServiceResult<Comment> {
    let texto = input::required_text("texto", Some(texto), MAX_COMMENT)?;
    let comment = Comment {
        id: uuid::Uuid::new_v4().to_string(),
        autor: author.id.clone(),
        texto,
        fecha: Utc::now(),
    };

    let stored = comment.clone();
    state
        .db
        .modify_publication(id, move |p| -> ServiceResult<()> {
            if !p.status.is_published() {
                return Err(ServiceError::not_found("Publication not found"));
            }
            p.comentarios.push(stored);
            Ok(())
        })?
        .ok_or_else(|| ServiceError::not_found("Publication not found"))?;

    Ok(comment)
}

/// Drafts are only visible to their author and to admins.
pub fn get_by_id(state: &AppState, id: &str, viewer: Option<&User>) -> ServiceResult<Publication> {
    let publication = state
        .db
        .get_publication(id)?
        .ok_or_else(|| ServiceError::not_found("Publication not found"))?;

    let visible = publication.status.is_published()
        || viewer.is_some_and(|v| v.tier.is_admin() || v.id == publication.autor);
    if !visible {
        return Err(ServiceError::not_found("Publication not found"));
    }
    Ok(publication)
}

pub fn list_by_tag(state: &AppState, query: &ListQuery) -> ServiceResult<Page<Publication>> {
    let page_size = query.page_size.clamp(1, MAX_PAGE_SIZE);
    let page = query.page.max(1);

    // Unknown categories are kept verbatim so they match nothing.
    let categoria = match query.categoria.as_deref().map(str::trim) {
        Some(c) if !c.is_empty() => Some(
            resolve_category_id(state, c)?.unwrap_or_else(|| c.to_string()),
        ),
        _ => None,
    };

    let all = state.db.list_publications(&PublicationFilter {
        tag: query.tag,
        categoria: categoria.as_deref(),
        published: query.publicado,
        autor: None,
    })?;

    let total = all.len() as u64;
    let offset = (page - 1).saturating_mul(page_size);
    let items = all
        .into_iter()
        .skip(offset as usize)
        .take(page_size as usize)
        .collect();

    Ok(Page {
        items,
        total,
        offset,
        limit: page_size,
    })
}

/// Case-insensitive substring search over title and description of
/// published documents.
pub fn search(
    state: &AppState,
    text: &str,
    tag: Option<PublicationTag>,
    autor: Option<&str>,
) -> ServiceResult<Vec<Publication>> {
    let needle = input::fold(text.trim());
    let candidates = state.db.list_publications(&PublicationFilter {
        tag,
        published: Some(true),
        autor,
        ..Default::default()
    })?;

    Ok(candidates
        .into_iter()
        .filter(|p| {
            needle.is_empty()
                || input::fold(&p.titulo).contains(&needle)
                || input::fold(&p.descripcion).contains(&needle)
        })
        .collect())
}

/// Published events dated within `[start, end]`, chronological.
pub fn calendar(state: &AppState, start: NaiveDate, end: NaiveDate) -> ServiceResult<Vec<Publication>> {
    if start > end {
        return Err(ServiceError::validation("startDate must not be after endDate"));
    }

    let mut events: Vec<(NaiveDate, Publication)> = state
        .db
        .list_publications(&PublicationFilter {
            tag: Some(PublicationTag::Evento),
            published: Some(true),
            ..Default::default()
        })?
        .into_iter()
        .filter_map(|p| {
            let date = NaiveDate::parse_from_str(p.fecha_evento.as_deref()?, "%Y-%m-%d").ok()?;
            (start <= date && date <= end).then_some((date, p))
        })
        .collect();

    events.sort_by(|(da, a), (db, b)| da.cmp(db).then_with(|| a.hora_evento.cmp(&b.hora_evento)));
    Ok(events.into_iter().map(|(_, p)| p).collect())
}
