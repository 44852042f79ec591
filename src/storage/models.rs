use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Three-state patch value for partial updates that survives serialization round-trips.
/// Unlike `Option<Option<T>>`, each variant has a distinct wire representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Patch<T> {
    /// Field was not included in the request (no change).
    #[default]
    Absent,
    /// Field was explicitly set to null (clear it).
    Null,
    /// Field was set to a new value.
    Value(T),
}

impl<T> From<Option<Option<T>>> for Patch<T> {
    fn from(v: Option<Option<T>>) -> Self {
        match v {
            None => Patch::Absent,
            Some(None) => Patch::Null,
            Some(Some(v)) => Patch::Value(v),
        }
    }
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    /// Apply the patch to an optional field.
    pub fn apply_to(self, target: &mut Option<T>) {
        match self {
            Patch::Absent => {}
            Patch::Null => *target = None,
            Patch::Value(v) => *target = Some(v),
        }
    }
}

// ============================================================================
// Users
// ============================================================================

/// Membership level. Lower numbers carry more privileges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tier {
    SuperAdmin = 0,
    Admin = 1,
    Basic = 2,
    Premium = 3,
}

impl Tier {
    pub fn is_admin(self) -> bool {
        matches!(self, Tier::SuperAdmin | Tier::Admin)
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub const ALL: [Tier; 4] = [Tier::SuperAdmin, Tier::Admin, Tier::Basic, Tier::Premium];
}

impl TryFrom<u8> for Tier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Tier::SuperAdmin),
            1 => Ok(Tier::Admin),
            2 => Ok(Tier::Basic),
            3 => Ok(Tier::Premium),
            other => Err(format!("unknown user tier {other}")),
        }
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> u8 {
        tier as u8
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub nombre: String,
    #[serde(default)]
    pub apellido: Option<String>,
    /// Stored lowercased
    pub email: String,
    pub password_hash: String,
    pub tier: Tier,
    #[serde(default)]
    pub limite_publicaciones: Option<u32>,
    #[serde(default)]
    pub premium_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// True when a premium membership has run out and should fall back to basic.
    pub fn premium_expired(&self, now: DateTime<Utc>) -> bool {
        self.tier == Tier::Premium && self.premium_until.is_some_and(|until| until <= now)
    }
}

// ============================================================================
// Publications
// ============================================================================

/// Content type discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationTag {
    Publicacion,
    Evento,
    Emprendimiento,
}

impl PublicationTag {
    /// Tags whose publications must carry a price.
    pub fn requires_price(self) -> bool {
        matches!(self, PublicationTag::Evento | PublicationTag::Emprendimiento)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PublicationTag::Publicacion => "publicacion",
            PublicationTag::Evento => "evento",
            PublicationTag::Emprendimiento => "emprendimiento",
        }
    }
}

impl std::str::FromStr for PublicationTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "publicacion" => Ok(PublicationTag::Publicacion),
            "evento" => Ok(PublicationTag::Evento),
            "emprendimiento" => Ok(PublicationTag::Emprendimiento),
            other => Err(format!(
                "tag must be one of publicacion, evento, emprendimiento (got '{other}')"
            )),
        }
    }
}

/// Moderation state of a publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationStatus {
    /// Submitted, awaiting first approval
    Draft,
    Published,
    /// Published, with an author edit staged in `pending_update`
    PendingEdit,
}

impl PublicationStatus {
    pub fn is_published(self) -> bool {
        !matches!(self, PublicationStatus::Draft)
    }
}

/// A stored file reference: public URL plus the storage key used to delete it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalLink {
    pub nombre: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub autor: String,
    pub texto: String,
    pub fecha: DateTime<Utc>,
}

/// Validated editable fields of a publication. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationChanges {
    #[serde(default)]
    pub titulo: Option<String>,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub categoria: Option<String>,
    #[serde(default)]
    pub fecha_evento: Patch<String>,
    #[serde(default)]
    pub hora_evento: Patch<String>,
    #[serde(default)]
    pub precio: Patch<f64>,
    #[serde(default)]
    pub adjuntos: Option<Vec<Attachment>>,
    #[serde(default)]
    pub enlaces_externos: Option<Vec<ExternalLink>>,
}

impl PublicationChanges {
    pub fn is_empty(&self) -> bool {
        self.titulo.is_none()
            && self.descripcion.is_none()
            && self.categoria.is_none()
            && self.fecha_evento.is_absent()
            && self.hora_evento.is_absent()
            && self.precio.is_absent()
            && self.adjuntos.is_none()
            && self.enlaces_externos.is_none()
    }

    /// Fold newer changes on top of these ones.
    pub fn merge(&mut self, newer: PublicationChanges) {
        if newer.titulo.is_some() {
            self.titulo = newer.titulo;
        }
        if newer.descripcion.is_some() {
            self.descripcion = newer.descripcion;
        }
        if newer.categoria.is_some() {
            self.categoria = newer.categoria;
        }
        if !newer.fecha_evento.is_absent() {
            self.fecha_evento = newer.fecha_evento;
        }
        if !newer.hora_evento.is_absent() {
            self.hora_evento = newer.hora_evento;
        }
        if !newer.precio.is_absent() {
            self.precio = newer.precio;
        }
        if newer.adjuntos.is_some() {
            self.adjuntos = newer.adjuntos;
        }
        if newer.enlaces_externos.is_some() {
            self.enlaces_externos = newer.enlaces_externos;
        }
    }
}

/// Author edit staged on a published document, awaiting admin review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingUpdate {
    pub changes: PublicationChanges,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    pub id: String,
    pub titulo: String,
    pub descripcion: String,
    pub autor: String,
    pub tag: PublicationTag,
    pub categoria: String,
    pub status: PublicationStatus,
    pub fecha: DateTime<Utc>,
    #[serde(default)]
    pub fecha_evento: Option<String>,
    #[serde(default)]
    pub hora_evento: Option<String>,
    #[serde(default)]
    pub precio: Option<f64>,
    #[serde(default)]
    pub adjuntos: Vec<Attachment>,
    #[serde(default)]
    pub enlaces_externos: Vec<ExternalLink>,
    #[serde(default)]
    pub comentarios: Vec<Comment>,
    #[serde(default)]
    pub pending_update: Option<PendingUpdate>,
    #[serde(default)]
    pub edit_count: u32,
    #[serde(default)]
    pub last_edit_request: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_edit_rejection: Option<String>,
}

impl Publication {
    /// Write changes straight into the live fields. Returns the attachments
    /// that were replaced and are no longer referenced.
    pub fn apply_changes(&mut self, changes: PublicationChanges) -> Vec<Attachment> {
        if let Some(titulo) = changes.titulo {
            self.titulo = titulo;
        }
        if let Some(descripcion) = changes.descripcion {
            self.descripcion = descripcion;
        }
        if let Some(categoria) = changes.categoria {
            self.categoria = categoria;
        }
        changes.fecha_evento.apply_to(&mut self.fecha_evento);
        changes.hora_evento.apply_to(&mut self.hora_evento);
        changes.precio.apply_to(&mut self.precio);
        if let Some(links) = changes.enlaces_externos {
            self.enlaces_externos = links;
        }
        match changes.adjuntos {
            Some(adjuntos) => {
                let dropped = self
                    .adjuntos
                    .iter()
                    .filter(|old| !adjuntos.contains(old))
                    .cloned()
                    .collect();
                self.adjuntos = adjuntos;
                self.prune_staged_attachments();
                dropped
            }
            None => Vec::new(),
        }
    }

    /// A staged edit may only keep attachments the live document still has.
    fn prune_staged_attachments(&mut self) {
        let live = &self.adjuntos;
        if let Some(staged) = self
            .pending_update
            .as_mut()
            .and_then(|pending| pending.changes.adjuntos.as_mut())
        {
            staged.retain(|a| live.contains(a));
        }
    }

    /// Stage an author edit, folding it into any edit already waiting.
    pub fn stage_changes(&mut self, changes: PublicationChanges, now: DateTime<Utc>) {
        let staged = match self.pending_update.take() {
            Some(mut pending) => {
                pending.changes.merge(changes);
                pending.changes
            }
            None => changes,
        };
        self.pending_update = Some(PendingUpdate {
            changes: staged,
            requested_at: now,
        });
        self.status = PublicationStatus::PendingEdit;
    }

    /// Merge the staged edit into the live document. Returns `None` when
    /// nothing is staged, otherwise the attachments the merge dropped.
    pub fn merge_pending(&mut self) -> Option<Vec<Attachment>> {
        self.prune_staged_attachments();
        let pending = self.pending_update.take()?;
        self.status = PublicationStatus::Published;
        self.last_edit_rejection = None;
        Some(self.apply_changes(pending.changes))
    }

    /// Discard the staged edit. Returns it, or `None` when nothing is staged.
    pub fn discard_pending(&mut self, reason: Option<String>) -> Option<PendingUpdate> {
        let pending = self.pending_update.take()?;
        self.status = PublicationStatus::Published;
        self.last_edit_rejection = reason;
        Some(pending)
    }
}

// ============================================================================
// Categories
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub nombre: String,
    pub activo: bool,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Library
// ============================================================================

/// Classification of a file derived from its MIME type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Audio,
    Binary,
    Document,
    Image,
    Video,
}

impl FileType {
    /// Derive a file type classification from a MIME type string.
    pub fn from_mime(mime_type: &str) -> Self {
        let primary = mime_type.split('/').next().unwrap_or("");
        match primary {
            "audio" => FileType::Audio,
            "image" => FileType::Image,
            "video" => FileType::Video,
            "text" | "application" => {
                let sub = mime_type.split('/').nth(1).unwrap_or("");
                match sub {
                    "pdf"
                    | "msword"
                    | "rtf"
                    | "csv"
                    | "vnd.openxmlformats-officedocument.wordprocessingml.document"
                    | "vnd.openxmlformats-officedocument.spreadsheetml.sheet"
                    | "vnd.openxmlformats-officedocument.presentationml.presentation"
                    | "vnd.ms-excel"
                    | "vnd.ms-powerpoint"
                    | "vnd.oasis.opendocument.text" => FileType::Document,
                    _ if primary == "text" => FileType::Document,
                    _ => FileType::Binary,
                }
            }
            _ => FileType::Binary,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Audio => "audio",
            FileType::Binary => "binary",
            FileType::Document => "document",
            FileType::Image => "image",
            FileType::Video => "video",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub nombre: String,
    /// `None` is the library root
    #[serde(default)]
    pub parent: Option<String>,
    pub autor: String,
    pub created_at: DateTime<Utc>,
}

/// A document in the shared library
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Archivo {
    pub id: String,
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    pub autor: String,
    pub size: u64,
    pub mime_type: String,
    pub tipo: FileType,
    pub url: String,
    pub key: String,
    pub publico: bool,
    /// `None` is the library root
    #[serde(default)]
    pub folder: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Payments
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    #[serde(default)]
    pub capture_id: Option<String>,
    pub user_id: String,
    pub status: String,
    pub amount: String,
    pub currency: String,
    /// Raw gateway payload, kept as JSON text
    pub raw: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Settings & blobs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: i64,
    pub updated_at: DateTime<Utc>,
}

/// Metadata of a blob; the bytes live in their own table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobMeta {
    pub id: String,
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
}
