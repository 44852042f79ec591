use redb::TableDefinition;

/// Users: uuid -> User (msgpack)
pub const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Email index: lowercased email -> user uuid
pub const USER_EMAILS: TableDefinition<&str, &str> = TableDefinition::new("user_emails");

/// Publications: uuid -> Publication (msgpack)
pub const PUBLICATIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("publications");

/// Author index: user uuid -> msgpack Vec of publication UUIDs
pub const AUTHOR_PUBLICATIONS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("author_publications");

/// Categories: uuid -> Category (msgpack)
pub const CATEGORIES: TableDefinition<&str, &[u8]> = TableDefinition::new("categories");

/// Category name index: lowercased name -> category uuid
pub const CATEGORY_NAMES: TableDefinition<&str, &str> = TableDefinition::new("category_names");

/// Library folders: uuid -> Folder (msgpack)
pub const FOLDERS: TableDefinition<&str, &[u8]> = TableDefinition::new("folders");

/// Library files: uuid -> Archivo (msgpack)
pub const ARCHIVOS: TableDefinition<&str, &[u8]> = TableDefinition::new("archivos");

/// Library key index: storage key -> file uuid
pub const ARCHIVO_KEYS: TableDefinition<&str, &str> = TableDefinition::new("archivo_keys");

/// Payments: uuid -> Payment (msgpack)
pub const PAYMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("payments");

/// Gateway reference index: order id / capture id -> payment uuid
pub const PAYMENT_REFS: TableDefinition<&str, &str> = TableDefinition::new("payment_refs");

/// Settings: key -> Setting (msgpack)
pub const SETTINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("settings");

/// Blob metadata: uuid -> BlobMeta (msgpack)
pub const BLOB_META: TableDefinition<&str, &[u8]> = TableDefinition::new("blob_meta");

/// Blob content: uuid -> raw bytes
pub const BLOB_DATA: TableDefinition<&str, &[u8]> = TableDefinition::new("blob_data");
