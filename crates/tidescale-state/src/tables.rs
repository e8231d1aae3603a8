//! redb table definitions for the tidescale state store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain types).

use redb::TableDefinition;

/// Scheduled autoscalers keyed by `{namespace}/{name}`.
pub const AUTOSCALERS: JsonTable = TableDefinition::new("autoscalers");

/// Schedules keyed by `{namespace}/{owner}/{name}`.
pub const SCHEDULES: JsonTable = TableDefinition::new("schedules");

/// Managed horizontal scalers keyed by `{namespace}/{name}`.
pub const SCALERS: JsonTable = TableDefinition::new("scalers");

/// Shape shared by every table in the store.
pub type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;
