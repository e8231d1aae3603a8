//! tidescale-state — embedded object store for tidescale.
//!
//! Backed by [redb](https://docs.rs/redb), stands in for the orchestration
//! API the controller talks to: scheduled autoscalers (parent
//! configurations), the schedules they own, and the horizontal scalers
//! they manage.
//!
//! # Architecture
//!
//! All objects are JSON-serialized into redb's `&[u8]` value columns.
//! Composite keys (`{namespace}/{name}`, `{namespace}/{owner}/{name}`)
//! enable prefix scans for the schedules owned by one autoscaler.
//!
//! Scalers carry a `resource_version`; updates based on a stale version
//! fail with `StateError::Conflict`, as do duplicate creates.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
