//! Propagation of record changes into the index.
//!
//! ```text
//! RecordEvent ──→ SyncHooks ──(Registry::for_source)──→ SyncDocument ──→ IndexGateway
//! ```

mod document;
mod hooks;

pub use document::{strip_tags, SyncDocument};
pub use hooks::{RecordEvent, SyncHooks, SyncOutcome, SyncStrategy};
