//! Index migration.
//!
//! A record-store migration plan names the record types it touched. Every
//! registered index mirroring one of them is rebuilt from scratch:
//!
//! ```text
//! plan ──(touched_models)──→ names ──(Registry::related_pairs)──→ definitions
//!                                                                   │
//!                                        drop_table → create_table → backfill
//! ```

mod migrator;
mod plan;

pub use migrator::{MigrationReport, Migrator, RebuiltTable};
pub use plan::{MigrationOperation, MigrationPlan, PlannedMigration};
