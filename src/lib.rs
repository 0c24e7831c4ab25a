//! # Search Sync
//!
//! Keeps Manticore Search index tables in step with a relational record store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Registry (startup, frozen)               │
//! │  • IndexDefinition per record type                         │
//! │  • Column spec from field classifications                  │
//! └─────────────────────────────────────────────────────────────┘
//!          │                    │                      │
//!          ▼                    ▼                      ▼
//! ┌────────────────┐  ┌──────────────────┐  ┌──────────────────┐
//! │    Migrator    │  │    SyncHooks     │  │   QueryEngine    │
//! │ plan → rebuild │  │ save / delete    │  │ match / phrase   │
//! │ drop→create→   │  │ insert vs replace│  │ tri-state hits   │
//! │ backfill       │  │                  │  │                  │
//! └────────────────┘  └──────────────────┘  └──────────────────┘
//!          │                    │                      │
//!          └────────────────────┼──────────────────────┘
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        IndexGateway                         │
//! │  • DDL, document CRUD, bulk, existence check, search       │
//! │  • Unknown-key policy, warn-and-propagate failures         │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//!            SearchTransport: HttpTransport | MemoryTransport
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use search_sync::record::{Record, RecordType, StaticRecordSource};
//! use search_sync::schema::{IndexDefinition, Registry};
//! use search_sync::{HttpTransport, IndexGateway, Migrator, QueryEngine, RecordEvent, SearchConfig, SyncHooks};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), search_sync::SearchError> {
//!     let config = SearchConfig::from_env()?;
//!     let transport = Arc::new(HttpTransport::connect(&config).await?);
//!     let gateway = Arc::new(IndexGateway::from_config(transport, &config));
//!
//!     let article = Arc::new(
//!         RecordType::new("Article")
//!             .field("title", "CharField")
//!             .field("body", "TextField"),
//!     );
//!     let registry = Arc::new(Registry::new());
//!     registry.register([IndexDefinition::new(&article).param("min_infix_len", "3")])?;
//!     registry.freeze();
//!
//!     // Full rebuild from the record store
//!     let records = Arc::new(StaticRecordSource::new());
//!     Migrator::new(registry.clone(), gateway.clone(), records).rebuild_all().await?;
//!
//!     // Propagate a save
//!     let hooks = SyncHooks::new(registry.clone(), gateway.clone()).with_strategy(config.sync_strategy);
//!     hooks.handle(&RecordEvent::saved("Article", Record::new(1).with("title", "<b>Hello</b>"))).await?;
//!
//!     // Query
//!     let engine = QueryEngine::new(gateway);
//!     if let Some(def) = registry.get("article") {
//!         let hits = engine.objects(&def).search("hello", true).await?.all().await?;
//!         println!("{} hits", hits.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`schema`]: field-type mapping, index definitions, the registry
//! - [`transport`]: raw engine API (HTTP and in-memory)
//! - [`gateway`]: typed schema and document operations
//! - [`migrate`]: migration plans and table rebuilds
//! - [`sync`]: record save/delete propagation
//! - [`search`]: query builder and result holder
//! - [`record`]: record types, records, record sources
//! - [`manifest`]: JSON snapshot loading for `migratesearch`
//! - [`resilience`]: retry with backoff

pub mod config;
pub mod gateway;
pub mod manifest;
pub mod metrics;
pub mod migrate;
pub mod record;
pub mod resilience;
pub mod schema;
pub mod search;
pub mod sync;
pub mod transport;

pub use config::SearchConfig;
pub use gateway::{DeleteOutcome, IndexGateway};
pub use metrics::LatencyTimer;
pub use migrate::{MigrationPlan, MigrationReport, Migrator};
pub use record::{FieldValue, Record, RecordSource, RecordType};
pub use resilience::retry::RetryConfig;
pub use schema::{IndexDefinition, Registry};
pub use search::{QueryEngine, QuerySet, QueryState, SearchHit};
pub use sync::{RecordEvent, SyncDocument, SyncHooks, SyncOutcome, SyncStrategy};
pub use transport::{ErrorKind, HttpTransport, MemoryTransport, SearchError, SearchTransport};
