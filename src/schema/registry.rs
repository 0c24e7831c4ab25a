// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Registry of index definitions.
//!
//! Built once at startup, frozen, then shared by reference with the
//! migrator, sync hooks and query engine.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use search_sync::record::RecordType;
//! use search_sync::schema::{IndexDefinition, Registry};
//!
//! let article = Arc::new(RecordType::new("Article").field("title", "CharField"));
//! let registry = Registry::new();
//! registry.register([IndexDefinition::new(&article)]).unwrap();
//! registry.freeze();
//!
//! assert_eq!(registry.related_pairs().len(), 1);
//! assert_eq!(registry.for_source("article").len(), 1);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use super::definition::IndexDefinition;
use crate::metrics;
use crate::record::RecordType;
use crate::transport::SearchError;

/// Ordered collection of registered index definitions.
///
/// Writes happen at startup only; after [`Registry::freeze`] every
/// registration is refused.
#[derive(Debug, Default)]
pub struct Registry {
    definitions: RwLock<Vec<Arc<IndexDefinition>>>,
    frozen: AtomicBool,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register definitions, in order.
    ///
    /// All definitions are validated first; one invalid definition rejects
    /// the whole call. Duplicates are not detected.
    pub fn register<I>(&self, definitions: I) -> Result<(), SearchError>
    where
        I: IntoIterator<Item = IndexDefinition>,
    {
        let definitions: Vec<IndexDefinition> = definitions.into_iter().collect();
        for definition in &definitions {
            definition.validate()?;
        }

        let mut registered = self.definitions.write();
        // Checked under the write lock so a concurrent freeze() cannot interleave
        if self.is_frozen() {
            return Err(SearchError::Config(
                "registry is frozen; register definitions before serving traffic".into(),
            ));
        }
        for definition in definitions {
            debug!(table = %definition.table_name(), "Index definition registered");
            registered.push(Arc::new(definition));
        }
        Ok(())
    }

    /// Refuse further registrations.
    pub fn freeze(&self) {
        let registered = self.definitions.write();
        if !self.frozen.swap(true, Ordering::SeqCst) {
            metrics::set_registered_definitions(registered.len());
            info!(definitions = registered.len(), "Index registry frozen");
        }
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    /// Every registered definition, regardless of source.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<IndexDefinition>> {
        self.definitions.read().clone()
    }

    /// `(definition, source type)` for every definition whose source is set
    /// and still alive, in registration order.
    #[must_use]
    pub fn related_pairs(&self) -> Vec<(Arc<IndexDefinition>, Arc<RecordType>)> {
        self.definitions
            .read()
            .iter()
            .filter_map(|def| def.source_type().map(|ty| (Arc::clone(def), ty)))
            .collect()
    }

    /// Definitions mirroring the named record type (case-insensitive).
    #[must_use]
    pub fn for_source(&self, type_name: &str) -> Vec<Arc<IndexDefinition>> {
        self.related_pairs()
            .into_iter()
            .filter(|(_, ty)| ty.is_named(type_name))
            .map(|(def, _)| def)
            .collect()
    }

    /// Record-type name → definition. Later registrations win on clashes.
    #[must_use]
    pub fn search_mapping(&self) -> HashMap<String, Arc<IndexDefinition>> {
        self.related_pairs()
            .into_iter()
            .map(|(def, ty)| (ty.name.clone(), def))
            .collect()
    }

    /// Definition registered under a table name (first match).
    #[must_use]
    pub fn get(&self, table_name: &str) -> Option<Arc<IndexDefinition>> {
        self.definitions
            .read()
            .iter()
            .find(|def| def.table_name() == table_name)
            .cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.read().is_empty()
    }
}
