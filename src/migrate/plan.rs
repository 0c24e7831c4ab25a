//! Migration plans as reported by the record store.
//!
//! # JSON shape
//!
//! Either plan entries as objects or as `[migration, backwards]` pairs:
//!
//! ```json
//! [
//!   {"app_label": "blog", "name": "0002_article_title", "operations": [
//!     {"kind": "AddField", "model_name": "article"}
//!   ]},
//!   [{"app_label": "blog", "name": "0003", "operations": []}, false]
//! ]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// One schema operation inside a migration. Operations that do not target
/// a single record type carry no `model_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationOperation {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub model_name: Option<String>,
}

impl MigrationOperation {
    pub fn on_model(kind: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            model_name: Some(model_name.into()),
        }
    }

    pub fn untargeted(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            model_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlannedMigration {
    #[serde(default)]
    pub app_label: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub backwards: bool,
    #[serde(default)]
    pub operations: Vec<MigrationOperation>,
}

impl PlannedMigration {
    pub fn new(app_label: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            app_label: app_label.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn operation(mut self, operation: MigrationOperation) -> Self {
        self.operations.push(operation);
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PlanEntry {
    Pair(PlannedMigration, bool),
    Flat(PlannedMigration),
}

impl From<PlanEntry> for PlannedMigration {
    fn from(entry: PlanEntry) -> Self {
        match entry {
            PlanEntry::Pair(mut migration, backwards) => {
                migration.backwards = backwards;
                migration
            }
            PlanEntry::Flat(migration) => migration,
        }
    }
}

/// Ordered list of applied migrations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct MigrationPlan {
    pub migrations: Vec<PlannedMigration>,
}

impl MigrationPlan {
    pub fn new(migrations: Vec<PlannedMigration>) -> Self {
        Self { migrations }
    }

    /// Parse a plan leniently. Anything that is not a list of migrations
    /// yields `None`; `null` yields an empty plan.
    pub fn from_json(value: &Value) -> Option<Self> {
        if value.is_null() {
            return Some(Self::default());
        }
        match Vec::<PlanEntry>::deserialize(value) {
            Ok(entries) => Some(Self::new(entries.into_iter().map(Into::into).collect())),
            Err(e) => {
                debug!(error = %e, "Ignoring unparseable migration plan");
                None
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Lower-cased names of every record type an operation targets,
    /// first occurrence order, without duplicates.
    #[must_use]
    pub fn touched_models(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self
            .migrations
            .iter()
            .flat_map(|m| m.operations.iter())
            .filter_map(|op| op.model_name.as_deref())
            .map(str::to_lowercase)
        {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}
