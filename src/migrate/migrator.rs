// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Table rebuilds driven by migration plans.
//!
//! Rebuilds run one table at a time. The first failing step aborts the run;
//! tables rebuilt before it stay rebuilt and nothing is rolled back. A
//! definition without a live source type cannot be backfilled and fails the
//! run before any engine call.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::plan::MigrationPlan;
use crate::gateway::IndexGateway;
use crate::metrics;
use crate::record::{RecordSource, RecordType};
use crate::schema::{IndexDefinition, Registry};
use crate::sync::SyncDocument;
use crate::transport::{MigrationStep, SearchError};

/// One rebuilt table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuiltTable {
    pub table: String,
    /// Documents sent by the backfill
    pub documents: usize,
}

/// Outcome of a migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub rebuilt: Vec<RebuiltTable>,
}

impl MigrationReport {
    /// Nothing was rebuilt.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rebuilt.is_empty()
    }

    #[must_use]
    pub fn tables(&self) -> Vec<&str> {
        self.rebuilt.iter().map(|t| t.table.as_str()).collect()
    }

    #[must_use]
    pub fn total_documents(&self) -> usize {
        self.rebuilt.iter().map(|t| t.documents).sum()
    }
}

pub struct Migrator {
    registry: Arc<Registry>,
    gateway: Arc<IndexGateway>,
    source: Arc<dyn RecordSource>,
}

impl Migrator {
    pub fn new(registry: Arc<Registry>, gateway: Arc<IndexGateway>, source: Arc<dyn RecordSource>) -> Self {
        Self {
            registry,
            gateway,
            source,
        }
    }

    /// Rebuild every index whose source type the plan touched.
    ///
    /// A plan naming no registered type makes no engine call.
    pub async fn make_migrations(&self, plan: &MigrationPlan) -> Result<MigrationReport, SearchError> {
        let touched = plan.touched_models();
        if touched.is_empty() {
            debug!("Migration plan touches no record types");
            return Ok(MigrationReport::default());
        }
        let definitions = self.definitions_for(&touched);
        if definitions.is_empty() {
            debug!(touched = ?touched, "No index mirrors the migrated record types");
            return Ok(MigrationReport::default());
        }
        self.run_migration(&definitions).await
    }

    /// [`Migrator::make_migrations`] over a JSON plan; an unparseable plan is a no-op.
    pub async fn make_migrations_json(&self, plan: &Value) -> Result<MigrationReport, SearchError> {
        match MigrationPlan::from_json(plan) {
            Some(plan) => self.make_migrations(&plan).await,
            None => Ok(MigrationReport::default()),
        }
    }

    /// Registered definitions whose live source type is among `type_names`
    /// (lower-cased), in registration order.
    #[must_use]
    pub fn definitions_for(&self, type_names: &[String]) -> Vec<Arc<IndexDefinition>> {
        self.registry
            .related_pairs()
            .into_iter()
            .filter(|(_, ty)| type_names.iter().any(|name| ty.is_named(name)))
            .map(|(def, _)| def)
            .collect()
    }

    /// Drop, create and backfill each definition in order.
    ///
    /// Every definition must have a live source type; otherwise the run fails
    /// with [`SearchError::InvalidDefinition`] and no table is touched.
    pub async fn run_migration(&self, definitions: &[Arc<IndexDefinition>]) -> Result<MigrationReport, SearchError> {
        let started = Instant::now();
        let sources = definitions
            .iter()
            .map(|definition| live_source(definition))
            .collect::<Result<Vec<_>, _>>()
            .inspect_err(|e| warn!(error = %e, "Migration refused"))?;

        let mut report = MigrationReport::default();
        for (definition, record_type) in definitions.iter().zip(&sources) {
            match self.rebuild(definition, record_type).await {
                Ok(documents) => {
                    metrics::record_rebuild(definition.table_name(), true);
                    report.rebuilt.push(RebuiltTable {
                        table: definition.table_name().to_string(),
                        documents,
                    });
                }
                Err(e) => {
                    metrics::record_rebuild(definition.table_name(), false);
                    warn!(
                        table = definition.table_name(),
                        rebuilt = report.rebuilt.len(),
                        error = %e,
                        "Migration aborted"
                    );
                    return Err(e);
                }
            }
        }

        metrics::record_migration_duration(started.elapsed());
        info!(
            tables = report.rebuilt.len(),
            documents = report.total_documents(),
            "Index migration complete"
        );
        Ok(report)
    }

    /// Rebuild every registered index, ignoring plans.
    pub async fn rebuild_all(&self) -> Result<MigrationReport, SearchError> {
        let definitions = self.registry.all();
        info!(definitions = definitions.len(), "Rebuilding all indexes");
        self.run_migration(&definitions).await
    }

    /// Load every live record of the source type into the table with one
    /// bulk call. No records, no call.
    pub async fn backfill(&self, definition: &IndexDefinition) -> Result<usize, SearchError> {
        let record_type = live_source(definition)?;
        self.load(definition, &record_type).await
    }

    async fn rebuild(&self, definition: &IndexDefinition, record_type: &RecordType) -> Result<usize, SearchError> {
        let table = definition.table_name();
        info!(table, source = %record_type.name, "Rebuilding index");

        self.gateway
            .drop_table(definition)
            .await
            .map_err(|e| step_error(table, MigrationStep::Drop, e))?;
        self.gateway
            .create_table(definition)
            .await
            .map_err(|e| step_error(table, MigrationStep::Create, e))?;
        self.load(definition, record_type)
            .await
            .map_err(|e| step_error(table, MigrationStep::Backfill, e))
    }

    async fn load(&self, definition: &IndexDefinition, record_type: &RecordType) -> Result<usize, SearchError> {
        let records = self.source.all_records(record_type).await?;
        let documents: Vec<SyncDocument> = records
            .iter()
            .map(|record| SyncDocument::project(definition, record))
            .collect();
        let sent = self.gateway.bulk_insert(definition.table_name(), documents).await?;
        debug!(table = definition.table_name(), documents = sent, "Backfill complete");
        Ok(sent)
    }
}

fn live_source(definition: &IndexDefinition) -> Result<Arc<RecordType>, SearchError> {
    definition.source_type().ok_or_else(|| SearchError::InvalidDefinition {
        name: definition.table_name().to_string(),
        reason: "source record type is unset or dropped".into(),
    })
}

fn step_error(table: &str, step: MigrationStep, source: SearchError) -> SearchError {
    SearchError::Migration {
        table: table.to_string(),
        step,
        source: Box::new(source),
    }
}
