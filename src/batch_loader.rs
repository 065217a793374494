//! Batch Loader
//!
//! Splits the raw records of one source into fixed-size groups. Records of a
//! group are decoded up front, then loaded concurrently (interleaved on the
//! calling task); the next group starts only once every load of the current
//! group has reached `Done` or `Failed`.

use crate::error::IngestError;
use crate::graph_store::GraphStore;
use crate::model::Paper;
use crate::record_loader::{load_record, RecordOutcome};
use futures::future::join_all;
use serde_json::Value;
use std::ops::Range;
use tracing::{info, warn};

// ============================================================================
// Configuration
// ============================================================================

pub const BATCH_SIZE: usize = 200;

/// Consecutive ranges of at most `batch_size` items covering `0..len`.
pub fn partition(len: usize, batch_size: usize) -> Vec<Range<usize>> {
    (0..len)
        .step_by(batch_size.max(1))
        .map(|start| start..(start + batch_size).min(len))
        .collect()
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// 1-based group counter.
    pub index: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub malformed: usize,
    pub failed_paper_ids: Vec<String>,
}

impl BatchReport {
    fn record(&mut self, outcome: &RecordOutcome) {
        if outcome.is_ok() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
            self.failed_paper_ids.push(outcome.paper_id.clone());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub batches: Vec<BatchReport>,
}

impl LoadReport {
    pub fn succeeded(&self) -> usize {
        self.batches.iter().map(|b| b.succeeded).sum()
    }

    pub fn failed(&self) -> usize {
        self.batches.iter().map(|b| b.failed).sum()
    }

    pub fn malformed(&self) -> usize {
        self.batches.iter().map(|b| b.malformed).sum()
    }

    pub fn failed_paper_ids(&self) -> impl Iterator<Item = &str> {
        self.batches
            .iter()
            .flat_map(|b| b.failed_paper_ids.iter().map(String::as_str))
    }
}

// ============================================================================
// Loader
// ============================================================================

pub struct BatchLoader<'a> {
    store: &'a dyn GraphStore,
    batch_size: usize,
}

impl<'a> BatchLoader<'a> {
    pub fn new(store: &'a dyn GraphStore, batch_size: usize) -> Result<Self, IngestError> {
        if batch_size == 0 {
            return Err(IngestError::InvalidConfiguration(
                "batch size must be at least one".to_string(),
            ));
        }
        Ok(Self { store, batch_size })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn load(&self, records: Vec<Value>) -> LoadReport {
        let groups = partition(records.len(), self.batch_size);
        let total = groups.len();
        let mut remaining = records.into_iter();
        let mut report = LoadReport::default();

        for (i, range) in groups.into_iter().enumerate() {
            let mut batch = BatchReport {
                index: i + 1,
                total,
                ..Default::default()
            };
            info!("📦 Processing batch {}/{}", batch.index, total);

            let mut papers = Vec::with_capacity(range.len());
            for (index, raw) in range.zip(remaining.by_ref()) {
                match Paper::from_value(index, raw) {
                    Ok(paper) => papers.push(paper),
                    Err(e) => {
                        warn!("⚠️  Skipping record: {}", e);
                        batch.malformed += 1;
                    }
                }
            }

            let outcomes = join_all(papers.iter().map(|paper| load_record(self.store, paper))).await;
            for outcome in &outcomes {
                batch.record(outcome);
            }

            if batch.failed > 0 || batch.malformed > 0 {
                warn!(
                    "   Batch {}/{}: {} ok, {} failed, {} malformed",
                    batch.index, total, batch.succeeded, batch.failed, batch.malformed
                );
            } else {
                info!("   Batch {}/{}: {} ok", batch.index, total, batch.succeeded);
            }
            report.batches.push(batch);
        }

        report
    }
}
