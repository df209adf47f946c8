//! Merges normalized batches into one deduplicated dataset.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::{ReportError, Result, Stage};
use crate::model::{CanonicalBatch, CanonicalRecord, DuplicateKeyWarning, Warning};

/// Which record survives when two share a `(period, category)` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The most recently ingested record replaces the earlier one.
    #[default]
    LastWriterWins,
    /// The first record for a key is kept; later ones are discarded.
    FirstWriterWins,
}

/// Canonical records keyed by `(period, category)`, in first-seen key order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnifiedDataset {
    records: Vec<CanonicalRecord>,
}

impl UnifiedDataset {
    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CanonicalRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Repackages the dataset as a single batch, e.g. to merge it with new sources.
    pub fn into_batch(self, source: impl Into<String>) -> CanonicalBatch {
        CanonicalBatch::new(source, self.records)
    }
}

impl<'a> IntoIterator for &'a UnifiedDataset {
    type Item = &'a CanonicalRecord;
    type IntoIter = std::slice::Iter<'a, CanonicalRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Consolidates batches in the order given. Duplicate keys are resolved by
/// `policy` and reported as warnings; the surviving record keeps the position
/// where its key was first seen.
#[instrument(level = "info", skip_all, fields(batches = batches.len(), ?policy))]
pub fn consolidate(
    batches: Vec<CanonicalBatch>,
    policy: DuplicatePolicy,
) -> Result<(UnifiedDataset, Vec<Warning>)> {
    let total: usize = batches.iter().map(|batch| batch.records.len()).sum();
    if total == 0 {
        return Err(ReportError::EmptyInput {
            stage: Stage::Consolidation,
        });
    }

    let mut records: Vec<CanonicalRecord> = Vec::with_capacity(total);
    let mut positions = HashMap::with_capacity(total);
    let mut warnings = Vec::new();

    for batch in batches {
        for record in batch.records {
            let key = record.key();
            let Some(&position) = positions.get(&key) else {
                positions.insert(key, records.len());
                records.push(record);
                continue;
            };

            let existing = &mut records[position];
            let (kept, replaced) = match policy {
                DuplicatePolicy::LastWriterWins => (record.origin(), existing.origin()),
                DuplicatePolicy::FirstWriterWins => (existing.origin(), record.origin()),
            };
            let (kept, replaced) = (kept.clone(), replaced.clone());
            warn!(%key, %kept, %replaced, "duplicate key");
            warnings.push(Warning::DuplicateKey(DuplicateKeyWarning {
                period: key.period,
                category: key.category,
                replaced,
                kept,
            }));
            if policy == DuplicatePolicy::LastWriterWins {
                *existing = record;
            }
        }
    }

    info!(
        records = records.len(),
        duplicates = warnings.len(),
        "consolidated dataset"
    );
    Ok((UnifiedDataset { records }, warnings))
}
