//! Per-relation diagnostics collected during consolidation.

use serde::Serialize;

use crate::model::Provenance;

/// Why an extracted relation did not contribute to the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// A parent or the offspring is not a known species.
    Unresolved { missing: Vec<String> },
    /// Same parents, offspring and chance as an override entry.
    DuplicateOfOverride,
    /// Identical relation (including conditions) was already consumed this run.
    DuplicateWithinRun,
}

/// One skipped relation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipDiagnostic {
    pub source: String,
    /// Offspring key (or raw reference) the relation tried to produce.
    pub offspring: String,
    /// Whether the override set already produces this offspring.
    pub in_override: bool,
    pub reason: SkipReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

/// An unconditional relation whose chance disagrees with the established
/// default for the same parents and offspring. It is kept as an extra
/// requirement rather than overwriting the default.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChanceConflict {
    pub source: String,
    pub parents: [String; 2],
    pub offspring: String,
    pub default_chance: f64,
    pub chance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

/// Counters over one consolidation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationReport {
    pub relations_seen: usize,
    /// Relations that created or extended a group.
    pub accepted: usize,
    /// Accepted relations whose parent pair belongs to an override group.
    pub merged_into_override: usize,
    pub duplicate_of_override: usize,
    pub duplicate_within_run: usize,
    pub unresolved: usize,
    /// Unresolved relations whose offspring the overrides already cover.
    pub unresolved_covered: usize,
    pub conflicts: usize,
}

impl ConsolidationReport {
    pub fn skipped(&self) -> usize {
        self.duplicate_of_override + self.duplicate_within_run + self.unresolved
    }

    pub(crate) fn record_skip(&mut self, reason: &SkipReason, in_override: bool) {
        match reason {
            SkipReason::Unresolved { .. } => {
                self.unresolved += 1;
                if in_override {
                    self.unresolved_covered += 1;
                }
            }
            SkipReason::DuplicateOfOverride => self.duplicate_of_override += 1,
            SkipReason::DuplicateWithinRun => self.duplicate_within_run += 1,
        }
    }
}
