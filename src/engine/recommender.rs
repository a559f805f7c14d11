use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::ProgrammeSnapshot;
use crate::engine::{classify_programme, Band};
use crate::programme::prestige::PrestigeTable;
use crate::programme::ProgrammeRecord;
use crate::scores::ScoreMap;

/// Bounds on a single recommendation scan, injected from configuration.
/// The caps keep one request's unit of work predictable when the pool is
/// large; a narrower institution-filtered pool gets the smaller cap.
#[derive(Debug, Clone, Copy)]
pub struct ScanLimits {
    pub filtered_cap: usize,
    pub unfiltered_cap: usize,
    pub max_results: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            filtered_cap: 100,
            unfiltered_cap: 500,
            max_results: 100,
        }
    }
}

/// A ranking request. `target_band` is the riskiest band the caller will
/// accept; safer bands may fill out the list, riskier ones never do.
#[derive(Debug, Clone)]
pub struct RecommendRequest {
    pub target_band: Band,
    pub exclude_codes: Vec<String>,
    pub institutions: Option<Vec<String>>,
    pub count: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("score mapping cannot be empty")]
    EmptyScores,
    #[error("target band must be between 0 and 8")]
    InvalidTargetBand,
    #[error("result count must be between 1 and {max}")]
    InvalidCount { max: usize },
}

impl RecommendRequest {
    pub fn validate(&self, scores: &ScoreMap, limits: &ScanLimits) -> Result<(), RequestError> {
        if scores.is_empty() {
            return Err(RequestError::EmptyScores);
        }
        if !self.target_band.is_rankable() {
            return Err(RequestError::InvalidTargetBand);
        }
        if self.count == 0 || self.count > limits.max_results {
            return Err(RequestError::InvalidCount {
                max: limits.max_results,
            });
        }
        Ok(())
    }
}

/// One ranked entry: the programme annotated with its classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationEntry {
    #[serde(flatten)]
    pub programme: ProgrammeRecord,
    pub band: Band,
    pub band_label: String,
    pub score: f64,
}

/// Diagnostic counters: scanned and found must always be reconcilable so no
/// silently dropped programme goes unaccounted for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendSummary {
    /// Programmes actually classified during the scan.
    pub programmes_scanned: usize,
    /// Programmes that produced a rankable band (any level).
    pub programmes_found: usize,
    /// Pool size after the institution filter.
    pub programmes_available: usize,
    /// Pool size before filtering (active records with statistics).
    pub programmes_with_statistics: usize,
    pub bands_found: Vec<i8>,
    pub bands_checked: Vec<i8>,
}

/// The recommendation aggregator. Prestige configuration is injected at
/// construction; everything else arrives per call.
#[derive(Debug, Clone)]
pub struct Recommender {
    prestige: PrestigeTable,
    limits: ScanLimits,
}

impl Recommender {
    pub fn new(prestige: PrestigeTable, limits: ScanLimits) -> Self {
        Self { prestige, limits }
    }

    pub fn with_defaults() -> Self {
        Self::new(PrestigeTable::with_defaults(), ScanLimits::default())
    }

    pub fn limits(&self) -> &ScanLimits {
        &self.limits
    }

    /// Runs the classification pipeline over the snapshot and assembles the
    /// quota-bounded, tie-broken recommendation list.
    pub fn recommend(
        &self,
        scores: &ScoreMap,
        snapshot: &ProgrammeSnapshot,
        request: &RecommendRequest,
    ) -> Result<(Vec<RecommendationEntry>, RecommendSummary), RequestError> {
        request.validate(scores, &self.limits)?;

        let with_statistics: Vec<&ProgrammeRecord> = snapshot
            .programmes
            .iter()
            .filter(|p| p.active && p.has_statistics())
            .collect();

        let filtered: Vec<&ProgrammeRecord> = match &request.institutions {
            Some(institutions) if !institutions.is_empty() => {
                let needles: Vec<String> =
                    institutions.iter().map(|s| s.to_lowercase()).collect();
                with_statistics
                    .iter()
                    .copied()
                    .filter(|p| {
                        let haystack = p.institution.to_lowercase();
                        needles.iter().any(|needle| haystack.contains(needle))
                    })
                    .collect()
            }
            _ => with_statistics.clone(),
        };

        let cap = if request.institutions.as_ref().is_some_and(|i| !i.is_empty()) {
            self.limits.filtered_cap
        } else {
            self.limits.unfiltered_cap
        };

        let mut by_band: BTreeMap<Band, Vec<RecommendationEntry>> = BTreeMap::new();
        let mut scanned = 0usize;
        for programme in filtered.iter().copied() {
            if request.exclude_codes.iter().any(|code| code == &programme.code) {
                continue;
            }
            if scanned >= cap {
                tracing::debug!(cap, "stopping recommendation scan at processing cap");
                break;
            }
            scanned += 1;

            let result = classify_programme(scores, programme);
            if !result.band.is_rankable() {
                continue;
            }
            by_band.entry(result.band).or_default().push(RecommendationEntry {
                programme: (*programme).clone(),
                band: result.band,
                band_label: result.band.label().to_string(),
                score: result.score,
            });
        }

        let programmes_found = by_band.values().map(Vec::len).sum();
        let bands_found: Vec<i8> = by_band.keys().map(|band| band.as_i8()).collect();

        // Only the target band and safer ones are eligible, target first.
        let bands_checked: Vec<Band> = by_band
            .keys()
            .copied()
            .filter(|band| *band >= request.target_band)
            .collect();

        let mut entries: Vec<RecommendationEntry> = Vec::new();
        for band in &bands_checked {
            if entries.len() >= request.count {
                break;
            }
            let mut in_band = by_band.remove(band).unwrap_or_default();
            in_band.sort_by(|a, b| self.entry_order(a, b, snapshot));
            for entry in in_band {
                if entries.len() >= request.count {
                    break;
                }
                entries.push(entry);
            }
        }

        // Defensive: the collection order above already respects the output
        // invariants, but the final order must hold regardless.
        entries.sort_by(|a, b| self.entry_order(a, b, snapshot));
        entries.truncate(request.count);

        let summary = RecommendSummary {
            programmes_scanned: scanned,
            programmes_found,
            programmes_available: filtered.len(),
            programmes_with_statistics: with_statistics.len(),
            bands_found,
            bands_checked: bands_checked.iter().map(|band| band.as_i8()).collect(),
        };
        Ok((entries, summary))
    }

    fn entry_order(
        &self,
        a: &RecommendationEntry,
        b: &RecommendationEntry,
        snapshot: &ProgrammeSnapshot,
    ) -> std::cmp::Ordering {
        a.band
            .cmp(&b.band)
            .then_with(|| {
                self.prestige_rank(&a.programme, snapshot)
                    .cmp(&self.prestige_rank(&b.programme, snapshot))
            })
            .then_with(|| a.programme.code.cmp(&b.programme.code))
    }

    /// Prestige rank for tie-breaking. The prefix-derived institution takes
    /// precedence over the record's own field when the code follows the
    /// JUPAS scheme, matching how the dataset resolves institutions.
    fn prestige_rank(&self, programme: &ProgrammeRecord, snapshot: &ProgrammeSnapshot) -> usize {
        let institution = snapshot
            .prefix_institution(&programme.code)
            .unwrap_or(programme.institution.as_str());
        self.prestige.rank(institution)
    }
}
