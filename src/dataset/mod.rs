pub mod store;

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::programme::prestige::{build_prefix_institutions, code_prefix_digit};
use crate::programme::ProgrammeRecord;

pub use store::ProgrammeStore;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed reading dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed parsing dataset {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("dataset {path} contains no programme records")]
    Empty { path: PathBuf },
}

/// One immutable, fully-derived view of the programme dataset. Readers hold
/// an `Arc` to it, so a reload never mutates anything a request is using.
#[derive(Debug)]
pub struct ProgrammeSnapshot {
    pub programmes: Vec<ProgrammeRecord>,
    /// JUPAS code prefix digit to institution, derived at load time.
    prefix_institutions: BTreeMap<char, String>,
    pub generation: u64,
    pub loaded_at: DateTime<Utc>,
}

impl ProgrammeSnapshot {
    fn new(programmes: Vec<ProgrammeRecord>, generation: u64) -> Self {
        let prefix_institutions = build_prefix_institutions(&programmes);
        Self {
            programmes,
            prefix_institutions,
            generation,
            loaded_at: Utc::now(),
        }
    }

    /// Institution implied by the programme code's prefix digit, when the
    /// code follows the JUPAS scheme and the prefix is known.
    pub fn prefix_institution(&self, code: &str) -> Option<&str> {
        let digit = code_prefix_digit(code)?;
        self.prefix_institutions
            .get(&digit)
            .map(String::as_str)
    }

    pub fn find_programme(&self, code: &str) -> Option<&ProgrammeRecord> {
        self.programmes.iter().find(|p| p.code == code)
    }

    pub fn coverage(&self) -> DatasetCoverage {
        let mut coverage = DatasetCoverage {
            total: self.programmes.len(),
            ..DatasetCoverage::default()
        };
        for programme in &self.programmes {
            if programme.active {
                coverage.active += 1;
            }
            if programme.score_uq.is_some() {
                coverage.with_upper_quartile += 1;
            }
            if programme.score_md.is_some() {
                coverage.with_median += 1;
            }
            if programme.score_lq.is_some() {
                coverage.with_lower_quartile += 1;
            }
        }
        coverage
    }

    #[cfg(test)]
    pub fn for_tests(programmes: Vec<ProgrammeRecord>) -> Self {
        Self::new(programmes, 1)
    }
}

/// How much of the dataset carries each historical quartile. Classification
/// quality degrades for records missing quartiles, so this is surfaced in
/// the status report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetCoverage {
    pub total: usize,
    pub active: usize,
    pub with_upper_quartile: usize,
    pub with_median: usize,
    pub with_lower_quartile: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStatus {
    pub path: PathBuf,
    pub loaded: bool,
    pub generation: u64,
    pub loaded_at: Option<DateTime<Utc>>,
    pub coverage: DatasetCoverage,
}
