use std::collections::BTreeMap;

use crate::programme::ProgrammeRecord;

/// Institution names exactly as the dataset spells them.
pub const HKUST: &str = "The Hong Kong University of Science and Technology";
pub const POLYU: &str = "The Hong Kong Polytechnic University";

/// Fixed prestige ordering used only as a ranking tie-break, never as an
/// eligibility factor. Institutions not listed sort last.
const PRESTIGE_ORDER: [&str; 16] = [
    "The University of Hong Kong",
    "The Chinese University of Hong Kong",
    HKUST,
    "City University of Hong Kong",
    POLYU,
    "Hong Kong Baptist University",
    "Lingnan University",
    "Hong Kong Shue Yan University",
    "The Education University of Hong Kong",
    "Hong Kong Metropolitan University",
    "The Hang Seng University of Hong Kong",
    "Saint Francis University",
    "Tung Wah College",
    "UOW College Hong Kong",
    "Hong Kong Chu Hai College",
    "Technological and Higher Education Institute of Hong Kong, Vocational Training Council",
];

/// Immutable prestige configuration injected into the recommender at
/// construction, so ranking is a pure function of (inputs, configuration).
#[derive(Debug, Clone)]
pub struct PrestigeTable {
    order: Vec<String>,
}

impl PrestigeTable {
    pub fn with_defaults() -> Self {
        Self {
            order: PRESTIGE_ORDER.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Rank of an institution in the prestige order; unranked institutions
    /// sort after every ranked one.
    pub fn rank(&self, institution: &str) -> usize {
        self.order
            .iter()
            .position(|name| name == institution)
            .unwrap_or(self.order.len())
    }
}

/// Maps the digit after the `JS` code prefix to its owning institution,
/// built once per dataset load. First occurrence of a prefix wins.
pub fn build_prefix_institutions(programmes: &[ProgrammeRecord]) -> BTreeMap<char, String> {
    let mut map = BTreeMap::new();
    for programme in programmes {
        if programme.institution.is_empty() {
            continue;
        }
        if let Some(prefix) = code_prefix_digit(&programme.code) {
            map.entry(prefix)
                .or_insert_with(|| programme.institution.clone());
        }
    }
    map
}

/// First digit after `JS` for codes following the JUPAS coding scheme.
pub fn code_prefix_digit(code: &str) -> Option<char> {
    if code.starts_with("JS") && code.len() >= 4 {
        code.chars().nth(2)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: &str, institution: &str) -> ProgrammeRecord {
        serde_json::from_str(&format!(
            r#"{{"code": "{code}", "institution": "{institution}"}}"#
        ))
        .expect("programme record")
    }

    #[test]
    fn ranked_institutions_order_before_unranked() {
        let table = PrestigeTable::with_defaults();
        let hku = table.rank("The University of Hong Kong");
        let cuhk = table.rank("The Chinese University of Hong Kong");
        let unknown = table.rank("Some Private College");
        assert!(hku < cuhk);
        assert!(cuhk < unknown);
        assert_eq!(unknown, table.rank("Another Unknown"));
    }

    #[test]
    fn prefix_map_keeps_first_institution_per_digit() {
        let programmes = vec![
            record("JS1001", "The University of Hong Kong"),
            record("JS1102", "Someone Else"),
            record("JS4500", "The Chinese University of Hong Kong"),
            record("XX123", "Ignored"),
        ];
        let map = build_prefix_institutions(&programmes);
        assert_eq!(
            map.get(&'1').map(String::as_str),
            Some("The University of Hong Kong")
        );
        assert_eq!(
            map.get(&'4').map(String::as_str),
            Some("The Chinese University of Hong Kong")
        );
        assert_eq!(map.get(&'X'), None);
    }

    #[test]
    fn prefix_digit_requires_js_scheme() {
        assert_eq!(code_prefix_digit("JS1234"), Some('1'));
        assert_eq!(code_prefix_digit("JS1"), None);
        assert_eq!(code_prefix_digit("1234"), None);
    }
}
