use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize};

/// A 3-letter DSE subject code. Longer keys are truncated on construction so
/// user-supplied codes line up with the dataset's short codes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SubjectCode(String);

/// Sentinel key used in requirement structures to mean "any elective".
pub const WILDCARD_KEY: &str = "ELE";

const CORE_SUBJECTS: [&str; 3] = ["CHI", "ENG", "MAT"];

impl SubjectCode {
    pub fn new(raw: &str) -> Self {
        Self(raw.chars().take(3).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Chinese, English and Mathematics never satisfy an elective wildcard.
    pub fn is_core(&self) -> bool {
        CORE_SUBJECTS.contains(&self.0.as_str())
    }

    pub fn mathematics() -> Self {
        Self("MAT".to_string())
    }

    pub fn extended_mathematics() -> Self {
        Self("MEP".to_string())
    }
}

impl Display for SubjectCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for SubjectCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(&raw))
    }
}

/// Normalized per-subject levels, keyed by short subject code. Values are
/// `f64` because the level-5 bonus remap introduces half-levels.
pub type ScoreMap = BTreeMap<SubjectCode, f64>;

/// Converts one raw grade token to the canonical numeric scale. Tokens
/// outside the scale map to 0, never to an error.
pub fn grade_level(token: &str) -> f64 {
    match token {
        "5**" => 7.0,
        "5*" => 6.0,
        "5" => 5.0,
        "4" => 4.0,
        "3" => 3.0,
        "2" => 2.0,
        "1" => 1.0,
        _ => 0.0,
    }
}

/// Builds the normalized score map from raw grade tokens. Subject keys are
/// truncated to their short form; later duplicates overwrite earlier ones.
pub fn normalize_scores<'a, I>(raw: I) -> ScoreMap
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    raw.into_iter()
        .map(|(subject, token)| (SubjectCode::new(subject), grade_level(token)))
        .collect()
}

/// Remaps levels 5/6/7 to 5.5/7/8.5 for programmes that award the bonus.
pub fn apply_level_5_bonus(scores: &mut ScoreMap) {
    for level in scores.values_mut() {
        if *level == 5.0 {
            *level = 5.5;
        } else if *level == 6.0 {
            *level = 7.0;
        } else if *level == 7.0 {
            *level = 8.5;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_grade_tokens_to_levels() {
        assert_eq!(grade_level("5**"), 7.0);
        assert_eq!(grade_level("5*"), 6.0);
        assert_eq!(grade_level("5"), 5.0);
        assert_eq!(grade_level("1"), 1.0);
        assert_eq!(grade_level("U"), 0.0);
        assert_eq!(grade_level(""), 0.0);
    }

    #[test]
    fn truncates_long_subject_keys() {
        let scores = normalize_scores([("CHIN", "5"), ("BIOLOGY", "4")]);
        assert_eq!(scores.get(&SubjectCode::new("CHI")), Some(&5.0));
        assert_eq!(scores.get(&SubjectCode::new("BIO")), Some(&4.0));
    }

    #[test]
    fn core_subjects_are_not_electives() {
        assert!(SubjectCode::new("CHI").is_core());
        assert!(SubjectCode::new("ENG").is_core());
        assert!(SubjectCode::new("MAT").is_core());
        assert!(!SubjectCode::new("BIO").is_core());
        assert!(!SubjectCode::new("MEP").is_core());
    }

    #[test]
    fn level_5_bonus_remaps_top_levels_only() {
        let mut scores = normalize_scores([("CHI", "5**"), ("ENG", "5*"), ("MAT", "5"), ("BIO", "4")]);
        apply_level_5_bonus(&mut scores);
        assert_eq!(scores.get(&SubjectCode::new("CHI")), Some(&8.5));
        assert_eq!(scores.get(&SubjectCode::new("ENG")), Some(&7.0));
        assert_eq!(scores.get(&SubjectCode::new("MAT")), Some(&5.5));
        assert_eq!(scores.get(&SubjectCode::new("BIO")), Some(&4.0));
    }
}
