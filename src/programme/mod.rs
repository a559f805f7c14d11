pub mod prestige;

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::scores::{SubjectCode, WILDCARD_KEY};

/// One entry of an admission requirement structure. The dataset mixes a
/// wildcard key (`ELE`) with named subject keys in the same mapping; the
/// distinction is made once at parse time instead of string-sniffing later.
#[derive(Debug, Clone, PartialEq)]
pub enum RequirementEntry {
    /// Any non-core elective at or above the minimum level.
    Wildcard { min_level: f64 },
    /// A specific subject at or above the minimum level.
    Subject { code: SubjectCode, min_level: f64 },
}

/// An ordered admission requirement structure. Document order is preserved
/// because it decides which entry satisfies a gate first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequirementSet(Vec<RequirementEntry>);

impl RequirementSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RequirementEntry> {
        self.0.iter()
    }

    #[cfg(test)]
    pub fn from_entries(entries: Vec<RequirementEntry>) -> Self {
        Self(entries)
    }
}

impl Serialize for RequirementSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in &self.0 {
            match entry {
                RequirementEntry::Wildcard { min_level } => {
                    map.serialize_entry(WILDCARD_KEY, min_level)?;
                }
                RequirementEntry::Subject { code, min_level } => {
                    map.serialize_entry(code, min_level)?;
                }
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RequirementSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SetVisitor;

        impl<'de> Visitor<'de> for SetVisitor {
            type Value = RequirementSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of subject code to minimum level, or null")
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(RequirementSet::default())
            }

            fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(RequirementSet::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((key, min_level)) = access.next_entry::<String, f64>()? {
                    let key = SubjectCode::new(&key);
                    if key.as_str() == WILDCARD_KEY {
                        entries.push(RequirementEntry::Wildcard { min_level });
                    } else {
                        entries.push(RequirementEntry::Subject {
                            code: key,
                            min_level,
                        });
                    }
                }
                Ok(RequirementSet(entries))
            }
        }

        deserializer.deserialize_any(SetVisitor)
    }
}

/// An ordered subject-weight structure. Order matters for the optional-slot
/// argmax (first strictly greater candidate wins).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightSet(Vec<(SubjectCode, f64)>);

impl WeightSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SubjectCode, f64)> {
        self.0.iter().map(|(code, weight)| (code, *weight))
    }

    pub fn get(&self, code: &SubjectCode) -> Option<f64> {
        self.0
            .iter()
            .find(|(candidate, _)| candidate == code)
            .map(|(_, weight)| *weight)
    }

    pub fn contains(&self, code: &SubjectCode) -> bool {
        self.get(code).is_some()
    }

    pub fn max_weight(&self) -> f64 {
        self.0.iter().map(|(_, w)| *w).fold(0.0, f64::max)
    }

    pub fn weights_descending(&self) -> Vec<f64> {
        let mut weights: Vec<f64> = self.0.iter().map(|(_, w)| *w).collect();
        weights.sort_by(|a, b| b.total_cmp(a));
        weights
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: Vec<(&str, f64)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(code, weight)| (SubjectCode::new(code), weight))
                .collect(),
        )
    }
}

impl Serialize for WeightSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (code, weight) in &self.0 {
            map.serialize_entry(code, weight)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for WeightSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SetVisitor;

        impl<'de> Visitor<'de> for SetVisitor {
            type Value = WeightSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of subject code to weight, or null")
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(WeightSet::default())
            }

            fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(WeightSet::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((key, weight)) = access.next_entry::<SubjectCode, f64>()? {
                    entries.push((key, weight));
                }
                Ok(WeightSet(entries))
            }
        }

        deserializer.deserialize_any(SetVisitor)
    }
}

/// One admission programme as supplied by the dataset loader. Treated as
/// read-only input everywhere; the engine never mutates or persists records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgrammeRecord {
    pub code: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub full_title_en: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub requirement_compulsory: RequirementSet,
    #[serde(default)]
    pub requirement_optional_1: RequirementSet,
    #[serde(default)]
    pub requirement_optional_2: RequirementSet,
    #[serde(default)]
    pub level_5_bonus: bool,
    #[serde(default)]
    pub subject_compulsory: WeightSet,
    #[serde(default)]
    pub subject_optional_1: WeightSet,
    #[serde(default)]
    pub subject_optional_2: WeightSet,
    #[serde(default)]
    pub subject_free_number: f64,
    #[serde(default)]
    pub subject_free_weight: WeightSet,
    #[serde(default)]
    pub subject_weight_limit: Option<usize>,
    #[serde(default)]
    pub score_uq: Option<f64>,
    #[serde(default)]
    pub score_md: Option<f64>,
    #[serde(default)]
    pub score_lq: Option<f64>,
}

fn default_active() -> bool {
    true
}

impl ProgrammeRecord {
    /// A record with no admission statistic at all cannot be classified and
    /// is excluded from ranking.
    pub fn has_statistics(&self) -> bool {
        self.score_uq.is_some() || self.score_md.is_some() || self.score_lq.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirement_map_preserves_document_order_and_tags_wildcard() {
        let json = r#"{"CHI": 3, "ELE": 3, "BIO": 2}"#;
        let set: RequirementSet = serde_json::from_str(json).expect("requirement set");
        let entries: Vec<_> = set.iter().collect();
        assert_eq!(entries.len(), 3);
        assert!(matches!(
            entries[0],
            RequirementEntry::Subject { code, min_level } if code.as_str() == "CHI" && *min_level == 3.0
        ));
        assert!(matches!(
            entries[1],
            RequirementEntry::Wildcard { min_level } if *min_level == 3.0
        ));
        assert!(matches!(
            entries[2],
            RequirementEntry::Subject { code, .. } if code.as_str() == "BIO"
        ));
    }

    #[test]
    fn null_requirement_map_is_empty() {
        let set: RequirementSet = serde_json::from_str("null").expect("null requirement set");
        assert!(set.is_empty());
    }

    #[test]
    fn programme_record_parses_with_missing_optional_fields() {
        let json = r#"{
            "code": "JS1234",
            "institution": "The University of Hong Kong",
            "requirement_compulsory": {"CHI": 3, "ENG": 3},
            "subject_compulsory": {"CHI": 1, "ENG": 1},
            "subject_free_number": 2.5,
            "score_md": 21.5
        }"#;
        let record: ProgrammeRecord = serde_json::from_str(json).expect("programme record");
        assert!(record.active);
        assert!(record.requirement_optional_1.is_empty());
        assert_eq!(record.subject_weight_limit, None);
        assert_eq!(record.subject_free_number, 2.5);
        assert!(record.has_statistics());
    }

    #[test]
    fn record_without_quartiles_has_no_statistics() {
        let json = r#"{"code": "JS9999"}"#;
        let record: ProgrammeRecord = serde_json::from_str(json).expect("programme record");
        assert!(!record.has_statistics());
    }
}
