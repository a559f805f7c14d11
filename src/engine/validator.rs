use crate::programme::{ProgrammeRecord, RequirementEntry, RequirementSet};
use crate::scores::{ScoreMap, SubjectCode};

/// Checks the compulsory and both optional admission gates. All three must
/// pass; an empty requirement structure always passes its gate.
pub fn fulfils_requirements(scores: &ScoreMap, programme: &ProgrammeRecord) -> bool {
    if !compulsory_gate(scores, &programme.requirement_compulsory) {
        return false;
    }
    let Some(elective_used) = optional_1_gate(scores, &programme.requirement_optional_1) else {
        return false;
    };
    optional_2_gate(scores, &programme.requirement_optional_2, &elective_used)
}

fn compulsory_gate(scores: &ScoreMap, requirements: &RequirementSet) -> bool {
    requirements.iter().all(|entry| match entry {
        RequirementEntry::Subject { code, min_level } => {
            scores.get(code).is_some_and(|level| level >= min_level)
        }
        // The dataset never puts a wildcard in the compulsory structure;
        // treat one as satisfied by any qualifying elective.
        RequirementEntry::Wildcard { min_level } => {
            find_elective(scores, *min_level, None).is_some()
        }
    })
}

/// Outcome of the first optional gate: `Some(consumed)` when fulfilled,
/// where `consumed` names the elective the gate used up, if any.
fn optional_1_gate(scores: &ScoreMap, requirements: &RequirementSet) -> Option<Consumed> {
    if requirements.is_empty() {
        return Some(Consumed::None);
    }

    let mut fulfilled = false;
    let mut elective_used: Option<SubjectCode> = None;
    for entry in requirements.iter() {
        match entry {
            // A wildcard match does not stop the scan; a later named entry
            // may still take over as the consumed elective.
            RequirementEntry::Wildcard { min_level } => {
                if let Some(elective) = find_elective(scores, *min_level, None) {
                    fulfilled = true;
                    elective_used = Some(elective);
                }
            }
            RequirementEntry::Subject { code, min_level } => {
                if scores.get(code).is_some_and(|level| level >= min_level) {
                    fulfilled = true;
                    // Mathematics may satisfy the gate, but only with a
                    // corroborating elective; it is not consumed itself.
                    if code != &SubjectCode::mathematics() {
                        elective_used = Some(code.clone());
                        break;
                    }
                }
            }
        }
    }

    if fulfilled && elective_used.is_none() {
        // MAT carried the gate: some other non-core elective must reach
        // level 3, and that elective is the one consumed.
        elective_used = find_elective(scores, 3.0, None);
        if elective_used.is_none() {
            return None;
        }
    }

    if fulfilled {
        Some(match elective_used {
            Some(code) => Consumed::Elective(code),
            None => Consumed::None,
        })
    } else {
        None
    }
}

fn optional_2_gate(scores: &ScoreMap, requirements: &RequirementSet, consumed: &Consumed) -> bool {
    if requirements.is_empty() {
        return true;
    }
    requirements.iter().any(|entry| match entry {
        // A wildcard must use a different elective from the one the first
        // gate consumed; double-counting one subject across both gates is
        // not allowed.
        RequirementEntry::Wildcard { min_level } => {
            find_elective(scores, *min_level, consumed.subject()).is_some()
        }
        // Named subjects may reuse the consumed elective.
        RequirementEntry::Subject { code, min_level } => {
            scores.get(code).is_some_and(|level| level >= min_level)
        }
    })
}

/// Elective consumed by the first optional gate, if any.
#[derive(Debug, Clone, PartialEq)]
enum Consumed {
    None,
    Elective(SubjectCode),
}

impl Consumed {
    fn subject(&self) -> Option<&SubjectCode> {
        match self {
            Self::None => None,
            Self::Elective(code) => Some(code),
        }
    }
}

/// First non-core subject (in sorted subject order) at or above `min_level`,
/// skipping `exclude` when given.
fn find_elective(
    scores: &ScoreMap,
    min_level: f64,
    exclude: Option<&SubjectCode>,
) -> Option<SubjectCode> {
    scores
        .iter()
        .find(|(code, level)| {
            !code.is_core() && Some(*code) != exclude && **level >= min_level
        })
        .map(|(code, _)| code.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programme::RequirementEntry;
    use crate::scores::normalize_scores;

    fn subject(code: &str, min_level: f64) -> RequirementEntry {
        RequirementEntry::Subject {
            code: SubjectCode::new(code),
            min_level,
        }
    }

    fn wildcard(min_level: f64) -> RequirementEntry {
        RequirementEntry::Wildcard { min_level }
    }

    fn programme(
        compulsory: Vec<RequirementEntry>,
        optional_1: Vec<RequirementEntry>,
        optional_2: Vec<RequirementEntry>,
    ) -> ProgrammeRecord {
        let mut record: ProgrammeRecord =
            serde_json::from_str(r#"{"code": "JS0000", "score_md": 1.0}"#).expect("record");
        record.requirement_compulsory = RequirementSet::from_entries(compulsory);
        record.requirement_optional_1 = RequirementSet::from_entries(optional_1);
        record.requirement_optional_2 = RequirementSet::from_entries(optional_2);
        record
    }

    #[test]
    fn empty_requirements_pass() {
        let record = programme(vec![], vec![], vec![]);
        let scores = normalize_scores([("CHI", "3")]);
        assert!(fulfils_requirements(&scores, &record));
    }

    #[test]
    fn compulsory_shortfall_fails() {
        let record = programme(vec![subject("CHI", 3.0), subject("ENG", 3.0)], vec![], vec![]);
        let scores = normalize_scores([("CHI", "3"), ("ENG", "2")]);
        assert!(!fulfils_requirements(&scores, &record));
    }

    #[test]
    fn compulsory_missing_subject_fails() {
        let record = programme(vec![subject("CHI", 3.0)], vec![], vec![]);
        let scores = normalize_scores([("ENG", "5")]);
        assert!(!fulfils_requirements(&scores, &record));
    }

    #[test]
    fn wildcard_ignores_core_subjects() {
        let record = programme(vec![], vec![wildcard(3.0)], vec![]);
        let only_core = normalize_scores([("CHI", "5"), ("ENG", "5"), ("MAT", "5")]);
        assert!(!fulfils_requirements(&only_core, &record));
        let with_elective = normalize_scores([("CHI", "5"), ("BIO", "3")]);
        assert!(fulfils_requirements(&with_elective, &record));
    }

    #[test]
    fn mat_needs_a_corroborating_elective() {
        let record = programme(vec![], vec![subject("MAT", 2.0)], vec![]);
        let mat_alone = normalize_scores([("MAT", "5"), ("BIO", "2")]);
        assert!(!fulfils_requirements(&mat_alone, &record));
        let corroborated = normalize_scores([("MAT", "5"), ("BIO", "3")]);
        assert!(fulfils_requirements(&corroborated, &record));
    }

    #[test]
    fn second_wildcard_needs_a_different_elective() {
        let record = programme(vec![], vec![wildcard(3.0)], vec![wildcard(3.0)]);
        let one_elective = normalize_scores([("BIO", "5")]);
        assert!(!fulfils_requirements(&one_elective, &record));
        let two_electives = normalize_scores([("BIO", "5"), ("PHY", "3")]);
        assert!(fulfils_requirements(&two_electives, &record));
    }

    #[test]
    fn named_second_requirement_may_reuse_the_elective() {
        let record = programme(vec![], vec![wildcard(3.0)], vec![subject("BIO", 3.0)]);
        let scores = normalize_scores([("BIO", "4")]);
        assert!(fulfils_requirements(&scores, &record));
    }

    #[test]
    fn named_non_mat_match_stops_the_scan() {
        // CHE satisfies the named entry, so the wildcard after it is never
        // needed; optional-2's wildcard must then avoid CHE.
        let record = programme(
            vec![],
            vec![subject("CHE", 3.0), wildcard(2.0)],
            vec![wildcard(2.0)],
        );
        let scores = normalize_scores([("CHE", "4"), ("BIO", "2")]);
        assert!(fulfils_requirements(&scores, &record));
        let che_only = normalize_scores([("CHE", "4")]);
        assert!(!fulfils_requirements(&che_only, &record));
    }
}
