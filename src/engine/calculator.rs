use crate::programme::prestige::{HKUST, POLYU};
use crate::programme::{ProgrammeRecord, WeightSet};
use crate::scores::{apply_level_5_bonus, ScoreMap, SubjectCode};

use std::collections::BTreeSet;

/// Result of the composite-score computation. `Ineligible` means a required
/// weighted subject was missing; it is a normal outcome, not an error, and
/// is distinct from a valid low score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreOutcome {
    Ineligible,
    Score(f64),
}

/// Institution-specific scoring carve-outs, resolved once at the calculator
/// boundary so the main path stays free of institution-name conditionals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BonusPolicy {
    /// Top-N free subjects plus a fractional partial bonus.
    Standard,
    /// Partial bonus withheld when the next candidate sits below level 3.
    PartialBonusFloor,
    /// Aggregate top-up formula over a theoretical full-score ceiling.
    AggregateTopUp,
}

impl BonusPolicy {
    fn for_institution(institution: &str) -> Self {
        if institution == HKUST {
            Self::AggregateTopUp
        } else if institution == POLYU {
            Self::PartialBonusFloor
        } else {
            Self::Standard
        }
    }
}

/// Computes the programme-specific weighted composite score. The caller is
/// expected to have run the requirement gates first.
pub fn composite_score(scores: &ScoreMap, programme: &ProgrammeRecord) -> ScoreOutcome {
    let mut scores = scores.clone();
    if programme.level_5_bonus {
        apply_level_5_bonus(&mut scores);
    }

    let mut total = 0.0;
    let mut used: BTreeSet<SubjectCode> = BTreeSet::new();

    // Compulsory weighted subjects; any one missing makes the programme
    // unscorable for this student.
    for (subject, weight) in programme.subject_compulsory.iter() {
        match scores.get(subject) {
            Some(level) => {
                total += level * weight;
                used.insert(subject.clone());
            }
            None => return ScoreOutcome::Ineligible,
        }
    }

    for slot in [&programme.subject_optional_1, &programme.subject_optional_2] {
        if slot.is_empty() {
            continue;
        }
        match best_weighted_candidate(&scores, slot, &used) {
            Some((subject, weighted)) => {
                total += weighted;
                used.insert(subject);
            }
            None => return ScoreOutcome::Ineligible,
        }
    }

    total += free_subject_contribution(&scores, programme, &mut used);

    ScoreOutcome::Score(round_2dp(total))
}

/// Best remaining `level x weight` candidate for an optional slot. First
/// strictly greater candidate in document order wins; a best of 0 means no
/// candidate qualifies.
fn best_weighted_candidate(
    scores: &ScoreMap,
    slot: &WeightSet,
    used: &BTreeSet<SubjectCode>,
) -> Option<(SubjectCode, f64)> {
    let mut best: Option<(SubjectCode, f64)> = None;
    for (subject, weight) in slot.iter() {
        if used.contains(subject) {
            continue;
        }
        let Some(level) = scores.get(subject) else {
            continue;
        };
        let weighted = level * weight;
        if weighted > best.as_ref().map_or(0.0, |(_, value)| *value) {
            best = Some((subject.clone(), weighted));
        }
    }
    best
}

fn free_subject_contribution(
    scores: &ScoreMap,
    programme: &ProgrammeRecord,
    used: &mut BTreeSet<SubjectCode>,
) -> f64 {
    let free_weights = &programme.subject_free_weight;
    let mut total = 0.0;

    // Candidate pools: weighted values, and (under a weight limit) the raw
    // values plus each candidate's bonus magnitude.
    let mut pool: Vec<(SubjectCode, f64)> = Vec::new();
    let mut raw_pool: Vec<(SubjectCode, f64)> = Vec::new();
    let mut extras: Vec<(SubjectCode, f64)> = Vec::new();

    // MBO pairing: the better of basic and extended mathematics enters the
    // pool as a single candidate, consuming both underlying subjects. It
    // never participates in the weight-limit carve-out.
    let mbo = SubjectCode::new("MBO");
    if free_weights.contains(&mbo) {
        let mat = SubjectCode::mathematics();
        let mep = SubjectCode::extended_mathematics();
        let mat_value = scores
            .get(&mat)
            .zip(free_weights.get(&mbo))
            .map_or(0.0, |(level, weight)| level * weight);
        let mep_value = scores
            .get(&mep)
            .zip(free_weights.get(&mep))
            .map_or(0.0, |(level, weight)| level * weight);
        pool.push((mbo, mat_value.max(mep_value)));
        used.insert(mat);
        used.insert(mep);
    }

    for (subject, level) in scores.iter() {
        if used.contains(subject) {
            continue;
        }
        let weighted = free_weights
            .get(subject)
            .map_or(*level, |weight| level * weight);
        pool.push((subject.clone(), weighted));
        if programme.subject_weight_limit.is_some() {
            raw_pool.push((subject.clone(), *level));
            extras.push((subject.clone(), weighted - level));
        }
    }

    let mut top_n = (programme.subject_free_number.floor() as usize).min(pool.len());

    if let Some(limit) = programme.subject_weight_limit {
        // Only the top-`limit` candidates by bonus magnitude keep their
        // weighted values; the rest of the pool reverts to raw levels.
        extras.sort_by(|a, b| b.1.total_cmp(&a.1));
        for (subject, _) in extras.iter().take(limit) {
            if let Some((_, weighted)) = pool.iter().find(|(code, _)| code == subject) {
                total += weighted;
            }
            raw_pool.retain(|(code, _)| code != subject);
        }
        pool = raw_pool;
        top_n = top_n.saturating_sub(limit);
    }

    let mut values: Vec<f64> = pool.into_iter().map(|(_, value)| value).collect();
    values.sort_by(|a, b| b.total_cmp(a));

    match BonusPolicy::for_institution(&programme.institution) {
        BonusPolicy::AggregateTopUp => {
            total += aggregate_top_up(&values, top_n, programme);
        }
        policy => {
            total += values.iter().take(top_n).sum::<f64>();
            let bonus_rate = programme.subject_free_number.fract();
            if bonus_rate > 0.0 {
                if let Some(next) = values.get(top_n) {
                    let withheld = policy == BonusPolicy::PartialBonusFloor && *next < 3.0;
                    if !withheld {
                        total += next * bonus_rate;
                    }
                }
            }
        }
    }

    total
}

/// Aggregate top-up formula: score each of the top `top_n + 1` free values
/// as "sum of the others plus a percentage of the theoretical full-score
/// ceiling keyed by that value's bonus tier", and keep the best.
fn aggregate_top_up(values: &[f64], top_n: usize, programme: &ProgrammeRecord) -> f64 {
    let limit = programme.subject_weight_limit.unwrap_or(0);

    let mut ceiling: f64 = programme.subject_compulsory.iter().map(|(_, w)| w).sum();
    ceiling += programme.subject_optional_1.max_weight();
    ceiling += programme.subject_optional_2.max_weight();
    ceiling += programme
        .subject_free_weight
        .weights_descending()
        .iter()
        .take(limit)
        .sum::<f64>();
    ceiling += programme.subject_free_number - limit as f64;
    ceiling *= 8.5;

    let considered = &values[..values.len().min(top_n + 1)];
    let sum: f64 = considered.iter().sum();
    let mut best = 0.0;
    for value in considered {
        let candidate = sum - value + (ceiling * bonus_tier(*value)).floor();
        if candidate > best {
            best = candidate;
        }
    }
    best
}

/// Bonus percentage per level tier, keyed at one decimal place.
fn bonus_tier(value: f64) -> f64 {
    let keyed = (value * 10.0).round() / 10.0;
    if keyed == 8.5 {
        0.05
    } else if keyed == 7.0 {
        0.0412
    } else if keyed == 5.5 {
        0.0324
    } else if keyed == 4.0 {
        0.0235
    } else if keyed == 3.0 {
        0.0176
    } else {
        0.0
    }
}

fn round_2dp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
