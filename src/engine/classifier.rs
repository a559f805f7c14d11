use crate::engine::Band;

/// Maps a composite score to a likelihood band using whichever historical
/// quartiles the programme carries. Bands are checked from 8 downwards; a
/// band is assigned as soon as any of its quartile conditions holds. The
/// offsets are fixed business constants.
pub fn classify(total: f64, uq: Option<f64>, md: Option<f64>, lq: Option<f64>) -> Band {
    let above_uq = |offset: f64| uq.is_some_and(|q| total >= q + offset);
    let above_md = |offset: f64| md.is_some_and(|q| total >= q + offset);
    let above_lq = |offset: f64| lq.is_some_and(|q| total >= q + offset);

    if above_uq(2.0) || above_md(8.0) || above_lq(16.0) {
        Band::GoldenTicket
    } else if above_uq(0.0) || above_md(6.0) || above_lq(12.0) {
        Band::Secure
    } else if (above_md(2.0) && above_lq(4.0)) || above_md(4.0) || above_lq(8.0) {
        Band::VerySafe
    } else if (above_md(0.0) && above_lq(2.0)) || above_md(2.0) || above_lq(4.0) {
        Band::Safe
    } else if (above_md(-1.0) && above_lq(1.0)) || above_md(0.0) || above_lq(2.0) {
        Band::Moderate
    } else if (above_md(-2.0) && above_lq(0.0)) || above_md(-1.0) || above_lq(1.0) {
        Band::Risky
    } else if above_md(-2.0) || above_lq(0.0) {
        Band::VeryRisky
    } else if above_md(-4.0) || above_lq(-2.0) {
        Band::Dangerous
    } else {
        Band::MissionImpossible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_quartiles_walk_the_ladder() {
        let (uq, md, lq) = (Some(20.0), Some(16.0), Some(12.0));
        assert_eq!(classify(22.0, uq, md, lq), Band::GoldenTicket);
        assert_eq!(classify(20.0, uq, md, lq), Band::Secure);
        assert_eq!(classify(19.0, uq, md, lq), Band::VerySafe);
        assert_eq!(classify(18.0, uq, md, lq), Band::VerySafe);
        assert_eq!(classify(16.5, uq, md, lq), Band::Safe);
        assert_eq!(classify(16.0, uq, md, lq), Band::Safe);
        assert_eq!(classify(15.5, uq, md, lq), Band::Moderate);
        assert_eq!(classify(14.0, uq, md, lq), Band::Moderate);
        assert_eq!(classify(13.5, uq, md, lq), Band::Risky);
        assert_eq!(classify(12.5, uq, md, lq), Band::VeryRisky);
        assert_eq!(classify(11.0, uq, md, lq), Band::Dangerous);
        assert_eq!(classify(9.0, uq, md, lq), Band::MissionImpossible);
    }

    #[test]
    fn median_only_thresholds() {
        let md = Some(16.0);
        assert_eq!(classify(24.0, None, md, None), Band::GoldenTicket);
        assert_eq!(classify(22.0, None, md, None), Band::Secure);
        assert_eq!(classify(20.0, None, md, None), Band::VerySafe);
        assert_eq!(classify(18.0, None, md, None), Band::Safe);
        assert_eq!(classify(16.0, None, md, None), Band::Moderate);
        assert_eq!(classify(15.0, None, md, None), Band::Risky);
        assert_eq!(classify(14.0, None, md, None), Band::VeryRisky);
        assert_eq!(classify(12.0, None, md, None), Band::Dangerous);
        assert_eq!(classify(11.0, None, md, None), Band::MissionImpossible);
    }

    #[test]
    fn lower_quartile_only_thresholds() {
        let lq = Some(12.0);
        assert_eq!(classify(28.0, None, None, lq), Band::GoldenTicket);
        assert_eq!(classify(24.0, None, None, lq), Band::Secure);
        assert_eq!(classify(20.0, None, None, lq), Band::VerySafe);
        assert_eq!(classify(16.0, None, None, lq), Band::Safe);
        assert_eq!(classify(14.0, None, None, lq), Band::Moderate);
        assert_eq!(classify(13.0, None, None, lq), Band::Risky);
        assert_eq!(classify(12.0, None, None, lq), Band::VeryRisky);
        assert_eq!(classify(10.0, None, None, lq), Band::Dangerous);
        assert_eq!(classify(9.0, None, None, lq), Band::MissionImpossible);
    }

    #[test]
    fn no_quartiles_fall_through_to_band_zero() {
        assert_eq!(classify(30.0, None, None, None), Band::MissionImpossible);
    }

    #[test]
    fn band_never_decreases_as_the_score_rises() {
        let (uq, md, lq) = (Some(20.0), Some(16.0), Some(12.0));
        let mut previous = Band::MissionImpossible;
        let mut total = 0.0;
        while total <= 30.0 {
            let band = classify(total, uq, md, lq);
            assert!(band >= previous, "band inversion at total {total}");
            previous = band;
            total += 0.25;
        }
    }
}
