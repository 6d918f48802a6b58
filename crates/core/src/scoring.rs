//! Score arithmetic and band lookup.

use crate::model::{BandScore, SectionResult};

/// Band assigned when no table entry contains the total score.
pub const DEFAULT_BAND: u8 = 1;

/// Level assigned when the matched band does not yield one.
pub const DEFAULT_LEVEL: &str = "Beginner";

pub const DEFAULT_RECOMMENDATION: &str =
    "Start with the foundation course to build core skills in every area.";

/// Separator between the level and the rest of a band description,
/// e.g. `"Intermediate - keep going"`.
pub const LEVEL_DELIMITER: &str = " - ";

/// Percentage of correct answers. An empty question bank scores 0.
#[must_use]
pub fn section_score(correct: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    100.0 * f64::from(correct) / f64::from(total)
}

/// Unweighted mean of section scores; 0 with no results.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn total_score(results: &[SectionResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().map(|r| r.score).sum::<f64>() / results.len() as f64
}

/// Band, level and recommendation resolved for a total score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandResolution {
    pub band: u8,
    pub level: String,
    pub recommendation: String,
}

impl Default for BandResolution {
    fn default() -> Self {
        Self {
            band: DEFAULT_BAND,
            level: DEFAULT_LEVEL.to_owned(),
            recommendation: DEFAULT_RECOMMENDATION.to_owned(),
        }
    }
}

/// Level for a matched band: the explicit label if set, otherwise the text
/// before the first `" - "` in the description.
fn level_for(band: &BandScore) -> Option<String> {
    if let Some(level) = band.level.as_deref().map(str::trim) {
        if !level.is_empty() {
            return Some(level.to_owned());
        }
    }
    band.description
        .split_once(LEVEL_DELIMITER)
        .map(|(level, _)| level.trim())
        .filter(|level| !level.is_empty())
        .map(str::to_owned)
}

/// Pick the first table entry (in stored order) whose inclusive range
/// contains `score`.
#[must_use]
pub fn resolve_band(table: &[BandScore], score: f64) -> BandResolution {
    let Some(matched) = table.iter().find(|b| b.contains(score)) else {
        return BandResolution::default();
    };

    BandResolution {
        band: matched.band,
        level: level_for(matched).unwrap_or_else(|| DEFAULT_LEVEL.to_owned()),
        recommendation: matched.description.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SectionType;
    use crate::time::fixed_now;

    fn result(score: f64) -> SectionResult {
        SectionResult {
            section_type: SectionType::Grammar,
            total_questions: 0,
            correct_answers: 0,
            score,
            passed: false,
            time_spent: 0,
            submitted_at: fixed_now(),
        }
    }

    fn table() -> Vec<BandScore> {
        vec![
            BandScore::new(1, 0.0, 49.0, "Beginner - start here"),
            BandScore::new(2, 50.0, 100.0, "Intermediate - keep going"),
        ]
    }

    #[test]
    fn total_is_unweighted_mean() {
        assert_eq!(total_score(&[]), 0.0);
        assert_eq!(total_score(&[result(100.0), result(50.0)]), 75.0);
    }

    #[test]
    fn section_score_handles_empty_bank() {
        assert_eq!(section_score(0, 0), 0.0);
        assert_eq!(section_score(1, 4), 25.0);
    }

    #[test]
    fn resolves_matching_band_with_parsed_level() {
        let band = resolve_band(&table(), 75.0);
        assert_eq!(band.band, 2);
        assert_eq!(band.level, "Intermediate");
        assert_eq!(band.recommendation, "Intermediate - keep going");
    }

    #[test]
    fn bounds_are_inclusive_and_first_match_wins() {
        assert_eq!(resolve_band(&table(), 49.0).band, 1);
        assert_eq!(resolve_band(&table(), 50.0).band, 2);

        let overlapping = vec![
            BandScore::new(3, 0.0, 100.0, "Catch all - first"),
            BandScore::new(4, 50.0, 100.0, "Later - ignored"),
        ];
        assert_eq!(resolve_band(&overlapping, 80.0).band, 3);
    }

    #[test]
    fn falls_back_to_default_when_nothing_matches() {
        assert_eq!(resolve_band(&table(), 49.5), BandResolution::default());
        assert_eq!(resolve_band(&[], 80.0), BandResolution::default());
    }

    #[test]
    fn description_without_delimiter_keeps_default_level() {
        let t = vec![BandScore::new(5, 0.0, 100.0, "Advanced")];
        let band = resolve_band(&t, 90.0);
        assert_eq!(band.band, 5);
        assert_eq!(band.level, DEFAULT_LEVEL);
        assert_eq!(band.recommendation, "Advanced");
    }

    #[test]
    fn explicit_level_takes_precedence() {
        let t = vec![BandScore::new(3, 0.0, 100.0, "Upper - polish fluency").with_level("B2")];
        assert_eq!(resolve_band(&t, 10.0).level, "B2");
    }
}
