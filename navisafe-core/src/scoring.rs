//! Safety scoring
//!
//! Maps the set of zones containing a position to an integer score in
//! [0, 100]. Candidates are combined set-wise so the result never depends on
//! catalog order.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Position, ZoneCatalog, ZoneKind};

/// Integer safety score in [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SafetyScore(u8);

impl SafetyScore {
    pub const MIN: SafetyScore = SafetyScore(0);
    pub const MAX: SafetyScore = SafetyScore(100);

    /// Clamp and round an arbitrary value into a score
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            return Self::MIN;
        }
        Self(value.clamp(0.0, 100.0).round() as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for SafetyScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tunable score constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreThresholds {
    /// Starting score before any zone is considered
    pub base: f64,
    /// Candidate for safe zones (max)
    pub safe: f64,
    /// Candidate for caution zones (min)
    pub caution: f64,
    /// Candidate for crowded zones (min)
    pub crowded: f64,
    /// Candidate for restricted zones (min), also the override
    pub restricted: f64,
    /// Safe combined with caution or crowded
    pub mixed: f64,
    /// Outside every zone
    pub outside: f64,
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        Self {
            base: 50.0,
            safe: 95.0,
            caution: 65.0,
            crowded: 70.0,
            restricted: 15.0,
            mixed: 75.0,
            outside: 60.0,
        }
    }
}

impl ScoreThresholds {
    fn candidate(&self, kind: ZoneKind) -> f64 {
        match kind {
            ZoneKind::Safe => self.safe,
            ZoneKind::Caution => self.caution,
            ZoneKind::Crowded => self.crowded,
            ZoneKind::Restricted => self.restricted,
        }
    }
}

/// Score a position against the catalog
pub fn score(position: &Position, catalog: &ZoneCatalog, thresholds: &ScoreThresholds) -> SafetyScore {
    score_kinds(catalog.containing(position).map(|z| z.kind), thresholds)
}

/// Score an already-computed membership, given as the kinds of the
/// containing zones (duplicates allowed, order irrelevant)
pub fn score_kinds<I>(kinds: I, thresholds: &ScoreThresholds) -> SafetyScore
where
    I: IntoIterator<Item = ZoneKind>,
{
    let mut in_safe = false;
    let mut in_caution = false;
    let mut in_crowded = false;
    let mut in_restricted = false;
    let mut lowest: Option<f64> = None;

    for kind in kinds {
        match kind {
            ZoneKind::Safe => in_safe = true,
            ZoneKind::Caution => in_caution = true,
            ZoneKind::Crowded => in_crowded = true,
            ZoneKind::Restricted => in_restricted = true,
        }
        if kind != ZoneKind::Safe {
            let c = thresholds.candidate(kind);
            lowest = Some(lowest.map_or(c, |l| l.min(c)));
        }
    }

    let value = if in_restricted {
        thresholds.restricted
    } else if in_safe && !in_caution && !in_crowded {
        thresholds.safe
    } else if in_safe {
        thresholds.mixed
    } else if !in_caution && !in_crowded {
        thresholds.outside
    } else {
        // Caution/crowded without any safe zone: the base held down by the
        // lowest candidate.
        let base = thresholds.base;
        lowest.map_or(base, |l| base.min(l))
    };

    SafetyScore::from_f64(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Zone;
    use ZoneKind::*;

    fn t() -> ScoreThresholds {
        ScoreThresholds::default()
    }

    #[test]
    fn test_priority_rules() {
        assert_eq!(score_kinds(Vec::<ZoneKind>::new(), &t()).value(), 60);
        assert_eq!(score_kinds([Safe], &t()).value(), 95);
        assert_eq!(score_kinds([Safe, Safe], &t()).value(), 95);
        assert_eq!(score_kinds([Safe, Caution], &t()).value(), 75);
        assert_eq!(score_kinds([Crowded, Safe], &t()).value(), 75);
        assert_eq!(score_kinds([Caution], &t()).value(), 50);
        assert_eq!(score_kinds([Crowded], &t()).value(), 50);
        assert_eq!(score_kinds([Restricted], &t()).value(), 15);
        assert_eq!(score_kinds([Safe, Caution, Crowded, Restricted], &t()).value(), 15);
    }

    #[test]
    fn test_order_independent() {
        let kinds = [Safe, Caution, Crowded, Restricted];
        // Every rotation and its reverse
        for i in 0..kinds.len() {
            let mut v = kinds.to_vec();
            v.rotate_left(i);
            let forward = score_kinds(v.clone(), &t());
            v.reverse();
            assert_eq!(forward, score_kinds(v, &t()));
        }

        for pair in [[Caution, Crowded], [Crowded, Caution], [Safe, Crowded], [Crowded, Safe]] {
            let mut rev = pair;
            rev.reverse();
            assert_eq!(score_kinds(pair, &t()), score_kinds(rev, &t()));
        }
    }

    #[test]
    fn test_custom_thresholds_clamped() {
        let thresholds = ScoreThresholds {
            safe: 140.0,
            outside: -20.0,
            ..Default::default()
        };
        assert_eq!(score_kinds([Safe], &thresholds), SafetyScore::MAX);
        assert_eq!(score_kinds(Vec::<ZoneKind>::new(), &thresholds), SafetyScore::MIN);
    }

    #[test]
    fn test_caution_below_base_uses_candidate() {
        let thresholds = ScoreThresholds {
            caution: 40.0,
            ..Default::default()
        };
        assert_eq!(score_kinds([Caution, Crowded], &thresholds).value(), 40);
    }

    #[test]
    fn test_score_rounding() {
        assert_eq!(SafetyScore::from_f64(74.5).value(), 75);
        assert_eq!(SafetyScore::from_f64(74.49).value(), 74);
        assert_eq!(SafetyScore::from_f64(f64::NAN), SafetyScore::MIN);
    }

    #[test]
    fn test_score_against_catalog() {
        let catalog = ZoneCatalog::embedded().unwrap();

        let central = Position::new(31.7086, 76.5270, None).unwrap();
        assert_eq!(score(&central, &catalog, &t()).value(), 95);

        let restricted = Position::new(31.7166, 76.5270, None).unwrap();
        assert_eq!(score(&restricted, &catalog, &t()).value(), 15);

        let nowhere = Position::new(0.0, 0.0, None).unwrap();
        assert_eq!(score(&nowhere, &catalog, &t()).value(), 60);

        let caution = Position::new(31.7116, 76.5320, None).unwrap();
        assert_eq!(score(&caution, &catalog, &t()).value(), 50);
    }

    #[test]
    fn test_restricted_overrides_overlap() {
        let catalog = ZoneCatalog::new(vec![
            Zone::new("safe", "Safe", 0.0, 0.0, 1_000.0, Safe),
            Zone::new("crowd", "Crowd", 0.0, 0.0, 1_000.0, Crowded),
            Zone::new("red", "Red", 0.0, 0.0, 200.0, Restricted),
        ])
        .unwrap();

        let inside_all = Position::new(0.0, 0.0, None).unwrap();
        assert_eq!(score(&inside_all, &catalog, &t()).value(), 15);

        // ~556 m north: safe + crowded only
        let mixed = Position::new(0.005, 0.0, None).unwrap();
        assert_eq!(score(&mixed, &catalog, &t()).value(), 75);
    }
}
