//! Rule-based checks of an environment against the species threshold boxes.

use crate::genes::GeneType;
use crate::thresholds::{SpeciesThresholds, ThresholdProfile};
use ecobee_protocol::{EnvironmentFactor, EnvironmentParameters};

pub fn find_matching_species<'a>(
    env: &EnvironmentParameters,
    thresholds: &'a ThresholdProfile,
) -> Option<&'a str> {
    thresholds
        .iter()
        .find(|entry| {
            EnvironmentFactor::ALL
                .into_iter()
                .all(|factor| entry.ranges.accepts(env, factor))
        })
        .map(|entry| entry.species.as_str())
}

pub fn in_range_count(env: &EnvironmentParameters, entry: &SpeciesThresholds) -> usize {
    EnvironmentFactor::ALL
        .into_iter()
        .filter(|factor| entry.ranges.accepts(env, *factor))
        .count()
}

/// Species with the most in-range parameters; earlier entries win ties.
pub fn closest_species<'a>(
    env: &EnvironmentParameters,
    thresholds: &'a ThresholdProfile,
) -> Option<&'a SpeciesThresholds> {
    let mut best: Option<(&SpeciesThresholds, usize)> = None;
    for entry in thresholds.iter() {
        let score = in_range_count(env, entry);
        if best.map(|(_, b)| score > b).unwrap_or(true) {
            best = Some((entry, score));
        }
    }
    best.map(|(entry, _)| entry)
}

pub fn mutation_targets(
    env: &EnvironmentParameters,
    thresholds: &ThresholdProfile,
) -> Vec<GeneType> {
    let Some(closest) = closest_species(env, thresholds) else {
        return vec![];
    };
    EnvironmentFactor::ALL
        .into_iter()
        .filter(|factor| !closest.ranges.accepts(env, *factor))
        .map(GeneType::for_factor)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thresholds::{SpeciesRanges, ThresholdRange};

    fn ranges(t: (f64, f64), h: (f64, f64), f: (f64, f64)) -> SpeciesRanges {
        SpeciesRanges {
            temperature: ThresholdRange::from(t),
            humidity: ThresholdRange::from(h),
            flowers: ThresholdRange::from(f),
        }
    }

    fn profile() -> ThresholdProfile {
        let mut p = ThresholdProfile::default();
        p.push("Apis_x", ranges((20.0, 30.0), (40.0, 60.0), (5.0, 10.0)));
        p.push("Apis_y", ranges((25.0, 35.0), (40.0, 60.0), (5.0, 10.0)));
        p.push("Apis_z", ranges((0.0, 10.0), (80.0, 90.0), (0.0, 2.0)));
        p
    }

    #[test]
    fn test_match_first_declared() {
        let p = profile();
        let env = EnvironmentParameters::new(27.0, 50.0, 7.0);
        assert_eq!(find_matching_species(&env, &p), Some("Apis_x"));
        let env = EnvironmentParameters::new(33.0, 50.0, 7.0);
        assert_eq!(find_matching_species(&env, &p), Some("Apis_y"));
    }

    #[test]
    fn test_match_inclusive_bounds() {
        let p = profile();
        let env = EnvironmentParameters::new(20.0, 60.0, 5.0);
        assert_eq!(find_matching_species(&env, &p), Some("Apis_x"));
    }

    #[test]
    fn test_no_match() {
        let p = profile();
        let env = EnvironmentParameters::new(50.0, 50.0, 7.0);
        assert_eq!(find_matching_species(&env, &p), None);
        assert_eq!(find_matching_species(&env, &ThresholdProfile::default()), None);
    }

    #[test]
    fn test_targets_single_factor() {
        let p = profile();
        let env = EnvironmentParameters::new(50.0, 50.0, 7.0);
        assert_eq!(closest_species(&env, &p).unwrap().species, "Apis_x");
        assert_eq!(mutation_targets(&env, &p), vec![GeneType::Hsp90]);
    }

    #[test]
    fn test_targets_fixed_order() {
        let p = profile();
        let env = EnvironmentParameters::new(50.0, 0.0, 100.0);
        // Nothing in range anywhere: first declared species is closest.
        assert_eq!(closest_species(&env, &p).unwrap().species, "Apis_x");
        assert_eq!(
            mutation_targets(&env, &p),
            vec![GeneType::Hsp90, GeneType::Aqp, GeneType::Or]
        );
    }

    #[test]
    fn test_targets_higher_count_wins_over_order() {
        let p = profile();
        let env = EnvironmentParameters::new(5.0, 85.0, 7.0);
        assert_eq!(closest_species(&env, &p).unwrap().species, "Apis_z");
        assert_eq!(mutation_targets(&env, &p), vec![GeneType::Or]);
    }

    #[test]
    fn test_targets_empty_iff_closest_box_contains_input() {
        let p = profile();
        let inside = EnvironmentParameters::new(25.0, 50.0, 7.0);
        assert!(mutation_targets(&inside, &p).is_empty());
        assert!(find_matching_species(&inside, &p).is_some());
        let outside = EnvironmentParameters::new(25.0, 61.0, 7.0);
        assert!(!mutation_targets(&outside, &p).is_empty());
        assert!(mutation_targets(&inside, &ThresholdProfile::default()).is_empty());
    }
}
