//! Tests for the leveling engine.

use proptest::prelude::*;

use super::*;

fn hundred_per_level() -> LevelCurve {
    LevelCurve::linear(100).expect("valid curve")
}

fn curve_strategy() -> impl Strategy<Value = LevelCurve> {
    prop_oneof![
        (1u64..1_000).prop_map(|base| LevelCurve::linear(base).expect("valid base")),
        (1u64..1_000).prop_map(|base| LevelCurve::quadratic(base).expect("valid base")),
        (1u64..1_000, 2u64..5).prop_map(|(base, factor)| {
            LevelCurve::exponential(base, factor).expect("valid parameters")
        }),
    ]
}

#[test]
fn test_linear_thresholds_match_worked_example() {
    let curve = hundred_per_level();

    assert_eq!(curve.cumulative_xp_for_level(1).unwrap(), 0);
    assert_eq!(curve.cumulative_xp_for_level(2).unwrap(), 100);
    assert_eq!(curve.cumulative_xp_for_level(3).unwrap(), 300);
    assert_eq!(curve.cumulative_xp_for_level(4).unwrap(), 600);

    assert_eq!(curve.level_from_xp(0), 1);
    assert_eq!(curve.level_from_xp(99), 1);
    assert_eq!(curve.level_from_xp(100), 2);
    assert_eq!(curve.level_from_xp(299), 2);
    assert_eq!(curve.level_from_xp(300), 3);
}

#[test]
fn test_default_curve_is_quadratic() {
    let curve = LevelCurve::default();

    assert_eq!(curve.xp_required_for_level(1).unwrap(), 100);
    assert_eq!(curve.xp_required_for_level(2).unwrap(), 400);
    assert_eq!(curve.cumulative_xp_for_level(3).unwrap(), 500);
    assert_eq!(curve.cumulative_xp_for_level(5).unwrap(), 3_000);
    assert_eq!(curve.level_from_xp(2_999), 4);
    assert_eq!(curve.level_from_xp(3_000), 5);
}

#[test]
fn test_exponential_thresholds() {
    let curve = LevelCurve::exponential(50, 2).unwrap();

    assert_eq!(curve.xp_required_for_level(1).unwrap(), 50);
    assert_eq!(curve.xp_required_for_level(3).unwrap(), 200);
    assert_eq!(curve.cumulative_xp_for_level(4).unwrap(), 350);
    assert_eq!(curve.level_from_xp(349), 3);
    assert_eq!(curve.level_from_xp(350), 4);
}

#[test]
fn test_level_zero_is_rejected() {
    let curve = hundred_per_level();

    assert_eq!(
        curve.xp_required_for_level(0),
        Err(LevelingError::InvalidLevel { level: 0 })
    );
    assert_eq!(
        curve.cumulative_xp_for_level(0),
        Err(LevelingError::InvalidLevel { level: 0 })
    );
}

#[test]
fn test_invalid_curve_parameters_are_rejected() {
    assert!(matches!(
        LevelCurve::linear(0),
        Err(LevelingError::InvalidCurve { .. })
    ));
    assert!(matches!(
        LevelCurve::quadratic(0),
        Err(LevelingError::InvalidCurve { .. })
    ));
    assert!(matches!(
        LevelCurve::exponential(10, 1),
        Err(LevelingError::InvalidCurve { .. })
    ));
    assert!(matches!(
        LevelCurve::exponential(10, 0),
        Err(LevelingError::InvalidCurve { .. })
    ));
    assert!(matches!(
        LevelCurve::exponential(0, 2),
        Err(LevelingError::InvalidCurve { .. })
    ));
}

#[test]
fn test_stored_values_fail_fast() {
    assert_eq!(xp_from_stored(42), Ok(42));
    assert_eq!(xp_from_stored(-1), Err(LevelingError::NegativeXp { xp: -1 }));
    assert_eq!(level_from_stored(3), Ok(3));
    assert_eq!(
        level_from_stored(0),
        Err(LevelingError::InvalidLevel { level: 0 })
    );
    assert_eq!(
        level_from_stored(-7),
        Err(LevelingError::InvalidLevel { level: -7 })
    );
}

#[test]
fn test_max_xp_is_total_for_every_shape() {
    let curves = [
        LevelCurve::linear(1).unwrap(),
        LevelCurve::quadratic(1).unwrap(),
        LevelCurve::exponential(1, 2).unwrap(),
        LevelCurve::default(),
    ];
    for curve in curves {
        let level = curve.level_from_xp(u64::MAX);
        assert!(curve.cumulative_xp_for_level(level).is_ok());
        match curve.cumulative_xp_for_level(level + 1) {
            Ok(next) => panic!("level {} at {next} should be unreachable", level + 1),
            Err(err) => assert_eq!(err, LevelingError::Overflow { level: level + 1 }),
        }

        let progress = curve.progress_to_next_level(u64::MAX);
        assert_eq!(progress.level, level);
        assert!(progress.fraction >= 0.0 && progress.fraction < 1.0);
    }
}

#[test]
fn test_last_representable_exponential_level_saturates_cost() {
    // cum(65) = 2^64 - 1 exactly, and the cost of level 65 is 2^64.
    let curve = LevelCurve::exponential(1, 2).unwrap();

    assert_eq!(curve.cumulative_xp_for_level(65).unwrap(), u64::MAX);
    assert_eq!(curve.level_from_xp(u64::MAX), 65);
    assert_eq!(
        curve.xp_required_for_level(65),
        Err(LevelingError::Overflow { level: 65 })
    );

    let progress = curve.progress_to_next_level(u64::MAX);
    assert_eq!(progress.xp_for_next_level, u64::MAX);
    assert_eq!(progress.xp_into_level, 0);
}

#[test]
fn test_progress_midway_through_level() {
    let progress = hundred_per_level().progress_to_next_level(350);

    assert_eq!(progress.level, 3);
    assert_eq!(progress.current_level_xp, 300);
    assert_eq!(progress.xp_into_level, 50);
    assert_eq!(progress.xp_for_next_level, 300);
    assert!((progress.fraction - 50.0 / 300.0).abs() < f64::EPSILON);
}

#[test]
fn test_reward_tiers_pick_highest_reached() {
    assert_eq!(title_for_level(1), None);
    assert_eq!(color_for_level(4), NEUTRAL_COLOR);
    assert_eq!(title_for_level(5), Some("Regular"));
    assert_eq!(title_for_level(19), Some("Contributor"));
    assert_eq!(title_for_level(20), Some("Veteran"));
    assert_eq!(title_for_level(10_000), Some("Legend"));
    assert_eq!(color_for_level(50), "#ef4444");
}

#[test]
fn test_reward_tiers_are_sorted() {
    assert!(
        REWARD_TIERS
            .windows(2)
            .all(|pair| pair[0].min_level < pair[1].min_level)
    );
}

#[test]
fn test_user_progress_decorates_level() {
    let curve = hundred_per_level();
    // cum(10) = 50 * 10 * 9 = 4500
    let user = UserProgress::from_xp(&curve, 4_500);

    assert_eq!(user.experience_points, 4_500);
    assert_eq!(user.progress.level, 10);
    assert_eq!(user.title, Some("Contributor"));
    assert_eq!(user.color, "#3b82f6");
}

proptest! {
    /// Property: constructors either reject the parameters or produce a
    /// curve whose first level costs something and whose lookups do not
    /// panic, including the degenerate `base == 0` and `factor < 2` inputs.
    #[test]
    fn prop_constructors_only_yield_usable_curves(
        shape in 0u8..3,
        base in 0u64..4,
        factor in 0u64..4,
        xp in any::<u64>(),
    ) {
        let built = match shape {
            0 => LevelCurve::linear(base),
            1 => LevelCurve::quadratic(base),
            _ => LevelCurve::exponential(base, factor),
        };
        match built {
            Ok(curve) => {
                prop_assert!(base >= 1);
                prop_assert!(curve.xp_required_for_level(1).unwrap() >= 1);
                prop_assert_eq!(curve.cumulative_xp_for_level(1), Ok(0));
                prop_assert!(curve.level_from_xp(xp) >= 1);
            },
            Err(err) => {
                prop_assert!(base == 0 || (shape >= 2 && factor < 2));
                let is_invalid_curve = matches!(err, LevelingError::InvalidCurve { .. });
                prop_assert!(is_invalid_curve);
            },
        }
    }

    /// Property: every level costs something, and no level costs less than
    /// the one before it.
    #[test]
    fn prop_thresholds_positive_and_non_decreasing(
        curve in curve_strategy(),
        level in 1u64..200,
    ) {
        if let (Ok(cost), Ok(next)) = (
            curve.xp_required_for_level(level),
            curve.xp_required_for_level(level + 1),
        ) {
            prop_assert!(cost > 0);
            prop_assert!(next >= cost);
        }
    }

    /// Property: cum(L + 1) == cum(L) + cost(L), with cum(1) == 0.
    #[test]
    fn prop_cumulative_is_running_sum(curve in curve_strategy(), level in 1u64..200) {
        prop_assert_eq!(curve.cumulative_xp_for_level(1), Ok(0));
        if let (Ok(cum), Ok(cost), Ok(next)) = (
            curve.cumulative_xp_for_level(level),
            curve.xp_required_for_level(level),
            curve.cumulative_xp_for_level(level + 1),
        ) {
            prop_assert_eq!(next, cum + cost);
        }
    }

    /// Property: a level's threshold maps back to that level, and one XP
    /// less maps to the level before.
    #[test]
    fn prop_round_trip_at_boundary(curve in curve_strategy(), level in 2u64..200) {
        if let Ok(cum) = curve.cumulative_xp_for_level(level) {
            prop_assert_eq!(curve.level_from_xp(cum), level);
            prop_assert_eq!(curve.level_from_xp(cum - 1), level - 1);
        }
    }

    /// Property: more XP never means a lower level.
    #[test]
    fn prop_level_lookup_monotonic(curve in curve_strategy(), a in any::<u64>(), b in any::<u64>()) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(curve.level_from_xp(low) <= curve.level_from_xp(high));
    }

    /// Property: progress agrees with the level lookup and stays in [0, 1).
    #[test]
    fn prop_progress_bounds(curve in curve_strategy(), xp in any::<u64>()) {
        let progress = curve.progress_to_next_level(xp);
        prop_assert_eq!(progress.level, curve.level_from_xp(xp));
        prop_assert!(progress.fraction >= 0.0);
        prop_assert!(progress.fraction < 1.0);
        prop_assert!(progress.xp_into_level < progress.xp_for_next_level);
    }
}
