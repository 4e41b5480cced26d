//! Placement scoring: the zero-sum placement curve and the opponent-strength modifier.
//!
//! Everything here is a total function over its domain. Peers in a lockstep match
//! replicate these computations, so they must stay free of I/O and hidden state.

use crate::config::RatingConfig;
use crate::numbers::{floor_f64_to_i32, usize_to_f64};

/// Zero-sum corrected points for every seat of a field of one size.
///
/// Building the table costs one pass over the field; callers scoring a whole
/// match should build it once and read every seat from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementCurve {
    points: Vec<i32>,
}

impl PlacementCurve {
    /// Compute the corrected curve for `field_size` seats.
    #[must_use]
    pub fn new(field_size: usize, config: &RatingConfig) -> Self {
        if field_size <= 1 {
            return Self {
                points: vec![0; field_size],
            };
        }

        let raw: Vec<f64> = (0..field_size)
            .map(|placement| raw_points(placement, field_size, config))
            .collect();
        let raw_sum: f64 = raw.iter().sum();
        let adjustment = (f64::from(config.zero_sum_target) - raw_sum) / usize_to_f64(field_size);
        let mut points: Vec<i32> = raw
            .iter()
            .map(|value| floor_f64_to_i32(value + adjustment))
            .collect();
        distribute_remainder(&mut points, config.zero_sum_target);
        Self { points }
    }

    /// Points awarded to `placement`; seats outside the field score zero.
    #[must_use]
    pub fn points(&self, placement: usize) -> i32 {
        self.points.get(placement).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn field_size(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[i32] {
        &self.points
    }

    /// Sum over the whole field. Equals the configured target for fields of two or more.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.points.iter().map(|p| i64::from(*p)).sum()
    }

    /// Rating change for `placement` after the opponent-strength modifier.
    #[must_use]
    pub fn rating_change(
        &self,
        placement: usize,
        player_rating: f64,
        opponent_ratings: &[f64],
        config: &RatingConfig,
    ) -> i32 {
        let base = self.points(placement);
        let modifier =
            calculate_opponent_strength_modifier(player_rating, opponent_ratings, base >= 0, config);
        floor_f64_to_i32(f64::from(base) * modifier)
    }
}

/// Uncorrected curve value: quadratic reward above the breakeven seat, mirrored penalty below.
fn raw_points(placement: usize, field_size: usize, config: &RatingConfig) -> f64 {
    let seat = usize_to_f64(placement);
    let breakeven = usize_to_f64(field_size) * config.breakeven_percentile;
    if (seat - breakeven).abs() < f64::EPSILON {
        return 0.0;
    }
    if seat < breakeven {
        let r = seat / breakeven;
        config.max_win * (1.0 - r * r)
    } else {
        let last = usize_to_f64(field_size - 1);
        let r = (last - seat) / (last - breakeven);
        -config.max_loss * (1.0 - r * r)
    }
}

/// Flooring loses up to one point per seat. Hand the integer remainder back from
/// the top seat down (or take it from the bottom seat up) so the field sums to the
/// target exactly while staying non-increasing.
fn distribute_remainder(points: &mut [i32], target: i32) {
    let total: i64 = points.iter().map(|p| i64::from(*p)).sum();
    let mut remainder = i64::from(target) - total;
    let len = points.len();
    if len == 0 {
        return;
    }
    let mut idx = 0;
    while remainder > 0 {
        if let Some(seat) = points.get_mut(idx % len) {
            *seat += 1;
        }
        remainder -= 1;
        idx += 1;
    }
    idx = 0;
    while remainder < 0 {
        if let Some(seat) = points.get_mut(len - 1 - idx % len) {
            *seat -= 1;
        }
        remainder += 1;
        idx += 1;
    }
}

/// Zero-sum placement points for one seat. Fields of one or fewer seats score zero.
#[must_use]
pub fn calculate_placement_points(placement: usize, field_size: usize, config: &RatingConfig) -> i32 {
    if field_size <= 1 || placement >= field_size {
        return 0;
    }
    PlacementCurve::new(field_size, config).points(placement)
}

/// Scale a gain or loss by how strong the opponents were, within `[1 - k, 1 + k]`.
///
/// Beating weaker opponents earns less; losing to weaker opponents costs more.
#[must_use]
pub fn calculate_opponent_strength_modifier(
    player_rating: f64,
    opponent_ratings: &[f64],
    is_gain: bool,
    config: &RatingConfig,
) -> f64 {
    if opponent_ratings.is_empty() {
        return 1.0;
    }
    let average = opponent_ratings.iter().sum::<f64>() / usize_to_f64(opponent_ratings.len());
    let diff = ((player_rating - average) / config.strength_scale).clamp(-1.0, 1.0);
    let scaled = diff * config.strength_factor;
    if is_gain { 1.0 - scaled } else { 1.0 + scaled }
}

/// Rating delta for one seat: placement points scaled by opponent strength, floored.
#[must_use]
pub fn calculate_rating_change(
    placement: usize,
    field_size: usize,
    player_rating: f64,
    opponent_ratings: &[f64],
    config: &RatingConfig,
) -> i32 {
    PlacementCurve::new(field_size, config).rating_change(
        placement,
        player_rating,
        opponent_ratings,
        config,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> RatingConfig {
        RatingConfig::default()
    }

    #[test]
    fn every_field_sums_to_zero() {
        let config = cfg();
        for field in 2..=64 {
            let total: i64 = (0..field)
                .map(|p| i64::from(calculate_placement_points(p, field, &config)))
                .sum();
            assert_eq!(total, 0, "field {field} is not zero-sum");
        }
    }

    #[test]
    fn nonzero_target_is_honoured() {
        let config = RatingConfig {
            zero_sum_target: 12,
            ..cfg()
        };
        for field in 2..=16 {
            assert_eq!(PlacementCurve::new(field, &config).total(), 12);
        }
    }

    #[test]
    fn points_never_increase_with_placement() {
        let config = cfg();
        for field in 2..=64 {
            let curve = PlacementCurve::new(field, &config);
            for pair in curve.as_slice().windows(2) {
                assert!(pair[0] >= pair[1], "field {field}: {:?}", curve.as_slice());
            }
        }
    }

    #[test]
    fn twenty_seat_field_spans_the_full_range() {
        let config = cfg();
        assert!((raw_points(0, 20, &config) - 40.0).abs() < f64::EPSILON);
        assert!((raw_points(19, 20, &config) + 40.0).abs() < f64::EPSILON);
        assert!(raw_points(10, 20, &config).abs() < f64::EPSILON);

        let curve = PlacementCurve::new(20, &config);
        assert_eq!(curve.points(0), 39);
        assert_eq!(curve.points(19), -42);
        assert_eq!(curve.total(), 0);
    }

    #[test]
    fn small_fields() {
        let config = cfg();
        assert_eq!(calculate_placement_points(0, 1, &config), 0);
        assert_eq!(calculate_placement_points(0, 0, &config), 0);
        assert_eq!(PlacementCurve::new(2, &config).as_slice(), &[20, -20]);
        assert_eq!(PlacementCurve::new(3, &config).as_slice(), &[33, 15, -48]);
        assert_eq!(calculate_placement_points(5, 3, &config), 0);
    }

    #[test]
    fn modifier_is_neutral_without_opponents() {
        let config = cfg();
        let m = calculate_opponent_strength_modifier(1_500.0, &[], true, &config);
        assert!((m - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn modifier_stays_within_strength_band() {
        let config = cfg();
        let k = config.strength_factor;
        for (player, opponent) in [(3_000.0, 100.0), (100.0, 3_000.0), (1_000.0, 1_000.0)] {
            for is_gain in [true, false] {
                let m = calculate_opponent_strength_modifier(player, &[opponent], is_gain, &config);
                assert!(m >= 1.0 - k - f64::EPSILON && m <= 1.0 + k + f64::EPSILON);
            }
        }
    }

    #[test]
    fn beating_weaker_field_earns_less_and_losing_to_it_costs_more() {
        let config = cfg();
        let weaker = [800.0, 800.0];
        let even = [1_200.0, 1_200.0];
        let gain_vs_weak = calculate_rating_change(0, 3, 1_200.0, &weaker, &config);
        let gain_vs_even = calculate_rating_change(0, 3, 1_200.0, &even, &config);
        assert!(gain_vs_weak < gain_vs_even);

        let loss_vs_weak = calculate_rating_change(2, 3, 1_200.0, &weaker, &config);
        let loss_vs_even = calculate_rating_change(2, 3, 1_200.0, &even, &config);
        assert!(loss_vs_weak < loss_vs_even);
    }

    #[test]
    fn even_field_change_matches_placement_points() {
        let config = cfg();
        for placement in 0..6 {
            let base = calculate_placement_points(placement, 6, &config);
            let change = calculate_rating_change(placement, 6, 1_000.0, &[1_000.0; 5], &config);
            assert_eq!(change, base);
        }
    }
}
