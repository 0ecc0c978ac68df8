//! [`ObservationFilter`] – plausibility rules for camera pose observations.
//!
//! Every registered [`ObservationRule`] is evaluated in insertion order; the
//! first one that fails names the [`Rejection`] and the observation is not
//! forwarded.  [`ObservationFilter::standard`] installs the four stock rules:
//!
//! | Order | Rule | Rejects when |
//! |---|---|---|
//! | 1 | [`TagCountRule`] | no tags were used |
//! | 2 | [`AmbiguityRule`] | exactly one tag and ambiguity above the cap |
//! | 3 | [`ZErrorRule`] | `|z|` above the cap |
//! | 4 | [`FieldBoundsRule`] | x or y outside the field |
//!
//! Comparisons are written so that a non-finite coordinate fails its rule.

use std::fmt;

use serde::Serialize;

use crate::field::FieldLayout;
use crate::io::PoseObservation;

/// Why an observation was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    NoTags,
    Ambiguous,
    ZError,
    OutOfField,
}

impl Rejection {
    pub fn label(self) -> &'static str {
        match self {
            Rejection::NoTags => "no_tags",
            Rejection::Ambiguous => "ambiguous",
            Rejection::ZError => "z_error",
            Rejection::OutOfField => "out_of_field",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rule trait
// ────────────────────────────────────────────────────────────────────────────

/// A single plausibility check applied to each observation.
pub trait ObservationRule {
    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    /// `Ok(())` when `obs` is plausible on `field`.
    fn check(&self, obs: &PoseObservation, field: &dyn FieldLayout) -> Result<(), Rejection>;
}

// ────────────────────────────────────────────────────────────────────────────
// ObservationFilter
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct ObservationFilter {
    rules: Vec<Box<dyn ObservationRule>>,
}

impl ObservationFilter {
    /// An empty filter that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock rule chain with the given caps.
    ///
    /// ```
    /// use tickbot_vision::filter::{ObservationFilter, Rejection};
    /// use tickbot_vision::{AprilTagLayout, PoseObservation};
    ///
    /// let filter = ObservationFilter::standard(0.1, 0.3);
    /// let field = AprilTagLayout::test_field();
    ///
    /// let blind = PoseObservation::default();
    /// assert_eq!(filter.evaluate(&blind, &field), Err(Rejection::NoTags));
    /// ```
    pub fn standard(max_ambiguity: f64, max_z_error: f64) -> Self {
        let mut filter = Self::new();
        filter.add_rule(Box::new(TagCountRule));
        filter.add_rule(Box::new(AmbiguityRule { max_ambiguity }));
        filter.add_rule(Box::new(ZErrorRule { max_z_error }));
        filter.add_rule(Box::new(FieldBoundsRule));
        filter
    }

    /// Append a rule; rules run in insertion order.
    pub fn add_rule(&mut self, rule: Box<dyn ObservationRule>) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Names of the installed rules, in evaluation order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run every rule; the first failure wins.
    pub fn evaluate(&self, obs: &PoseObservation, field: &dyn FieldLayout) -> Result<(), Rejection> {
        for rule in &self.rules {
            rule.check(obs, field)?;
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Built-in rules
// ────────────────────────────────────────────────────────────────────────────

/// At least one tag must have been used.
pub struct TagCountRule;

impl ObservationRule for TagCountRule {
    fn name(&self) -> &str {
        "tag_count"
    }

    fn check(&self, obs: &PoseObservation, _field: &dyn FieldLayout) -> Result<(), Rejection> {
        if obs.tag_count == 0 {
            return Err(Rejection::NoTags);
        }
        Ok(())
    }
}

/// Single-tag solves must not be ambiguous.  Multi-tag solves pass
/// regardless of the reported ambiguity.
pub struct AmbiguityRule {
    pub max_ambiguity: f64,
}

impl ObservationRule for AmbiguityRule {
    fn name(&self) -> &str {
        "ambiguity"
    }

    fn check(&self, obs: &PoseObservation, _field: &dyn FieldLayout) -> Result<(), Rejection> {
        if obs.tag_count == 1 && obs.ambiguity > self.max_ambiguity {
            return Err(Rejection::Ambiguous);
        }
        Ok(())
    }
}

/// The robot must be near the floor.
pub struct ZErrorRule {
    pub max_z_error: f64,
}

impl ObservationRule for ZErrorRule {
    fn name(&self) -> &str {
        "z_error"
    }

    fn check(&self, obs: &PoseObservation, _field: &dyn FieldLayout) -> Result<(), Rejection> {
        if !(obs.pose.z().abs() <= self.max_z_error) {
            return Err(Rejection::ZError);
        }
        Ok(())
    }
}

/// The robot must be inside `[0, length] × [0, width]`.
pub struct FieldBoundsRule;

impl ObservationRule for FieldBoundsRule {
    fn name(&self) -> &str {
        "field_bounds"
    }

    fn check(&self, obs: &PoseObservation, field: &dyn FieldLayout) -> Result<(), Rejection> {
        let (x, y) = (obs.pose.x(), obs.pose.y());
        let in_x = x >= 0.0 && x <= field.field_length();
        let in_y = y >= 0.0 && y <= field.field_width();
        if !(in_x && in_y) {
            return Err(Rejection::OutOfField);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::AprilTagLayout;
    use tickbot_types::{Pose3d, Rotation3d, Translation3d};

    fn obs(x: f64, y: f64, z: f64, tag_count: usize, ambiguity: f64) -> PoseObservation {
        PoseObservation {
            timestamp: 1.0,
            pose: Pose3d::new(Translation3d::new(x, y, z), Rotation3d::identity()),
            ambiguity,
            tag_count,
            average_tag_distance: 2.0,
        }
    }

    fn standard() -> ObservationFilter {
        ObservationFilter::standard(0.1, 0.3)
    }

    #[test]
    fn plausible_observation_passes() {
        let field = AprilTagLayout::test_field();
        assert_eq!(standard().evaluate(&obs(3.0, 4.0, 0.0, 2, 0.0), &field), Ok(()));
    }

    #[test]
    fn zero_tags_always_rejected() {
        let field = AprilTagLayout::test_field();
        // even with otherwise perfect numbers
        assert_eq!(
            standard().evaluate(&obs(3.0, 4.0, 0.0, 0, 0.0), &field),
            Err(Rejection::NoTags)
        );
    }

    #[test]
    fn single_ambiguous_tag_rejected() {
        let field = AprilTagLayout::test_field();
        assert_eq!(
            standard().evaluate(&obs(3.0, 4.0, 0.0, 1, 0.2), &field),
            Err(Rejection::Ambiguous)
        );
    }

    #[test]
    fn ambiguity_ignored_for_multi_tag() {
        let field = AprilTagLayout::test_field();
        assert_eq!(standard().evaluate(&obs(3.0, 4.0, 0.0, 2, 0.9), &field), Ok(()));
    }

    #[test]
    fn ambiguity_at_cap_passes() {
        let field = AprilTagLayout::test_field();
        assert_eq!(standard().evaluate(&obs(3.0, 4.0, 0.0, 1, 0.1), &field), Ok(()));
    }

    #[test]
    fn high_z_rejected() {
        let field = AprilTagLayout::test_field();
        assert_eq!(
            standard().evaluate(&obs(3.0, 4.0, 0.5, 2, 0.0), &field),
            Err(Rejection::ZError)
        );
        assert_eq!(
            standard().evaluate(&obs(3.0, 4.0, -0.5, 2, 0.0), &field),
            Err(Rejection::ZError)
        );
    }

    #[test]
    fn outside_field_rejected() {
        let field = AprilTagLayout::test_field();
        for (x, y) in [(-0.1, 4.0), (17.6, 4.0), (3.0, -0.1), (3.0, 8.1)] {
            assert_eq!(
                standard().evaluate(&obs(x, y, 0.0, 2, 0.0), &field),
                Err(Rejection::OutOfField),
                "({x}, {y})"
            );
        }
    }

    #[test]
    fn field_edges_are_inside() {
        let field = AprilTagLayout::test_field();
        assert_eq!(standard().evaluate(&obs(0.0, 0.0, 0.0, 2, 0.0), &field), Ok(()));
        assert_eq!(
            standard().evaluate(&obs(field.field_length(), field.field_width(), 0.0, 2, 0.0), &field),
            Ok(())
        );
    }

    #[test]
    fn first_failing_rule_wins() {
        let field = AprilTagLayout::test_field();
        // ambiguous, too high and off the field: ambiguity is checked first
        assert_eq!(
            standard().evaluate(&obs(-1.0, 4.0, 0.5, 1, 0.5), &field),
            Err(Rejection::Ambiguous)
        );
        // too high and off the field: z is checked first
        assert_eq!(
            standard().evaluate(&obs(-1.0, 4.0, 0.5, 2, 0.0), &field),
            Err(Rejection::ZError)
        );
    }

    #[test]
    fn non_finite_pose_rejected() {
        let field = AprilTagLayout::test_field();
        assert_eq!(
            standard().evaluate(&obs(3.0, 4.0, f64::NAN, 2, 0.0), &field),
            Err(Rejection::ZError)
        );
        assert_eq!(
            standard().evaluate(&obs(f64::NAN, 4.0, 0.0, 2, 0.0), &field),
            Err(Rejection::OutOfField)
        );
    }

    #[test]
    fn standard_rule_order() {
        assert_eq!(
            standard().rule_names(),
            vec!["tag_count", "ambiguity", "z_error", "field_bounds"]
        );
    }

    #[test]
    fn empty_filter_accepts_everything() {
        let field = AprilTagLayout::test_field();
        let filter = ObservationFilter::new();
        assert!(filter.is_empty());
        assert_eq!(filter.evaluate(&obs(-5.0, -5.0, 9.0, 0, 1.0), &field), Ok(()));
    }

    #[test]
    fn custom_rule_appends_after_standard() {
        struct StaleRule;
        impl ObservationRule for StaleRule {
            fn name(&self) -> &str {
                "stale"
            }
            fn check(&self, obs: &PoseObservation, _f: &dyn FieldLayout) -> Result<(), Rejection> {
                if obs.timestamp < 0.0 {
                    Err(Rejection::OutOfField)
                } else {
                    Ok(())
                }
            }
        }

        let field = AprilTagLayout::test_field();
        let mut filter = standard();
        filter.add_rule(Box::new(StaleRule));
        assert_eq!(filter.len(), 5);
        let mut o = obs(3.0, 4.0, 0.0, 2, 0.0);
        o.timestamp = -1.0;
        assert_eq!(filter.evaluate(&o, &field), Err(Rejection::OutOfField));
    }
}
