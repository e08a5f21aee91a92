//! Direction Classifier - Joystick Displacement to Drive Command
//!
//! ## Responsibilities
//!
//! - Map a raw pointer displacement to a single discrete drive command
//! - Suppress jitter near the stick's rest position (dead zone)
//! - Collapse diagonal intent onto the dominant axis

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Pointer displacement from the stick's resting center, in pixels.
///
/// The offset is the raw pointer position and may exceed the stick radius;
/// visual knob clamping is the dashboard's concern and does not affect
/// classification.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PointerOffset {
    pub x: f64,
    pub y: f64,
}

/// Discrete drive command.
///
/// The rover accepts exactly one direction (or center) at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Center,
    Up,
    Down,
    Left,
    Right,
}

impl Command {
    /// String form used in API responses and log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Stick geometry for classification.
///
/// `axis_priority` scales the vertical magnitude before the dominance
/// comparison. At the default 0.5 the horizontal axis wins unless the
/// vertical displacement is more than twice the horizontal, so the split
/// between axes is intentionally not a symmetric 45 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StickGeometry {
    /// Stick travel radius in pixels
    pub radius: f64,
    /// Displacements below this distance classify as `Center`
    pub dead_zone: f64,
    /// Vertical magnitude scale in the axis dominance comparison
    pub axis_priority: f64,
}

impl Default for StickGeometry {
    fn default() -> Self {
        // Matches the dashboard's 140px stick control
        Self {
            radius: 70.0,
            dead_zone: 20.0,
            axis_priority: 0.5,
        }
    }
}

impl StickGeometry {
    /// Validate the caller contract: `radius > 0`, `0 <= dead_zone < radius`,
    /// `0 < axis_priority <= 1`, all finite.
    pub fn validate(&self) -> Result<()> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(Error::Domain(format!(
                "stick radius must be a positive finite number, got {}",
                self.radius
            )));
        }
        if !self.dead_zone.is_finite() || self.dead_zone < 0.0 || self.dead_zone >= self.radius {
            return Err(Error::Domain(format!(
                "dead zone must satisfy 0 <= dead_zone < radius, got {}",
                self.dead_zone
            )));
        }
        if !self.axis_priority.is_finite()
            || self.axis_priority <= 0.0
            || self.axis_priority > 1.0
        {
            return Err(Error::Domain(format!(
                "axis priority must satisfy 0 < axis_priority <= 1, got {}",
                self.axis_priority
            )));
        }
        Ok(())
    }
}

/// Classify a pointer displacement into a drive command.
///
/// Pure function: normalizes the offset by the stick radius, returns
/// `Center` inside the dead zone, otherwise picks the dominant axis with
/// the vertical magnitude scaled by `axis_priority` (ties go vertical).
pub fn classify(offset: PointerOffset, geometry: StickGeometry) -> Result<Command> {
    geometry.validate()?;

    let nx = offset.x / geometry.radius;
    let ny = offset.y / geometry.radius;

    let distance = (nx * nx + ny * ny).sqrt();
    if distance < geometry.dead_zone / geometry.radius {
        return Ok(Command::Center);
    }

    if nx.abs() > ny.abs() * geometry.axis_priority {
        if nx > 0.0 {
            Ok(Command::Right)
        } else {
            Ok(Command::Left)
        }
    } else if ny > 0.0 {
        Ok(Command::Down)
    } else {
        Ok(Command::Up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stick() -> StickGeometry {
        StickGeometry::default()
    }

    fn classify_xy(x: f64, y: f64) -> Command {
        classify(PointerOffset { x, y }, stick()).unwrap()
    }

    #[test]
    fn rest_position_is_center() {
        assert_eq!(classify_xy(0.0, 0.0), Command::Center);
    }

    #[test]
    fn jitter_inside_dead_zone_is_center() {
        assert_eq!(classify_xy(10.0, -10.0), Command::Center);
        assert_eq!(classify_xy(-19.9, 0.0), Command::Center);
        assert_eq!(classify_xy(0.0, 19.9), Command::Center);
    }

    #[test]
    fn dead_zone_boundary_classifies() {
        // Distance exactly equal to the dead zone is outside it
        assert_eq!(classify_xy(20.0, 0.0), Command::Right);
    }

    #[test]
    fn cardinal_directions() {
        assert_eq!(classify_xy(50.0, 0.0), Command::Right);
        assert_eq!(classify_xy(-50.0, 0.0), Command::Left);
        assert_eq!(classify_xy(0.0, -50.0), Command::Up);
        assert_eq!(classify_xy(0.0, 50.0), Command::Down);
    }

    #[test]
    fn offset_beyond_radius_still_classifies() {
        assert_eq!(classify_xy(300.0, 0.0), Command::Right);
        assert_eq!(classify_xy(0.0, -500.0), Command::Up);
    }

    #[test]
    fn horizontal_wins_when_scaled_vertical_is_smaller() {
        // |30| > |40| * 0.5, so horizontal dominates despite the larger
        // raw vertical magnitude
        assert_eq!(classify_xy(30.0, 40.0), Command::Right);
        assert_eq!(classify_xy(-30.0, 40.0), Command::Left);
    }

    #[test]
    fn vertical_wins_on_exact_tie() {
        // |20| == |40| * 0.5 fails the strict comparison
        assert_eq!(classify_xy(20.0, 40.0), Command::Down);
        assert_eq!(classify_xy(20.0, -40.0), Command::Up);
    }

    #[test]
    fn scale_invariant_in_radius() {
        let offsets = [(25.0, 3.0), (-4.0, 33.0), (15.0, -15.0), (0.0, 21.0)];
        for (x, y) in offsets {
            let base = classify(
                PointerOffset { x, y },
                StickGeometry {
                    radius: 70.0,
                    dead_zone: 20.0,
                    axis_priority: 0.5,
                },
            )
            .unwrap();
            let scaled = classify(
                PointerOffset { x: x * 3.0, y: y * 3.0 },
                StickGeometry {
                    radius: 210.0,
                    dead_zone: 60.0,
                    axis_priority: 0.5,
                },
            )
            .unwrap();
            assert_eq!(base, scaled, "offset ({x}, {y})");
        }
    }

    #[test]
    fn axis_priority_one_compares_raw_magnitudes() {
        let geometry = StickGeometry {
            axis_priority: 1.0,
            ..stick()
        };
        assert_eq!(
            classify(PointerOffset { x: 30.0, y: 40.0 }, geometry).unwrap(),
            Command::Down
        );
        assert_eq!(
            classify(PointerOffset { x: 40.0, y: 30.0 }, geometry).unwrap(),
            Command::Right
        );
    }

    #[test]
    fn zero_radius_is_a_domain_error() {
        let err = classify(
            PointerOffset { x: 10.0, y: 0.0 },
            StickGeometry {
                radius: 0.0,
                dead_zone: 0.0,
                axis_priority: 0.5,
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::Domain(_)));
    }

    #[test]
    fn dead_zone_at_or_beyond_radius_is_a_domain_error() {
        let err = classify(
            PointerOffset { x: 10.0, y: 0.0 },
            StickGeometry {
                radius: 70.0,
                dead_zone: 70.0,
                axis_priority: 0.5,
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::Domain(_)));
    }

    #[test]
    fn axis_priority_out_of_range_is_a_domain_error() {
        for bad in [0.0, -0.5, 1.5, f64::NAN] {
            let err = classify(
                PointerOffset { x: 10.0, y: 0.0 },
                StickGeometry {
                    axis_priority: bad,
                    ..stick()
                },
            )
            .unwrap_err();
            assert!(matches!(err, Error::Domain(_)), "axis_priority {bad}");
        }
    }
}
