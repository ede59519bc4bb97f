//! Arm-position payload and its domain checks.
//!
//! Layout (9 bytes): `x: f32 LE`, `z: f32 LE`, `grip: u8`.

/// Upper bound for the X axis, in millimetres.
pub const MAX_X: f32 = 1000.0;

/// Upper bound for the Z axis, in millimetres.
pub const MAX_Z: f32 = 500.0;

/// Encoded size of a [`Position`] payload.
pub const POSITION_PAYLOAD_LEN: usize = 9;

/// Axis bounds applied by the validator. Both axes start at zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    pub max_x: f32,
    pub max_z: f32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_x: MAX_X,
            max_z: MAX_Z,
        }
    }
}

/// A single field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum Violation {
    #[error("x must be within 0-{max} mm (got {value})")]
    X { value: f32, max: f32 },

    #[error("z must be within 0-{max} mm (got {value})")]
    Z { value: f32, max: f32 },

    #[error("grip must be 0 or 1 (got {0})")]
    Grip(u8),
}

/// Target position for the arm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub z: f32,
    pub grip: u8,
}

impl Position {
    pub fn new(x: f32, z: f32, grip: u8) -> Self {
        Self { x, z, grip }
    }

    /// Whether the gripper should be closed.
    pub fn gripping(&self) -> bool {
        self.grip == 1
    }

    /// Check every field against the default [`Limits`].
    pub fn validate(&self) -> Vec<Violation> {
        self.validate_with(&Limits::default())
    }

    /// Check every field against `limits`, collecting all violations.
    pub fn validate_with(&self, limits: &Limits) -> Vec<Violation> {
        let mut violations = Vec::new();
        // Written as a range check so NaN fails too.
        if !(0.0..=limits.max_x).contains(&self.x) {
            violations.push(Violation::X {
                value: self.x,
                max: limits.max_x,
            });
        }
        if !(0.0..=limits.max_z).contains(&self.z) {
            violations.push(Violation::Z {
                value: self.z,
                max: limits.max_z,
            });
        }
        if self.grip > 1 {
            violations.push(Violation::Grip(self.grip));
        }
        violations
    }

    /// Serialize to the 9-byte wire payload.
    pub fn to_payload(&self) -> [u8; POSITION_PAYLOAD_LEN] {
        let mut out = [0u8; POSITION_PAYLOAD_LEN];
        out[0..4].copy_from_slice(&self.x.to_le_bytes());
        out[4..8].copy_from_slice(&self.z.to_le_bytes());
        out[8] = self.grip;
        out
    }

    /// Parse a 9-byte wire payload. Returns `None` for any other length.
    ///
    /// No range checks are applied; call [`validate`](Self::validate) on the
    /// result when the values matter.
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        let bytes: &[u8; POSITION_PAYLOAD_LEN] = payload.try_into().ok()?;
        let x = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let z = f32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Some(Self {
            x,
            z,
            grip: bytes[8],
        })
    }
}

/// Validate raw position fields against the default limits.
///
/// Returns every violation found; an empty list means the values are valid.
pub fn validate_position(x: f32, z: f32, grip: u8) -> Vec<Violation> {
    Position::new(x, z, grip).validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bounds_inclusive() {
        assert!(validate_position(0.0, 0.0, 0).is_empty());
        assert!(validate_position(MAX_X, MAX_Z, 1).is_empty());
    }

    #[test]
    fn reports_every_violation() {
        let violations = validate_position(-1.0, 500.5, 2);
        assert_eq!(
            violations,
            vec![
                Violation::X {
                    value: -1.0,
                    max: MAX_X
                },
                Violation::Z {
                    value: 500.5,
                    max: MAX_Z
                },
                Violation::Grip(2),
            ]
        );
    }

    #[test]
    fn rejects_nan_and_infinity() {
        let violations = validate_position(f32::NAN, f32::INFINITY, 0);
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn custom_limits() {
        let limits = Limits {
            max_x: 10.0,
            max_z: 10.0,
        };
        let pos = Position::new(20.0, 5.0, 1);
        assert_eq!(
            pos.validate_with(&limits),
            vec![Violation::X {
                value: 20.0,
                max: 10.0
            }]
        );
    }

    #[test]
    fn payload_layout_is_little_endian() {
        let pos = Position::new(150.5, 300.0, 1);
        let payload = pos.to_payload();
        assert_eq!(&payload[0..4], &150.5f32.to_le_bytes());
        assert_eq!(&payload[4..8], &300.0f32.to_le_bytes());
        assert_eq!(payload[8], 1);
        assert_eq!(Position::from_payload(&payload), Some(pos));
    }

    #[test]
    fn from_payload_rejects_wrong_length() {
        assert_eq!(Position::from_payload(&[0u8; 8]), None);
        assert_eq!(Position::from_payload(&[0u8; 10]), None);
    }

    #[test]
    fn violation_messages_name_the_field() {
        assert_eq!(Violation::Grip(3).to_string(), "grip must be 0 or 1 (got 3)");
        assert!(Violation::X {
            value: 1200.0,
            max: MAX_X
        }
        .to_string()
        .starts_with("x must be within 0-1000"));
    }
}
