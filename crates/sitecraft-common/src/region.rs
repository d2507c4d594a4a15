use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid selection region: {reason}")]
pub struct InvalidRegion {
    pub reason: String,
}

/// A rectangle in fractional image coordinates.
///
/// All four values are in `[0, 1]` relative to the image's intrinsic box,
/// `width` and `height` are strictly positive and `x + width`, `y + height`
/// never exceed 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl SelectionRegion {
    /// Build a region, clamping it into the unit square.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Result<Self, InvalidRegion> {
        if ![x, y, width, height].iter().all(|v| v.is_finite()) {
            return Err(InvalidRegion {
                reason: "coordinates must be finite".to_string(),
            });
        }
        let x1 = x.clamp(0.0, 1.0);
        let y1 = y.clamp(0.0, 1.0);
        let x2 = (x + width).clamp(0.0, 1.0);
        let y2 = (y + height).clamp(0.0, 1.0);
        let region = Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        };
        if region.width <= 0.0 || region.height <= 0.0 {
            return Err(InvalidRegion {
                reason: "width and height must be positive inside the image".to_string(),
            });
        }
        Ok(region)
    }

    /// Re-check the invariant on a region that came from the wire.
    pub fn validated(self) -> Result<Self, InvalidRegion> {
        Self::new(self.x, self.y, self.width, self.height)
    }
}

impl std::str::FromStr for SelectionRegion {
    type Err = InvalidRegion;

    /// Parse `x,y,width,height`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| InvalidRegion {
                reason: format!("'{}' is not a number list: {}", s, e),
            })?;
        match parts.as_slice() {
            [x, y, w, h] => Self::new(*x, *y, *w, *h),
            _ => Err(InvalidRegion {
                reason: format!("expected 4 values (x,y,width,height), got {}", parts.len()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clamps_into_unit_square() {
        let region = SelectionRegion::new(0.8, -0.1, 0.5, 0.3).unwrap();
        assert_eq!(region.x, 0.8);
        assert_eq!(region.y, 0.0);
        assert!((region.width - 0.2).abs() < 1e-9);
        assert!((region.height - 0.2).abs() < 1e-9);
    }

    #[test]
    fn new_rejects_empty_rectangles() {
        assert!(SelectionRegion::new(0.5, 0.5, 0.0, 0.2).is_err());
        assert!(SelectionRegion::new(1.2, 0.0, 0.3, 0.3).is_err());
        assert!(SelectionRegion::new(f64::NAN, 0.0, 0.3, 0.3).is_err());
    }

    #[test]
    fn parse_from_cli_string() {
        let region: SelectionRegion = "0.025, 0.05,0.25,0.25".parse().unwrap();
        assert_eq!(region.x, 0.025);
        assert_eq!(region.height, 0.25);
        assert!("1,2,3".parse::<SelectionRegion>().is_err());
        assert!("a,b,c,d".parse::<SelectionRegion>().is_err());
    }
}
