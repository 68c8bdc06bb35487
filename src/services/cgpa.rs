//! CGPA normalization to the 10-point scale.

use crate::error::{AppError, Result};

/// Values below this are treated as 4-point CGPAs.
const FOUR_POINT_CEILING: f64 = 4.0;

/// Convert a CGPA to the 10-point scale.
///
/// Values under 4.0 are read as 4-point grades and scaled; anything from 4.0
/// up to 10.0 is already on the 10-point scale and returned unchanged.
pub fn convert_cgpa(value: f64) -> Result<f64> {
    if !value.is_finite() || !(0.0..=10.0).contains(&value) {
        return Err(AppError::validation(format!(
            "CGPA must be between 0 and 10, got {value}"
        )));
    }

    if value < FOUR_POINT_CEILING {
        Ok(round2(value / FOUR_POINT_CEILING * 10.0))
    } else {
        Ok(value)
    }
}

/// Whether a value would be changed by [`convert_cgpa`].
pub fn is_four_point(value: f64) -> bool {
    value.is_finite() && (0.0..FOUR_POINT_CEILING).contains(&value)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_four_point_scale() {
        assert_eq!(convert_cgpa(3.6).unwrap(), 9.0);
        assert_eq!(convert_cgpa(3.0).unwrap(), 7.5);
        assert_eq!(convert_cgpa(0.0).unwrap(), 0.0);
    }

    #[test]
    fn leaves_ten_point_scale_unchanged() {
        assert_eq!(convert_cgpa(8.5).unwrap(), 8.5);
        assert_eq!(convert_cgpa(4.0).unwrap(), 4.0);
        assert_eq!(convert_cgpa(10.0).unwrap(), 10.0);
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(convert_cgpa(-0.1).is_err());
        assert!(convert_cgpa(10.5).is_err());
        assert!(convert_cgpa(f64::NAN).is_err());
    }

    #[test]
    fn four_point_detection() {
        assert!(is_four_point(3.9));
        assert!(!is_four_point(4.0));
        assert!(!is_four_point(f64::INFINITY));
    }
}
