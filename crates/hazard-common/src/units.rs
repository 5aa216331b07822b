//! Unit conversion constants and rounding helpers for payload values.

/// Meters-per-second to knots.
pub const MS_TO_KT: f64 = 1.94384;

/// Round a value to `dp` decimal places for payload serialization.
pub fn round_to(value: f64, dp: u32) -> f64 {
    let factor = 10f64.powi(dp as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ms_to_kt() {
        // 25.0 m/s is 48.6 kt at one decimal place
        assert_eq!(round_to(25.0 * MS_TO_KT, 1), 48.6);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(39.123456, 4), 39.1235);
        assert_eq!(round_to(1.005, 1), 1.0);
        assert_eq!(round_to(-104.98765, 4), -104.9877);
    }
}
