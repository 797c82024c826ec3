//! Byte-size display formatting
//!
//! The quota resolver reports sizes as human-readable strings; this is the
//! narrow interface it consumes plus the default binary-unit implementation.

/// Converts raw byte counts to display strings.
pub trait SizeFormat: Send + Sync {
    fn convert(&self, raw: f64) -> String;
}

const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Binary-unit formatter: 1536 bytes renders as "1.50 KB".
#[derive(Debug, Default, Clone, Copy)]
pub struct BinarySize;

impl SizeFormat for BinarySize {
    fn convert(&self, raw: f64) -> String {
        if !raw.is_finite() || raw <= 0.0 {
            return "0 B".to_string();
        }
        let mut value = raw;
        let mut unit = 0;
        while value >= 1024.0 && unit < UNITS.len() - 1 {
            value /= 1024.0;
            unit += 1;
        }
        if unit == 0 {
            format!("{} {}", value as u64, UNITS[unit])
        } else {
            format!("{:.2} {}", value, UNITS[unit])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_sizes() {
        let fmt = BinarySize;
        assert_eq!(fmt.convert(0.0), "0 B");
        assert_eq!(fmt.convert(-5.0), "0 B");
        assert_eq!(fmt.convert(512.0), "512 B");
        assert_eq!(fmt.convert(1536.0), "1.50 KB");
        assert_eq!(fmt.convert(1_610_612_736.0), "1.50 GB");
    }

    #[test]
    fn test_convert_caps_at_largest_unit() {
        let fmt = BinarySize;
        let huge = 1024f64.powi(7);
        assert!(fmt.convert(huge).ends_with("PB"));
    }
}
