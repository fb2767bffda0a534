//! Kubernetes resource quantity parsing
//!
//! Converts quantity strings such as `16Gi`, `500m` or `1e3` into base
//! units (bytes for memory and storage, cores for CPU).

/// Parse a quantity string into its value in base units
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let split = raw
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
        .unwrap_or(raw.len());
    let (number, suffix) = raw.split_at(split);
    let number: f64 = number.parse().ok()?;

    let multiplier = match suffix {
        "" => 1.0,
        "n" => 1e-9,
        "u" => 1e-6,
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        "Ki" => 1024.0,
        "Mi" => 1024.0 * 1024.0,
        "Gi" => 1024.0 * 1024.0 * 1024.0,
        "Ti" => 1024.0f64.powi(4),
        "Pi" => 1024.0f64.powi(5),
        "Ei" => 1024.0f64.powi(6),
        exp if exp.starts_with('e') || exp.starts_with('E') => {
            let exponent: i32 = exp[1..].parse().ok()?;
            10f64.powi(exponent)
        }
        _ => return None,
    };

    Some(number * multiplier)
}

/// Parse a quantity into whole bytes
pub fn parse_bytes(raw: &str) -> Option<u64> {
    parse_quantity(raw)
        .filter(|v| *v >= 0.0)
        .map(|v| v.round() as u64)
}

/// Parse a CPU quantity into millicores
pub fn parse_millicores(raw: &str) -> Option<u64> {
    parse_quantity(raw)
        .filter(|v| *v >= 0.0)
        .map(|v| (v * 1000.0).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_suffixes() {
        assert_eq!(parse_bytes("16Gi"), Some(16 * 1024 * 1024 * 1024));
        assert_eq!(parse_bytes("512Mi"), Some(512 * 1024 * 1024));
        assert_eq!(parse_bytes("3977748Ki"), Some(3977748 * 1024));
    }

    #[test]
    fn test_decimal_suffixes_and_plain_numbers() {
        assert_eq!(parse_bytes("2k"), Some(2000));
        assert_eq!(parse_bytes("128974848"), Some(128974848));
        assert_eq!(parse_bytes("1e3"), Some(1000));
        assert_eq!(parse_bytes("1.5G"), Some(1_500_000_000));
    }

    #[test]
    fn test_cpu_millicores() {
        assert_eq!(parse_millicores("4"), Some(4000));
        assert_eq!(parse_millicores("250m"), Some(250));
        assert_eq!(parse_millicores("1.5"), Some(1500));
        assert_eq!(parse_millicores("123456789n"), Some(123));
    }

    #[test]
    fn test_malformed() {
        assert_eq!(parse_quantity(""), None);
        assert_eq!(parse_quantity("Gi"), None);
        assert_eq!(parse_quantity("10Qi"), None);
        assert_eq!(parse_bytes("-5Gi"), None);
    }
}
