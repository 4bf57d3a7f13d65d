//! Validation functions for Traffic Manager attributes

use tfplug::types::Dynamic;

/// Expected status code ranges take the form `low-high` with both bounds
/// being HTTP status codes.
pub fn status_code_range(value: &Dynamic, key: &str) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();

    if let Some(v) = value.as_str() {
        match parse_status_code_range(v) {
            Some((low, high)) if low > high => {
                errors.push(format!(
                    "lower bound of {} must not exceed the upper bound (got {:?})",
                    key, v
                ));
            }
            Some(_) => {}
            None => {
                errors.push(format!(
                    "{} must be in the format `100-599` with each bound between 100 and 599 (got {:?})",
                    key, v
                ));
            }
        }
    }

    (Vec::new(), errors)
}

pub(crate) fn parse_status_code_range(input: &str) -> Option<(i64, i64)> {
    let (low, high) = input.split_once('-')?;
    let low: i64 = low.parse().ok()?;
    let high: i64 = high.parse().ok()?;

    let in_bounds = |code: i64| (100..=599).contains(&code);
    if !in_bounds(low) || !in_bounds(high) {
        return None;
    }

    Some((low, high))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors_for(value: &str) -> Vec<String> {
        let (_, errors) = status_code_range(&Dynamic::String(value.to_string()), "k");
        errors
    }

    #[test]
    fn accepts_valid_ranges() {
        assert!(errors_for("100-101").is_empty());
        assert!(errors_for("200-200").is_empty());
        assert!(errors_for("100-599").is_empty());
    }

    #[test]
    fn rejects_malformed_ranges() {
        assert!(!errors_for("abc-101").is_empty());
        assert!(!errors_for("100").is_empty());
        assert!(!errors_for("100-").is_empty());
        assert!(!errors_for("99-101").is_empty());
        assert!(!errors_for("100-700").is_empty());
    }

    #[test]
    fn rejects_inverted_ranges() {
        assert!(!errors_for("300-200").is_empty());
    }
}
