//! Attribute validators
//!
//! Validators run during `ValidateResourceConfig` against the configured
//! value of the attribute they are attached to. Null and unknown values are
//! skipped; requiredness is enforced separately by the framework.

use crate::types::{Diagnostics, Dynamic};

pub trait Validator: Send + Sync {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics);
}

/// Value must be one of the given strings.
pub struct StringInSlice {
    pub values: Vec<String>,
    pub ignore_case: bool,
}

impl StringInSlice {
    pub fn new(values: &[&str], ignore_case: bool) -> Self {
        Self {
            values: values.iter().map(|s| s.to_string()).collect(),
            ignore_case,
        }
    }
}

impl Validator for StringInSlice {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        // applied to a list attribute, every element must match
        if let Some(items) = value.as_list() {
            for item in items {
                self.validate(item, attribute_path, diagnostics);
            }
            return;
        }

        if let Some(s) = value.as_str() {
            let matched = self.values.iter().any(|candidate| {
                if self.ignore_case {
                    candidate.eq_ignore_ascii_case(s)
                } else {
                    candidate == s
                }
            });
            if !matched {
                diagnostics.add_error(
                    format!(
                        "expected {} to be one of [{}]",
                        attribute_path,
                        self.values.join(", ")
                    ),
                    format!("got '{}'", s),
                );
            }
        }
    }
}

/// Number must fall within [min, max].
pub struct IntBetween {
    pub min: i64,
    pub max: i64,
}

impl Validator for IntBetween {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(n) = value.as_i64() {
            if n < self.min || n > self.max {
                diagnostics.add_error(
                    format!(
                        "expected {} to be in the range ({} - {})",
                        attribute_path, self.min, self.max
                    ),
                    format!("got {}", n),
                );
            }
        }
    }
}

/// Number must be one of the listed values.
pub struct IntInSlice {
    pub values: Vec<i64>,
}

impl Validator for IntInSlice {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(n) = value.as_i64() {
            if !self.values.contains(&n) {
                diagnostics.add_error(
                    format!(
                        "expected {} to be one of [{}]",
                        attribute_path,
                        self.values
                            .iter()
                            .map(|v| v.to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                    format!("got {}", n),
                );
            }
        }
    }
}

/// Number must be at least min.
pub struct IntAtLeast {
    pub min: i64,
}

impl Validator for IntAtLeast {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(n) = value.as_i64() {
            if n < self.min {
                diagnostics.add_error(
                    format!("expected {} to be at least {}", attribute_path, self.min),
                    format!("got {}", n),
                );
            }
        }
    }
}

pub struct StringIsNotEmpty;

impl Validator for StringIsNotEmpty {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_str() {
            if s.is_empty() {
                diagnostics.add_error(
                    format!("expected {} to not be empty", attribute_path),
                    String::new(),
                );
            }
        }
    }
}

/// Value must match the regular expression.
pub struct StringMatch {
    pub pattern: regex::Regex,
    pub message: String,
}

impl StringMatch {
    pub fn new(pattern: &str, message: &str) -> Self {
        Self {
            pattern: regex::Regex::new(pattern).expect("invalid validator regex"),
            message: message.to_string(),
        }
    }
}

impl Validator for StringMatch {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_str() {
            if !self.pattern.is_match(s) {
                diagnostics.add_error(
                    format!("invalid value for {}", attribute_path),
                    self.message.clone(),
                );
            }
        }
    }
}

/// Value must be a UUID.
pub struct IsUuid;

impl Validator for IsUuid {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_str() {
            let bytes: Vec<&str> = s.split('-').collect();
            let well_formed = bytes.len() == 5
                && bytes[0].len() == 8
                && bytes[1].len() == 4
                && bytes[2].len() == 4
                && bytes[3].len() == 4
                && bytes[4].len() == 12
                && s.chars().all(|c| c.is_ascii_hexdigit() || c == '-');
            if !well_formed {
                diagnostics.add_error(
                    format!("expected {} to be a valid UUID", attribute_path),
                    format!("got '{}'", s),
                );
            }
        }
    }
}

/// Adapts a plain validation function returning `(warnings, errors)` in the
/// classic plugin-SDK shape.
pub struct ValidateFn(pub fn(&Dynamic, &str) -> (Vec<String>, Vec<String>));

impl Validator for ValidateFn {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        let (warnings, errors) = (self.0)(value, attribute_path);
        for warning in warnings {
            diagnostics.add_warning(warning, String::new());
        }
        for error in errors {
            diagnostics.add_error(error, String::new());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_in_slice_accepts_listed_value() {
        let validator = StringInSlice::new(&["Standard", "Premium"], true);

        let mut diags = Diagnostics::new();
        validator.validate(&Dynamic::String("standard".to_string()), "tier", &mut diags);

        assert!(!diags.has_errors());
    }

    #[test]
    fn string_in_slice_rejects_unlisted_value() {
        let validator = StringInSlice::new(&["Standard", "Premium"], false);

        let mut diags = Diagnostics::new();
        validator.validate(&Dynamic::String("Basic".to_string()), "tier", &mut diags);

        assert_eq!(diags.errors.len(), 1);
        assert!(diags.errors[0].summary.contains("one of"));
    }

    #[test]
    fn int_between_bounds() {
        let validator = IntBetween { min: 1, max: 1000 };

        let mut diags = Diagnostics::new();
        validator.validate(&Dynamic::Number(500.0), "weight", &mut diags);
        assert!(!diags.has_errors());

        validator.validate(&Dynamic::Number(0.0), "weight", &mut diags);
        assert!(diags.has_errors());
    }

    #[test]
    fn int_at_least_rejects_below_min() {
        let validator = IntAtLeast { min: 1 };

        let mut diags = Diagnostics::new();
        validator.validate(&Dynamic::Number(0.0), "target_instance_count", &mut diags);

        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn string_is_not_empty() {
        let mut diags = Diagnostics::new();
        StringIsNotEmpty.validate(&Dynamic::String(String::new()), "primary_key", &mut diags);
        assert!(diags.has_errors());
    }

    #[test]
    fn string_match_rejects_non_matching() {
        let validator = StringMatch::new(
            "^([01][0-9]|[2][0-3]):([03][0])$",
            "Time of day must match the format HH:mm where HH is 00-23 and mm is 00 or 30",
        );

        let mut diags = Diagnostics::new();
        validator.validate(&Dynamic::String("16:00".to_string()), "time", &mut diags);
        assert!(!diags.has_errors());

        validator.validate(&Dynamic::String("16:15".to_string()), "time", &mut diags);
        assert!(diags.has_errors());
    }

    #[test]
    fn is_uuid_accepts_canonical_form() {
        let mut diags = Diagnostics::new();
        IsUuid.validate(
            &Dynamic::String("00000000-0000-0000-0000-000000000000".to_string()),
            "log_analytics_workspace_id",
            &mut diags,
        );
        assert!(!diags.has_errors());

        IsUuid.validate(
            &Dynamic::String("not-a-uuid".to_string()),
            "log_analytics_workspace_id",
            &mut diags,
        );
        assert!(diags.has_errors());
    }

    #[test]
    fn validate_fn_collects_warnings_and_errors() {
        fn only_https(value: &Dynamic, key: &str) -> (Vec<String>, Vec<String>) {
            let mut errors = Vec::new();
            if let Some(s) = value.as_str() {
                if !s.starts_with("https://") {
                    errors.push(format!("{} must be an https URL", key));
                }
            }
            (Vec::new(), errors)
        }

        let validator = ValidateFn(only_https);
        let mut diags = Diagnostics::new();
        validator.validate(&Dynamic::String("http://x".to_string()), "uri", &mut diags);

        assert_eq!(diags.errors.len(), 1);
    }
}
