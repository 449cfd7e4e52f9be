//! Phone number normalization and validation
//!
//! Pure string transformation; no session or network interaction.

use crate::config::DispatchConfig;

/// Result of normalizing a raw contact value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumberCheck {
    /// Digits-only, prefix-resolved, length-validated number
    Valid(String),
    /// Original raw value, kept for the outcome record
    Invalid(String),
}

impl NumberCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, NumberCheck::Valid(_))
    }
}

/// Normalize and validate a raw contact value.
///
/// Strips all non-digit characters. A leading zero is replaced with the
/// configured default country prefix — deployment policy, not a universal
/// phone-number rule. The result must fall inside the configured length
/// window (inclusive) to be considered valid.
pub fn format_number(raw: &str, cfg: &DispatchConfig) -> NumberCheck {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    let normalized = if let Some(rest) = digits.strip_prefix('0') {
        format!("{}{}", cfg.default_country_prefix, rest)
    } else {
        digits
    };

    if normalized.len() >= cfg.min_length && normalized.len() <= cfg.max_length {
        NumberCheck::Valid(normalized)
    } else {
        NumberCheck::Invalid(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> DispatchConfig {
        DispatchConfig::default()
    }

    #[test]
    fn strips_punctuation_and_spaces() {
        assert_eq!(
            format_number("+91 98765-43210", &cfg()),
            NumberCheck::Valid("919876543210".to_string())
        );
    }

    #[test]
    fn leading_zero_gets_country_prefix() {
        assert_eq!(
            format_number("09876543210", &cfg()),
            NumberCheck::Valid("919876543210".to_string())
        );
    }

    #[test]
    fn too_short_is_invalid_and_keeps_raw() {
        assert_eq!(
            format_number("12345", &cfg()),
            NumberCheck::Invalid("12345".to_string())
        );
    }

    #[test]
    fn too_long_is_invalid() {
        let long = "9".repeat(16);
        assert_eq!(format_number(&long, &cfg()), NumberCheck::Invalid(long));
    }

    #[test]
    fn formatting_is_idempotent() {
        let once = match format_number("0987-654-3210", &cfg()) {
            NumberCheck::Valid(n) => n,
            other => panic!("expected valid, got {:?}", other),
        };
        assert_eq!(format_number(&once, &cfg()), NumberCheck::Valid(once));
    }

    #[test]
    fn prefix_is_configurable() {
        let mut c = cfg();
        c.default_country_prefix = "44".to_string();
        assert_eq!(
            format_number("07700900123", &c),
            NumberCheck::Valid("447700900123".to_string())
        );
    }
}
