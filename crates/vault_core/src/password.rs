//! Master-password policy for saving a vault file.
//!
//! The predicate is pure and total: it never errors, it only reports which
//! rules a candidate satisfies. A policy failure blocks the save locally and
//! is never sent to the backend.

pub const MIN_PASSWORD_LEN: usize = 10;
pub const MAX_PASSWORD_LEN: usize = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PasswordValidation {
    pub is_valid: bool,
    pub has_number: bool,
    pub has_lowercase: bool,
    pub has_uppercase: bool,
    pub is_length_valid: bool,
}

/// Checks a candidate master password against the vault policy: length in
/// `[MIN_PASSWORD_LEN, MAX_PASSWORD_LEN]` inclusive, at least one digit, one
/// lowercase and one uppercase letter. All four are required for `is_valid`.
pub fn validate(candidate: &str) -> PasswordValidation {
    let has_number = candidate.chars().any(|c| c.is_ascii_digit());
    let has_lowercase = candidate.chars().any(|c| c.is_lowercase());
    let has_uppercase = candidate.chars().any(|c| c.is_uppercase());
    let length = candidate.chars().count();
    let is_length_valid = (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&length);

    PasswordValidation {
        is_valid: has_number && has_lowercase && has_uppercase && is_length_valid,
        has_number,
        has_lowercase,
        has_uppercase,
        is_length_valid,
    }
}

/// Gate for confirm-password flows: both entries must match and the candidate
/// must pass the policy.
pub fn matches(candidate: &str, confirmation: &str) -> bool {
    candidate == confirmation && validate(candidate).is_valid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_password_satisfying_all_rules() {
        let validation = validate("Abcdef12345");
        assert!(validation.is_valid);
        assert!(validation.has_number);
        assert!(validation.has_lowercase);
        assert!(validation.has_uppercase);
        assert!(validation.is_length_valid);
    }

    #[test]
    fn length_bounds_are_inclusive() {
        assert!(!validate("Abcdef123").is_valid); // 9 chars
        assert!(validate("Abcdef1234").is_valid); // 10 chars
        assert!(validate("Abcdef1234567890123").is_valid); // 19 chars
        assert!(!validate("Abcdef12345678901234").is_valid); // 20 chars
    }

    #[test]
    fn each_character_class_is_required() {
        let missing_digit = validate("Abcdefghijk");
        assert!(!missing_digit.is_valid);
        assert!(!missing_digit.has_number);

        let missing_lower = validate("ABCDEF12345");
        assert!(!missing_lower.is_valid);
        assert!(!missing_lower.has_lowercase);

        let missing_upper = validate("abcdef12345");
        assert!(!missing_upper.is_valid);
        assert!(!missing_upper.has_uppercase);
    }

    #[test]
    fn empty_candidate_fails_every_rule() {
        assert_eq!(validate(""), PasswordValidation::default());
    }

    #[test]
    fn matches_requires_equality_and_policy() {
        assert!(matches("Abcdef12345", "Abcdef12345"));
        assert!(!matches("Abcdef12345", "Abcdef12346"));
        // Equal but too weak.
        assert!(!matches("short", "short"));
    }
}
