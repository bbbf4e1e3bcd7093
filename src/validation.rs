//! Input validation for request fields
//!
//! Length caps and character allow-lists keep free-text exercise phrases
//! from becoming injection vectors or pathological index scans.

use anyhow::{anyhow, Result};

/// Maximum lengths for security
pub const MAX_EXERCISE_NAME_LENGTH: usize = 200;
pub const MAX_USER_ID_LENGTH: usize = 128;
pub const MAX_BODY_PART_LENGTH: usize = 64;
pub const MAX_REASON_LENGTH: usize = 500;

/// Validate a free-text exercise name
///
/// Voice transcription produces letters, digits, spaces and light
/// punctuation; anything else is noise we refuse early.
pub fn validate_exercise_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(anyhow!("exercise name cannot be empty"));
    }

    if name.len() > MAX_EXERCISE_NAME_LENGTH {
        return Err(anyhow!(
            "exercise name too long: {} chars (max: {})",
            name.len(),
            MAX_EXERCISE_NAME_LENGTH
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c.is_whitespace() || "-_'&/.,()".contains(c))
    {
        return Err(anyhow!(
            "exercise name contains invalid characters (allowed: alphanumeric, space, -_'&/.,())"
        ));
    }

    Ok(())
}

/// Validate user_id
pub fn validate_user_id(user_id: &str) -> Result<()> {
    if user_id.is_empty() {
        return Err(anyhow!("user_id cannot be empty"));
    }

    if user_id.len() > MAX_USER_ID_LENGTH {
        return Err(anyhow!(
            "user_id too long: {} chars (max: {})",
            user_id.len(),
            MAX_USER_ID_LENGTH
        ));
    }

    // Only allow alphanumeric, dash, underscore, @, .
    if !user_id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '@' || c == '.')
    {
        return Err(anyhow!(
            "user_id contains invalid characters (allowed: alphanumeric, -, _, @, .)"
        ));
    }

    Ok(())
}

/// Validate a fuzzy-match threshold override
pub fn validate_threshold(threshold: f32) -> Result<()> {
    if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
        return Err(anyhow!("threshold must be within [0, 1], got {threshold}"));
    }
    Ok(())
}

/// Validate an injured-body-part string
pub fn validate_body_part(body_part: &str) -> Result<()> {
    if body_part.trim().is_empty() {
        return Err(anyhow!("body part cannot be empty"));
    }

    if body_part.len() > MAX_BODY_PART_LENGTH {
        return Err(anyhow!(
            "body part too long: {} chars (max: {})",
            body_part.len(),
            MAX_BODY_PART_LENGTH
        ));
    }

    if !body_part
        .chars()
        .all(|c| c.is_alphabetic() || c.is_whitespace() || c == '-')
    {
        return Err(anyhow!("body part must be alphabetic"));
    }

    Ok(())
}

/// Validate the optional free-text substitution reason
pub fn validate_reason(reason: &str) -> Result<()> {
    if reason.len() > MAX_REASON_LENGTH {
        return Err(anyhow!(
            "reason too long: {} chars (max: {})",
            reason.len(),
            MAX_REASON_LENGTH
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exercise_name_valid() {
        assert!(validate_exercise_name("Dumbbell Bench Press").is_ok());
        assert!(validate_exercise_name("21s (barbell curl)").is_ok());
        assert!(validate_exercise_name("farmer's carry").is_ok());
    }

    #[test]
    fn test_exercise_name_rejects_empty_and_oversized() {
        assert!(validate_exercise_name("").is_err());
        assert!(validate_exercise_name("   ").is_err());
        assert!(validate_exercise_name(&"x".repeat(300)).is_err());
    }

    #[test]
    fn test_exercise_name_rejects_control_chars() {
        assert!(validate_exercise_name("bench\u{0} press").is_err());
        assert!(validate_exercise_name("squat<script>").is_err());
    }

    #[test]
    fn test_user_id() {
        assert!(validate_user_id("user_123").is_ok());
        assert!(validate_user_id("a@b.com").is_ok());
        assert!(validate_user_id("").is_err());
        assert!(validate_user_id("user 123").is_err());
    }

    #[test]
    fn test_threshold_bounds() {
        assert!(validate_threshold(0.0).is_ok());
        assert!(validate_threshold(0.8).is_ok());
        assert!(validate_threshold(1.0).is_ok());
        assert!(validate_threshold(-0.1).is_err());
        assert!(validate_threshold(1.1).is_err());
        assert!(validate_threshold(f32::NAN).is_err());
    }

    #[test]
    fn test_body_part() {
        assert!(validate_body_part("shoulder").is_ok());
        assert!(validate_body_part("lower back").is_ok());
        assert!(validate_body_part("").is_err());
        assert!(validate_body_part("knee;drop table").is_err());
    }
}
