//! Play events
//!
//! [`UpdateRequest`] is the JSON body clients post to `/api/update`.
//! [`PlayEvent`] is its validated form, the only thing the evaluator accepts.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::types::QuizError;

/// Largest integer a JavaScript client can send without losing precision
pub const MAX_CLIENT_XP: f64 = 9_007_199_254_740_991.0;

/// Longest accepted category name
pub const MAX_CATEGORY_LEN: usize = 64;

/// Longest accepted avatar name
pub const MAX_AVATAR_LEN: usize = 64;

/// Raw update body
///
/// Fields are kept as loose JSON so that a value of the wrong type is a
/// validation failure for that field, not a rejected body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    #[serde(default)]
    pub xp: Option<Value>,
    #[serde(default)]
    pub avatar: Option<Value>,
    #[serde(default)]
    pub achievement_id: Option<Value>,
    #[serde(default)]
    pub category: Option<Value>,
    #[serde(default)]
    pub time_taken: Option<Value>,
    #[serde(default)]
    pub is_perfect: Option<Value>,
}

/// How to treat an invalid field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Reject the whole request
    Strict,
    /// Drop the offending field and continue
    Lenient,
}

/// A validated play event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayEvent {
    /// Absolute XP total to store before evaluation
    pub xp: Option<u64>,
    pub achievement_id: Option<String>,
    pub category: Option<String>,
    pub time_taken_seconds: Option<f64>,
    pub is_perfect: bool,
}

impl PlayEvent {
    pub fn with_xp(mut self, xp: u64) -> Self {
        self.xp = Some(xp);
        self
    }

    pub fn with_achievement(mut self, id: impl Into<String>) -> Self {
        self.achievement_id = Some(id.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_time_taken(mut self, seconds: f64) -> Self {
        self.time_taken_seconds = Some(seconds);
        self
    }

    pub fn perfect(mut self) -> Self {
        self.is_perfect = true;
        self
    }
}

/// Validated update: the play event plus the avatar change, if any
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedUpdate {
    pub event: PlayEvent,
    pub avatar: Option<String>,
}

impl UpdateRequest {
    /// Validate every field.
    ///
    /// In strict mode the first invalid field fails the request with
    /// [`QuizError::Validation`]; in lenient mode invalid fields are dropped.
    pub fn validate(&self, mode: ValidationMode) -> Result<ValidatedUpdate, QuizError> {
        let mut update = ValidatedUpdate::default();

        update.event.xp = keep_valid(
            mode,
            "xp",
            present(&self.xp).map(|v| as_number(v).and_then(validate_xp)).transpose(),
        )?;
        update.event.time_taken_seconds = keep_valid(
            mode,
            "timeTaken",
            present(&self.time_taken)
                .map(|v| as_number(v).and_then(validate_time))
                .transpose(),
        )?;
        update.event.category = keep_valid(
            mode,
            "category",
            present(&self.category)
                .map(|v| as_text(v).and_then(validate_category))
                .transpose(),
        )?
        .flatten();
        update.event.is_perfect = keep_valid(
            mode,
            "isPerfect",
            present(&self.is_perfect).map(as_flag).transpose(),
        )?
        .unwrap_or(false);
        update.avatar = keep_valid(
            mode,
            "avatar",
            present(&self.avatar)
                .map(|v| as_text(v).and_then(validate_avatar))
                .transpose(),
        )?
        .flatten();

        // An empty id means "no achievement"; unknown ids are ignored later
        update.event.achievement_id = keep_valid(
            mode,
            "achievementId",
            present(&self.achievement_id).map(as_text).transpose(),
        )?
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

        Ok(update)
    }
}

/// A JSON `null` counts as absent
fn present(value: &Option<Value>) -> Option<&Value> {
    value.as_ref().filter(|v| !v.is_null())
}

fn as_number(value: &Value) -> Result<f64, String> {
    value.as_f64().ok_or_else(|| "must be a number".to_string())
}

fn as_text(value: &Value) -> Result<&str, String> {
    value.as_str().ok_or_else(|| "must be a string".to_string())
}

fn as_flag(value: &Value) -> Result<bool, String> {
    value.as_bool().ok_or_else(|| "must be true or false".to_string())
}

fn keep_valid<T>(
    mode: ValidationMode,
    field: &str,
    result: Result<Option<T>, String>,
) -> Result<Option<T>, QuizError> {
    match result {
        Ok(value) => Ok(value),
        Err(reason) => match mode {
            ValidationMode::Strict => Err(QuizError::Validation(format!("{}: {}", field, reason))),
            ValidationMode::Lenient => {
                warn!(field, reason = %reason, "Dropping invalid update field");
                Ok(None)
            }
        },
    }
}

fn validate_xp(xp: f64) -> Result<u64, String> {
    if !xp.is_finite() {
        return Err("must be a finite number".into());
    }
    if xp < 0.0 {
        return Err("must not be negative".into());
    }
    if xp.fract() != 0.0 {
        return Err("must be a whole number".into());
    }
    if xp > MAX_CLIENT_XP {
        return Err("is too large".into());
    }
    Ok(xp as u64)
}

fn validate_time(seconds: f64) -> Result<f64, String> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err("must be a non-negative number of seconds".into());
    }
    Ok(seconds)
}

/// Category names become keys of a stored document, so `.` and a leading `$`
/// are not allowed. A blank category counts as absent.
fn validate_category(category: &str) -> Result<Option<String>, String> {
    let category = category.trim();
    if category.is_empty() {
        return Ok(None);
    }
    if category.chars().count() > MAX_CATEGORY_LEN {
        return Err(format!("must be at most {} characters", MAX_CATEGORY_LEN));
    }
    if category.contains('.') || category.starts_with('$') || category.contains('\0') {
        return Err("contains reserved characters".into());
    }
    Ok(Some(category.to_string()))
}

fn validate_avatar(avatar: &str) -> Result<Option<String>, String> {
    let avatar = avatar.trim();
    if avatar.is_empty() {
        return Ok(None);
    }
    if avatar.chars().count() > MAX_AVATAR_LEN {
        return Err(format!("must be at most {} characters", MAX_AVATAR_LEN));
    }
    Ok(Some(avatar.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> UpdateRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_full_body() {
        let req = parse(
            r#"{"xp": 120, "avatar": "Ninja", "achievementId": "first_win",
                "category": "Math", "timeTaken": 8.5, "isPerfect": true}"#,
        );
        let update = req.validate(ValidationMode::Strict).unwrap();

        assert_eq!(update.avatar.as_deref(), Some("Ninja"));
        assert_eq!(
            update.event,
            PlayEvent::default()
                .with_xp(120)
                .with_achievement("first_win")
                .with_category("Math")
                .with_time_taken(8.5)
                .perfect()
        );
    }

    #[test]
    fn test_empty_body() {
        let update = parse("{}").validate(ValidationMode::Strict).unwrap();
        assert_eq!(update, ValidatedUpdate::default());
    }

    #[test]
    fn test_negative_xp_strict() {
        let err = parse(r#"{"xp": -5}"#)
            .validate(ValidationMode::Strict)
            .unwrap_err();
        assert!(matches!(err, QuizError::Validation(msg) if msg.starts_with("xp")));
    }

    #[test]
    fn test_negative_xp_lenient_drops_field() {
        let update = parse(r#"{"xp": -5, "category": "Math"}"#)
            .validate(ValidationMode::Lenient)
            .unwrap();
        assert_eq!(update.event.xp, None);
        assert_eq!(update.event.category.as_deref(), Some("Math"));
    }

    #[test]
    fn test_fractional_xp_rejected() {
        assert!(parse(r#"{"xp": 10.5}"#).validate(ValidationMode::Strict).is_err());
    }

    #[test]
    fn test_bad_time_rejected() {
        assert!(parse(r#"{"timeTaken": -1}"#)
            .validate(ValidationMode::Strict)
            .is_err());
    }

    #[test]
    fn test_reserved_category_rejected() {
        assert!(parse(r#"{"category": "a.b"}"#)
            .validate(ValidationMode::Strict)
            .is_err());
        assert!(parse(r#"{"category": "$set"}"#)
            .validate(ValidationMode::Strict)
            .is_err());
    }

    #[test]
    fn test_blank_fields_are_absent() {
        let update = parse(r#"{"category": "  ", "avatar": "", "achievementId": ""}"#)
            .validate(ValidationMode::Strict)
            .unwrap();
        assert_eq!(update, ValidatedUpdate::default());
    }

    #[test]
    fn test_wrong_type_is_a_validation_error() {
        let err = parse(r#"{"xp": "lots"}"#)
            .validate(ValidationMode::Strict)
            .unwrap_err();
        assert!(matches!(err, QuizError::Validation(ref msg) if msg.starts_with("xp")));
        assert_eq!(err.status_code(), hyper::StatusCode::UNPROCESSABLE_ENTITY);

        assert!(parse(r#"{"isPerfect": "yes"}"#)
            .validate(ValidationMode::Strict)
            .is_err());
        assert!(parse(r#"{"achievementId": 7}"#)
            .validate(ValidationMode::Strict)
            .is_err());
    }

    #[test]
    fn test_wrong_type_lenient_drops_field() {
        let update = parse(r#"{"category": 5, "isPerfect": true, "avatar": ["x"]}"#)
            .validate(ValidationMode::Lenient)
            .unwrap();
        assert_eq!(update.event, PlayEvent::default().perfect());
        assert_eq!(update.avatar, None);
    }

    #[test]
    fn test_null_fields_are_absent() {
        let update = parse(r#"{"xp": null, "category": null, "isPerfect": null}"#)
            .validate(ValidationMode::Strict)
            .unwrap();
        assert_eq!(update, ValidatedUpdate::default());
    }
}
