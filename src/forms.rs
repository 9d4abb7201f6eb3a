//! The review form: binds submitted fields to a target and validates them.

use crate::config::ReviewSettings;
use crate::models::review::{NewReview, UserId};
use crate::models::target::TargetRef;
use crate::word_filter::WordFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const TITLE_MAX_LENGTH: usize = 255;

const REQUIRED: &str = "This field is required.";

/// Raw, unvalidated field values as they arrived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewFields {
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Field rules, built once from settings.
#[derive(Debug, Clone)]
pub struct ReviewValidator {
    max_content_length: usize,
    word_filter: WordFilter,
}

impl ReviewValidator {
    pub fn new(settings: &ReviewSettings) -> Self {
        Self {
            max_content_length: settings.max_content_length,
            word_filter: WordFilter::from_settings(settings),
        }
    }

    pub fn max_content_length(&self) -> usize {
        self.max_content_length
    }

    fn clean(&self, fields: &ReviewFields) -> Result<CleanedReview, BTreeMap<String, Vec<String>>> {
        let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut fail = |field: &str, message: String| {
            errors.entry(field.to_string()).or_default().push(message);
        };

        let rating = match fields.rating.trim() {
            "" => {
                fail("rating", REQUIRED.to_string());
                None
            }
            raw => match raw.parse::<u16>() {
                Ok(rating) => Some(rating),
                Err(_) => {
                    fail("rating", "Enter a whole number between 0 and 65535.".to_string());
                    None
                }
            },
        };

        let title_length = fields.title.chars().count();
        if fields.title.trim().is_empty() {
            fail("title", REQUIRED.to_string());
        } else if title_length > TITLE_MAX_LENGTH {
            fail(
                "title",
                format!("Ensure this value has at most {TITLE_MAX_LENGTH} characters (it has {title_length})."),
            );
        }

        let content_length = fields.content.chars().count();
        if fields.content.trim().is_empty() {
            fail("content", REQUIRED.to_string());
        } else if content_length > self.max_content_length {
            fail(
                "content",
                format!(
                    "Ensure this value has at most {} characters (it has {content_length}).",
                    self.max_content_length
                ),
            );
        } else if let Err(profane) = self.word_filter.check(&fields.content) {
            fail("content", profane.to_string());
        }

        match rating {
            Some(rating) if errors.is_empty() => Ok(CleanedReview {
                rating,
                title: fields.title.clone(),
                content: fields.content.clone(),
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CleanedReview {
    rating: u16,
    title: String,
    content: String,
}

/// A review form bound to a target. A form is either unsubmitted (blank),
/// or bound to submitted fields and already validated.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewForm {
    target: Option<TargetRef>,
    data: ReviewFields,
    next: Option<String>,
    errors: BTreeMap<String, Vec<String>>,
    is_bound: bool,
    max_content_length: usize,
    #[serde(skip)]
    cleaned: Option<CleanedReview>,
}

impl ReviewForm {
    /// An unsubmitted form for `target`.
    pub fn blank(target: Option<TargetRef>, validator: &ReviewValidator) -> Self {
        Self {
            target,
            data: ReviewFields::default(),
            next: None,
            errors: BTreeMap::new(),
            is_bound: false,
            max_content_length: validator.max_content_length(),
            cleaned: None,
        }
    }

    /// A form holding submitted `fields` for `target`, validated on the spot.
    pub fn bound(
        target: TargetRef,
        fields: ReviewFields,
        next: Option<String>,
        validator: &ReviewValidator,
    ) -> Self {
        let (cleaned, errors) = match validator.clean(&fields) {
            Ok(cleaned) => (Some(cleaned), BTreeMap::new()),
            Err(errors) => (None, errors),
        };
        Self {
            target: Some(target),
            data: fields,
            next,
            errors,
            is_bound: true,
            max_content_length: validator.max_content_length(),
            cleaned,
        }
    }

    pub fn with_next(mut self, next: Option<String>) -> Self {
        self.next = next;
        self
    }

    pub fn target(&self) -> Option<&TargetRef> {
        self.target.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.is_bound
    }

    pub fn is_valid(&self) -> bool {
        self.is_bound && self.cleaned.is_some()
    }

    pub fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    pub fn field_errors(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The unsaved review this form describes, `None` unless valid.
    pub fn new_review(&self, user_id: Option<UserId>) -> Option<NewReview> {
        let cleaned = self.cleaned.as_ref()?;
        let target = self.target.clone()?;
        Some(NewReview {
            rating: cleaned.rating,
            title: cleaned.title.clone(),
            content: cleaned.content.clone(),
            user_id,
            target,
        })
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(max: usize, banned: &[&str], allow: bool) -> ReviewValidator {
        ReviewValidator::new(&ReviewSettings {
            max_content_length: max,
            allow_profanities: allow,
            banned_words: banned.iter().map(|w| w.to_string()).collect(),
        })
    }

    fn target() -> TargetRef {
        TargetRef::new("catalog.item".parse().unwrap(), "1")
    }

    fn fields(rating: &str, title: &str, content: &str) -> ReviewFields {
        ReviewFields {
            rating: rating.into(),
            title: title.into(),
            content: content.into(),
        }
    }

    #[test]
    fn test_valid_form_builds_review() {
        let form = ReviewForm::bound(target(), fields("4", "Nice", "Really nice."), None, &validator(3000, &[], false));
        assert!(form.is_valid());
        let review = form.new_review(Some(UserId("bob".into()))).unwrap();
        assert_eq!(review.rating, 4);
        assert_eq!(review.title, "Nice");
        assert_eq!(review.target, target());
        assert_eq!(review.user_id, Some(UserId("bob".into())));
    }

    #[test]
    fn test_blank_form_is_not_valid() {
        let form = ReviewForm::blank(Some(target()), &validator(3000, &[], false));
        assert!(!form.is_bound());
        assert!(!form.is_valid());
        assert!(form.new_review(None).is_none());
        assert!(form.errors().is_empty());
    }

    #[test]
    fn test_required_fields() {
        let form = ReviewForm::bound(target(), fields("", " ", ""), None, &validator(3000, &[], false));
        assert!(!form.is_valid());
        for field in ["rating", "title", "content"] {
            assert_eq!(form.field_errors(field), [REQUIRED.to_string()]);
        }
    }

    #[test]
    fn test_rating_must_be_non_negative_integer() {
        let v = validator(3000, &[], false);
        for bad in ["-1", "4.5", "five", "70000"] {
            let form = ReviewForm::bound(target(), fields(bad, "t", "c"), None, &v);
            assert_eq!(form.field_errors("rating").len(), 1, "{bad:?} should be rejected");
        }
        let zero = ReviewForm::bound(target(), fields("0", "t", "c"), None, &v);
        assert!(zero.is_valid());
    }

    #[test]
    fn test_length_limits() {
        let v = validator(5, &[], false);
        let long_title = "x".repeat(TITLE_MAX_LENGTH + 1);
        let form = ReviewForm::bound(target(), fields("1", &long_title, "123456"), None, &v);
        assert_eq!(
            form.field_errors("title"),
            ["Ensure this value has at most 255 characters (it has 256).".to_string()]
        );
        assert_eq!(
            form.field_errors("content"),
            ["Ensure this value has at most 5 characters (it has 6).".to_string()]
        );

        let exact = ReviewForm::bound(target(), fields("1", "t", "12345"), None, &v);
        assert!(exact.is_valid());
    }

    #[test]
    fn test_profanity_rejected_unless_allowed() {
        let strict = ReviewForm::bound(target(), fields("1", "t", "What the Heck"), None, &validator(3000, &["heck"], false));
        assert!(!strict.is_valid());
        assert_eq!(
            strict.field_errors("content"),
            ["The word \"h--k\" is not allowed here.".to_string()]
        );

        let lenient = ReviewForm::bound(target(), fields("1", "t", "What the Heck"), None, &validator(3000, &["heck"], true));
        assert!(lenient.is_valid());
    }

    #[test]
    fn test_json_shape_for_templates() {
        let form = ReviewForm::bound(target(), fields("x", "t", "c"), Some("/items/1".into()), &validator(3000, &[], false));
        let json = form.to_json();
        assert_eq!(json["target"]["type_tag"], "catalog.item");
        assert_eq!(json["data"]["title"], "t");
        assert_eq!(json["next"], "/items/1");
        assert_eq!(json["max_content_length"], 3000);
        assert!(json["errors"]["rating"].is_array());
        assert!(json.get("cleaned").is_none());
    }
}
