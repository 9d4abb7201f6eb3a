//! Posting a review: resolve the target, validate, persist.

use crate::forms::{ReviewFields, ReviewForm, ReviewValidator};
use crate::models::review::{Review, UserId};
use crate::models::target::{TargetRef, TypeTag};
use crate::registry::{RepositoryError, ResolveError, TypeRegistry};
use crate::store::ReviewStore;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Fields posted to the submission endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewPayload {
    #[serde(rename = "typeTag", alias = "content_type", default)]
    pub type_tag: Option<String>,
    #[serde(rename = "primaryKey", alias = "object_pk", default)]
    pub primary_key: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
}

impl ReviewPayload {
    fn fields(&self) -> ReviewFields {
        ReviewFields {
            rating: self.rating.clone().unwrap_or_default(),
            title: self.title.clone().unwrap_or_default(),
            content: self.content.clone().unwrap_or_default(),
        }
    }

    /// The redirect target, if it is usable as a `Location` header. Blank
    /// values and values carrying control characters count as absent.
    fn next(&self) -> Option<String> {
        let next = self.next.as_deref()?;
        if next.chars().any(char::is_control) {
            warn!(next, "ignoring next with control characters");
            return None;
        }
        Some(next.to_string()).filter(|next| !next.trim().is_empty())
    }
}

/// A submission that cannot have come from a rendered review form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BadRequest {
    #[error("Missing typeTag or primaryKey field.")]
    MissingTarget,
    #[error("Invalid typeTag value: {0:?}")]
    InvalidType(String),
    #[error("The given type tag {0} does not resolve to a valid type.")]
    UnknownType(String),
    #[error("No object matching type {type_tag} and primary key {primary_key:?} exists.")]
    ObjectNotFound { type_tag: TypeTag, primary_key: String },
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    BadRequest(#[from] BadRequest),
    #[error("review store error: {0}")]
    Store(#[from] rusqlite::Error),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<ResolveError> for SubmissionError {
    fn from(err: ResolveError) -> Self {
        let bad = match err {
            ResolveError::Store(e) => return SubmissionError::Repository(e),
            ResolveError::MalformedTypeTag(malformed) => BadRequest::InvalidType(malformed.0),
            ResolveError::UnknownType(tag) => BadRequest::UnknownType(tag),
            ResolveError::NotFound {
                type_tag,
                primary_key,
            } => BadRequest::ObjectNotFound {
                type_tag,
                primary_key,
            },
            ResolveError::DuplicateType(tag) => BadRequest::UnknownType(tag.to_string()),
            ResolveError::UnregisteredType(pk) => BadRequest::UnknownType(pk),
        };
        SubmissionError::BadRequest(bad)
    }
}

/// Outcome of a well-formed submission.
#[derive(Debug)]
pub enum Submission {
    /// The review was saved. Redirect to `next` when there is one.
    Created {
        review: Review,
        next: Option<String>,
    },
    /// Validation failed; nothing was saved. Re-display `form` using the
    /// first of `template_names` that exists.
    Rejected {
        form: ReviewForm,
        template_names: Vec<String>,
    },
}

#[derive(Clone)]
pub struct ReviewSubmitter {
    registry: Arc<TypeRegistry>,
    store: ReviewStore,
    validator: ReviewValidator,
}

impl ReviewSubmitter {
    pub fn new(registry: Arc<TypeRegistry>, store: ReviewStore, validator: ReviewValidator) -> Self {
        Self {
            registry,
            store,
            validator,
        }
    }

    pub fn validator(&self) -> &ReviewValidator {
        &self.validator
    }

    /// Resolves the payload's target, validates the fields and saves the
    /// review, attributed to `user_id` when given.
    pub async fn submit(
        &self,
        payload: ReviewPayload,
        user_id: Option<UserId>,
    ) -> Result<Submission, SubmissionError> {
        let target = self.resolve_target(&payload).await?;
        let next = payload.next();
        let form = ReviewForm::bound(target.clone(), payload.fields(), next.clone(), &self.validator);

        let Some(new_review) = form.new_review(user_id) else {
            debug!(%target, errors = ?form.errors(), "review rejected");
            return Ok(Submission::Rejected {
                template_names: preview_template_names(&target.type_tag),
                form,
            });
        };

        let review = self.store.create(new_review).await?;
        info!(%target, review = %review.id(), "review posted");
        Ok(Submission::Created { review, next })
    }

    /// The form shown on the submission page: bound to the payload's target
    /// when it resolves, unbound otherwise.
    pub async fn blank_form(&self, payload: &ReviewPayload) -> Result<ReviewForm, RepositoryError> {
        let target = match self.resolve_target(payload).await {
            Ok(target) => Some(target),
            Err(SubmissionError::Store(e)) => return Err(e.into()),
            Err(SubmissionError::Repository(e)) => return Err(e),
            Err(SubmissionError::BadRequest(_)) => None,
        };
        Ok(ReviewForm::blank(target, &self.validator).with_next(payload.next()))
    }

    async fn resolve_target(&self, payload: &ReviewPayload) -> Result<TargetRef, SubmissionError> {
        let (Some(type_tag), Some(primary_key)) = (
            payload.type_tag.as_deref().filter(|s| !s.is_empty()),
            payload.primary_key.as_deref().filter(|s| !s.is_empty()),
        ) else {
            return Err(BadRequest::MissingTarget.into());
        };

        let type_tag = self.registry.parse_type_tag(type_tag).map_err(|err| {
            warn!(type_tag, "{err}");
            SubmissionError::from(err)
        })?;
        let target = TargetRef::new(type_tag, primary_key);
        self.registry.resolve(&target).await?;
        Ok(target)
    }
}

/// Candidate preview templates for a rejected form, most specific first.
pub fn preview_template_names(type_tag: &TypeTag) -> Vec<String> {
    vec![
        format!("reviews/{}_{}_preview.html", type_tag.namespace(), type_tag.kind()),
        format!("reviews/{}_preview.html", type_tag.namespace()),
        "reviews/preview.html".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_template_names() {
        let tag: TypeTag = "catalog.item".parse().unwrap();
        assert_eq!(
            preview_template_names(&tag),
            vec![
                "reviews/catalog_item_preview.html",
                "reviews/catalog_preview.html",
                "reviews/preview.html",
            ]
        );
    }

    #[test]
    fn test_payload_accepts_legacy_field_names() {
        let payload: ReviewPayload =
            serde_json::from_value(serde_json::json!({ "content_type": "catalog.item", "object_pk": "3" }))
                .unwrap();
        assert_eq!(payload.type_tag.as_deref(), Some("catalog.item"));
        assert_eq!(payload.primary_key.as_deref(), Some("3"));
    }

    #[test]
    fn test_blank_next_is_ignored() {
        let payload = ReviewPayload {
            next: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(payload.next(), None);
    }

    #[test]
    fn test_next_with_control_characters_is_ignored() {
        let payload = ReviewPayload {
            next: Some("/x\nSet-Cookie: a=b".into()),
            ..Default::default()
        };
        assert_eq!(payload.next(), None);

        let payload = ReviewPayload {
            next: Some("/items/caf\u{e9}?page=2".into()),
            ..Default::default()
        };
        assert_eq!(payload.next().as_deref(), Some("/items/caf\u{e9}?page=2"));
    }

    #[test]
    fn test_resolve_errors_map_to_bad_requests() {
        let malformed: SubmissionError = ResolveError::from(crate::models::target::MalformedTypeTag("x".into())).into();
        assert!(matches!(
            malformed,
            SubmissionError::BadRequest(BadRequest::InvalidType(ref s)) if s == "x"
        ));

        let unknown: SubmissionError = ResolveError::UnknownType("shop.product".into()).into();
        assert!(matches!(
            unknown,
            SubmissionError::BadRequest(BadRequest::UnknownType(_))
        ));
    }
}
