// src/models/review.rs
use crate::models::target::TargetRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Reference to an identity authenticated outside this crate.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored review. Only the store builds these, so `id` and `created_at`
/// have no setters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Review {
    id: Uuid,
    pub rating: u16,
    pub title: String,
    pub content: String,
    created_at: DateTime<Utc>,
    pub user_id: Option<UserId>,
    pub target: TargetRef,
}

impl Review {
    pub(crate) fn from_parts(id: Uuid, created_at: DateTime<Utc>, new: NewReview) -> Self {
        Review {
            id,
            rating: new.rating,
            title: new.title,
            content: new.content,
            created_at,
            user_id: new.user_id,
            target: new.target,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A validated review that has not been saved yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub rating: u16,
    pub title: String,
    pub content: String,
    pub user_id: Option<UserId>,
    pub target: TargetRef,
}
