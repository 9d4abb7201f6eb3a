//! Review repository built on [`Database`].

use crate::db::Database;
use crate::models::review::{NewReview, Review};
use crate::models::target::TargetRef;
use rusqlite::Error;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ReviewStore {
    db: Database,
}

impl ReviewStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, review: NewReview) -> Result<Review, Error> {
        self.db.insert_review(review).await
    }

    /// Reviews about `target`, newest first. Nothing is queried until the
    /// returned set is fetched.
    pub fn for_target(&self, target: &TargetRef) -> ReviewSet {
        ReviewSet {
            db: self.db.clone(),
            target: Some(target.clone()),
        }
    }

    /// The set that never holds any review.
    pub fn none(&self) -> ReviewSet {
        ReviewSet {
            db: self.db.clone(),
            target: None,
        }
    }

    pub async fn count_for_target(&self, target: &TargetRef) -> Result<usize, Error> {
        self.for_target(target).count().await
    }

    pub async fn average_rating_for_target(&self, target: &TargetRef) -> Result<Option<f64>, Error> {
        self.for_target(target).average_rating().await
    }
}

/// A lazy, restartable query over the reviews of one target.
#[derive(Debug, Clone)]
pub struct ReviewSet {
    db: Database,
    target: Option<TargetRef>,
}

impl ReviewSet {
    pub fn target(&self) -> Option<&TargetRef> {
        self.target.as_ref()
    }

    pub async fn fetch(&self) -> Result<Vec<Review>, Error> {
        match &self.target {
            Some(target) => self.db.reviews_for_target(target).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn count(&self) -> Result<usize, Error> {
        match &self.target {
            Some(target) => self.db.count_reviews_for_target(target).await,
            None => Ok(0),
        }
    }

    /// Mean rating, or `None` when there is nothing to average.
    pub async fn average_rating(&self) -> Result<Option<f64>, Error> {
        let reviews = self.fetch().await?;
        let (sum, count) = reviews
            .iter()
            .fold((0u64, 0u64), |(sum, count), r| (sum + u64::from(r.rating), count + 1));
        if count == 0 {
            return Ok(None);
        }
        let average = sum as f64 / count as f64;
        debug!(reviews = count, average, "computed average rating");
        Ok(Some(average))
    }
}
