//! Drops content created or edited after the trigger instant.
//!
//! An item is admitted iff `created_at <= T` and, when present,
//! `last_edited_at <= T`. Without a trigger instant every item is admitted.
//! Runs before any text reaches the sanitizer or the prompt formatter.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::entity::FetchedEntity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FenceReport {
    pub body_dropped: bool,
    pub timeline_dropped: usize,
    pub reviews_dropped: usize,
    pub review_comments_dropped: usize,
}

impl FenceReport {
    pub fn is_empty(&self) -> bool {
        !self.body_dropped
            && self.timeline_dropped == 0
            && self.reviews_dropped == 0
            && self.review_comments_dropped == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFence {
    trigger_time: Option<DateTime<Utc>>,
}

impl TimeFence {
    pub fn new(trigger_time: Option<DateTime<Utc>>) -> Self {
        Self { trigger_time }
    }

    pub fn trigger_time(&self) -> Option<DateTime<Utc>> {
        self.trigger_time
    }

    pub fn admits(
        &self,
        created_at: DateTime<Utc>,
        last_edited_at: Option<DateTime<Utc>>,
    ) -> bool {
        let Some(trigger_time) = self.trigger_time else {
            return true;
        };
        created_at <= trigger_time && last_edited_at.map_or(true, |edited| edited <= trigger_time)
    }

    /// Entity body check. GitHub leaves `lastEditedAt` null for some body
    /// edits, so `updatedAt` stands in for it.
    pub fn is_body_safe_to_use(&self, entity: &FetchedEntity) -> bool {
        self.admits(
            entity.created_at,
            Some(entity.last_edited_at.unwrap_or(entity.updated_at)),
        )
    }

    /// Filters `entity` in place and marks the body unsafe when needed.
    pub fn apply(&self, entity: &mut FetchedEntity) -> FenceReport {
        let mut report = FenceReport::default();
        if self.trigger_time.is_none() {
            return report;
        }

        if !self.is_body_safe_to_use(entity) {
            entity.body_safe = false;
            report.body_dropped = true;
        }

        let before = entity.timeline.len();
        entity
            .timeline
            .retain(|item| self.admits(item.created_at(), item.last_edited_at()));
        report.timeline_dropped = before - entity.timeline.len();

        let before = entity.reviews.len();
        entity
            .reviews
            .retain(|review| self.admits(review.created_at, review.last_edited_at));
        report.reviews_dropped = before - entity.reviews.len();

        for review in &mut entity.reviews {
            let before = review.comments.len();
            review
                .comments
                .retain(|comment| self.admits(comment.created_at, comment.last_edited_at));
            report.review_comments_dropped += before - review.comments.len();
        }

        if !report.is_empty() {
            info!(
                number = entity.number,
                body_dropped = report.body_dropped,
                timeline_dropped = report.timeline_dropped,
                reviews_dropped = report.reviews_dropped,
                review_comments_dropped = report.review_comments_dropped,
                "time fence excluded content edited after trigger"
            );
        }
        report
    }
}
