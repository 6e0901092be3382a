//! Feedback-driven rank updates
//!
//! Click, upvote and downvote adjust a Q&A row's rank score by fixed
//! deltas. The score update is the one operation that must succeed; the
//! audit log is best-effort and cache invalidation follows.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::{response_cache_key, MemoryStore};
use crate::error::{CollegiumError, Result};
use crate::storage::{Database, Tenant};

/// A feedback action and its rank-score delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackAction {
    Click,
    Upvote,
    Downvote,
}

impl FeedbackAction {
    pub fn delta(self) -> f64 {
        match self {
            FeedbackAction::Click => 0.5,
            FeedbackAction::Upvote => 1.5,
            FeedbackAction::Downvote => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackAction::Click => "click",
            FeedbackAction::Upvote => "upvote",
            FeedbackAction::Downvote => "downvote",
        }
    }
}

impl FromStr for FeedbackAction {
    type Err = CollegiumError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "click" => Ok(FeedbackAction::Click),
            "upvote" => Ok(FeedbackAction::Upvote),
            "downvote" => Ok(FeedbackAction::Downvote),
            other => Err(CollegiumError::BadInput(format!(
                "unknown feedback action '{other}'"
            ))),
        }
    }
}

/// Applies feedback to storage and keeps the response cache honest.
pub struct FeedbackUpdater {
    db: Arc<Database>,
    cache: Arc<MemoryStore>,
    clamp: Option<(f64, f64)>,
}

impl FeedbackUpdater {
    pub fn new(db: Arc<Database>, cache: Arc<MemoryStore>, clamp: Option<(f64, f64)>) -> Self {
        Self { db, cache, clamp }
    }

    /// Apply one feedback action for a tenant.
    ///
    /// `normalized_query` and `limit` identify the response the feedback
    /// came from, so its cache entry (and the browse entry at the same
    /// limit) can be dropped.
    #[allow(clippy::too_many_arguments)]
    pub fn apply(
        &self,
        tenant: &Tenant,
        target_id: i64,
        action: FeedbackAction,
        client_ip: &str,
        user_agent: Option<&str>,
        normalized_query: &str,
        limit: usize,
    ) -> Result<()> {
        if target_id <= 0 {
            return Err(CollegiumError::BadInput(
                "feedback target id must be positive".to_string(),
            ));
        }

        let updated =
            self.db
                .apply_feedback_delta(&tenant.id, target_id, action.delta(), self.clamp)?;
        if updated == 0 {
            return Err(CollegiumError::BadInput(format!(
                "feedback target {target_id} not found"
            )));
        }

        // Audit trail is best-effort; a failed insert must not undo the
        // rank update the user already caused.
        let meta = serde_json::json!({ "query": normalized_query });
        if let Err(e) = self.db.log_interaction(
            &tenant.id,
            target_id,
            action.as_str(),
            client_ip,
            user_agent,
            Some(&meta),
        ) {
            tracing::warn!(
                tenant = %tenant.id,
                target_id,
                "failed to log feedback interaction: {e}"
            );
        }

        // Only the exact keys this feedback can have come from; stale
        // entries for other queries age out via TTL.
        self.cache
            .delete(&response_cache_key(&tenant.id, normalized_query, limit));
        self.cache.delete(&response_cache_key(&tenant.id, "", limit));

        tracing::debug!(
            tenant = %tenant.id,
            target_id,
            action = action.as_str(),
            "applied feedback"
        );
        Ok(())
    }
}
