//! Issue detail panel and its discussion thread
//!
//! The `comments` column holds the whole thread. Adding a comment re-reads
//! the row, appends, and writes the full array back, so two writers racing
//! on the same issue keep only the last write.

use tracing::info;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::models::{Comment, Issue, IssuePatch, User};
use crate::store::IssueStore;

/// Thread with `comment` appended, order preserved
pub fn append(thread: &[Comment], comment: Comment) -> Vec<Comment> {
    let mut next = Vec::with_capacity(thread.len() + 1);
    next.extend_from_slice(thread);
    next.push(comment);
    next
}

pub struct DetailPanel<'a> {
    store: &'a dyn IssueStore,
    clock: &'a Clock,
}

impl<'a> DetailPanel<'a> {
    pub(crate) fn new(store: &'a dyn IssueStore, clock: &'a Clock) -> Self {
        Self { store, clock }
    }

    pub async fn issue(&self, id: &str) -> Result<Issue> {
        self.store
            .get_issue(id)
            .await?
            .ok_or_else(|| Error::not_found("Issue not found."))
    }

    /// Append a comment by `author`. Whitespace-only text writes nothing.
    pub async fn add_comment(&self, author: &User, issue_id: &str, text: &str) -> Result<Comment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::validation("Comment is empty"));
        }

        let issue = self.issue(issue_id).await?;

        let comment = Comment {
            user: author.username.clone(),
            msg: text.to_string(),
            time: self.clock.stamp(),
        };
        let patch = IssuePatch {
            comments: Some(append(&issue.comments, comment.clone())),
            ..Default::default()
        };
        self.store.update_issue(issue_id, &patch).await?;

        info!(id = issue_id, author = %author.username, count = issue.comments.len() + 1, "comment added");
        Ok(comment)
    }
}
