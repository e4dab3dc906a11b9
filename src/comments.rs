//! Episode comments
//!
//! The comment backend is a document store behind the [`CommentStore`]
//! trait. Identity is never ambient: every write takes the acting
//! [`UserContext`] explicitly.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::{Comment, NewComment, UserContext};

/// Longest accepted comment, in characters
pub const MAX_COMMENT_LEN: usize = 1000;

/// Comment store errors
#[derive(Error, Debug)]
pub enum CommentError {
    #[error("Comment text is empty")]
    EmptyText,

    #[error("Comment is too long ({len} > {max} characters)")]
    TooLong { len: usize, max: usize },

    #[error("Episode id is empty")]
    EmptyEpisodeId,

    #[error("Posting requires a signed-in user")]
    MissingIdentity,

    #[error("Parent comment {0} not found")]
    UnknownParent(String),

    #[error("Parent comment {0} belongs to another episode")]
    ParentOnOtherEpisode(String),

    #[error("Comment storage failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Comment storage is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Interface of the comment backend
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Store a comment and return its new id
    async fn post(&self, ctx: &UserContext, comment: NewComment) -> Result<String, CommentError>;

    /// Top-level comments of an episode, oldest first
    async fn top_level(&self, episode_id: &str) -> Result<Vec<Comment>, CommentError>;

    /// Replies to a comment, oldest first
    async fn replies(&self, parent_id: &str) -> Result<Vec<Comment>, CommentError>;
}

/// Form validation shared by all stores; returns the trimmed comment
pub fn validate(ctx: &UserContext, comment: NewComment) -> Result<NewComment, CommentError> {
    if ctx.id.trim().is_empty() {
        return Err(CommentError::MissingIdentity);
    }
    if comment.episode_id.trim().is_empty() {
        return Err(CommentError::EmptyEpisodeId);
    }

    let text = comment.text.trim();
    if text.is_empty() {
        return Err(CommentError::EmptyText);
    }
    let len = text.chars().count();
    if len > MAX_COMMENT_LEN {
        return Err(CommentError::TooLong {
            len,
            max: MAX_COMMENT_LEN,
        });
    }

    Ok(NewComment {
        episode_id: comment.episode_id.trim().to_string(),
        text: text.to_string(),
        is_spoiler: comment.is_spoiler,
        parent_id: comment
            .parent_id
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()),
    })
}

/// Validate against the existing thread and build the comment to store
fn prepare(
    existing: &[Comment],
    ctx: &UserContext,
    comment: NewComment,
) -> Result<Comment, CommentError> {
    let comment = validate(ctx, comment)?;

    if let Some(parent_id) = &comment.parent_id {
        let parent = existing
            .iter()
            .find(|c| &c.id == parent_id)
            .ok_or_else(|| CommentError::UnknownParent(parent_id.clone()))?;
        if parent.episode_id != comment.episode_id {
            return Err(CommentError::ParentOnOtherEpisode(parent_id.clone()));
        }
    }

    Ok(Comment {
        id: uuid::Uuid::new_v4().to_string(),
        episode_id: comment.episode_id,
        text: comment.text,
        is_spoiler: comment.is_spoiler,
        author_id: ctx.id.clone(),
        author_name: ctx.display_name.clone(),
        author_avatar: ctx.avatar_url.clone(),
        parent_id: comment.parent_id,
        created_at: chrono::Utc::now(),
    })
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryCommentStore {
    comments: RwLock<Vec<Comment>>,
}

impl InMemoryCommentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_comments(comments: Vec<Comment>) -> Self {
        Self {
            comments: RwLock::new(comments),
        }
    }

    async fn query<F>(&self, pred: F) -> Vec<Comment>
    where
        F: Fn(&Comment) -> bool + Send,
    {
        let mut found: Vec<Comment> = self
            .comments
            .read()
            .await
            .iter()
            .filter(|c| pred(c))
            .cloned()
            .collect();
        found.sort_by_key(|c| c.created_at);
        found
    }
}

#[async_trait]
impl CommentStore for InMemoryCommentStore {
    async fn post(&self, ctx: &UserContext, comment: NewComment) -> Result<String, CommentError> {
        let mut comments = self.comments.write().await;
        let stored = prepare(&comments, ctx, comment)?;
        let id = stored.id.clone();
        comments.push(stored);
        debug!(comment_id = %id, author = %ctx.id, "comment stored");
        Ok(id)
    }

    async fn top_level(&self, episode_id: &str) -> Result<Vec<Comment>, CommentError> {
        Ok(self
            .query(|c| c.episode_id == episode_id && c.parent_id.is_none())
            .await)
    }

    async fn replies(&self, parent_id: &str) -> Result<Vec<Comment>, CommentError> {
        Ok(self
            .query(|c| c.parent_id.as_deref() == Some(parent_id))
            .await)
    }
}

/// Store persisted as a JSON document, used by the CLI
pub struct JsonCommentStore {
    path: PathBuf,
    inner: InMemoryCommentStore,
}

impl JsonCommentStore {
    /// Default location (~/.local/share/anistream/comments.json)
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("anistream").join("comments.json"))
    }

    /// Open the store, starting empty when the file does not exist yet
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, CommentError> {
        let path = path.as_ref().to_path_buf();
        let comments = match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            inner: InMemoryCommentStore::with_comments(comments),
        })
    }

    async fn persist(&self, comments: &[Comment]) -> Result<(), CommentError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(comments)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl CommentStore for JsonCommentStore {
    async fn post(&self, ctx: &UserContext, comment: NewComment) -> Result<String, CommentError> {
        // Memory changes only after the file write succeeds
        let mut comments = self.inner.comments.write().await;
        let stored = prepare(&comments, ctx, comment)?;
        let id = stored.id.clone();

        let mut next = comments.clone();
        next.push(stored);
        self.persist(&next).await?;

        *comments = next;
        debug!(
            comment_id = %id,
            author = %ctx.id,
            path = %self.path.display(),
            "comment saved"
        );
        Ok(id)
    }

    async fn top_level(&self, episode_id: &str) -> Result<Vec<Comment>, CommentError> {
        self.inner.top_level(episode_id).await
    }

    async fn replies(&self, parent_id: &str) -> Result<Vec<Comment>, CommentError> {
        self.inner.replies(parent_id).await
    }
}
