use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CommentId, PostId, SubforumId, UserId, VoteStatus};

/// One post as the listing and detail loaders return it. `score` and
/// `viewer_vote` default when the backend omits them (signed-out viewers,
/// posts the viewer never touched), which is what lets a vote controller
/// start from `(0, none)` without a special case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSummary {
    pub post_id: PostId,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub score: i64,
    pub created_at: DateTime<Utc>,
    pub author_id: UserId,
    pub author_username: String,
    pub subforum_id: SubforumId,
    pub subforum_name: String,
    #[serde(default)]
    pub viewer_vote: VoteStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentPayload {
    pub comment_id: CommentId,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub author_username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetailResponse {
    pub post: PostSummary,
    pub comments: Vec<CommentPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubforumSummary {
    pub subforum_id: SubforumId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Account payload returned by login and registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub karma: i64,
}
