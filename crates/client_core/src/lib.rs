use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{
    domain::{CommentId, PostId, SubforumId, UserId, Viewer, VoteStatus},
    error::ApiError,
    protocol::{PostDetailResponse, PostSummary, SubforumSummary, UserProfile},
};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::info;

mod vote;
pub use vote::{apply_vote, UnvoteEncoding, VoteController};

/// Vote-related failure. Everything here is handled locally by the
/// controller (guard, or rollback plus notice) and never escapes as a panic.
#[derive(Debug, Clone, Error)]
pub enum VoteError {
    #[error("please log in to vote")]
    Unauthenticated,
    #[error("vote request failed in transit: {0}")]
    Transport(String),
    #[error("vote rejected: {0}")]
    Rejected(ApiError),
}

/// A vote intent as transmitted to the remote gateway. `vote_value` is the
/// wire value after unvote encoding, which is not always the requested
/// direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteIntent {
    pub post_id: PostId,
    pub requester_id: UserId,
    pub vote_value: i8,
}

#[async_trait]
pub trait VoteGateway: Send + Sync {
    async fn submit_vote(&self, intent: VoteIntent) -> Result<(), VoteError>;
}

/// Stand-in gateway for contexts with no backend wired.
pub struct MissingVoteGateway;

#[async_trait]
impl VoteGateway for MissingVoteGateway {
    async fn submit_vote(&self, intent: VoteIntent) -> Result<(), VoteError> {
        Err(VoteError::Transport(format!(
            "no vote gateway configured for post {}",
            intent.post_id.0
        )))
    }
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    VoteStateChanged {
        post_id: PostId,
        score: i64,
        status: VoteStatus,
    },
    VoteFailed {
        post_id: PostId,
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    user: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VoteHttpRequest {
    user_id: i64,
    vote_type: i8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CreateCommentRequest {
    user_id: i64,
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_comment_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CreatePostRequest {
    user_id: i64,
    subforum_id: i64,
    title: String,
    content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SubscribeRequest {
    user_id: i64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the forum backend: feed/detail/community loaders, thin
/// submission glue, and the [`VoteGateway`] the vote controllers confirm
/// against.
pub struct ForumClient {
    http: Client,
    server_url: String,
    unvote_encoding: UnvoteEncoding,
    events: broadcast::Sender<ClientEvent>,
}

impl ForumClient {
    pub fn new(server_url: impl Into<String>) -> Arc<Self> {
        Self::with_http(Client::new(), server_url, UnvoteEncoding::default())
    }

    pub fn with_http(
        http: Client,
        server_url: impl Into<String>,
        unvote_encoding: UnvoteEncoding,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            http,
            server_url: server_url.into(),
            unvote_encoding,
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Builds a vote controller for one rendered post, wired to this
    /// client's gateway, unvote encoding, and event channel. The viewer is
    /// whatever identity the page holds; `None` renders a signed-out
    /// controller that refuses to vote.
    pub fn vote_controller(
        self: &Arc<Self>,
        post: &PostSummary,
        viewer: Option<Viewer>,
    ) -> VoteController {
        VoteController::from_summary(
            post,
            viewer,
            Arc::clone(self) as Arc<dyn VoteGateway>,
            self.unvote_encoding,
            self.events.clone(),
        )
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Viewer> {
        let response: LoginResponse = self
            .http
            .post(format!("{}/api/login", self.server_url))
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(Viewer {
            user_id: response.user.user_id,
            username: response.user.username,
            karma: response.user.karma,
        })
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<()> {
        self.http
            .post(format!("{}/api/register", self.server_url))
            .json(&RegisterRequest {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn fetch_front_page(&self, viewer: Option<&Viewer>) -> Result<Vec<PostSummary>> {
        let mut request = self.http.get(format!("{}/api/posts", self.server_url));
        if let Some(viewer) = viewer {
            request = request.query(&[("current_user_id", viewer.user_id.0)]);
        }
        let posts = request.send().await?.error_for_status()?.json().await?;
        Ok(posts)
    }

    pub async fn fetch_subforum_posts(
        &self,
        subforum_name: &str,
        viewer: Option<&Viewer>,
    ) -> Result<Vec<PostSummary>> {
        let mut request = self
            .http
            .get(format!("{}/api/posts", self.server_url))
            .query(&[("subforum_name", subforum_name)]);
        if let Some(viewer) = viewer {
            request = request.query(&[("current_user_id", viewer.user_id.0)]);
        }
        let response = request.send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(anyhow!("subforum '{subforum_name}' not found"));
        }
        let posts = response.error_for_status()?.json().await?;
        Ok(posts)
    }

    pub async fn fetch_post_detail(
        &self,
        post_id: PostId,
        viewer: Option<&Viewer>,
    ) -> Result<PostDetailResponse> {
        let mut request = self
            .http
            .get(format!("{}/api/posts/{}", self.server_url, post_id.0));
        if let Some(viewer) = viewer {
            request = request.query(&[("current_user_id", viewer.user_id.0)]);
        }
        let detail = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("invalid post detail payload for post {}", post_id.0))?;
        Ok(detail)
    }

    /// Posts a comment under `post_id`. The backend gives no
    /// incremental-append guarantee; refetch the post detail to observe the
    /// updated comment sequence.
    pub async fn submit_comment(
        &self,
        post_id: PostId,
        viewer: &Viewer,
        body: &str,
        parent: Option<CommentId>,
    ) -> Result<()> {
        self.http
            .post(format!("{}/api/posts/{}/comments", self.server_url, post_id.0))
            .json(&CreateCommentRequest {
                user_id: viewer.user_id.0,
                content: body.to_string(),
                parent_comment_id: parent.map(|id| id.0),
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Communities available as post-creation targets.
    pub async fn list_subforums(&self) -> Result<Vec<SubforumSummary>> {
        let subforums = self
            .http
            .get(format!("{}/api/subforums", self.server_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(subforums)
    }

    pub async fn create_post(
        &self,
        viewer: &Viewer,
        subforum_id: SubforumId,
        title: &str,
        body: &str,
    ) -> Result<()> {
        self.http
            .post(format!("{}/api/posts", self.server_url))
            .json(&CreatePostRequest {
                user_id: viewer.user_id.0,
                subforum_id: subforum_id.0,
                title: title.to_string(),
                content: body.to_string(),
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn subscribe(&self, viewer: &Viewer, subforum_id: SubforumId) -> Result<()> {
        self.http
            .post(format!(
                "{}/api/subforums/{}/subscribe",
                self.server_url, subforum_id.0
            ))
            .json(&SubscribeRequest {
                user_id: viewer.user_id.0,
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl VoteGateway for ForumClient {
    async fn submit_vote(&self, intent: VoteIntent) -> Result<(), VoteError> {
        info!(
            post_id = intent.post_id.0,
            requester_id = intent.requester_id.0,
            vote_value = intent.vote_value,
            "vote: submitting"
        );
        let response = self
            .http
            .post(format!(
                "{}/api/posts/{}/vote",
                self.server_url, intent.post_id.0
            ))
            .json(&VoteHttpRequest {
                user_id: intent.requester_id.0,
                vote_type: intent.vote_value,
            })
            .send()
            .await
            .map_err(|err| VoteError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(VoteError::Rejected(rejection_from_response(
            status.as_u16(),
            &body,
        )))
    }
}

fn rejection_from_response(status: u16, body: &str) -> ApiError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => ApiError::from_status(status, parsed.error),
        Err(_) if !body.trim().is_empty() => ApiError::from_status(status, body.trim()),
        Err(_) => {
            ApiError::from_status(status, format!("vote endpoint returned status {status}"))
        }
    }
}

#[cfg(test)]
mod tests;
