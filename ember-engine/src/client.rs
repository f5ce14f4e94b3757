//! HTTP client for the remote story service.

use async_trait::async_trait;
use ember_model::{AuthorId, Comment, CommentId, EngagementCounts, MediaItem, StoryId, UserId};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{EngineError, Result};
use crate::service::{StoryFilter, StoryService};

/// Envelope every service endpoint wraps its payload in.
#[derive(Debug, serde::Deserialize)]
struct ApiResponse<T> {
    data: Option<T>,
}

/// Story service client with authentication support.
#[derive(Clone, Debug)]
pub struct HttpStoryService {
    client: Client,
    base_url: String,
    api_version: String,
    token_store: Arc<RwLock<Option<String>>>,
}

impl HttpStoryService {
    pub fn new(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| EngineError::Internal(format!("failed to build HTTP client: {e}")))?;

        log::info!("[StoryService] client created, base URL: {}", base_url);

        Ok(Self {
            client,
            base_url,
            api_version: "v1".to_string(),
            token_store: Arc::new(RwLock::new(None)),
        })
    }

    /// Build a versioned API URL.
    fn build_url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/api/{}/{}", self.base_url, self.api_version, path)
    }

    /// Set the bearer token used for authenticated mutations.
    pub async fn set_token(&self, token: Option<String>) {
        *self.token_store.write().await = token;
    }

    async fn build_request(&self, builder: RequestBuilder) -> RequestBuilder {
        if let Some(token) = self.token_store.read().await.as_ref() {
            builder.header("Authorization", format!("Bearer {token}"))
        } else {
            builder
        }
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| EngineError::TransientNetwork(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| EngineError::TransientNetwork(e.to_string()))?;
                // A malformed body is a contract problem, not a retryable
                // transport failure.
                let api_response: ApiResponse<T> = serde_json::from_slice(&bytes)?;
                api_response
                    .data
                    .ok_or_else(|| EngineError::Internal("empty response from server".into()))
            }
            StatusCode::UNAUTHORIZED => {
                // Token might be expired, clear it
                self.set_token(None).await;
                Err(EngineError::NotAuthenticated)
            }
            status => Err(EngineError::TransientNetwork(format!(
                "request failed with status {status}"
            ))),
        }
    }

    async fn execute_no_content(&self, request: RequestBuilder) -> Result<()> {
        let response = request
            .send()
            .await
            .map_err(|e| EngineError::TransientNetwork(e.to_string()))?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            StatusCode::UNAUTHORIZED => {
                self.set_token(None).await;
                Err(EngineError::NotAuthenticated)
            }
            status => Err(EngineError::TransientNetwork(format!(
                "request failed with status {status}"
            ))),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.build_url(path);
        log::debug!("[StoryService] GET {}", url);
        let request = self.client.get(&url);
        let request = self.build_request(request).await;
        self.execute(request).await
    }

    async fn post<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.build_url(path);
        let request = self.client.post(&url).json(body);
        let request = self.build_request(request).await;
        self.execute(request).await
    }

    async fn post_no_content<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let url = self.build_url(path);
        let request = self.client.post(&url).json(body);
        let request = self.build_request(request).await;
        self.execute_no_content(request).await
    }
}

#[derive(serde::Serialize)]
struct UserRef {
    user_id: UserId,
}

#[derive(serde::Serialize)]
struct PostCommentRequest {
    parent_id: Option<CommentId>,
    text: String,
}

#[async_trait]
impl StoryService for HttpStoryService {
    async fn list_stories(&self, filter: StoryFilter) -> Result<Vec<MediaItem>> {
        match filter {
            StoryFilter::GlobalFeed => self.get("stories/feed").await,
            StoryFilter::Author(author_id) => {
                self.get(&format!("authors/{author_id}/stories")).await
            }
        }
    }

    async fn engagement_counts(&self, story_id: StoryId) -> Result<EngagementCounts> {
        self.get(&format!("stories/{story_id}/engagement")).await
    }

    async fn my_like_state(&self, story_id: StoryId, user_id: UserId) -> Result<bool> {
        #[derive(serde::Deserialize)]
        struct LikeStateResponse {
            liked: bool,
        }
        let response: LikeStateResponse = self
            .get(&format!("stories/{story_id}/likes/{user_id}"))
            .await?;
        Ok(response.liked)
    }

    async fn my_follow_state(&self, author_id: AuthorId, user_id: UserId) -> Result<bool> {
        #[derive(serde::Deserialize)]
        struct FollowStateResponse {
            following: bool,
        }
        let response: FollowStateResponse = self
            .get(&format!("authors/{author_id}/followers/{user_id}"))
            .await?;
        Ok(response.following)
    }

    async fn toggle_like(&self, story_id: StoryId, user_id: UserId) -> Result<()> {
        self.post_no_content(&format!("stories/{story_id}/like/toggle"), &UserRef { user_id })
            .await
    }

    async fn toggle_follow(&self, author_id: AuthorId, user_id: UserId) -> Result<()> {
        self.post_no_content(
            &format!("authors/{author_id}/follow/toggle"),
            &UserRef { user_id },
        )
        .await
    }

    async fn record_view(&self, story_id: StoryId, user_id: UserId) -> Result<()> {
        self.post_no_content(&format!("stories/{story_id}/view"), &UserRef { user_id })
            .await
    }

    async fn soft_delete_story(&self, story_id: StoryId) -> Result<()> {
        let url = self.build_url(&format!("stories/{story_id}"));
        let request = self.build_request(self.client.delete(&url)).await;
        let response = request
            .send()
            .await
            .map_err(|e| EngineError::TransientNetwork(e.to_string()))?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            // Expired or deleted from another session.
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(EngineError::ItemGone(story_id)),
            StatusCode::UNAUTHORIZED => {
                self.set_token(None).await;
                Err(EngineError::NotAuthenticated)
            }
            status => Err(EngineError::TransientNetwork(format!(
                "request failed with status {status}"
            ))),
        }
    }

    async fn list_comments(&self, story_id: StoryId) -> Result<Vec<Comment>> {
        self.get(&format!("stories/{story_id}/comments")).await
    }

    async fn post_comment(
        &self,
        story_id: StoryId,
        parent_id: Option<CommentId>,
        text: String,
    ) -> Result<Comment> {
        self.post(
            &format!("stories/{story_id}/comments"),
            &PostCommentRequest { parent_id, text },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_versions_the_path() {
        let client = HttpStoryService::new("https://api.example.com".into()).unwrap();
        assert_eq!(
            client.build_url("/stories/feed"),
            "https://api.example.com/api/v1/stories/feed"
        );
    }

    #[test]
    fn malformed_bodies_map_to_serialization_not_transient() {
        let err = serde_json::from_slice::<ApiResponse<u32>>(b"<html>oops</html>").unwrap_err();
        let err = EngineError::from(err);
        assert!(matches!(err, EngineError::Serialization(_)));
        assert!(!err.is_transient());
    }
}
