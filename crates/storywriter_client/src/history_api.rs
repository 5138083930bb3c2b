//! crates/storywriter_client/src/history_api.rs
//!
//! HTTP implementation of the `StoryHistoryRemote` port against the proxy's
//! `/api/stories` endpoints.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use storywriter_core::{
    domain::{NewStoryRecord, StoryHistoryItem},
    ports::{PortError, PortResult, StoryHistoryRemote},
};

#[derive(Deserialize)]
struct StoryListResponse {
    #[serde(default)]
    stories: Vec<StoryHistoryItem>,
}

#[derive(Deserialize)]
struct StoryCreateResponse {
    story: Option<StoryHistoryItem>,
}

fn transport(e: reqwest::Error) -> PortError {
    PortError::Unavailable(e.to_string())
}

/// Maps a non-success response to `PortError::Upstream`.
async fn ensure_success(response: reqwest::Response) -> PortResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PortError::Upstream {
        status: status.as_u16(),
        body,
    })
}

#[derive(Clone)]
pub struct HttpHistoryApi {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpHistoryApi {
    pub fn new(http: reqwest::Client, proxy_url: &str) -> PortResult<Self> {
        let base_url = Url::parse(proxy_url.trim_end_matches('/'))
            .map_err(|e| PortError::InvalidInput(format!("Invalid proxy URL: {}", e)))?;
        Ok(Self { http, base_url })
    }

    /// Builds `<base>/api/stories[/<id>]?userId=<user_id>` with proper escaping.
    fn stories_url(&self, user_id: Option<&str>, id: Option<&str>) -> PortResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| PortError::InvalidInput("Proxy URL cannot be a base".to_string()))?;
            segments.pop_if_empty().extend(["api", "stories"]);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        if let Some(user_id) = user_id {
            url.query_pairs_mut().append_pair("userId", user_id);
        }
        Ok(url)
    }
}

#[async_trait]
impl StoryHistoryRemote for HttpHistoryApi {
    async fn fetch_history(&self, user_id: &str) -> PortResult<Vec<StoryHistoryItem>> {
        let url = self.stories_url(Some(user_id), None)?;
        let response = self.http.get(url).send().await.map_err(transport)?;
        let list = ensure_success(response)
            .await?
            .json::<StoryListResponse>()
            .await
            .map_err(|e| PortError::Unexpected(format!("Invalid story list response: {}", e)))?;
        Ok(list.stories)
    }

    async fn save_story(&self, record: NewStoryRecord) -> PortResult<StoryHistoryItem> {
        let url = self.stories_url(None, None)?;
        let response = self
            .http
            .post(url)
            .json(&record)
            .send()
            .await
            .map_err(transport)?;
        let created = ensure_success(response)
            .await?
            .json::<StoryCreateResponse>()
            .await
            .map_err(|e| PortError::Unexpected(format!("Invalid story save response: {}", e)))?;
        created
            .story
            .ok_or_else(|| PortError::Unexpected("Invalid story save response".to_string()))
    }

    async fn delete_story(&self, user_id: &str, id: &str) -> PortResult<()> {
        let url = self.stories_url(Some(user_id), Some(id))?;
        let response = self.http.delete(url).send().await.map_err(transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        ensure_success(response).await?;
        Ok(())
    }

    async fn clear_history(&self, user_id: &str) -> PortResult<()> {
        let url = self.stories_url(Some(user_id), None)?;
        let response = self.http.delete(url).send().await.map_err(transport)?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> HttpHistoryApi {
        HttpHistoryApi::new(reqwest::Client::new(), base).unwrap()
    }

    #[test]
    fn urls_escape_ids_and_user_ids() {
        let url = api("http://localhost:3001")
            .stories_url(Some("a b&c"), Some("x/y"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3001/api/stories/x%2Fy?userId=a+b%26c"
        );
    }

    #[test]
    fn base_path_is_kept() {
        let url = api("http://example.com/proxy/").stories_url(None, None).unwrap();
        assert_eq!(url.as_str(), "http://example.com/proxy/api/stories");
    }

    #[test]
    fn invalid_base_is_rejected() {
        assert!(HttpHistoryApi::new(reqwest::Client::new(), "not a url").is_err());
    }
}
