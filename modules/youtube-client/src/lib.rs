pub mod error;
pub mod types;

pub use error::{Result, YoutubeError};
pub use types::{Video, VideoListResponse, VideoSnippet};

use std::time::Duration;

const BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Only the fields needed to attribute a video to its channel.
const VIDEO_FIELDS: &str = "items(id,snippet(channelId,channelTitle))";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

pub struct YoutubeClient {
    client: reqwest::Client,
    api_key: String,
}

impl YoutubeClient {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, api_key }
    }

    /// Look up a video by ID. Returns an empty list for unknown IDs.
    pub async fn videos(&self, video_id: &str) -> Result<Vec<Video>> {
        let url = format!("{}/videos", BASE_URL);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("part", "id,snippet"),
                ("id", video_id),
                ("fields", VIDEO_FIELDS),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(YoutubeError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let list: VideoListResponse = serde_json::from_str(&resp.text().await?)?;
        tracing::debug!(video_id, count = list.items.len(), "Fetched video metadata");
        Ok(list.items)
    }
}
