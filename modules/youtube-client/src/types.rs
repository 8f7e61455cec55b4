use serde::Deserialize;

/// Response from `videos.list`. Unknown or private IDs simply produce an
/// empty `items`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<Video>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    pub id: String,
    pub snippet: Option<VideoSnippet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoSnippet {
    #[serde(rename = "channelId")]
    pub channel_id: String,
    #[serde(rename = "channelTitle", default)]
    pub channel_title: String,
}
