// Capability seams between the moderator and the outside world.
//
// DiscussionSource: subscriptions to new posts/comments plus removal.
// MetadataProvider: video ID -> publishing channel(s).
// BlacklistStore: read-only (channel, platform) lookup.
//
// The concrete Reddit, YouTube and Postgres handles implement these here or
// in blacklist.rs; tests swap in the mocks from testing.rs.

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use reddit_client::{
    RedditClient, RedditError, SeenHistory, StreamEvent, StreamOptions, Subscription, Thing,
};
use snooytbust_common::{
    BlacklistEntry, DiscussionItem, ItemId, MediaPlatform, PublisherRecord, SubscribeError,
    VideoId,
};
use youtube_client::YoutubeClient;

// ---------------------------------------------------------------------------
// DiscussionSource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    Submissions,
    Comments,
}

impl fmt::Display for SubscriptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submissions => write!(f, "submissions"),
            Self::Comments => write!(f, "comments"),
        }
    }
}

/// What a subscription yields. The end of the stream counts as `Closed` too.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionEvent {
    Item(DiscussionItem),
    Closed,
}

pub type ItemChannel = BoxStream<'static, SubscriptionEvent>;

#[async_trait]
pub trait DiscussionSource: Send + Sync {
    /// Subscribe to new submissions in a community.
    async fn subscribe_submissions(&self, community: &str) -> Result<ItemChannel, SubscribeError>;

    /// Subscribe to new comments in a community.
    async fn subscribe_comments(&self, community: &str) -> Result<ItemChannel, SubscribeError>;

    /// Remove an item. `permanent` marks it as spam rather than a plain
    /// moderator removal. Removing an already-removed item is not an error
    /// upstream, but callers must tolerate one anyway.
    async fn remove(&self, id: &ItemId, permanent: bool) -> Result<()>;
}

// ---------------------------------------------------------------------------
// MetadataProvider
// ---------------------------------------------------------------------------

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Publishers for a video. Empty when the ID doesn't resolve.
    async fn lookup(&self, video: &VideoId) -> Result<Vec<PublisherRecord>>;
}

// ---------------------------------------------------------------------------
// BlacklistStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait BlacklistStore: Send + Sync {
    /// Matching row, if any. `Ok(None)` is "not blacklisted", distinct from `Err`.
    async fn find(
        &self,
        publisher_id: &str,
        platform: MediaPlatform,
    ) -> Result<Option<BlacklistEntry>>;
}

// ---------------------------------------------------------------------------
// Reddit adapter
// ---------------------------------------------------------------------------

/// `DiscussionSource` backed by the Reddit OAuth API. Each listing keeps
/// one dedup history for the life of the source, so re-subscribing after a
/// closure picks up what was posted in between.
pub struct RedditSource {
    client: RedditClient,
    options: StreamOptions,
    posts: SeenHistory,
    comments: SeenHistory,
}

impl RedditSource {
    pub fn new(client: RedditClient, options: StreamOptions) -> Self {
        Self {
            client,
            posts: SeenHistory::new(options.seen_capacity),
            comments: SeenHistory::new(options.seen_capacity),
            options,
        }
    }
}

#[async_trait]
impl DiscussionSource for RedditSource {
    async fn subscribe_submissions(&self, community: &str) -> Result<ItemChannel, SubscribeError> {
        let sub = self
            .client
            .stream_posts(community, self.options.clone(), &self.posts)
            .await
            .map_err(classify)?;
        Ok(into_channel(sub))
    }

    async fn subscribe_comments(&self, community: &str) -> Result<ItemChannel, SubscribeError> {
        let sub = self
            .client
            .stream_comments(community, self.options.clone(), &self.comments)
            .await
            .map_err(classify)?;
        Ok(into_channel(sub))
    }

    async fn remove(&self, id: &ItemId, permanent: bool) -> Result<()> {
        self.client.remove(&id.fullname(), permanent).await?;
        Ok(())
    }
}

fn classify(err: RedditError) -> SubscribeError {
    if err.is_auth() {
        SubscribeError::Credentials(err.into())
    } else {
        SubscribeError::Transient(err.into())
    }
}

fn into_channel(sub: Subscription) -> ItemChannel {
    stream::unfold(sub, |mut sub| async move {
        let event = sub.recv().await?;
        Some((event, sub))
    })
    .filter_map(|event| async move {
        match event {
            StreamEvent::Thing(thing) => to_item(thing).map(SubscriptionEvent::Item),
            StreamEvent::Closed => Some(SubscriptionEvent::Closed),
        }
    })
    .boxed()
}

fn to_item(thing: Thing) -> Option<DiscussionItem> {
    let Some(id) = ItemId::from_fullname(thing.fullname()) else {
        tracing::debug!(fullname = thing.fullname(), "Skipping unsupported thing kind");
        return None;
    };
    Some(DiscussionItem {
        id,
        author: thing.author().to_string(),
        community: thing.subreddit().to_string(),
        body: thing.body(),
        permalink: thing.permalink_url(),
    })
}

// ---------------------------------------------------------------------------
// YouTube adapter
// ---------------------------------------------------------------------------

#[async_trait]
impl MetadataProvider for YoutubeClient {
    async fn lookup(&self, video: &VideoId) -> Result<Vec<PublisherRecord>> {
        let videos = self.videos(video.as_str()).await?;
        Ok(videos
            .into_iter()
            .filter_map(|v| v.snippet)
            .map(|s| PublisherRecord {
                publisher_id: s.channel_id,
                display_name: s.channel_title,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reddit_client::{Comment, Link};

    #[test]
    fn converts_comment_thing() {
        let item = to_item(Thing::Comment(Comment {
            name: "t1_c".into(),
            id: "c".into(),
            author: "carol".into(),
            subreddit: "videos".into(),
            body: "https://youtu.be/dQw4w9WgXcQ".into(),
            permalink: "/r/videos/comments/x/t/c/".into(),
            link_id: "t3_x".into(),
            created_utc: 0.0,
        }))
        .unwrap();

        assert_eq!(item.id, ItemId::comment("c"));
        assert_eq!(item.author, "carol");
        assert_eq!(item.community, "videos");
        assert_eq!(item.permalink, "https://www.reddit.com/r/videos/comments/x/t/c/");
    }

    #[test]
    fn converts_link_thing_with_url_in_body() {
        let item = to_item(Thing::Link(Link {
            name: "t3_x".into(),
            id: "x".into(),
            author: "alice".into(),
            subreddit: "videos".into(),
            title: "title".into(),
            selftext: String::new(),
            url: "https://youtu.be/dQw4w9WgXcQ".into(),
            permalink: "/r/videos/comments/x/title/".into(),
            created_utc: 0.0,
        }))
        .unwrap();

        assert_eq!(item.id, ItemId::post("x"));
        assert_eq!(item.body, "https://youtu.be/dQw4w9WgXcQ");
    }

    #[test]
    fn auth_errors_classified_as_credentials() {
        assert!(classify(RedditError::Auth("invalid_grant".into())).is_credentials());
        assert!(!classify(RedditError::Network("reset".into())).is_credentials());
        assert!(!classify(RedditError::Api {
            status: 503,
            message: String::new()
        })
        .is_credentials());
    }
}
