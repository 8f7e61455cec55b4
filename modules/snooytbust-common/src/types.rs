use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// --- Discussion items ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Post,
    Comment,
}

impl ItemKind {
    /// Reddit type prefix used in fullnames.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Post => "t3",
            Self::Comment => "t1",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post => write!(f, "post"),
            Self::Comment => write!(f, "comment"),
        }
    }
}

/// Identity of a discussion item: kind plus the opaque base36 ID.
/// Displays as a Reddit fullname (`t3_abc`, `t1_def`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId {
    pub kind: ItemKind,
    pub id: String,
}

impl ItemId {
    pub fn post(id: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Post,
            id: id.into(),
        }
    }

    pub fn comment(id: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Comment,
            id: id.into(),
        }
    }

    /// Parse a fullname. Returns `None` for kinds other than posts and comments.
    pub fn from_fullname(fullname: &str) -> Option<Self> {
        let (prefix, id) = fullname.split_once('_')?;
        if id.is_empty() {
            return None;
        }
        match prefix {
            "t3" => Some(Self::post(id)),
            "t1" => Some(Self::comment(id)),
            _ => None,
        }
    }

    pub fn fullname(&self) -> String {
        format!("{}_{}", self.kind.prefix(), self.id)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind.prefix(), self.id)
    }
}

/// A post or comment observed in the monitored community. Never mutated
/// locally; removal is a remote side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionItem {
    pub id: ItemId,
    pub author: String,
    pub community: String,
    pub body: String,
    pub permalink: String,
}

impl DiscussionItem {
    pub fn kind(&self) -> ItemKind {
        self.id.kind
    }
}

// --- Video links and publishers ---

/// Normalized YouTube video ID (11+ chars of `[A-Za-z0-9_-]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Channel that published a video, as resolved by the metadata provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherRecord {
    pub publisher_id: String,
    pub display_name: String,
}

// --- Blacklist ---

/// Platform discriminator stored alongside each blacklisted channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaPlatform {
    YouTube,
}

impl MediaPlatform {
    pub fn id(&self) -> i32 {
        match self {
            Self::YouTube => 1,
        }
    }
}

impl fmt::Display for MediaPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::YouTube => write!(f, "youtube"),
        }
    }
}

/// The matching blacklist row. Only its existence (and ID, for logs) matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub id: i64,
}

// --- Moderation ---

/// What the moderator managed to do about a blacklist hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Removed,
    /// The item matched but the remove call failed; it is still up.
    RemovalFailed,
}

/// One blacklist hit on one item. Built transiently to drive the removal
/// log line and the notification; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModerationEvent {
    pub item: DiscussionItem,
    pub publisher: PublisherRecord,
    pub entry: BlacklistEntry,
    pub video_id: VideoId,
    pub action: ModerationAction,
    pub detected_at: DateTime<Utc>,
}

impl ModerationEvent {
    pub fn new(
        item: &DiscussionItem,
        publisher: &PublisherRecord,
        entry: BlacklistEntry,
        video_id: &VideoId,
        action: ModerationAction,
    ) -> Self {
        Self {
            item: item.clone(),
            publisher: publisher.clone(),
            entry,
            video_id: video_id.clone(),
            action,
            detected_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fullname_parses_posts_and_comments() {
        assert_eq!(ItemId::from_fullname("t3_abc"), Some(ItemId::post("abc")));
        assert_eq!(ItemId::from_fullname("t1_def"), Some(ItemId::comment("def")));
        assert_eq!(ItemId::from_fullname("t5_sub"), None);
        assert_eq!(ItemId::from_fullname("t3_"), None);
        assert_eq!(ItemId::from_fullname("nope"), None);
    }

    #[test]
    fn item_id_displays_as_fullname() {
        let id = ItemId::comment("xyz");
        assert_eq!(id.to_string(), "t1_xyz");
        assert_eq!(id.fullname(), "t1_xyz");
    }

    #[test]
    fn youtube_platform_id_is_one() {
        assert_eq!(MediaPlatform::YouTube.id(), 1);
    }
}
