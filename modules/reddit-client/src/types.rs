use serde::{Deserialize, Serialize};

const WEB_BASE: &str = "https://www.reddit.com";

/// Script-app credentials for the OAuth password grant.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

/// Response from `/api/v1/access_token`. Reddit answers a bad password
/// with a 200 and an `error` field, so everything is optional.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: Option<String>,
    pub expires_in: Option<u64>,
    pub error: Option<String>,
}

/// The authenticated account, from `/api/v1/me`.
#[derive(Debug, Clone, Deserialize)]
pub struct Me {
    pub id: String,
    pub name: String,
}

// --- Listings ---

#[derive(Debug, Clone, Deserialize)]
pub struct Listing<T> {
    pub data: ListingData<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingData<T> {
    pub children: Vec<Child<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Child<T> {
    pub kind: String,
    pub data: T,
}

impl<T> Listing<T> {
    pub fn into_items(self) -> Vec<T> {
        self.data.children.into_iter().map(|c| c.data).collect()
    }
}

/// A submission (`t3`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    /// Fullname, e.g. `t3_abc123`.
    pub name: String,
    pub id: String,
    pub author: String,
    pub subreddit: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    /// Target URL for link posts; the permalink for self posts.
    #[serde(default)]
    pub url: String,
    pub permalink: String,
    #[serde(default)]
    pub created_utc: f64,
}

/// A comment (`t1`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    /// Fullname, e.g. `t1_def456`.
    pub name: String,
    pub id: String,
    pub author: String,
    pub subreddit: String,
    #[serde(default)]
    pub body: String,
    pub permalink: String,
    #[serde(default)]
    pub link_id: String,
    #[serde(default)]
    pub created_utc: f64,
}

/// Anything a subscription can yield.
#[derive(Debug, Clone)]
pub enum Thing {
    Link(Link),
    Comment(Comment),
}

impl Thing {
    pub fn fullname(&self) -> &str {
        match self {
            Thing::Link(l) => &l.name,
            Thing::Comment(c) => &c.name,
        }
    }

    pub fn author(&self) -> &str {
        match self {
            Thing::Link(l) => &l.author,
            Thing::Comment(c) => &c.author,
        }
    }

    pub fn subreddit(&self) -> &str {
        match self {
            Thing::Link(l) => &l.subreddit,
            Thing::Comment(c) => &c.subreddit,
        }
    }

    /// Text worth scanning for links. For submissions this is the target
    /// URL followed by the self text, since a link post carries its link
    /// only in `url`.
    pub fn body(&self) -> String {
        match self {
            Thing::Link(l) => {
                if l.selftext.is_empty() {
                    l.url.clone()
                } else {
                    format!("{}\n{}", l.url, l.selftext)
                }
            }
            Thing::Comment(c) => c.body.clone(),
        }
    }

    /// Absolute permalink on www.reddit.com.
    pub fn permalink_url(&self) -> String {
        let path = match self {
            Thing::Link(l) => &l.permalink,
            Thing::Comment(c) => &c.permalink,
        };
        if path.starts_with("http") {
            path.clone()
        } else {
            format!("{WEB_BASE}{path}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_new_posts_listing() {
        let json = r#"{
            "kind": "Listing",
            "data": {
                "after": "t3_b",
                "before": null,
                "children": [
                    {"kind": "t3", "data": {
                        "name": "t3_b", "id": "b", "author": "alice", "subreddit": "videos",
                        "title": "watch this", "selftext": "", "url": "https://youtu.be/dQw4w9WgXcQ",
                        "permalink": "/r/videos/comments/b/watch_this/", "created_utc": 1700000000.0
                    }},
                    {"kind": "t3", "data": {
                        "name": "t3_a", "id": "a", "author": "bob", "subreddit": "videos",
                        "title": "self", "selftext": "hello", "url": "https://www.reddit.com/r/videos/comments/a/self/",
                        "permalink": "/r/videos/comments/a/self/"
                    }}
                ]
            }
        }"#;

        let listing: Listing<Link> = serde_json::from_str(json).unwrap();
        let links = listing.into_items();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].name, "t3_b");
        assert_eq!(links[1].created_utc, 0.0);
    }

    #[test]
    fn link_body_includes_target_url() {
        let thing = Thing::Link(Link {
            name: "t3_x".into(),
            id: "x".into(),
            author: "alice".into(),
            subreddit: "videos".into(),
            title: "t".into(),
            selftext: "more at youtube".into(),
            url: "https://youtu.be/dQw4w9WgXcQ".into(),
            permalink: "/r/videos/comments/x/t/".into(),
            created_utc: 0.0,
        });

        assert_eq!(thing.body(), "https://youtu.be/dQw4w9WgXcQ\nmore at youtube");
        assert_eq!(
            thing.permalink_url(),
            "https://www.reddit.com/r/videos/comments/x/t/"
        );
    }

    #[test]
    fn comment_accessors() {
        let thing = Thing::Comment(Comment {
            name: "t1_c".into(),
            id: "c".into(),
            author: "carol".into(),
            subreddit: "videos".into(),
            body: "see https://youtube.com/watch?v=dQw4w9WgXcQ".into(),
            permalink: "/r/videos/comments/x/t/c/".into(),
            link_id: "t3_x".into(),
            created_utc: 0.0,
        });

        assert_eq!(thing.fullname(), "t1_c");
        assert_eq!(thing.author(), "carol");
        assert_eq!(thing.subreddit(), "videos");
        assert!(thing.body().contains("watch?v="));
    }
}
