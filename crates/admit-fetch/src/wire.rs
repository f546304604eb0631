//! Wire types for the Reddit JSON API.
//!
//! Every API object arrives in a `kind`/`data` envelope. Listing pages
//! carry an `after` cursor for pagination; the comments endpoint returns
//! two listings, the post itself and then its comment tree.

use admit_core::RawPost;
use chrono::DateTime;
use serde::Deserialize;

/// Envelope around every Reddit API object
#[derive(Debug, Deserialize)]
pub(crate) struct Thing<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Listing<T> {
    pub data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingData<T> {
    /// Cursor for the next page, absent on the last one
    pub after: Option<String>,
    pub children: Vec<Thing<T>>,
}

/// Fields of a `t3` submission worth keeping
#[derive(Debug, Deserialize)]
pub(crate) struct PostData {
    pub id: String,
    #[serde(default)]
    pub subreddit: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub created_utc: Option<f64>,
    #[serde(default)]
    pub stickied: bool,
    #[serde(default)]
    pub distinguished: Option<String>,
}

impl PostData {
    /// Moderator pins, announcements and removed posts are not
    /// application stories and never enter the corpus.
    pub fn is_listable(&self) -> bool {
        !self.stickied
            && self.distinguished.is_none()
            && self.selftext != "[deleted]"
            && self.selftext != "[removed]"
    }

    /// Convert to the pipeline's input record. `subreddit` is the
    /// listing that was requested, used when the payload omits its own.
    pub fn into_raw_post(self, subreddit: &str) -> RawPost {
        let created_utc = self
            .created_utc
            .and_then(|secs| DateTime::from_timestamp(secs as i64, 0));
        let subreddit = if self.subreddit.is_empty() {
            subreddit.to_string()
        } else {
            self.subreddit
        };
        RawPost {
            id: self.id,
            subreddit,
            title: self.title,
            body: self.selftext,
            comments: Vec::new(),
            score: self.score,
            created_utc,
        }
    }
}

/// Fields of a `t1` comment worth keeping. Everything is optional so the
/// post listing that precedes the comment tree deserializes too.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct CommentData {
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub stickied: bool,
}

/// Top-level comment bodies worth keeping, in listing order.
///
/// Skips non-comment children ("more" stubs and the occasional pinned
/// reply), deleted bodies and anything shorter than `min_length` chars,
/// and stops at `cap`.
pub(crate) fn usable_comments(
    listings: &[Listing<CommentData>],
    min_length: usize,
    cap: usize,
) -> Vec<String> {
    let mut comments = Vec::new();
    let tree = match listings.get(1) {
        Some(tree) => tree,
        None => return comments,
    };

    for child in &tree.data.children {
        if comments.len() >= cap {
            break;
        }
        if child.kind != "t1" || child.data.stickied {
            continue;
        }
        let body = match child.data.body.as_deref() {
            Some(body) => body,
            None => continue,
        };
        if body == "[deleted]" || body == "[removed]" {
            continue;
        }
        if body.chars().count() < min_length {
            continue;
        }
        comments.push(body.to_string());
    }
    comments
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_PAGE: &str = r#"{
        "kind": "Listing",
        "data": {
            "after": "t3_cursor",
            "children": [
                {"kind": "t3", "data": {
                    "id": "aaa",
                    "subreddit": "gradadmissions",
                    "title": "Got in!",
                    "selftext": "Accepted to my dream program today.",
                    "score": 42,
                    "created_utc": 1700000000.0,
                    "stickied": false
                }},
                {"kind": "t3", "data": {
                    "id": "bbb",
                    "title": "Weekly megathread",
                    "selftext": "Ask here.",
                    "stickied": true
                }},
                {"kind": "t3", "data": {
                    "id": "ccc",
                    "title": "Removed post",
                    "selftext": "[removed]"
                }}
            ]
        }
    }"#;

    const COMMENT_THREAD: &str = r#"[
        {"kind": "Listing", "data": {"after": null, "children": [
            {"kind": "t3", "data": {}}
        ]}},
        {"kind": "Listing", "data": {"after": null, "children": [
            {"kind": "t1", "data": {"body": "This is a long enough comment to keep around."}},
            {"kind": "t1", "data": {"body": "too short"}},
            {"kind": "t1", "data": {"body": "[deleted]"}},
            {"kind": "more", "data": {}},
            {"kind": "t1", "data": {"body": "A pinned automod reply that is long enough to pass.", "stickied": true}},
            {"kind": "t1", "data": {"body": "Another perfectly usable comment with enough characters."}},
            {"kind": "t1", "data": {"body": "Third usable comment that would exceed the configured cap."}}
        ]}}
    ]"#;

    #[test]
    fn test_listing_page_parses() {
        let listing: Listing<PostData> = serde_json::from_str(LISTING_PAGE).unwrap();
        assert_eq!(listing.data.after.as_deref(), Some("t3_cursor"));
        assert_eq!(listing.data.children.len(), 3);

        let first = &listing.data.children[0];
        assert_eq!(first.kind, "t3");
        assert_eq!(first.data.id, "aaa");
        assert_eq!(first.data.score, 42);
    }

    #[test]
    fn test_pinned_and_removed_posts_are_not_listable() {
        let listing: Listing<PostData> = serde_json::from_str(LISTING_PAGE).unwrap();
        let listable: Vec<bool> = listing
            .data
            .children
            .iter()
            .map(|c| c.data.is_listable())
            .collect();
        assert_eq!(listable, [true, false, false]);
    }

    #[test]
    fn test_into_raw_post_maps_fields() {
        let listing: Listing<PostData> = serde_json::from_str(LISTING_PAGE).unwrap();
        let post = listing
            .data
            .children
            .into_iter()
            .next()
            .unwrap()
            .data
            .into_raw_post("gradadmissions");

        assert_eq!(post.id, "aaa");
        assert_eq!(post.subreddit, "gradadmissions");
        assert_eq!(post.title, "Got in!");
        assert_eq!(post.body, "Accepted to my dream program today.");
        assert_eq!(post.score, 42);
        assert_eq!(post.created_utc.unwrap().timestamp(), 1_700_000_000);
        assert!(post.comments.is_empty());
    }

    #[test]
    fn test_missing_subreddit_falls_back_to_requested() {
        let data = PostData {
            id: "ddd".to_string(),
            subreddit: String::new(),
            title: "Question".to_string(),
            selftext: "How hard is the GRE really?".to_string(),
            score: 0,
            created_utc: None,
            stickied: false,
            distinguished: None,
        };
        let post = data.into_raw_post("StudyAbroad");
        assert_eq!(post.subreddit, "StudyAbroad");
        assert!(post.created_utc.is_none());
    }

    #[test]
    fn test_distinguished_posts_are_not_listable() {
        let data = PostData {
            id: "eee".to_string(),
            subreddit: String::new(),
            title: "Mod announcement".to_string(),
            selftext: "Rules update.".to_string(),
            score: 0,
            created_utc: None,
            stickied: false,
            distinguished: Some("moderator".to_string()),
        };
        assert!(!data.is_listable());
    }

    #[test]
    fn test_usable_comments_filters_and_caps() {
        let listings: Vec<Listing<CommentData>> = serde_json::from_str(COMMENT_THREAD).unwrap();
        let comments = usable_comments(&listings, 20, 2);
        assert_eq!(
            comments,
            [
                "This is a long enough comment to keep around.",
                "Another perfectly usable comment with enough characters.",
            ]
        );
    }

    #[test]
    fn test_usable_comments_without_tree_listing() {
        let listings: Vec<Listing<CommentData>> = serde_json::from_str("[]").unwrap();
        assert!(usable_comments(&listings, 20, 10).is_empty());
    }
}
