//! The content-source seam: what the harvester needs from a forum API client.
//!
//! Records are exposed through accessor traits with explicit nullability so the
//! normalizers never touch a loosely-typed attribute bag, and tests can plug in
//! fakes.

use anyhow::Result;
use std::fmt;

/// Time window for `top` / `controversial` listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeFilter {
    Hour,
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TimeFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeFilter::Hour => "hour",
            TimeFilter::Day => "day",
            TimeFilter::Week => "week",
            TimeFilter::Month => "month",
            TimeFilter::Year => "year",
            TimeFilter::All => "all",
        }
    }
}

/// A named listing feed of a community.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Listing {
    Hot,
    New,
    Rising,
    Top(TimeFilter),
    Controversial(TimeFilter),
}

impl Listing {
    /// Stable name used in logs and in dump file names (`top_week`, `controversial_month`, ...).
    pub fn name(self) -> String {
        match self {
            Listing::Hot => "hot".into(),
            Listing::New => "new".into(),
            Listing::Rising => "rising".into(),
            Listing::Top(t) => format!("top_{}", t.as_str()),
            Listing::Controversial(t) => format!("controversial_{}", t.as_str()),
        }
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Read-only view of a post as returned by the content source.
///
/// Accessors for fields the normalizer cannot do without return `Result`, so a
/// malformed record surfaces as an item error instead of a panic.
pub trait RawPost {
    fn id(&self) -> &str;
    fn title(&self) -> Option<&str>;
    fn selftext(&self) -> Option<&str>;
    fn author(&self) -> Option<&str>;
    fn score(&self) -> Result<i64>;
    fn upvote_ratio(&self) -> Result<f64>;
    fn num_comments(&self) -> Result<i64>;
    /// Seconds since the Unix epoch, UTC.
    fn created_utc(&self) -> Result<i64>;
    fn url(&self) -> Option<&str>;
    /// Site-relative permalink, e.g. `/r/x/comments/abc/title/`.
    fn permalink(&self) -> Result<&str>;
    fn link_flair_text(&self) -> Option<&str>;
}

/// Read-only view of a comment.
pub trait RawComment {
    fn id(&self) -> &str;
    fn body(&self) -> Option<&str>;
    fn author(&self) -> Option<&str>;
    fn score(&self) -> Result<i64>;
    fn created_utc(&self) -> Result<i64>;
    /// Parent fullname (`t3_<post>` or `t1_<comment>`), when the source exposes it.
    fn parent_id(&self) -> Option<&str>;
}

/// One entry of a post's top-level comment list.
pub enum CommentNode {
    Comment(Box<dyn RawComment>),
    /// A "load more comments" placeholder. Never expanded by the harvester.
    More,
}

/// Lazily-produced listing items. Each item may fail independently.
pub type PostStream<'a> = Box<dyn Iterator<Item = Result<Box<dyn RawPost>>> + 'a>;

/// A single community on a content platform.
pub trait ContentSource {
    /// Connectivity probe. Returns the community's subscriber count on success.
    fn check_connection(&self) -> Result<u64>;

    /// Open a listing. `limit == None` asks for as many items as the source will give.
    fn listing(&self, listing: Listing, limit: Option<usize>) -> Result<PostStream<'_>>;

    /// Top-level comments of a post, in source order, placeholders included.
    fn comments(&self, post_id: &str) -> Result<Vec<CommentNode>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_names_are_stable() {
        assert_eq!(Listing::Hot.name(), "hot");
        assert_eq!(Listing::Top(TimeFilter::Week).name(), "top_week");
        assert_eq!(Listing::Controversial(TimeFilter::Month).to_string(), "controversial_month");
    }
}
