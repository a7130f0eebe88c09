//! Raw source records -> normalized rows (truncation, timestamps, demographics).

use crate::demographics::extract_split;
use crate::records::{NormalizedComment, NormalizedPost};
use crate::source::{RawComment, RawPost};
use anyhow::{Context, Result};
use time::macros::format_description;
use time::OffsetDateTime;

pub const TITLE_MAX_CHARS: usize = 500;
pub const POST_BODY_MAX_CHARS: usize = 1000;
pub const COMMENT_BODY_MAX_CHARS: usize = 500;

pub const DELETED_AUTHOR: &str = "[deleted]";
pub const PERMALINK_BASE: &str = "https://reddit.com";

/// Comment bodies that mark a deleted or moderator-removed comment.
pub const REMOVED_BODIES: [&str; 2] = ["[deleted]", "[removed]"];

/// First `max` characters of `s` (char-based, never splits a code point).
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Render epoch seconds as `YYYY-MM-DD HH:MM:SS` in UTC.
pub fn format_utc(ts: i64) -> Result<String> {
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let dt = OffsetDateTime::from_unix_timestamp(ts)
        .with_context(|| format!("timestamp {ts} out of range"))?;
    Ok(dt.format(fmt)?)
}

pub fn is_removed_body(body: &str) -> bool {
    REMOVED_BODIES.contains(&body)
}

/// Build a `NormalizedPost`. Demographics are read from the full, untruncated
/// `title + " " + body`; only the stored fields are truncated.
pub fn normalize_post(post: &dyn RawPost) -> Result<NormalizedPost> {
    let id = post.id();
    let title = post.title().unwrap_or("");
    let body = post.selftext().unwrap_or("");
    let combined = format!("{title} {body}");
    let (gender, age) = extract_split(&combined);

    Ok(NormalizedPost {
        post_id: id.to_string(),
        title: truncate_chars(title, TITLE_MAX_CHARS),
        text: truncate_chars(body, POST_BODY_MAX_CHARS),
        author: post.author().unwrap_or(DELETED_AUTHOR).to_string(),
        score: post.score().with_context(|| format!("post {id}: score"))?,
        upvote_ratio: post.upvote_ratio().with_context(|| format!("post {id}: upvote_ratio"))?,
        num_comments: post.num_comments().with_context(|| format!("post {id}: num_comments"))?,
        created_date: format_utc(post.created_utc().with_context(|| format!("post {id}: created_utc"))?)?,
        url: post.url().unwrap_or("").to_string(),
        permalink: format!("{PERMALINK_BASE}{}", post.permalink().with_context(|| format!("post {id}: permalink"))?),
        flair: post.link_flair_text().map(str::to_string),
        gender,
        age,
        has_selftext: !body.is_empty(),
        text_length: combined.chars().count(),
    })
}

/// Build a `NormalizedComment`, or `Ok(None)` when the comment has no body or
/// its body is a deletion/removal marker.
pub fn normalize_comment(post_id: &str, comment: &dyn RawComment) -> Result<Option<NormalizedComment>> {
    let body = match comment.body() {
        Some(b) if !is_removed_body(b) => b,
        _ => return Ok(None),
    };
    let id = comment.id();
    let (gender, age) = extract_split(body);

    Ok(Some(NormalizedComment {
        comment_id: id.to_string(),
        post_id: post_id.to_string(),
        comment_parent_id: comment.parent_id().map(str::to_string),
        comment_body: truncate_chars(body, COMMENT_BODY_MAX_CHARS),
        comment_author: comment.author().unwrap_or(DELETED_AUTHOR).to_string(),
        comment_score: comment.score().with_context(|| format!("comment {id}: score"))?,
        comment_created_date: format_utc(comment.created_utc().with_context(|| format!("comment {id}: created_utc"))?)?,
        comment_gender: gender,
        comment_age: age,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demographics::Gender;
    use anyhow::anyhow;

    struct Post {
        title: String,
        body: Option<String>,
        author: Option<String>,
        created: Option<i64>,
    }

    impl RawPost for Post {
        fn id(&self) -> &str { "p1" }
        fn title(&self) -> Option<&str> { Some(&self.title) }
        fn selftext(&self) -> Option<&str> { self.body.as_deref() }
        fn author(&self) -> Option<&str> { self.author.as_deref() }
        fn score(&self) -> Result<i64> { Ok(12) }
        fn upvote_ratio(&self) -> Result<f64> { Ok(0.93) }
        fn num_comments(&self) -> Result<i64> { Ok(4) }
        fn created_utc(&self) -> Result<i64> { self.created.ok_or_else(|| anyhow!("missing created_utc")) }
        fn url(&self) -> Option<&str> { Some("https://example.com/p1") }
        fn permalink(&self) -> Result<&str> { Ok("/r/personalfinance/comments/p1/x/") }
        fn link_flair_text(&self) -> Option<&str> { None }
    }

    struct Comment(Option<&'static str>);

    impl RawComment for Comment {
        fn id(&self) -> &str { "c1" }
        fn body(&self) -> Option<&str> { self.0 }
        fn author(&self) -> Option<&str> { Some("alice") }
        fn score(&self) -> Result<i64> { Ok(3) }
        fn created_utc(&self) -> Result<i64> { Ok(1_136_073_600) }
        fn parent_id(&self) -> Option<&str> { Some("t3_p1") }
    }

    fn post(title: &str, body: Option<&str>) -> Post {
        Post { title: title.into(), body: body.map(Into::into), author: None, created: Some(1_136_073_600) }
    }

    #[test]
    fn post_fields_are_normalized() {
        let p = normalize_post(&post("Budget help (28F)", Some("Need advice"))).unwrap();
        assert_eq!(p.post_id, "p1");
        assert_eq!(p.author, DELETED_AUTHOR);
        assert_eq!(p.created_date, "2006-01-01 00:00:00");
        assert_eq!(p.permalink, "https://reddit.com/r/personalfinance/comments/p1/x/");
        assert_eq!(p.flair, None);
        assert_eq!((p.gender, p.age), (Some(Gender::Female), Some(28)));
        assert!(p.has_selftext);
        assert_eq!(p.text_length, "Budget help (28F) Need advice".len());
    }

    #[test]
    fn long_title_is_truncated_but_fully_scanned() {
        let title = format!("{} i'm a 31 year old female", "x".repeat(600));
        let p = normalize_post(&post(&title, None)).unwrap();
        assert_eq!(p.title.chars().count(), TITLE_MAX_CHARS);
        assert_eq!(p.title, title.chars().take(TITLE_MAX_CHARS).collect::<String>());
        assert_eq!((p.gender, p.age), (Some(Gender::Female), Some(31)));
        assert!(!p.has_selftext);
        assert_eq!(p.text_length, title.chars().count() + 1);
    }

    #[test]
    fn body_truncation_counts_chars() {
        let body = "é".repeat(1200);
        let p = normalize_post(&post("t", Some(&body))).unwrap();
        assert_eq!(p.text.chars().count(), POST_BODY_MAX_CHARS);
    }

    #[test]
    fn malformed_post_is_an_error() {
        let mut p = post("t", None);
        p.created = None;
        let err = normalize_post(&p).unwrap_err();
        assert!(format!("{err:#}").contains("created_utc"));
    }

    #[test]
    fn removed_comments_are_dropped() {
        assert!(normalize_comment("p1", &Comment(Some("[deleted]"))).unwrap().is_none());
        assert!(normalize_comment("p1", &Comment(Some("[removed]"))).unwrap().is_none());
        assert!(normalize_comment("p1", &Comment(None)).unwrap().is_none());
    }

    #[test]
    fn comment_fields_are_normalized() {
        let c = normalize_comment("p1", &Comment(Some("same here, 35m"))).unwrap().unwrap();
        assert_eq!(c.comment_id, "c1");
        assert_eq!(c.post_id, "p1");
        assert_eq!(c.comment_parent_id.as_deref(), Some("t3_p1"));
        assert_eq!(c.comment_author, "alice");
        assert_eq!((c.comment_gender, c.comment_age), (Some(Gender::Male), Some(35)));
    }

    #[test]
    fn truncate_chars_keeps_short_strings() {
        assert_eq!(truncate_chars("abc", 5), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }
}
