//! Bounded comment sampling for a chosen subset of posts.

use crate::normalize::normalize_comment;
use crate::records::{NormalizedComment, NormalizedPost};
use crate::source::{CommentNode, ContentSource};
use crate::stats::RunStatistics;

pub struct CommentSampler<'a> {
    source: &'a dyn ContentSource,
}

impl<'a> CommentSampler<'a> {
    pub fn new(source: &'a dyn ContentSource) -> Self {
        Self { source }
    }

    /// Up to `max_comments` top-level comments of `post_id`, in source order.
    ///
    /// "More comments" placeholders are dropped without expansion, the cap is
    /// applied to the remaining entries, then deleted/removed bodies are filtered
    /// out, so fewer than `max_comments` rows may come back. A failed fetch is
    /// logged and yields no comments.
    pub fn sample(&self, post_id: &str, max_comments: usize, stats: &mut RunStatistics) -> Vec<NormalizedComment> {
        let nodes = match self.source.comments(post_id) {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(post_id, "Fetching comments failed: {:#}", e);
                return Vec::new();
            }
        };
        stats.api_calls += 1;

        let mut out = Vec::new();
        let top_level = nodes
            .iter()
            .filter_map(|n| match n {
                CommentNode::Comment(c) => Some(c.as_ref()),
                CommentNode::More => None,
            })
            .take(max_comments);

        for c in top_level {
            match normalize_comment(post_id, c) {
                Ok(Some(row)) => {
                    stats.record_comment(row.has_demographics());
                    out.push(row);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(post_id, "Skipping comment: {:#}", e);
                    stats.items_skipped += 1;
                }
            }
        }
        out
    }
}

/// Which posts to sample comments from: every post with an extracted age, or,
/// when there are none, the `cap` highest-scoring posts (ties keep collection order).
pub fn select_posts_for_comments(posts: &[NormalizedPost], cap: usize) -> Vec<&NormalizedPost> {
    let with_demo: Vec<&NormalizedPost> = posts.iter().filter(|p| p.has_demographics()).collect();
    if !with_demo.is_empty() {
        return with_demo;
    }
    let mut by_score: Vec<&NormalizedPost> = posts.iter().collect();
    by_score.sort_by(|a, b| b.score.cmp(&a.score));
    by_score.truncate(cap.min(posts.len()));
    by_score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demographics::Gender;
    use crate::source::{Listing, PostStream, RawComment};
    use anyhow::{anyhow, Result};

    struct C(&'static str, &'static str);

    impl RawComment for C {
        fn id(&self) -> &str { self.0 }
        fn body(&self) -> Option<&str> { Some(self.1) }
        fn author(&self) -> Option<&str> { None }
        fn score(&self) -> Result<i64> { Ok(1) }
        fn created_utc(&self) -> Result<i64> { Ok(0) }
        fn parent_id(&self) -> Option<&str> { None }
    }

    struct Src;

    impl ContentSource for Src {
        fn check_connection(&self) -> Result<u64> { Ok(1) }
        fn listing(&self, _l: Listing, _n: Option<usize>) -> Result<PostStream<'_>> {
            Ok(Box::new(std::iter::empty()))
        }
        fn comments(&self, post_id: &str) -> Result<Vec<CommentNode>> {
            if post_id == "gone" {
                return Err(anyhow!("404"));
            }
            Ok(vec![
                CommentNode::Comment(Box::new(C("c1", "first, 29f"))),
                CommentNode::More,
                CommentNode::Comment(Box::new(C("c2", "[removed]"))),
                CommentNode::Comment(Box::new(C("c3", "third"))),
                CommentNode::Comment(Box::new(C("c4", "fourth"))),
            ])
        }
    }

    #[test]
    fn cap_applies_before_filtering() {
        let mut stats = RunStatistics::start();
        let rows = CommentSampler::new(&Src).sample("p1", 3, &mut stats);
        let ids: Vec<_> = rows.iter().map(|c| c.comment_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c3"]);
        assert_eq!(rows[0].comment_author, "[deleted]");
        assert_eq!(rows[0].comment_gender, Some(Gender::Female));
        assert_eq!(stats.comments_scraped, 2);
        assert_eq!(stats.comments_with_demographics, 1);
        assert_eq!(stats.api_calls, 1);
    }

    #[test]
    fn fetch_failure_is_empty() {
        let mut stats = RunStatistics::start();
        assert!(CommentSampler::new(&Src).sample("gone", 5, &mut stats).is_empty());
        assert_eq!(stats.api_calls, 0);
    }

    fn post(id: &str, score: i64, age: Option<u8>) -> NormalizedPost {
        NormalizedPost {
            post_id: id.into(),
            title: String::new(),
            text: String::new(),
            author: "a".into(),
            score,
            upvote_ratio: 1.0,
            num_comments: 0,
            created_date: "2024-01-01 00:00:00".into(),
            url: String::new(),
            permalink: String::new(),
            flair: None,
            gender: age.map(|_| Gender::Male),
            age,
            has_selftext: false,
            text_length: 0,
        }
    }

    #[test]
    fn selection_prefers_posts_with_demographics() {
        let posts = vec![post("a", 5, None), post("b", 1, Some(30)), post("c", 9, Some(41))];
        let sel: Vec<_> = select_posts_for_comments(&posts, 100).iter().map(|p| p.post_id.clone()).collect();
        assert_eq!(sel, vec!["b", "c"]);
    }

    #[test]
    fn selection_falls_back_to_top_scores() {
        let posts = vec![post("a", 5, None), post("b", 10, None), post("c", 5, None), post("d", 1, None)];
        let sel: Vec<_> = select_posts_for_comments(&posts, 3).iter().map(|p| p.post_id.clone()).collect();
        assert_eq!(sel, vec!["b", "a", "c"]);
        assert!(select_posts_for_comments(&[], 100).is_empty());
    }
}
