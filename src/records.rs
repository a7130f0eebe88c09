//! Normalized output rows. Field order is the CSV column order.

use crate::demographics::Gender;
use serde::{Deserialize, Serialize};

/// Column names of a posts dataset, in file order.
pub const POST_COLUMNS: [&str; 15] = [
    "post_id", "title", "text", "author", "score", "upvote_ratio", "num_comments",
    "created_date", "url", "permalink", "flair", "gender", "age", "has_selftext", "text_length",
];

/// Column names of a comments dataset, in file order.
pub const COMMENT_COLUMNS: [&str; 9] = [
    "comment_id", "post_id", "comment_parent_id", "comment_body", "comment_author",
    "comment_score", "comment_created_date", "comment_gender", "comment_age",
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPost {
    pub post_id: String,
    pub title: String,
    pub text: String,
    pub author: String,
    pub score: i64,
    pub upvote_ratio: f64,
    pub num_comments: i64,
    pub created_date: String, // YYYY-MM-DD HH:MM:SS, UTC
    pub url: String,
    pub permalink: String, // absolute
    pub flair: Option<String>,
    pub gender: Option<Gender>,
    pub age: Option<u8>,
    pub has_selftext: bool,
    pub text_length: usize, // chars of "title body", untruncated
}

impl NormalizedPost {
    pub fn has_demographics(&self) -> bool {
        self.age.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedComment {
    pub comment_id: String,
    pub post_id: String,
    pub comment_parent_id: Option<String>,
    pub comment_body: String,
    pub comment_author: String,
    pub comment_score: i64,
    pub comment_created_date: String,
    pub comment_gender: Option<Gender>,
    pub comment_age: Option<u8>,
}

impl NormalizedComment {
    pub fn has_demographics(&self) -> bool {
        self.comment_age.is_some()
    }
}
