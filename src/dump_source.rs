//! File-backed `ContentSource` that replays exported listings.
//!
//! Layout under `root`:
//!
//! ```text
//! <community>/about.json                   {"subscribers": 123}
//! <community>/<listing>.jsonl[.zst]        hot, new, rising, top_week, controversial_month, ...
//! <community>/comments/<post_id>.jsonl[.zst]
//! ```
//!
//! Records use the platform's own field names. In comment files a line of
//! `{"kind":"more"}` stands for a "load more comments" placeholder. Lines that are
//! not valid JSON are logged and skipped; I/O errors break the listing.

use crate::source::{CommentNode, ContentSource, Listing, PostStream, RawComment, RawPost};
use crate::util::open_with_backoff;
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use zstd::stream::read::Decoder;

#[derive(Debug, Deserialize)]
pub struct DumpPost {
    pub id: String,
    pub title: Option<String>,
    pub selftext: Option<String>,
    pub author: Option<String>,
    pub score: Option<i64>,
    pub upvote_ratio: Option<f64>,
    pub num_comments: Option<i64>,
    pub created_utc: Option<f64>, // the platform emits floats ("1136073600.0")
    pub url: Option<String>,
    pub permalink: Option<String>,
    pub link_flair_text: Option<String>,
}

fn required<T: Copy>(v: Option<T>, id: &str, field: &str) -> Result<T> {
    v.ok_or_else(|| anyhow!("record {id}: missing {field}"))
}

impl RawPost for DumpPost {
    fn id(&self) -> &str { &self.id }
    fn title(&self) -> Option<&str> { self.title.as_deref() }
    fn selftext(&self) -> Option<&str> { self.selftext.as_deref() }
    fn author(&self) -> Option<&str> { self.author.as_deref() }
    fn score(&self) -> Result<i64> { required(self.score, &self.id, "score") }
    fn upvote_ratio(&self) -> Result<f64> { required(self.upvote_ratio, &self.id, "upvote_ratio") }
    fn num_comments(&self) -> Result<i64> { required(self.num_comments, &self.id, "num_comments") }
    fn created_utc(&self) -> Result<i64> { Ok(required(self.created_utc, &self.id, "created_utc")? as i64) }
    fn url(&self) -> Option<&str> { self.url.as_deref() }
    fn permalink(&self) -> Result<&str> {
        self.permalink.as_deref().ok_or_else(|| anyhow!("record {}: missing permalink", self.id))
    }
    fn link_flair_text(&self) -> Option<&str> { self.link_flair_text.as_deref() }
}

#[derive(Debug, Deserialize)]
pub struct DumpComment {
    pub id: String,
    pub body: Option<String>,
    pub author: Option<String>,
    pub score: Option<i64>,
    pub created_utc: Option<f64>,
    pub parent_id: Option<String>,
}

impl RawComment for DumpComment {
    fn id(&self) -> &str { &self.id }
    fn body(&self) -> Option<&str> { self.body.as_deref() }
    fn author(&self) -> Option<&str> { self.author.as_deref() }
    fn score(&self) -> Result<i64> { required(self.score, &self.id, "score") }
    fn created_utc(&self) -> Result<i64> { Ok(required(self.created_utc, &self.id, "created_utc")? as i64) }
    fn parent_id(&self) -> Option<&str> { self.parent_id.as_deref() }
}

pub struct DumpSource {
    dir: PathBuf,
    read_buf_bytes: usize,
}

impl DumpSource {
    pub fn new(root: impl AsRef<Path>, community: &str) -> Self {
        Self { dir: root.as_ref().join(community), read_buf_bytes: 256 * 1024 }
    }

    /// `<stem>.jsonl.zst` if present, else `<stem>.jsonl`.
    fn resolve(&self, stem: &Path) -> Option<PathBuf> {
        let base = stem.as_os_str().to_string_lossy();
        [format!("{base}.jsonl.zst"), format!("{base}.jsonl")]
            .into_iter()
            .map(PathBuf::from)
            .find(|p| p.is_file())
    }
}

/// Open a plain or zstd-compressed NDJSON file as a buffered line source.
pub fn open_ndjson(path: &Path, read_buf_bytes: usize) -> Result<Box<dyn BufRead>> {
    let f = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
    let is_zst = path.extension().map_or(false, |e| e == "zst");
    if is_zst {
        let mut dec = Decoder::new(f).with_context(|| format!("zstd {}", path.display()))?;
        dec.window_log_max(31)?;
        Ok(Box::new(BufReader::with_capacity(read_buf_bytes, dec)))
    } else {
        Ok(Box::new(BufReader::with_capacity(read_buf_bytes, f)))
    }
}

fn non_empty_lines(r: Box<dyn BufRead>, path: PathBuf) -> impl Iterator<Item = Result<String>> {
    r.lines().filter_map(move |line| match line {
        Ok(l) if l.trim().is_empty() => None,
        Ok(l) => Some(Ok(l)),
        Err(e) => Some(Err(anyhow::Error::new(e).context(format!("read {}", path.display())))),
    })
}

impl ContentSource for DumpSource {
    fn check_connection(&self) -> Result<u64> {
        if !self.dir.is_dir() {
            bail!("community directory {} does not exist", self.dir.display());
        }
        let about = self.dir.join("about.json");
        if !about.is_file() {
            return Ok(0);
        }
        let v: Value = serde_json::from_str(&fs::read_to_string(&about)?)
            .with_context(|| format!("parse {}", about.display()))?;
        Ok(v.get("subscribers").and_then(Value::as_u64).unwrap_or(0))
    }

    fn listing(&self, listing: Listing, limit: Option<usize>) -> Result<PostStream<'_>> {
        let stem = self.dir.join(listing.name());
        let path = self
            .resolve(&stem)
            .ok_or_else(|| anyhow!("listing {listing} not available under {}", self.dir.display()))?;
        let reader = open_ndjson(&path, self.read_buf_bytes)?;

        let items = non_empty_lines(reader, path.clone()).filter_map(move |line| {
            let line = match line {
                Ok(l) => l,
                Err(e) => return Some(Err(e)),
            };
            match serde_json::from_str::<DumpPost>(&line) {
                Ok(p) => Some(Ok(Box::new(p) as Box<dyn RawPost>)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Skipping unparseable post line: {}", e);
                    None
                }
            }
        });
        Ok(Box::new(items.take(limit.unwrap_or(usize::MAX))))
    }

    fn comments(&self, post_id: &str) -> Result<Vec<CommentNode>> {
        let stem = self.dir.join("comments").join(post_id);
        let Some(path) = self.resolve(&stem) else {
            return Ok(Vec::new());
        };
        let reader = open_ndjson(&path, self.read_buf_bytes)?;

        let mut out = Vec::new();
        for line in non_empty_lines(reader, path.clone()) {
            let v: Value = match serde_json::from_str(&line?) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Skipping unparseable comment line: {}", e);
                    continue;
                }
            };
            if v.get("kind").and_then(Value::as_str) == Some("more") {
                out.push(CommentNode::More);
                continue;
            }
            match serde_json::from_value::<DumpComment>(v) {
                Ok(c) => out.push(CommentNode::Comment(Box::new(c))),
                Err(e) => tracing::warn!(path = %path.display(), "Skipping malformed comment: {}", e),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(path: &Path, lines: &[&str]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut f = fs::File::create(path).unwrap();
        for l in lines {
            writeln!(f, "{l}").unwrap();
        }
    }

    #[test]
    fn missing_community_fails_connection() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(DumpSource::new(tmp.path(), "nope").check_connection().is_err());
    }

    #[test]
    fn reads_plain_listing_with_limit_and_skips_bad_lines() {
        let tmp = tempfile::tempdir().unwrap();
        write(&tmp.path().join("pf").join("about.json"), &[r#"{"subscribers": 7}"#]);
        write(
            &tmp.path().join("pf").join("hot.jsonl"),
            &[r#"{"id":"a","title":"one"}"#, "not json", "", r#"{"id":"b"}"#, r#"{"id":"c"}"#],
        );
        let src = DumpSource::new(tmp.path(), "pf");
        assert_eq!(src.check_connection().unwrap(), 7);

        let ids: Vec<String> = src
            .listing(Listing::Hot, Some(2))
            .unwrap()
            .map(|r| r.unwrap().id().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(src.listing(Listing::New, None).is_err());
    }

    #[test]
    fn missing_fields_surface_as_accessor_errors() {
        let p: DumpPost = serde_json::from_str(r#"{"id":"x","score":3}"#).unwrap();
        assert_eq!(p.score().unwrap(), 3);
        assert!(p.created_utc().is_err());
        assert!(p.permalink().is_err());
    }

    #[test]
    fn comments_keep_placeholders_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            &tmp.path().join("pf").join("comments").join("a.jsonl"),
            &[r#"{"id":"c1","body":"hi","created_utc":1.0}"#, r#"{"kind":"more"}"#, r#"{"id":"c2"}"#],
        );
        let src = DumpSource::new(tmp.path(), "pf");
        let nodes = src.comments("a").unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(matches!(nodes[1], CommentNode::More));
        assert!(src.comments("unknown").unwrap().is_empty());
    }
}
