#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Write plain JSONL lines.
pub fn write_lines(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut f = File::create(path).unwrap();
    for l in lines {
        writeln!(f, "{}", l).unwrap();
    }
}

/// Write a compressed `.zst` file containing the provided JSONL lines.
pub fn write_zst_lines(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(path).unwrap();
    let mut enc = zstd::stream::write::Encoder::new(f, 3).unwrap();
    for l in lines {
        writeln!(&mut enc, "{}", l).unwrap();
    }
    enc.finish().unwrap();
}

/// Read a text file line-by-line into strings (skips empty lines).
pub fn read_lines(path: &Path) -> Vec<String> {
    let f = File::open(path).unwrap();
    let r = BufReader::new(f);
    r.lines().map(|l| l.unwrap()).filter(|s| !s.is_empty()).collect()
}

/// A post record in the platform's dump format. 2024-01-01 00:00:00 UTC plus `offset` seconds.
pub fn post(id: &str, title: &str, selftext: &str, score: i64, offset: i64) -> Value {
    json!({
        "id": id, "title": title, "selftext": selftext, "author": format!("user_{id}"),
        "score": score, "upvote_ratio": 0.9, "num_comments": 3,
        "created_utc": (1704067200 + offset) as f64,
        "url": format!("https://example.com/{id}"),
        "permalink": format!("/r/personalfinance/comments/{id}/"),
        "link_flair_text": null
    })
}

pub fn comment(id: &str, post_id: &str, body: Option<&str>, score: i64) -> Value {
    json!({
        "id": id, "body": body, "author": "commenter", "score": score,
        "created_utc": 1704070800.0, "parent_id": format!("t3_{post_id}")
    })
}

pub fn more() -> Value {
    json!({"kind": "more"})
}

/// Builder for a dump directory laid out as `DumpSource` expects.
pub struct DumpFixture {
    pub root: PathBuf,
    pub community: String,
    _guard: tempfile::TempDir,
}

impl DumpFixture {
    pub fn new(community: &str, subscribers: u64) -> Self {
        let guard = tempfile::tempdir().unwrap();
        let root = guard.path().to_path_buf();
        let dir = root.join(community);
        fs::create_dir_all(dir.join("comments")).unwrap();
        fs::write(dir.join("about.json"), json!({"subscribers": subscribers}).to_string()).unwrap();
        Self { root, community: community.to_string(), _guard: guard }
    }

    pub fn dir(&self) -> PathBuf {
        self.root.join(&self.community)
    }

    pub fn listing(&self, name: &str, records: &[Value]) -> &Self {
        let lines: Vec<String> = records.iter().map(Value::to_string).collect();
        write_lines(&self.dir().join(format!("{name}.jsonl")), &lines);
        self
    }

    pub fn listing_zst(&self, name: &str, records: &[Value]) -> &Self {
        let lines: Vec<String> = records.iter().map(Value::to_string).collect();
        write_zst_lines(&self.dir().join(format!("{name}.jsonl.zst")), &lines);
        self
    }

    pub fn comments(&self, post_id: &str, records: &[Value]) -> &Self {
        let lines: Vec<String> = records.iter().map(Value::to_string).collect();
        write_lines(&self.dir().join("comments").join(format!("{post_id}.jsonl")), &lines);
        self
    }
}
