//! CSV dataset files for a finished run.

use crate::records::{NormalizedComment, NormalizedPost};
use crate::util::{create_with_backoff, replace_file_atomic_backoff};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::OffsetDateTime;

/// Paths written by `save_run`. A side with no rows is not written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SavedFiles {
    pub posts: Option<PathBuf>,
    pub comments: Option<PathBuf>,
}

/// Local wall-clock `YYYYMMDD_HHMMSS` (UTC when the local offset is unknown).
pub fn file_timestamp() -> String {
    let fmt = format_description!("[year][month][day]_[hour][minute][second]");
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(fmt).unwrap_or_else(|_| now.unix_timestamp().to_string())
}

pub fn posts_file_name(prefix: &str, stamp: &str) -> String {
    format!("{prefix}_posts_{stamp}.csv")
}

pub fn comments_file_name(prefix: &str, stamp: &str) -> String {
    format!("{prefix}_comments_{stamp}.csv")
}

/// Serialize `rows` (header from the first row's field names) to `path`,
/// through a temp file promoted on success.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let tmp = path.with_extension("csv.inprogress");
    {
        let f = create_with_backoff(&tmp, 16, 50).with_context(|| format!("create {}", tmp.display()))?;
        let mut w = csv::Writer::from_writer(BufWriter::new(f));
        for row in rows {
            w.serialize(row).with_context(|| format!("write {}", tmp.display()))?;
        }
        w.flush().with_context(|| format!("flush {}", tmp.display()))?;
    }
    replace_file_atomic_backoff(&tmp, path)
}

/// Write `<prefix>_posts_<stamp>.csv` and `<prefix>_comments_<stamp>.csv` into `out_dir`.
pub fn save_run(
    out_dir: &Path,
    prefix: &str,
    stamp: &str,
    posts: &[NormalizedPost],
    comments: &[NormalizedComment],
) -> Result<SavedFiles> {
    fs::create_dir_all(out_dir).with_context(|| format!("create {}", out_dir.display()))?;
    let mut saved = SavedFiles::default();

    if !posts.is_empty() {
        let p = out_dir.join(posts_file_name(prefix, stamp));
        write_csv(&p, posts)?;
        tracing::info!("Posts saved to {}", p.display());
        saved.posts = Some(p);
    }
    if !comments.is_empty() {
        let p = out_dir.join(comments_file_name(prefix, stamp));
        write_csv(&p, comments)?;
        tracing::info!("Comments saved to {}", p.display());
        saved.comments = Some(p);
    }
    Ok(saved)
}
