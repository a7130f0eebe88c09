//! Dataset cleaning: a stateless CSV -> CSV pass over previously written datasets.
//!
//! Per row, in order: fill missing fields with sentinels, parse and re-render the
//! creation date, strip fullname prefixes from id columns, drop rows whose primary
//! key was already seen. Column order and row order are preserved. An unparseable
//! date fails the whole file and leaves no output behind.

use crate::progress::make_count_progress;
use crate::util::{create_with_backoff, open_with_backoff, remove_with_backoff, replace_file_atomic_backoff};
use ahash::AHashSet;
use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use std::fs;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};
use walkdir::WalkDir;

/// Prefix added to the basename of every cleaned file.
pub const CLEANED_PREFIX: &str = "cleaned_with_age_gender_";

pub const UNKNOWN_GENDER: &str = "Unknown";
pub const MISSING_AGE: &str = "-1";
pub const NO_TEXT: &str = "No Text";
pub const NO_FLAIR: &str = "No Flair";

/// How to remove a fullname prefix from an id column.
#[derive(Clone, Debug)]
pub enum StripRule {
    /// Remove this literal when the value starts with it.
    Literal(&'static str),
    /// Remove a leading match of this pattern (anchored at the start).
    Pattern(Regex),
}

impl StripRule {
    fn apply<'s>(&self, v: &'s str) -> &'s str {
        match self {
            StripRule::Literal(p) => v.strip_prefix(p).unwrap_or(v),
            StripRule::Pattern(re) => match re.find(v) {
                Some(m) if m.start() == 0 => &v[m.end()..],
                _ => v,
            },
        }
    }
}

/// Column roles for one kind of dataset.
#[derive(Clone, Debug)]
pub struct CleanProfile {
    pub name: &'static str,
    pub key: &'static str,
    pub date_column: &'static str,
    pub fills: Vec<(&'static str, &'static str)>, // (column, sentinel), in application order
    pub strips: Vec<(&'static str, StripRule)>,
}

impl CleanProfile {
    pub fn posts() -> Self {
        Self {
            name: "posts",
            key: "post_id",
            date_column: "created_date",
            fills: vec![
                ("gender", UNKNOWN_GENDER),
                ("age", MISSING_AGE),
                ("text", NO_TEXT),
                ("flair", NO_FLAIR),
            ],
            strips: vec![],
        }
    }

    pub fn comments() -> Self {
        Self {
            name: "comments",
            key: "comment_id",
            date_column: "comment_created_date",
            fills: vec![
                ("comment_gender", UNKNOWN_GENDER),
                ("comment_age", MISSING_AGE),
                ("comment_body", NO_TEXT),
            ],
            strips: vec![
                ("post_id", StripRule::Literal("t3_")),
                ("comment_parent_id", StripRule::Pattern(Regex::new(r"^t[13]_").expect("static prefix pattern"))),
            ],
        }
    }

    /// Pick a profile from a dataset file name (`*_comments*.csv`, `*_posts*.csv`).
    pub fn for_file_name(name: &str) -> Option<Self> {
        if !name.ends_with(".csv") {
            return None;
        }
        if name.contains("_comments") {
            Some(Self::comments())
        } else if name.contains("_posts") {
            Some(Self::posts())
        } else {
            None
        }
    }
}

/// Counts from one cleaned file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub rows_in: u64,
    pub rows_out: u64,
    pub duplicates_dropped: u64,
    pub cells_filled: u64,
    pub ids_stripped: u64,
}

#[derive(Clone, Debug)]
pub struct CleanReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub stats: CleanStats,
}

/// Parse the date formats the datasets carry and render them as `YYYY-MM-DD HH:MM:SS`.
pub fn normalize_date(raw: &str) -> Result<String> {
    let out_fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let s = raw.trim();

    let dt = if let Ok(dt) = PrimitiveDateTime::parse(s, out_fmt) {
        dt
    } else if let Ok(dt) = PrimitiveDateTime::parse(s, format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]")) {
        dt
    } else if let Ok(dt) = PrimitiveDateTime::parse(s, format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]")) {
        dt
    } else if let Ok(odt) = OffsetDateTime::parse(s, &Rfc3339) {
        let utc = odt.to_offset(UtcOffset::UTC);
        PrimitiveDateTime::new(utc.date(), utc.time())
    } else if let Ok(d) = Date::parse(s, format_description!("[year]-[month]-[day]")) {
        d.midnight()
    } else {
        bail!("unrecognized date {:?}", raw);
    };
    if dt.nanosecond() != 0 {
        bail!("date {:?} has a fractional second the output format cannot keep", raw);
    }
    Ok(dt.format(out_fmt)?)
}

fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

/// Clean CSV from `input` into `output`. Reads and writes stream row by row;
/// callers that need all-or-nothing output should write to a temp sink.
pub fn clean_csv<R: Read, W: Write>(input: R, output: W, profile: &CleanProfile) -> Result<CleanStats> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(input);
    let mut wtr = csv::Writer::from_writer(output);

    let headers = rdr.headers().context("read header row")?.clone();
    let key_idx = column(&headers, profile.key)
        .ok_or_else(|| anyhow!("{} dataset has no {:?} column", profile.name, profile.key))?;
    let date_idx = column(&headers, profile.date_column)
        .ok_or_else(|| anyhow!("{} dataset has no {:?} column", profile.name, profile.date_column))?;
    let fills: Vec<(usize, &str)> = profile
        .fills
        .iter()
        .filter_map(|(col, v)| column(&headers, col).map(|i| (i, *v)))
        .collect();
    let strips: Vec<(usize, &StripRule)> = profile
        .strips
        .iter()
        .filter_map(|(col, rule)| column(&headers, col).map(|i| (i, rule)))
        .collect();

    wtr.write_record(&headers)?;

    let mut stats = CleanStats::default();
    let mut seen: AHashSet<String> = AHashSet::new();
    let mut row: Vec<String> = Vec::with_capacity(headers.len());

    for (idx, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("read record {}", idx + 1))?;
        // physical line where the record starts; quoted fields may span lines
        let line = rec.position().map_or(idx as u64 + 2, |p| p.line());
        stats.rows_in += 1;

        row.clear();
        row.extend(rec.iter().map(str::to_string));

        for &(i, sentinel) in &fills {
            if row[i].is_empty() {
                row[i] = sentinel.to_string();
                stats.cells_filled += 1;
            }
        }

        if !row[date_idx].is_empty() {
            row[date_idx] = normalize_date(&row[date_idx])
                .with_context(|| format!("line {line}: column {:?}", profile.date_column))?;
        }

        for &(i, rule) in &strips {
            let stripped = rule.apply(&row[i]);
            if stripped.len() != row[i].len() {
                row[i] = stripped.to_string();
                stats.ids_stripped += 1;
            }
        }

        if !seen.insert(row[key_idx].clone()) {
            stats.duplicates_dropped += 1;
            continue;
        }
        wtr.write_record(&row)?;
        stats.rows_out += 1;
    }
    wtr.flush()?;
    Ok(stats)
}

/// Output path for a cleaned copy of `input`, inside `out_dir` (default: beside the input).
pub fn cleaned_path(input: &Path, out_dir: Option<&Path>) -> Result<PathBuf> {
    let name = input
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("not a file path: {}", input.display()))?;
    let dir = match out_dir {
        Some(d) => d.to_path_buf(),
        None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    Ok(dir.join(format!("{CLEANED_PREFIX}{name}")))
}

/// Clean one file. The result is staged in a temp file and only promoted when
/// every row succeeded.
pub fn clean_file(input: &Path, out_dir: Option<&Path>, profile: &CleanProfile) -> Result<CleanReport> {
    let output = cleaned_path(input, out_dir)?;
    if let Some(dir) = output.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    let tmp = output.with_extension("csv.inprogress");

    let rdr = open_with_backoff(input, 16, 50).with_context(|| format!("open {}", input.display()))?;
    let w = create_with_backoff(&tmp, 16, 50).with_context(|| format!("create {}", tmp.display()))?;

    let res = clean_csv(BufReader::new(rdr), BufWriter::new(w), profile);
    let stats = match res {
        Ok(s) => s,
        Err(e) => {
            let _ = remove_with_backoff(&tmp, 10, 25);
            return Err(e.context(format!("cleaning {}", input.display())));
        }
    };
    replace_file_atomic_backoff(&tmp, &output)?;

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        rows_in = stats.rows_in,
        rows_out = stats.rows_out,
        duplicates = stats.duplicates_dropped,
        "Cleaned {} dataset",
        profile.name
    );
    Ok(CleanReport { input: input.to_path_buf(), output, stats })
}

/// Clean every dataset CSV directly inside `dir`, choosing the profile from the
/// file name and skipping files that are already cleaned outputs. A file that
/// fails is logged and reported; the others still run.
pub fn clean_dir(dir: &Path, out_dir: Option<&Path>, progress: bool) -> Result<Vec<(PathBuf, Result<CleanReport>)>> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let mut jobs: Vec<(PathBuf, CleanProfile)> = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let ent = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        let Some(name) = ent.file_name().to_str() else { continue };
        if name.starts_with(CLEANED_PREFIX) || !ent.file_type().is_file() {
            continue;
        }
        if let Some(profile) = CleanProfile::for_file_name(name) {
            jobs.push((ent.path().to_path_buf(), profile));
        }
    }

    if jobs.is_empty() {
        tracing::warn!("No dataset files found in {}", dir.display());
    }
    let pb = if progress { Some(make_count_progress(jobs.len() as u64, "Cleaning datasets")) } else { None };

    let mut results = Vec::with_capacity(jobs.len());
    for (path, profile) in jobs {
        let res = clean_file(&path, out_dir, &profile);
        if let Err(e) = &res {
            tracing::error!("Failed to clean {}: {:#}", path.display(), e);
        }
        results.push((path, res));
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }
    if let Some(pb) = pb {
        pb.finish_with_message("cleaning done");
    }
    Ok(results)
}
