//! Per-run counters and the end-of-run summary report.

use crate::demographics::Gender;
use crate::records::NormalizedPost;
use std::fmt;
use std::time::{Duration, Instant};

/// Counters accumulated through one harvest run. Created at the start of a run,
/// passed by `&mut` through each stage, and finalized into a `RunSummary`.
#[derive(Clone, Debug)]
pub struct RunStatistics {
    started: Instant,
    pub posts_scraped: u64,
    pub posts_with_demographics: u64,
    pub comments_scraped: u64,
    pub comments_with_demographics: u64,
    pub api_calls: u64,
    pub items_skipped: u64,
    pub sources_failed: u64,
}

impl Default for RunStatistics {
    fn default() -> Self {
        Self::start()
    }
}

impl RunStatistics {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            posts_scraped: 0,
            posts_with_demographics: 0,
            comments_scraped: 0,
            comments_with_demographics: 0,
            api_calls: 0,
            items_skipped: 0,
            sources_failed: 0,
        }
    }

    pub fn record_post(&mut self, has_demographics: bool) {
        self.posts_scraped += 1;
        if has_demographics {
            self.posts_with_demographics += 1;
        }
    }

    pub fn record_comment(&mut self, has_demographics: bool) {
        self.comments_scraped += 1;
        if has_demographics {
            self.comments_with_demographics += 1;
        }
    }

    pub fn finish(&self) -> RunSummary {
        self.finish_with_elapsed(self.started.elapsed())
    }

    /// Finalize with an explicit elapsed time (deterministic reports in tests).
    pub fn finish_with_elapsed(&self, elapsed: Duration) -> RunSummary {
        RunSummary {
            elapsed,
            posts_scraped: self.posts_scraped,
            posts_with_demographics: self.posts_with_demographics,
            comments_scraped: self.comments_scraped,
            comments_with_demographics: self.comments_with_demographics,
            api_calls: self.api_calls,
            items_skipped: self.items_skipped,
            sources_failed: self.sources_failed,
        }
    }
}

/// Frozen statistics of a finished run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub elapsed: Duration,
    pub posts_scraped: u64,
    pub posts_with_demographics: u64,
    pub comments_scraped: u64,
    pub comments_with_demographics: u64,
    pub api_calls: u64,
    pub items_skipped: u64,
    pub sources_failed: u64,
}

fn pct(part: u64, whole: u64) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 * 100.0 / whole as f64 }
}

fn per_minute(n: u64, minutes: f64) -> f64 {
    if minutes > 0.0 { n as f64 / minutes } else { 0.0 }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.elapsed.as_secs_f64();
        let mins = secs / 60.0;
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "HARVEST STATISTICS")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Total runtime: {mins:.1} minutes ({secs:.1} seconds)")?;
        writeln!(f, "API calls made: {}", self.api_calls)?;
        writeln!(f, "API calls/minute: {:.1}", per_minute(self.api_calls, mins))?;
        writeln!(f)?;
        writeln!(f, "POSTS:")?;
        writeln!(f, "  scraped: {}", self.posts_scraped)?;
        writeln!(
            f,
            "  with age/gender: {} ({:.1}%)",
            self.posts_with_demographics,
            pct(self.posts_with_demographics, self.posts_scraped)
        )?;
        writeln!(f)?;
        writeln!(f, "COMMENTS:")?;
        writeln!(f, "  scraped: {}", self.comments_scraped)?;
        writeln!(
            f,
            "  with age/gender: {} ({:.1}%)",
            self.comments_with_demographics,
            pct(self.comments_with_demographics, self.comments_scraped)
        )?;
        writeln!(f)?;
        writeln!(f, "FAILURES:")?;
        writeln!(f, "  items skipped: {}", self.items_skipped)?;
        writeln!(f, "  sources failed: {}", self.sources_failed)?;
        if mins > 0.0 {
            writeln!(f)?;
            writeln!(f, "EFFICIENCY:")?;
            writeln!(f, "  posts/minute: {:.1}", per_minute(self.posts_scraped, mins))?;
            writeln!(f, "  comments/minute: {:.1}", per_minute(self.comments_scraped, mins))?;
            writeln!(
                f,
                "  data points/minute: {:.1}",
                per_minute(self.posts_scraped + self.comments_scraped, mins)
            )?;
        }
        write!(f, "{rule}")
    }
}

/// Gender counts and age range over the posts that carry demographics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DemographicBreakdown {
    pub male: usize,
    pub female: usize,
    pub min_age: Option<u8>,
    pub max_age: Option<u8>,
}

impl DemographicBreakdown {
    pub fn from_posts(posts: &[NormalizedPost]) -> Self {
        let mut b = Self::default();
        for (g, age) in posts.iter().filter_map(|p| Some((p.gender?, p.age?))) {
            match g {
                Gender::Male => b.male += 1,
                Gender::Female => b.female += 1,
            }
            b.min_age = Some(b.min_age.map_or(age, |m| m.min(age)));
            b.max_age = Some(b.max_age.map_or(age, |m| m.max(age)));
        }
        b
    }

    pub fn total(&self) -> usize {
        self.male + self.female
    }
}

impl fmt::Display for DemographicBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Age/gender distribution ({} posts):", self.total())?;
        writeln!(f, "  Male: {}", self.male)?;
        writeln!(f, "  Female: {}", self.female)?;
        match (self.min_age, self.max_age) {
            (Some(lo), Some(hi)) => write!(f, "  Age range: {lo} - {hi}"),
            _ => write!(f, "  Age range: n/a"),
        }
    }
}

/// The first `rows` collected posts, one line each.
pub struct PostPreview<'a> {
    pub posts: &'a [NormalizedPost],
    pub rows: usize,
}

impl<'a> PostPreview<'a> {
    pub fn new(posts: &'a [NormalizedPost]) -> Self {
        Self { posts, rows: 10 }
    }
}

impl fmt::Display for PostPreview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sample of {} posts:", self.rows.min(self.posts.len()))?;
        for p in self.posts.iter().take(self.rows) {
            let title: String = p.title.chars().take(50).collect();
            let age = p.age.map_or_else(|| "-".to_string(), |a| a.to_string());
            let gender = p.gender.map_or("-", Gender::as_str);
            write!(
                f,
                "\n  {title} | score {} | comments {} | age {age} | gender {gender} | selftext {}",
                p.score, p.num_comments, p.has_selftext
            )?;
        }
        Ok(())
    }
}
