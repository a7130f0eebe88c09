use crate::source::{Listing, TimeFilter};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One entry of the multi-source plan: a listing and how many items to ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceSpec {
    pub listing: Listing,
    pub limit: Option<usize>, // None = as many as the source yields
}

impl SourceSpec {
    pub const fn new(listing: Listing, limit: Option<usize>) -> Self {
        Self { listing, limit }
    }
}

/// Default multi-source plan, in priority order.
pub fn default_source_plan() -> Vec<SourceSpec> {
    use Listing::*;
    use TimeFilter::*;
    vec![
        SourceSpec::new(Hot, Some(1500)),
        SourceSpec::new(New, Some(1500)),
        SourceSpec::new(Top(Week), Some(800)),
        SourceSpec::new(Top(Month), Some(800)),
        SourceSpec::new(Top(Year), Some(800)),
        SourceSpec::new(Top(All), Some(800)),
        SourceSpec::new(Rising, Some(500)),
        SourceSpec::new(Controversial(Month), Some(300)),
    ]
}

/// Sort methods walked by the paginated fallback, each without a fetch limit.
pub fn pagination_plan() -> Vec<SourceSpec> {
    vec![
        SourceSpec::new(Listing::Hot, None),
        SourceSpec::new(Listing::New, None),
        SourceSpec::new(Listing::Top(TimeFilter::All), None),
    ]
}

/// Pause lengths at each courtesy point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pacing {
    pub batch_pause: Duration,
    pub source_pause: Duration,
    pub comments_pause: Duration,
    pub comments_every: usize, // pause after this many sampled posts
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            batch_pause: Duration::from_secs(2),
            source_pause: Duration::from_secs(3),
            comments_pause: Duration::from_secs(1),
            comments_every: 10,
        }
    }
}

impl Pacing {
    /// No pauses at all (dry runs over local dumps).
    pub fn none() -> Self {
        Self {
            batch_pause: Duration::ZERO,
            source_pause: Duration::ZERO,
            comments_pause: Duration::ZERO,
            comments_every: 10,
        }
    }
}

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct HarvestOptions {
    pub community: String,          // normalized lowercase, no "r/"
    pub target_posts: usize,
    pub batch_size: usize,          // accepted items between batch pauses
    pub comments_per_post: usize,
    pub max_comment_posts: usize,   // cap for the top-by-score fallback selection
    pub sources: Vec<SourceSpec>,
    pub pacing: Pacing,
    pub out_dir: PathBuf,
    pub file_prefix: String,
    pub progress: bool,             // show progress bars
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            community: "personalfinance".into(),
            target_posts: 5000,
            batch_size: 100,
            comments_per_post: 5,
            max_comment_posts: 100,
            sources: default_source_plan(),
            pacing: Pacing::default(),
            out_dir: PathBuf::from("."),
            file_prefix: "reddit_data".into(),
            progress: true,
        }
    }
}

impl HarvestOptions {
    pub fn with_community(mut self, name: impl AsRef<str>) -> Self {
        let mut s = name.as_ref().trim().to_lowercase();
        if let Some(rest) = s.strip_prefix("r/") {
            s = rest.to_string();
        }
        self.community = s;
        self
    }
    pub fn with_target_posts(mut self, n: usize) -> Self {
        self.target_posts = n;
        self
    }
    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.max(1);
        self
    }
    pub fn with_comments_per_post(mut self, n: usize) -> Self {
        self.comments_per_post = n;
        self
    }
    pub fn with_max_comment_posts(mut self, n: usize) -> Self {
        self.max_comment_posts = n;
        self
    }
    pub fn with_sources(mut self, sources: Vec<SourceSpec>) -> Self {
        self.sources = sources;
        self
    }
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }
    pub fn with_out_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.out_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }

    /// Apply `HARVEST_*` environment overrides. Unparseable numbers are logged and ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(s) = std::env::var("HARVEST_COMMUNITY") {
            if !s.trim().is_empty() {
                self = self.with_community(s);
            }
        }
        if let Ok(s) = std::env::var("HARVEST_OUT_DIR") {
            if !s.trim().is_empty() {
                self.out_dir = PathBuf::from(s);
            }
        }
        if let Ok(s) = std::env::var("HARVEST_PREFIX") {
            if !s.trim().is_empty() {
                self.file_prefix = s;
            }
        }
        if let Some(n) = env_usize("HARVEST_TARGET_POSTS") {
            self.target_posts = n;
        }
        if let Some(n) = env_usize("HARVEST_BATCH_SIZE") {
            self = self.with_batch_size(n);
        }
        if let Some(n) = env_usize("HARVEST_COMMENTS_PER_POST") {
            self.comments_per_post = n;
        }
        self
    }
}

fn env_usize(key: &str) -> Option<usize> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!("{} is set but is not a non-negative integer: {:?}", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_source_plan() {
        let o = HarvestOptions::default();
        assert_eq!(o.sources.len(), 8);
        assert_eq!(o.sources[0], SourceSpec::new(Listing::Hot, Some(1500)));
        assert_eq!(o.sources[7], SourceSpec::new(Listing::Controversial(TimeFilter::Month), Some(300)));
        assert_eq!(o.pacing.batch_pause, Duration::from_secs(2));
    }

    #[test]
    fn builder_normalizes_inputs() {
        let o = HarvestOptions::default().with_community(" r/PersonalFinance ").with_batch_size(0);
        assert_eq!(o.community, "personalfinance");
        assert_eq!(o.batch_size, 1);
    }
}
