use crate::collector::{Collection, Collector, SourceReport};
use crate::comments::{select_posts_for_comments, CommentSampler};
use crate::config::{pagination_plan, HarvestOptions, Pacing, SourceSpec};
use crate::output::{file_timestamp, save_run, SavedFiles};
use crate::progress::maybe_count_progress;
use crate::records::{NormalizedComment, NormalizedPost};
use crate::source::ContentSource;
use crate::stats::{RunStatistics, RunSummary};
use crate::throttle::{PausePoint, Throttle};
use crate::util::init_tracing_once;
use anyhow::Result;
use std::path::Path;

/// Everything one harvest run produced.
#[derive(Debug)]
pub struct HarvestReport {
    pub connected: bool,
    pub posts: Vec<NormalizedPost>,
    pub comments: Vec<NormalizedComment>,
    pub sources: Vec<SourceReport>,
    pub summary: RunSummary,
}

impl HarvestReport {
    pub fn posts_with_demographics(&self) -> usize {
        self.posts.iter().filter(|p| p.has_demographics()).count()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Harvester {
    pub(crate) opts: HarvestOptions,
}

impl Harvester {
    pub fn new() -> Self {
        Self { opts: HarvestOptions::default() }
    }

    pub fn with_options(opts: HarvestOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &HarvestOptions {
        &self.opts
    }

    // -------- Builder methods --------
    pub fn community(mut self, name: impl AsRef<str>) -> Self { self.opts = self.opts.with_community(name); self }
    pub fn target_posts(mut self, n: usize) -> Self { self.opts = self.opts.with_target_posts(n); self }
    pub fn batch_size(mut self, n: usize) -> Self { self.opts = self.opts.with_batch_size(n); self }
    pub fn comments_per_post(mut self, n: usize) -> Self { self.opts = self.opts.with_comments_per_post(n); self }
    pub fn max_comment_posts(mut self, n: usize) -> Self { self.opts = self.opts.with_max_comment_posts(n); self }
    pub fn sources(mut self, plan: Vec<SourceSpec>) -> Self { self.opts = self.opts.with_sources(plan); self }
    pub fn pacing(mut self, pacing: Pacing) -> Self { self.opts = self.opts.with_pacing(pacing); self }
    pub fn out_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_out_dir(dir); self }
    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self { self.opts = self.opts.with_file_prefix(prefix); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }

    // -------- Operations --------

    /// Collect posts from the configured plan, then sample comments from the
    /// selected posts. Source failures are absorbed and reported, never returned.
    pub fn run(&self, source: &dyn ContentSource, throttle: &dyn Throttle) -> HarvestReport {
        init_tracing_once();
        let mut stats = RunStatistics::start();
        tracing::info!(
            community = %self.opts.community,
            target = self.opts.target_posts,
            sources = self.opts.sources.len(),
            "Starting harvest"
        );

        let collection = self.collect_with(source, throttle, &self.opts.sources, false, self.opts.target_posts, &mut stats);
        if !collection.connected || collection.posts.is_empty() {
            tracing::error!("No posts collected");
            return HarvestReport {
                connected: collection.connected,
                posts: collection.posts,
                comments: Vec::new(),
                sources: collection.reports,
                summary: stats.finish(),
            };
        }

        let comments = self.sample_comments(source, throttle, &collection.posts, &mut stats);
        let summary = stats.finish();
        HarvestReport {
            connected: true,
            posts: collection.posts,
            comments,
            sources: collection.reports,
            summary,
        }
    }

    /// Fallback pass over hot/new/top(all) with no fetch limits and no
    /// cross-listing dedupe. Posts only.
    pub fn run_paginated(&self, source: &dyn ContentSource, throttle: &dyn Throttle, target: usize) -> HarvestReport {
        init_tracing_once();
        let mut stats = RunStatistics::start();
        tracing::info!(target, "Starting paginated collection");
        let collection = self.collect_with(source, throttle, &pagination_plan(), true, target, &mut stats);
        HarvestReport {
            connected: collection.connected,
            posts: collection.posts,
            comments: Vec::new(),
            sources: collection.reports,
            summary: stats.finish(),
        }
    }

    /// Run the paginated pass when `report` holds fewer than `below` posts,
    /// including when the first pass collected nothing.
    pub fn fallback_if_short(
        &self,
        source: &dyn ContentSource,
        throttle: &dyn Throttle,
        report: &HarvestReport,
        below: usize,
        target: usize,
    ) -> Option<HarvestReport> {
        if report.posts.len() >= below {
            return None;
        }
        tracing::info!(collected = report.posts.len(), "Fewer than {} posts, trying paginated collection", below);
        Some(self.run_paginated(source, throttle, target))
    }

    /// Sample up to `comments_per_post` comments from each selected post, pausing
    /// every `comments_every` posts.
    pub fn sample_comments(
        &self,
        source: &dyn ContentSource,
        throttle: &dyn Throttle,
        posts: &[NormalizedPost],
        stats: &mut RunStatistics,
    ) -> Vec<NormalizedComment> {
        let selected = select_posts_for_comments(posts, self.opts.max_comment_posts);
        if selected.is_empty() || self.opts.comments_per_post == 0 {
            return Vec::new();
        }
        tracing::info!("Sampling comments from {} posts", selected.len());

        let sampler = CommentSampler::new(source);
        let pb = maybe_count_progress(self.opts.progress, selected.len() as u64, "Sampling comments");
        let every = self.opts.pacing.comments_every.max(1);
        let mut out = Vec::new();

        for (i, post) in selected.iter().enumerate() {
            out.extend(sampler.sample(&post.post_id, self.opts.comments_per_post, stats));
            if let Some(pb) = &pb {
                pb.inc(1);
            }
            if (i + 1) % every == 0 {
                tracing::info!("Comments sampled from {}/{} posts", i + 1, selected.len());
                throttle.pause(PausePoint::Comments, self.opts.pacing.comments_pause);
            }
        }
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        tracing::info!("Sampled {} comments", out.len());
        out
    }

    /// Write the report's posts and comments as timestamped CSV files under `out_dir`.
    pub fn save(&self, report: &HarvestReport) -> Result<SavedFiles> {
        self.save_as(report, &self.opts.file_prefix)
    }

    pub fn save_as(&self, report: &HarvestReport, prefix: &str) -> Result<SavedFiles> {
        save_run(&self.opts.out_dir, prefix, &file_timestamp(), &report.posts, &report.comments)
    }

    fn collect_with(
        &self,
        source: &dyn ContentSource,
        throttle: &dyn Throttle,
        plan: &[SourceSpec],
        paginated: bool,
        target: usize,
        stats: &mut RunStatistics,
    ) -> Collection {
        let pb = maybe_count_progress(self.opts.progress, target as u64, "Collecting posts");
        let collector = Collector::new(source, throttle, self.opts.pacing).with_progress(pb.clone());
        let collection = if paginated {
            collector.collect_paginated(plan, target, stats)
        } else {
            collector.collect(plan, target, self.opts.batch_size, stats)
        };
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        tracing::info!(
            "Collected {} posts ({} with age/gender)",
            collection.posts.len(),
            collection.posts.iter().filter(|p| p.has_demographics()).count()
        );
        collection
    }
}
