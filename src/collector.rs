//! Multi-source post collection: walk listings in priority order, dedupe by post
//! id across listings, stop at a target count, pace between batches and sources.
//!
//! Failures never escape `collect`: an item that fails to normalize is skipped, a
//! listing that fails to open (or breaks mid-iteration) is abandoned, and the next
//! listing is tried.

use crate::config::{Pacing, SourceSpec};
use crate::normalize::normalize_post;
use crate::records::NormalizedPost;
use crate::source::{ContentSource, Listing, RawPost};
use crate::stats::RunStatistics;
use crate::throttle::{PausePoint, Throttle};
use ahash::AHashSet;
use anyhow::Error;
use indicatif::ProgressBar;
use std::time::Duration;

/// What happened to one listing item.
#[derive(Debug)]
pub enum ItemOutcome {
    Accepted,
    Duplicate,
    Failed(Error),
}

/// What happened to one listing.
#[derive(Debug)]
pub enum SourceOutcome {
    Completed { accepted: usize },
    /// Opening the listing failed, or it failed after `accepted` items.
    Failed { accepted: usize, error: Error },
}

#[derive(Debug)]
pub struct SourceReport {
    pub listing: Listing,
    pub outcome: SourceOutcome,
}

/// Result of one collection pass.
#[derive(Debug, Default)]
pub struct Collection {
    pub connected: bool,
    pub posts: Vec<NormalizedPost>,
    pub reports: Vec<SourceReport>,
}

/// How a pass walks its plan.
#[derive(Clone, Copy, Debug)]
struct Walk {
    dedupe: bool,
    batch_size: usize,
    batch_pause: Duration,
    source_pause: Duration,
}

pub struct Collector<'a> {
    source: &'a dyn ContentSource,
    throttle: &'a dyn Throttle,
    pacing: Pacing,
    progress: Option<ProgressBar>,
}

/// Accepted items between pauses in the paginated fallback.
pub const PAGINATION_BATCH: usize = 50;
pub const PAGINATION_PAUSE: Duration = Duration::from_secs(1);

impl<'a> Collector<'a> {
    pub fn new(source: &'a dyn ContentSource, throttle: &'a dyn Throttle, pacing: Pacing) -> Self {
        Self { source, throttle, pacing, progress: None }
    }

    pub fn with_progress(mut self, pb: Option<ProgressBar>) -> Self {
        self.progress = pb;
        self
    }

    /// Collect up to `target` unique posts from `plan`, in order.
    pub fn collect(
        &self,
        plan: &[SourceSpec],
        target: usize,
        batch_size: usize,
        stats: &mut RunStatistics,
    ) -> Collection {
        let walk = Walk {
            dedupe: true,
            batch_size: batch_size.max(1),
            batch_pause: self.pacing.batch_pause,
            source_pause: self.pacing.source_pause,
        };
        self.run(plan, target, walk, stats)
    }

    /// Fallback pass: unlimited listings, no cross-listing dedupe, short pauses
    /// every `PAGINATION_BATCH` accepted items and none between listings.
    pub fn collect_paginated(&self, plan: &[SourceSpec], target: usize, stats: &mut RunStatistics) -> Collection {
        let walk = Walk {
            dedupe: false,
            batch_size: PAGINATION_BATCH,
            batch_pause: PAGINATION_PAUSE,
            source_pause: Duration::ZERO,
        };
        self.run(plan, target, walk, stats)
    }

    fn run(&self, plan: &[SourceSpec], target: usize, walk: Walk, stats: &mut RunStatistics) -> Collection {
        let mut out = Collection::default();

        match self.source.check_connection() {
            Ok(subscribers) => {
                tracing::info!(subscribers, "Connection check succeeded");
                out.connected = true;
            }
            Err(e) => {
                tracing::error!("Connection check failed: {:#}", e);
                return out;
            }
        }

        let mut seen: AHashSet<String> = AHashSet::new();

        for (idx, spec) in plan.iter().enumerate() {
            if out.posts.len() >= target {
                break;
            }
            tracing::info!(listing = %spec.listing, limit = ?spec.limit, "Collecting listing");

            let stream = match self.source.listing(spec.listing, spec.limit) {
                Ok(s) => s,
                Err(error) => {
                    tracing::error!(listing = %spec.listing, "Listing failed: {:#}", error);
                    stats.sources_failed += 1;
                    out.reports.push(SourceReport {
                        listing: spec.listing,
                        outcome: SourceOutcome::Failed { accepted: 0, error },
                    });
                    continue;
                }
            };
            stats.api_calls += 1;

            let mut accepted = 0usize;
            let mut failure: Option<Error> = None;

            for item in stream {
                if out.posts.len() >= target {
                    break;
                }
                let raw = match item {
                    Ok(raw) => raw,
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                };
                match self.accept(raw.as_ref(), walk.dedupe, &mut seen, &mut out.posts) {
                    ItemOutcome::Accepted => {
                        accepted += 1;
                        let has_demo = out.posts.last().map_or(false, |p| p.has_demographics());
                        stats.record_post(has_demo);
                        if let Some(pb) = &self.progress {
                            pb.inc(1);
                        }
                        if accepted % walk.batch_size == 0 {
                            tracing::info!(
                                listing = %spec.listing,
                                "{} posts from this listing, {} total ({} with age/gender)",
                                accepted,
                                out.posts.len(),
                                stats.posts_with_demographics
                            );
                            self.throttle.pause(PausePoint::Batch, walk.batch_pause);
                        }
                    }
                    ItemOutcome::Duplicate => {}
                    ItemOutcome::Failed(e) => {
                        tracing::warn!(listing = %spec.listing, "Skipping post: {:#}", e);
                        stats.items_skipped += 1;
                    }
                }
            }

            match failure {
                Some(error) => {
                    tracing::error!(listing = %spec.listing, accepted, "Listing broke off: {:#}", error);
                    stats.sources_failed += 1;
                    out.reports.push(SourceReport { listing: spec.listing, outcome: SourceOutcome::Failed { accepted, error } });
                }
                None => {
                    tracing::info!(listing = %spec.listing, "Completed listing: {} new posts", accepted);
                    out.reports.push(SourceReport { listing: spec.listing, outcome: SourceOutcome::Completed { accepted } });
                    let more_to_do = idx + 1 < plan.len() && out.posts.len() < target;
                    if more_to_do {
                        self.throttle.pause(PausePoint::Source, walk.source_pause);
                    }
                }
            }
        }

        out
    }

    /// Dedupe (first seen wins; the id is marked before normalizing) and normalize one item.
    fn accept(
        &self,
        raw: &dyn RawPost,
        dedupe: bool,
        seen: &mut AHashSet<String>,
        posts: &mut Vec<NormalizedPost>,
    ) -> ItemOutcome {
        if dedupe && !seen.insert(raw.id().to_string()) {
            return ItemOutcome::Duplicate;
        }
        match normalize_post(raw) {
            Ok(p) => {
                posts.push(p);
                ItemOutcome::Accepted
            }
            Err(e) => ItemOutcome::Failed(e),
        }
    }
}
