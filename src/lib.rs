mod config;
mod demographics;
mod source;
mod records;
mod normalize;

mod throttle;
mod stats;
mod collector;
mod comments;
mod pipeline;

mod dump_source;
mod output;
mod cleaner;
mod progress;
mod util;

pub use crate::config::{default_source_plan, pagination_plan, HarvestOptions, Pacing, SourceSpec};
pub use crate::demographics::{extract, extract_split, Demographics, Gender, MAX_AGE, MIN_AGE};
pub use crate::source::{CommentNode, ContentSource, Listing, PostStream, RawComment, RawPost, TimeFilter};
pub use crate::records::{NormalizedComment, NormalizedPost, COMMENT_COLUMNS, POST_COLUMNS};
pub use crate::normalize::{normalize_comment, normalize_post};

pub use crate::pipeline::{HarvestReport, Harvester};
pub use crate::collector::{Collection, Collector, ItemOutcome, SourceOutcome, SourceReport};
pub use crate::comments::{select_posts_for_comments, CommentSampler};
pub use crate::stats::{DemographicBreakdown, PostPreview, RunStatistics, RunSummary};
pub use crate::throttle::{PausePoint, RecordingThrottle, SleepThrottle, Throttle};

// file-backed source and CSV outputs
pub use crate::dump_source::{open_ndjson, DumpSource};
pub use crate::output::{file_timestamp, save_run, SavedFiles};

// dataset cleaning
pub use crate::cleaner::{clean_csv, clean_dir, clean_file, cleaned_path, normalize_date, CleanProfile, CleanReport, CleanStats, CLEANED_PREFIX};

pub use crate::util::{init_tracing_once, open_with_backoff, create_with_backoff, remove_with_backoff, replace_file_atomic_backoff};
