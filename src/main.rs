use anyhow::{anyhow, bail, Result};
use demoharvest::{
    clean_dir, clean_file, init_tracing_once, CleanProfile, DemographicBreakdown, DumpSource, HarvestOptions,
    Harvester, PostPreview, SleepThrottle,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const DUMP_ROOT: &str = "./dumps";
// Below this many posts the paginated fallback is tried as well.
const FALLBACK_BELOW: usize = 4000;
const FALLBACK_TARGET: usize = 2000;

fn main() -> ExitCode {
    init_tracing_once();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let res = match args.first().map(String::as_str) {
        Some("clean") => clean(&args[1..]),
        Some("-h" | "--help") => {
            print_usage();
            Ok(())
        }
        Some(other) => Err(anyhow!("unknown command {other:?}")),
        None => harvest(),
    };
    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    println!("usage:");
    println!("  demoharvest                     harvest posts and comments (HARVEST_* env vars)");
    println!("  demoharvest clean <dir|file>... clean harvested CSV datasets");
}

fn harvest() -> Result<()> {
    let opts = HarvestOptions::default().with_env_overrides();
    let dump_root = std::env::var("HARVEST_DUMP_DIR")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DUMP_ROOT));

    let source = DumpSource::new(&dump_root, &opts.community);
    let harvester = Harvester::with_options(opts);
    let throttle = SleepThrottle;

    let report = harvester.run(&source, &throttle);
    println!("{}", report.summary);

    if report.posts.is_empty() {
        tracing::error!(
            "No posts collected from r/{} under {}",
            harvester.options().community,
            dump_root.display()
        );
    } else {
        let saved = harvester.save(&report)?;
        for p in saved.posts.iter().chain(saved.comments.iter()) {
            println!("Saved {}", p.display());
        }
        println!("{}", PostPreview::new(&report.posts));
        println!("{}", DemographicBreakdown::from_posts(&report.posts));
    }

    let mut extra_posts = 0;
    if let Some(extra) = harvester.fallback_if_short(&source, &throttle, &report, FALLBACK_BELOW, FALLBACK_TARGET) {
        println!("Paginated collection got {} posts", extra.posts.len());
        extra_posts = extra.posts.len();
        if extra_posts > 0 {
            let prefix = format!("{}_paginated", harvester.options().file_prefix);
            harvester.save_as(&extra, &prefix)?;
        }
    }

    if report.posts.is_empty() && extra_posts == 0 {
        bail!("no posts collected from r/{}", harvester.options().community);
    }
    Ok(())
}

fn clean(paths: &[String]) -> Result<()> {
    if paths.is_empty() {
        bail!("clean needs at least one directory or CSV file");
    }
    let mut failed = 0usize;
    for raw in paths {
        let path = Path::new(raw);
        if path.is_dir() {
            for (file, res) in clean_dir(path, None, true)? {
                match res {
                    Ok(r) => println!("{} -> {} ({} rows)", file.display(), r.output.display(), r.stats.rows_out),
                    Err(_) => failed += 1,
                }
            }
        } else {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            let profile = CleanProfile::for_file_name(name)
                .ok_or_else(|| anyhow!("cannot tell posts from comments for {}", path.display()))?;
            match clean_file(path, None, &profile) {
                Ok(r) => println!("{} -> {} ({} rows)", path.display(), r.output.display(), r.stats.rows_out),
                Err(e) => {
                    tracing::error!("{:?}", e);
                    failed += 1;
                }
            }
        }
    }
    if failed > 0 {
        bail!("{failed} dataset file(s) failed to clean");
    }
    Ok(())
}
