//! `datamirror fetch` – run the pipeline for one dataset and show what landed.

use anyhow::{Context, Result};
use datamirror_core::config::DatamirrorConfig;
use datamirror_core::transport::{CurlTransport, ProgressStats};
use datamirror_core::{DatasetRegistry, FetchOutcome, FetchPipeline, FetchRequest};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct FetchArgs {
    pub dataset: String,
    pub download_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub no_cache: bool,
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("cannot determine current directory")?
            .join(path))
    }
}

/// Resolve flags against config into a pipeline request. Flags win; `--no-cache`
/// drops any configured cache.
pub(crate) fn build_request(cfg: &DatamirrorConfig, args: &FetchArgs) -> Result<FetchRequest> {
    let download_dir = absolute(args.download_dir.as_deref().unwrap_or(cfg.download_dir.as_path()))?;
    let mut request = FetchRequest::new(args.dataset.clone(), download_dir);
    if !args.no_cache {
        if let Some(cache) = args.cache_dir.as_deref().or(cfg.cache_dir.as_deref()) {
            request = request.with_cache_dir(absolute(cache)?);
        }
    }
    Ok(request)
}

pub fn run_fetch(cfg: &DatamirrorConfig, registry: DatasetRegistry, args: &FetchArgs) -> Result<()> {
    let request = build_request(cfg, args)?;

    let (progress_tx, progress_rx) = mpsc::channel::<ProgressStats>();
    let printer = thread::spawn(move || print_progress(progress_rx));
    let transport = CurlTransport::from_config(cfg).with_progress(progress_tx);
    // The pipeline owns the only sender; dropping it ends the printer.
    let result = FetchPipeline::new(registry, transport).fetch(&request);
    let _ = printer.join();

    let outcome = result?;
    print_summary(&outcome);
    print!("{}", render_listing(&outcome.dataset_dir)?);
    Ok(())
}

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Print a throttled status line on stderr until the sender goes away.
fn print_progress(rx: mpsc::Receiver<ProgressStats>) {
    let mut last_print: Option<Instant> = None;
    for stats in rx {
        let due = last_print.map_or(true, |t| t.elapsed() >= PROGRESS_INTERVAL);
        if due || stats.is_complete() {
            eprint!("\r{}", format_progress(&stats));
            last_print = Some(Instant::now());
        }
    }
    if last_print.is_some() {
        eprintln!();
    }
}

/// `  12.0 / 48.0 MiB (25.0%)  3.00 MiB/s  ETA 12s  `; without a total only
/// the byte count and rate are shown.
pub(crate) fn format_progress(stats: &ProgressStats) -> String {
    let done_mib = stats.bytes_done as f64 / 1_048_576.0;
    let rate_mib = stats.bytes_per_sec() / 1_048_576.0;
    match (stats.total_bytes, stats.fraction()) {
        (Some(total), Some(fraction)) => {
            let eta = stats
                .eta_secs()
                .map(|s| format!("{:.0}s", s))
                .unwrap_or_else(|| "?".to_string());
            format!(
                "  {:.1} / {:.1} MiB ({:.1}%)  {:.2} MiB/s  ETA {}  ",
                done_mib,
                total as f64 / 1_048_576.0,
                fraction * 100.0,
                rate_mib,
                eta
            )
        }
        _ => format!("  {:.1} MiB  {:.2} MiB/s  ", done_mib, rate_mib),
    }
}

fn print_summary(outcome: &FetchOutcome) {
    match (outcome.cache_status, outcome.downloaded_bytes) {
        (_, Some(bytes)) => println!("Downloaded {} ({} bytes)", outcome.dataset, bytes),
        (Some(status), None) => println!("Using cached {} (cache {})", outcome.dataset, status),
        (None, None) => {}
    }
    for path in &outcome.written {
        println!("Wrote {}", path.display());
    }
}

/// One-level tree of `root`: the directory itself, then its entries sorted by
/// name, directories suffixed with `/`.
pub(crate) fn render_listing(root: &Path) -> Result<String> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(root).with_context(|| format!("read dir: {}", root.display()))? {
        let entry = entry?;
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_dir() {
            name.push('/');
        }
        entries.push(name);
    }
    entries.sort();

    let mut out = format!("{}\n", root.display());
    let last = entries.len().saturating_sub(1);
    for (i, name) in entries.iter().enumerate() {
        let branch = if i == last { "└── " } else { "├── " };
        out.push_str(branch);
        out.push_str(name);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(no_cache: bool, cache_dir: Option<&str>) -> FetchArgs {
        FetchArgs {
            dataset: "nerf_synthetic".to_string(),
            download_dir: Some(PathBuf::from("/srv/data")),
            cache_dir: cache_dir.map(PathBuf::from),
            no_cache,
        }
    }

    #[test]
    fn flags_override_config() {
        let cfg = DatamirrorConfig {
            cache_dir: Some(PathBuf::from("/var/cache/datamirror")),
            ..DatamirrorConfig::default()
        };
        let req = build_request(&cfg, &args(false, None)).unwrap();
        assert_eq!(req.download_dir, PathBuf::from("/srv/data"));
        assert_eq!(req.cache_dir, Some(PathBuf::from("/var/cache/datamirror")));

        let req = build_request(&cfg, &args(false, Some("/tmp/c"))).unwrap();
        assert_eq!(req.cache_dir, Some(PathBuf::from("/tmp/c")));

        let req = build_request(&cfg, &args(true, None)).unwrap();
        assert_eq!(req.cache_dir, None);
    }

    #[test]
    fn relative_download_dir_is_made_absolute() {
        let cfg = DatamirrorConfig::default();
        let mut a = args(false, None);
        a.download_dir = None;
        let req = build_request(&cfg, &a).unwrap();
        assert!(req.download_dir.is_absolute());
        assert!(req.download_dir.ends_with("data"));
    }

    #[test]
    fn progress_line_with_and_without_total() {
        let stats = ProgressStats {
            bytes_done: 12 * 1_048_576,
            total_bytes: Some(48 * 1_048_576),
            elapsed_secs: 4.0,
        };
        assert_eq!(
            format_progress(&stats),
            "  12.0 / 48.0 MiB (25.0%)  3.00 MiB/s  ETA 12s  "
        );

        let unknown = ProgressStats {
            total_bytes: None,
            ..stats
        };
        assert_eq!(format_progress(&unknown), "  12.0 MiB  3.00 MiB/s  ");
    }

    #[test]
    fn listing_uses_tree_branches() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("chair")).unwrap();
        fs::create_dir(dir.path().join("drums")).unwrap();
        fs::write(dir.path().join("README.txt"), b"x").unwrap();

        let out = render_listing(dir.path()).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], dir.path().display().to_string());
        assert_eq!(&lines[1..], ["├── README.txt", "├── chair/", "└── drums/"]);
    }
}
