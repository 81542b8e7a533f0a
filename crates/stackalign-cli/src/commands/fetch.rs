use crate::cli::FetchArgs;
use crate::data::{FetchProgress, StructureCache};
use crate::error::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

pub async fn run(args: FetchArgs) -> Result<()> {
    let cache = StructureCache::new(args.cache_dir.clone())?;
    println!("Fetching structures into: {:?}", cache.get_cache_path());

    for id in &args.ids {
        let path = fetch_one(&cache, id, args.force).await?;
        println!("✓ {} -> {}", id, path.display());
    }
    info!("Fetched {} structure(s).", args.ids.len());
    Ok(())
}

/// Downloads `id` into the cache with a byte progress bar.
pub(crate) async fn fetch_one(
    cache: &StructureCache,
    id: &str,
    force: bool,
) -> Result<std::path::PathBuf> {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_draw_target(indicatif::ProgressDrawTarget::stderr_with_hz(2));
    pb.set_message(id.to_string());

    let progress_callback = |progress: FetchProgress| match progress {
        FetchProgress::DownloadStarted { total_size } => {
            if let Some(size) = total_size {
                pb.set_length(size);
            }
        }
        FetchProgress::Downloading { downloaded } => {
            pb.set_position(downloaded);
        }
    };

    match cache.fetch(id, force, progress_callback).await {
        Ok(path) => {
            pb.finish_and_clear();
            Ok(path)
        }
        Err(e) => {
            pb.finish_with_message(format!("✗ {} failed.", id));
            Err(e)
        }
    }
}
