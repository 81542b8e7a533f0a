use crate::cli::{CacheArgs, CacheCommands};
use crate::data::StructureCache;
use crate::error::Result;
use tracing::info;

pub async fn run(args: CacheArgs) -> Result<()> {
    match args.command {
        CacheCommands::Path => {
            let cache = StructureCache::new(args.cache_dir)?;
            let path = cache.get_cache_path();
            info!("Structure cache path: {:?}", path);
            println!("{}", path.display());
        }
    }
    Ok(())
}
