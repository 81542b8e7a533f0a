use crate::error::{CliError, Result};
use directories::ProjectDirs;
use futures_util::{Stream, StreamExt};
use stackalign::core::io::loader::{AccessionKind, FileLoader};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const RCSB_URL: &str = "https://files.rcsb.org/download";
const ALPHAFOLD_URL: &str = "https://alphafold.ebi.ac.uk/files";
const ALPHAFOLD_MODEL_VERSION: &str = "v4";

#[derive(Debug, Clone, Copy)]
pub enum FetchProgress {
    DownloadStarted { total_size: Option<u64> },
    Downloading { downloaded: u64 },
}

/// Local directory of structures downloaded by accession.
///
/// Files are stored as `<ID>.pdb` with the accession upper-cased, which is
/// the layout [`FileLoader`] resolves accessions against.
#[derive(Debug)]
pub struct StructureCache {
    base_path: PathBuf,
}

impl StructureCache {
    pub fn new(custom_path: Option<PathBuf>) -> Result<Self> {
        let path = match custom_path {
            Some(path) => path,
            None => Self::default_cache_path()?,
        };
        debug!("StructureCache initialized with path: {:?}", &path);
        Ok(Self { base_path: path })
    }

    pub fn get_cache_path(&self) -> &Path {
        &self.base_path
    }

    /// A loader that reads local files and resolves accessions in this cache.
    pub fn loader(&self) -> FileLoader {
        FileLoader::with_accession_dir(&self.base_path)
    }

    pub fn cached_path(&self, id: &str) -> Option<PathBuf> {
        self.loader().locate_accession(id)
    }

    pub fn download_url(id: &str) -> Result<String> {
        match AccessionKind::classify(id) {
            Some(AccessionKind::Pdb) => Ok(format!("{}/{}.pdb", RCSB_URL, id.to_ascii_uppercase())),
            Some(AccessionKind::UniProt) => Ok(format!(
                "{}/AF-{}-F1-model_{}.pdb",
                ALPHAFOLD_URL,
                id.to_ascii_uppercase(),
                ALPHAFOLD_MODEL_VERSION
            )),
            None => Err(CliError::Argument(format!(
                "'{}' is neither a PDB code nor a UniProt accession.",
                id
            ))),
        }
    }

    fn target_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!("{}.pdb", id.to_ascii_uppercase()))
    }

    /// Ensures `id` is cached, downloading it when missing or when `force` is set.
    pub async fn fetch(
        &self,
        id: &str,
        force: bool,
        mut progress_callback: impl FnMut(FetchProgress),
    ) -> Result<PathBuf> {
        if !force {
            if let Some(path) = self.cached_path(id) {
                debug!("'{}' already cached at {:?}", id, &path);
                return Ok(path);
            }
        }
        let url = Self::download_url(id)?;
        fs::create_dir_all(&self.base_path)?;

        info!("Sending request to {}", url);
        let client = reqwest::Client::new();
        let response = client.get(&url).send().await?.error_for_status()?;

        let total_size = response.content_length();
        progress_callback(FetchProgress::DownloadStarted { total_size });

        let target = self.target_path(id);
        Self::store_stream(response.bytes_stream(), &target, progress_callback).await?;

        info!("Downloaded '{}' to {:?}", id, &target);
        Ok(target)
    }

    /// Writes `stream` to `<target>.part` and renames it into place once complete.
    ///
    /// A failed transfer removes the partial file, so the cache never holds a
    /// truncated structure.
    async fn store_stream<S, B, E>(
        mut stream: S,
        target: &Path,
        mut progress_callback: impl FnMut(FetchProgress),
    ) -> Result<()>
    where
        S: Stream<Item = std::result::Result<B, E>> + Unpin,
        B: AsRef<[u8]>,
        CliError: From<E>,
    {
        let partial = target.with_extension("pdb.part");
        let written = async {
            let mut file = fs::File::create(&partial)?;
            let mut downloaded: u64 = 0;
            while let Some(item) = stream.next().await {
                let chunk = item?;
                file.write_all(chunk.as_ref())?;
                downloaded += chunk.as_ref().len() as u64;
                progress_callback(FetchProgress::Downloading { downloaded });
            }
            file.flush()?;
            Ok::<_, CliError>(())
        }
        .await;

        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&partial) {
                debug!("Could not remove partial download {:?}: {}", &partial, cleanup);
            }
            return Err(e);
        }
        fs::rename(&partial, target)?;
        Ok(())
    }

    fn default_cache_path() -> Result<PathBuf> {
        ProjectDirs::from("edu", "caltech", "stackalign")
            .map(|dirs| dirs.cache_dir().join("structures"))
            .ok_or_else(|| {
                CliError::Cache("Could not determine default cache directory path.".to_string())
            })
    }
}
