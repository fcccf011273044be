use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use tempfile::NamedTempFile;

use crate::catalog::error::{CatalogError, FetchError};
use crate::catalog::source::CatalogSource;

const DATE_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub folder: PathBuf,
    pub prefix: String,
    /// Dated files kept after a refresh, at least one
    pub keep: usize,
    pub retries: u32,
    pub backoff: Duration,
    /// Fall back to an older dated file when the download fails
    pub serve_stale: bool,
}

/// Day-scoped catalog files, `<prefix>_<YYYYMMDD>.txt`, one per UTC date.
pub struct CatalogStore<C> {
    config: StoreConfig,
    source: C,
    fetch_lock: Mutex<()>,
}

impl<C: CatalogSource> CatalogStore<C> {
    pub fn new(config: StoreConfig, source: C) -> Self {
        Self {
            config,
            source,
            fetch_lock: Mutex::new(()),
        }
    }

    fn dated_path(&self, date: NaiveDate) -> PathBuf {
        self.config.folder.join(format!(
            "{}_{}.txt",
            self.config.prefix,
            date.format(DATE_FORMAT)
        ))
    }

    /// Path to the catalog for `today`, downloading it when missing.
    ///
    /// Concurrent callers for a missing day wait for the first download
    /// instead of starting their own.
    pub fn fetch(&self, today: NaiveDate) -> Result<PathBuf, CatalogError> {
        let _guard = self.fetch_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let path = self.dated_path(today);
        if path.is_file() {
            log::info!("Using local catalog {}", path.display());
            return Ok(path);
        }

        match self.download_with_retry() {
            Ok(body) => {
                write_atomically(&path, &body)?;
                log::info!("Catalog downloaded: {}", path.display());
                if let Err(e) = self.evict(today) {
                    log::warn!("Failed to prune old catalogs: {}", e);
                }
                Ok(path)
            }
            Err(e) => self.stale_fallback(today, e),
        }
    }

    fn download_with_retry(&self) -> Result<Vec<u8>, FetchError> {
        let mut attempt = 0;
        loop {
            match self.source.download(&self.config.url) {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retriable() && attempt < self.config.retries => {
                    let delay = self.config.backoff * 2u32.saturating_pow(attempt);
                    log::warn!(
                        "Catalog download attempt {} failed: {}; retrying in {:?}",
                        attempt + 1,
                        e,
                        delay
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn stale_fallback(&self, today: NaiveDate, error: FetchError) -> Result<PathBuf, CatalogError> {
        if !self.config.serve_stale {
            return Err(error.into());
        }

        let stale = self
            .dated_files()?
            .into_iter()
            .filter(|(date, _)| *date < today)
            .max_by_key(|(date, _)| *date);

        match stale {
            Some((date, path)) => {
                log::warn!(
                    "Catalog download failed ({}); serving catalog from {}",
                    error,
                    date
                );
                Ok(path)
            }
            None => Err(error.into()),
        }
    }

    /// Dated catalog files in the folder, in no particular order.
    fn dated_files(&self) -> Result<Vec<(NaiveDate, PathBuf)>, CatalogError> {
        if !self.config.folder.exists() {
            return Ok(Vec::new());
        }

        let prefix = format!("{}_", self.config.prefix);
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.config.folder)? {
            let path = entry?.path();
            if !path.is_file() || !path.extension().is_some_and(|ext| ext == "txt") {
                continue;
            }
            let date = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_prefix(&prefix))
                .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok());
            if let Some(date) = date {
                files.push((date, path));
            }
        }
        Ok(files)
    }

    /// Delete all but the newest `keep` files dated up to `today`. Files
    /// dated after `today` are left alone and do not count towards `keep`.
    fn evict(&self, today: NaiveDate) -> Result<(), CatalogError> {
        let mut files = self.dated_files()?;
        files.retain(|(date, _)| *date <= today);
        files.sort_by(|a, b| b.0.cmp(&a.0));

        for (_, path) in files.into_iter().skip(self.config.keep.max(1)) {
            fs::remove_file(&path)?;
            log::info!("Removed old catalog {}", path.display());
        }
        Ok(())
    }
}

/// Write through a uniquely named temporary file in the target folder, then
/// rename it into place, so readers never see a partial catalog.
fn write_atomically(path: &Path, body: &[u8]) -> Result<(), CatalogError> {
    let folder = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(folder)?;

    let mut temp = NamedTempFile::new_in(folder)?;
    temp.write_all(body)?;
    temp.flush()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
