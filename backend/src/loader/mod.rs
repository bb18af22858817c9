//! Fetch the four raw extracts and parse them into [`RawTable`]s.
//!
//! ```text
//! SourceLocation ─▶ fetch_bytes ─▶ (extract_single_csv if .zip) ─▶ parse ─▶ RawTable
//! ```
//!
//! The four sources are fetched concurrently; the first failure aborts the
//! whole load.

use std::io::{Cursor, Read};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{PipelineConfig, SourceLocation, SourceSet};
use crate::error::{LoadError, LoadResult};
use crate::parser::{parse_bytes_with, RawTable};

/// The four raw extracts of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTables {
    pub users: RawTable,
    pub deposits: RawTable,
    pub withdrawals: RawTable,
    pub events: RawTable,
}

/// Reads sources over HTTP or from disk.
#[derive(Debug, Clone)]
pub struct Loader {
    client: reqwest::Client,
    sources: SourceSet,
    delimiter: Option<char>,
}

impl Loader {
    pub fn new(config: &PipelineConfig) -> LoadResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(LoadError::Client)?;

        Ok(Self {
            client,
            sources: config.sources.clone(),
            delimiter: config.delimiter,
        })
    }

    /// Raw bytes of a source. Non-2xx HTTP answers are errors.
    pub async fn fetch_bytes(&self, location: &SourceLocation) -> LoadResult<Vec<u8>> {
        match location {
            SourceLocation::Url(url) => {
                debug!(url = %url, "Fetching");
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .map_err(|source| LoadError::Http {
                        url: url.clone(),
                        source,
                    })?;

                let status = response.status();
                if !status.is_success() {
                    return Err(LoadError::Status {
                        url: url.clone(),
                        status: status.as_u16(),
                    });
                }

                let bytes = response.bytes().await.map_err(|source| LoadError::Http {
                    url: url.clone(),
                    source,
                })?;
                Ok(bytes.to_vec())
            }
            SourceLocation::Path(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|source| LoadError::Io {
                        path: path.display().to_string(),
                        source,
                    })
            }
        }
    }

    /// Fetch, unpack if archived, and parse one source.
    pub async fn load_table(
        &self,
        table: &'static str,
        location: &SourceLocation,
    ) -> LoadResult<RawTable> {
        let mut bytes = self.fetch_bytes(location).await?;
        if location.is_archive() {
            bytes = extract_single_csv(&bytes)?;
        }

        let parsed = parse_bytes_with(&bytes, self.delimiter)
            .map_err(|source| LoadError::Parse { table, source })?;

        info!(
            table,
            source = %location,
            rows = parsed.table.len(),
            columns = parsed.table.headers.len(),
            encoding = %parsed.encoding,
            delimiter = ?parsed.delimiter,
            "Loaded source"
        );
        Ok(parsed.table)
    }

    /// Load all four sources concurrently.
    pub async fn load_all(&self) -> LoadResult<RawTables> {
        let (users, deposits, withdrawals, events) = tokio::try_join!(
            self.load_table("users", &self.sources.users),
            self.load_table("deposits", &self.sources.deposits),
            self.load_table("withdrawals", &self.sources.withdrawals),
            self.load_table("events", &self.sources.events),
        )?;

        Ok(RawTables {
            users,
            deposits,
            withdrawals,
            events,
        })
    }
}

/// The single data file inside a zip archive.
///
/// Directory entries and `__MACOSX/` metadata are ignored. Anything other
/// than exactly one remaining file is an error.
pub fn extract_single_csv(bytes: &[u8]) -> LoadResult<Vec<u8>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

    let mut names: Vec<String> = archive
        .file_names()
        .filter(|name| !name.ends_with('/') && !name.starts_with("__MACOSX/"))
        .map(String::from)
        .collect();
    names.sort();

    let name = match names.as_slice() {
        [name] => name.clone(),
        _ => {
            return Err(LoadError::ArchiveLayout {
                found: names.len(),
                names,
            })
        }
    };

    let mut file = archive.by_name(&name)?;
    let mut content = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
    file.read_to_end(&mut content)
        .map_err(|source| LoadError::Io { path: name, source })?;
    Ok(content)
}
