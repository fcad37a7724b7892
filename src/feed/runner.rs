//! Source discovery and batch execution.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use super::processor::{SourceOutcome, SourceProcessor};
use super::{CacheSource, CacheStore, FeedFetcher, FileWriter, HttpFetcher, OutputWriter};
use crate::config::{Config, RunConfig, SourcesConfig};
use crate::Result;

/// Source id used when a file name carries no digits.
pub const DEFAULT_SOURCE_ID: u32 = 1;

/// One configured feed source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Cache identity; selects the artifact and mirror file names.
    pub source_id: u32,
    /// Feed URL.
    pub url: String,
    /// Name of the file the source was read from.
    pub file_name: String,
}

/// Derive a source id from a file name: the first run of ASCII digits.
///
/// Falls back to [`DEFAULT_SOURCE_ID`] when there is no digit or the run
/// does not fit in a `u32`.
pub fn source_id_from_file_name(file_name: &str) -> u32 {
    let digits: String = file_name
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();

    digits.parse().unwrap_or(DEFAULT_SOURCE_ID)
}

/// Sources found in the sources directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub sources: Vec<SourceConfig>,
    /// Matching files that could not be read.
    pub unreadable: Vec<String>,
}

/// Load every `<prefix>*.<extension>` file of the sources directory,
/// ordered by file name.
///
/// Only an unreadable directory is an error. A file that cannot be read
/// is logged and listed in [`Discovery::unreadable`].
pub fn discover_sources(config: &SourcesConfig) -> Result<Discovery> {
    let suffix = format!(".{}", config.extension);

    let mut file_names = Vec::new();
    for dir_entry in fs::read_dir(&config.dir)? {
        let dir_entry = dir_entry?;
        if !dir_entry.file_type()?.is_file() {
            continue;
        }
        let Some(file_name) = dir_entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if file_name.starts_with(&config.prefix) && file_name.ends_with(&suffix) {
            file_names.push(file_name);
        }
    }
    file_names.sort();

    let mut discovery = Discovery::default();
    let mut claimed: HashMap<u32, String> = HashMap::new();

    for file_name in file_names {
        let source_id = source_id_from_file_name(&file_name);
        let url = match fs::read_to_string(Path::new(&config.dir).join(&file_name)) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                warn!(source = source_id, "Skipping unreadable {}: {}", file_name, e);
                discovery.unreadable.push(file_name);
                continue;
            }
        };

        if let Some(previous) = claimed.get(&source_id) {
            warn!(
                source = source_id,
                "{} and {} share cache id {}; they will overwrite each other",
                previous,
                file_name,
                source_id
            );
        } else {
            claimed.insert(source_id, file_name.clone());
        }

        discovery.sources.push(SourceConfig {
            source_id,
            url,
            file_name,
        });
    }

    Ok(discovery)
}

/// Per-run tally of source outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &SourceOutcome) {
        match outcome {
            SourceOutcome::Updated { .. } => self.updated += 1,
            SourceOutcome::Unchanged => self.unchanged += 1,
            SourceOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.updated + self.unchanged + self.failed
    }
}

/// Runs the processor over a set of sources.
pub struct Runner<F, C, W> {
    processor: SourceProcessor<F, C, W>,
    parallel: bool,
    max_concurrency: usize,
}

impl<F, C, W> Runner<F, C, W>
where
    F: FeedFetcher,
    C: CacheSource,
    W: OutputWriter,
{
    pub fn new(processor: SourceProcessor<F, C, W>, run: &RunConfig) -> Self {
        Self {
            processor,
            parallel: run.parallel,
            max_concurrency: run.max_concurrency.max(1),
        }
    }

    pub fn processor(&self) -> &SourceProcessor<F, C, W> {
        &self.processor
    }

    /// Process every source. A failing source never stops the others.
    pub async fn run(&self, sources: &[SourceConfig]) -> RunSummary {
        let outcomes: Vec<SourceOutcome> = if self.parallel {
            stream::iter(sources)
                .map(|source| self.processor.process(source))
                .buffer_unordered(self.max_concurrency)
                .collect()
                .await
        } else {
            let mut outcomes = Vec::with_capacity(sources.len());
            for source in sources {
                outcomes.push(self.processor.process(source).await);
            }
            outcomes
        };

        let mut summary = RunSummary::default();
        for outcome in &outcomes {
            summary.record(outcome);
        }
        summary
    }
}

/// Run one full update cycle as configured.
///
/// Returns an error only for setup failures; per-source failures are
/// counted in the summary.
pub async fn run(config: &Config) -> Result<RunSummary> {
    let Discovery {
        sources,
        unreadable,
    } = discover_sources(&config.sources)?;
    fs::create_dir_all(&config.cache.output_dir)?;

    info!(
        "Processing {} source(s) from {} ({})",
        sources.len(),
        config.sources.dir,
        if config.run.parallel {
            "parallel"
        } else {
            "sequential"
        }
    );

    let processor = SourceProcessor::new(
        HttpFetcher::new(&config.fetch)?,
        CacheStore::new(config.cache.clone(), &config.fetch)?,
        FileWriter::new(config.cache.clone(), config.html.clone())?,
        config.cache.max_items,
        config.cache.merge_policy,
    );
    let mut summary = Runner::new(processor, &config.run).run(&sources).await;
    summary.failed += unreadable.len();

    info!(
        "Run complete: {} updated, {} unchanged, {} failed",
        summary.updated, summary.unchanged, summary.failed
    );
    Ok(summary)
}
