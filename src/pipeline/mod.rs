//! Aggregation pipeline orchestration
//!
//! Drives the stages end to end: fetch all sources, parse each one,
//! filter the combined entries, probe the candidates, assemble the
//! output documents. Per-source and per-entry failures are recorded in
//! the per-source reports and never abort the request; the only
//! caller-visible errors are configuration problems (no sources at all)
//! and an exceeded overall request budget.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use url::Url;

use crate::assembler::{assemble, AssemblyOutcome};
use crate::config::Config;
use crate::errors::{AppError, AppResult, FormatError, SourceFetchError};
use crate::filter::ChannelFilter;
use crate::models::{ChannelEntry, PlaylistSource, ValidationOutcome};
use crate::parser::parse_m3u;
use crate::sources::{fetch_all, HttpSourceLoader, SourceFetcher};
use crate::validator::{HttpProber, StreamProbe, StreamValidator};

/// Terminal disposition of one source within a request
#[derive(Debug)]
pub enum SourceState {
    /// The source could not be retrieved and was skipped
    FetchFailed(SourceFetchError),
    /// The source was retrieved but its text was malformed
    ParseFailed(FormatError),
    /// The source went through the whole pipeline
    Processed {
        /// Entries parsed out of the source
        parsed: usize,
        /// Entries that survived name filtering and dedup
        matched: usize,
        /// Entries included in the final output
        included: usize,
    },
}

/// Per-source processing report
#[derive(Debug)]
pub struct SourceReport {
    pub url: String,
    pub state: SourceState,
}

/// Outcome of one aggregation request
#[derive(Debug)]
pub struct AggregationResult {
    pub assembly: AssemblyOutcome,
    pub reports: Vec<SourceReport>,
}

/// The aggregation pipeline
pub struct Aggregator {
    fetcher: Arc<dyn SourceFetcher>,
    filter: ChannelFilter,
    validator: StreamValidator,
    request_budget: Option<Duration>,
}

impl Aggregator {
    /// Build a pipeline with explicit fetch and probe implementations
    /// (the seam tests use to avoid the network).
    pub fn new(fetcher: Arc<dyn SourceFetcher>, probe: Arc<dyn StreamProbe>, config: &Config) -> Self {
        Self {
            fetcher,
            filter: ChannelFilter::new(
                &config.channels.wanted,
                config.channels.match_mode,
                config.channels.empty_wanted,
            ),
            validator: StreamValidator::new(
                probe,
                config.probe.concurrency,
                config.probe.sample_size,
            ),
            request_budget: config.request_budget(),
        }
    }

    /// Build the production pipeline with HTTP-backed fetcher and prober.
    pub fn from_config(config: &Config) -> Self {
        let fetcher = Arc::new(HttpSourceLoader::new(config.fetch_timeout()));
        let prober = Arc::new(HttpProber::new(
            config.probe_timeout(),
            config.probe.min_body_bytes,
            config.body_grace(),
        ));
        Self::new(fetcher, prober, config)
    }

    /// Turn configured source URLs into per-request [`PlaylistSource`]s.
    /// An unparseable configured URL is a configuration error.
    pub fn sources_from_config(config: &Config) -> AppResult<Vec<PlaylistSource>> {
        config
            .sources
            .urls
            .iter()
            .map(|url| {
                Url::parse(url)
                    .map(PlaylistSource::new)
                    .map_err(|error| {
                        AppError::configuration(format!("Invalid source URL {url}: {error}"))
                    })
            })
            .collect()
    }

    /// Run one aggregation request over the given sources.
    pub async fn run(&self, sources: &[PlaylistSource]) -> AppResult<AggregationResult> {
        if sources.is_empty() {
            return Err(AppError::configuration("No playlist sources configured"));
        }

        match self.request_budget {
            Some(budget) => tokio::time::timeout(budget, self.run_inner(sources))
                .await
                .map_err(|_| AppError::BudgetExceeded {
                    budget_secs: budget.as_secs(),
                })?,
            None => self.run_inner(sources).await,
        }
    }

    async fn run_inner(&self, sources: &[PlaylistSource]) -> AppResult<AggregationResult> {
        info!("Aggregating {} playlist sources", sources.len());

        // Fetch stage: one slot per source, failures skip the source.
        let texts = fetch_all(self.fetcher.as_ref(), sources).await;

        // Parse stage: discovery order is source-major, then in-source.
        let mut reports: Vec<SourceReport> = Vec::with_capacity(sources.len());
        let mut discovered: Vec<ChannelEntry> = Vec::new();
        for (source, text) in sources.iter().zip(texts) {
            let url = source.url.as_str().to_string();
            let state = match text {
                Err(error) => SourceState::FetchFailed(error),
                Ok(text) => match parse_m3u(&text, &url) {
                    Err(error) => {
                        warn!("Rejecting malformed source {}: {}", url, error);
                        SourceState::ParseFailed(error)
                    }
                    Ok(entries) => {
                        let parsed = entries.len();
                        discovered.extend(entries);
                        SourceState::Processed {
                            parsed,
                            matched: 0,
                            included: 0,
                        }
                    }
                },
            };
            reports.push(SourceReport { url, state });
        }

        // Filter stage runs over the combined list so dedup is global.
        let candidates = self.filter.filter(discovered);
        for report in &mut reports {
            if let SourceState::Processed { matched, .. } = &mut report.state {
                *matched = count_for_source(&candidates, &report.url);
            }
        }

        // Validation stage.
        let outcomes = self.validator.validate(candidates).await;
        for report in &mut reports {
            if let SourceState::Processed { included, .. } = &mut report.state {
                *included = outcomes
                    .iter()
                    .filter(|outcome| {
                        outcome.is_alive() && outcome.entry.source_url == report.url
                    })
                    .count();
            }
        }

        let assembly = assemble(sources, &outcomes);
        log_summary(&reports, &outcomes);
        Ok(AggregationResult { assembly, reports })
    }
}

fn count_for_source(entries: &[ChannelEntry], source_url: &str) -> usize {
    entries
        .iter()
        .filter(|entry| entry.source_url == source_url)
        .count()
}

fn log_summary(reports: &[SourceReport], outcomes: &[ValidationOutcome]) {
    let alive = outcomes.iter().filter(|outcome| outcome.is_alive()).count();
    for report in reports {
        match &report.state {
            SourceState::FetchFailed(error) => {
                info!("Source {}: fetch failed ({})", report.url, error)
            }
            SourceState::ParseFailed(error) => {
                info!("Source {}: parse failed ({})", report.url, error)
            }
            SourceState::Processed {
                parsed,
                matched,
                included,
            } => info!(
                "Source {}: {} parsed, {} matched, {} included",
                report.url, parsed, matched, included
            ),
        }
    }
    info!(
        "Request complete: {} of {} validated entries alive",
        alive,
        outcomes.len()
    );
}
