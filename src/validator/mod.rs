//! Stream liveness validation
//!
//! Probes every candidate entry's stream URL concurrently under a
//! per-probe timeout and classifies each one alive or dead. Probing sits
//! behind the [`StreamProbe`] trait; [`HttpProber`] is the reqwest-backed
//! implementation used in production.
//!
//! Execution model: all probes of a batch are dispatched fan-out/fan-in
//! through an ordered buffer capped at a configurable number of in-flight
//! probes, so results correspond to inputs by position regardless of
//! completion order. Each probe is attempted exactly once; there are no
//! retries, and a probe failure is never escalated past this stage.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::errors::ProbeFailure;
use crate::models::{ChannelEntry, ProbeOutcome, ValidationOutcome};

const USER_AGENT: &str = concat!("iptv-aggregator/", env!("CARGO_PKG_VERSION"));

/// Liveness probe for a single stream URL
#[async_trait]
pub trait StreamProbe: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// HTTP liveness prober
///
/// Issues a HEAD request first and falls back to GET when HEAD does not
/// answer with a success status. When `min_body_bytes` is non-zero the
/// GET body stream must deliver at least that many bytes within the grace
/// window, which guards against servers returning a success status with
/// an empty or error payload.
pub struct HttpProber {
    client: reqwest::Client,
    timeout: Duration,
    min_body_bytes: usize,
    body_grace: Duration,
}

impl HttpProber {
    pub fn new(timeout: Duration, min_body_bytes: usize, body_grace: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            timeout,
            min_body_bytes,
            body_grace,
        }
    }

    async fn probe_inner(&self, url: &str) -> ProbeOutcome {
        // HEAD is cheap; a success status settles it unless body bytes
        // are required. Any HEAD failure falls through to GET.
        if self.min_body_bytes == 0 {
            if let Ok(response) = self.client.head(url).send().await {
                if response.status().is_success() {
                    return ProbeOutcome::Alive;
                }
            }
        }

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(error) => return ProbeOutcome::Dead(classify_request_error(&error)),
        };
        let status = response.status();
        if !status.is_success() {
            return ProbeOutcome::Dead(ProbeFailure::Status {
                status: status.as_u16(),
            });
        }
        if self.min_body_bytes == 0 {
            return ProbeOutcome::Alive;
        }
        self.read_body_minimum(response).await
    }

    /// Read body chunks until the minimum byte count is reached or the
    /// grace window expires.
    async fn read_body_minimum(&self, response: reqwest::Response) -> ProbeOutcome {
        let required = self.min_body_bytes;
        let deadline = tokio::time::Instant::now() + self.body_grace;
        let mut body = response.bytes_stream();
        let mut read = 0usize;

        while read < required {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return ProbeOutcome::Dead(ProbeFailure::ShortBody { read, required });
            }
            match tokio::time::timeout(remaining, body.next()).await {
                Ok(Some(Ok(chunk))) => read += chunk.len(),
                Ok(Some(Err(error))) => {
                    return ProbeOutcome::Dead(ProbeFailure::network(error));
                }
                // Stream ended or grace window expired before enough bytes.
                Ok(None) | Err(_) => {
                    return ProbeOutcome::Dead(ProbeFailure::ShortBody { read, required });
                }
            }
        }
        ProbeOutcome::Alive
    }
}

#[async_trait]
impl StreamProbe for HttpProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        match tokio::time::timeout(self.timeout, self.probe_inner(url)).await {
            Ok(outcome) => outcome,
            Err(_) => ProbeOutcome::Dead(ProbeFailure::Timeout),
        }
    }
}

fn classify_request_error(error: &reqwest::Error) -> ProbeFailure {
    if error.is_timeout() {
        ProbeFailure::Timeout
    } else {
        ProbeFailure::network(error)
    }
}

/// Validator over a batch of candidate entries
///
/// Produces exactly one [`ValidationOutcome`] per input entry, in input
/// order. Optional sampling mode (opt-in, `sample_size > 0`) probes only
/// a random subset and accepts the whole batch if any sampled stream is
/// alive — a latency/correctness trade-off that can silently admit dead
/// entries.
pub struct StreamValidator {
    probe: Arc<dyn StreamProbe>,
    concurrency: usize,
    sample_size: usize,
}

impl StreamValidator {
    pub fn new(probe: Arc<dyn StreamProbe>, concurrency: usize, sample_size: usize) -> Self {
        Self {
            probe,
            concurrency: concurrency.max(1),
            sample_size,
        }
    }

    /// Probe the candidate batch and classify every entry.
    pub async fn validate(&self, entries: Vec<ChannelEntry>) -> Vec<ValidationOutcome> {
        if entries.is_empty() {
            return Vec::new();
        }
        let outcomes = if self.sample_size == 0 {
            self.validate_all(entries).await
        } else {
            self.validate_sampled(entries).await
        };
        let alive = outcomes.iter().filter(|outcome| outcome.is_alive()).count();
        info!("Validated {} streams, {} alive", outcomes.len(), alive);
        outcomes
    }

    async fn validate_all(&self, entries: Vec<ChannelEntry>) -> Vec<ValidationOutcome> {
        // `buffered` keeps result order matched to input order while
        // capping the number of in-flight probes.
        stream::iter(entries)
            .map(|entry| {
                let probe = Arc::clone(&self.probe);
                async move {
                    let outcome = probe.probe(&entry.stream_url).await;
                    if let ProbeOutcome::Dead(failure) = &outcome {
                        debug!("Stream {} is dead: {}", entry.stream_url, failure);
                    }
                    ValidationOutcome { entry, outcome }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn validate_sampled(&self, entries: Vec<ChannelEntry>) -> Vec<ValidationOutcome> {
        let sample_size = self.sample_size.min(entries.len());

        // Partial Fisher-Yates: the first `sample_size` positions end up
        // holding a uniform random subset of the indices.
        let mut indices: Vec<usize> = (0..entries.len()).collect();
        for i in 0..sample_size {
            let j = i + fastrand::usize(..indices.len() - i);
            indices.swap(i, j);
        }
        let mut sampled: Vec<usize> = indices[..sample_size].to_vec();
        sampled.sort_unstable();

        let probed: HashMap<usize, ProbeOutcome> = stream::iter(sampled)
            .map(|index| {
                let probe = Arc::clone(&self.probe);
                let url = entries[index].stream_url.clone();
                async move { (index, probe.probe(&url).await) }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let accepted = probed.values().any(ProbeOutcome::is_alive);
        if accepted {
            warn!(
                "Sampling accepted the batch from {} probes; {} entries admitted unprobed",
                probed.len(),
                entries.len() - probed.len()
            );
        } else {
            info!(
                "Sampling rejected the batch: none of {} probed streams alive",
                probed.len()
            );
        }

        entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let outcome = match probed.get(&index) {
                    // A probed entry keeps its real outcome either way.
                    Some(outcome) => outcome.clone(),
                    None if accepted => ProbeOutcome::Alive,
                    None => ProbeOutcome::Dead(ProbeFailure::SampleRejected),
                };
                ValidationOutcome { entry, outcome }
            })
            .collect()
    }
}
