use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::filter::{EmptyWantedPolicy, MatchMode};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub sources: SourcesConfig,
    pub channels: ChannelsConfig,
    pub fetch: FetchConfig,
    pub probe: ProbeConfig,
    pub output: OutputConfig,
    /// Optional wall-clock budget for a whole aggregation request
    #[serde(default)]
    pub request_budget_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Upstream playlist URLs, processed in this order
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Channel names the subscriber wants in the output
    pub wanted: Vec<String>,
    pub match_mode: MatchMode,
    /// What an empty `wanted` list means; the default excludes everything
    pub empty_wanted: EmptyWantedPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub timeout_secs: u64,
    /// Maximum number of in-flight probes
    pub concurrency: usize,
    /// Minimum response-body bytes for a stream to count as alive;
    /// 0 disables the body check (HEAD/GET status only)
    pub min_body_bytes: usize,
    /// Grace window for reading the body minimum
    pub body_grace_secs: u64,
    /// Opt-in sampling: probe only this many random candidates and accept
    /// the whole batch if any is alive; 0 (the default) validates
    /// every candidate
    pub sample_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: SourcesConfig { urls: Vec::new() },
            channels: ChannelsConfig {
                wanted: Vec::new(),
                match_mode: MatchMode::Exact,
                empty_wanted: EmptyWantedPolicy::ExcludeAll,
            },
            fetch: FetchConfig { timeout_secs: 10 },
            probe: ProbeConfig {
                timeout_secs: 10,
                concurrency: 16,
                min_body_bytes: 0,
                body_grace_secs: 2,
                sample_size: 0,
            },
            output: OutputConfig {
                directory: PathBuf::from("./data/playlists"),
            },
            request_budget_secs: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(&config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(&config_file, contents)?;
            Ok(default_config)
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe.timeout_secs)
    }

    pub fn body_grace(&self) -> Duration {
        Duration::from_secs(self.probe.body_grace_secs)
    }

    pub fn request_budget(&self) -> Option<Duration> {
        self.request_budget_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let reparsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(reparsed.probe.timeout_secs, 10);
        assert_eq!(reparsed.probe.sample_size, 0);
        assert_eq!(reparsed.channels.match_mode, MatchMode::Exact);
        assert_eq!(
            reparsed.channels.empty_wanted,
            EmptyWantedPolicy::ExcludeAll
        );
    }

    #[test]
    fn parses_a_user_config() {
        let text = r#"
            request_budget_secs = 60

            [sources]
            urls = ["http://host/lists/ru.m3u"]

            [channels]
            wanted = ["Channel A"]
            match_mode = "substring"
            empty_wanted = "passthrough"

            [fetch]
            timeout_secs = 5

            [probe]
            timeout_secs = 8
            concurrency = 32
            min_body_bytes = 1
            body_grace_secs = 3
            sample_size = 4

            [output]
            directory = "./out"
        "#;
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.sources.urls.len(), 1);
        assert_eq!(config.channels.match_mode, MatchMode::Substring);
        assert_eq!(config.channels.empty_wanted, EmptyWantedPolicy::Passthrough);
        assert_eq!(config.probe.sample_size, 4);
        assert_eq!(config.request_budget(), Some(Duration::from_secs(60)));
    }
}
