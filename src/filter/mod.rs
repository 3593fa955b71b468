//! Channel filtering
//!
//! Selects parsed entries whose title matches a configured wanted-name
//! list and deduplicates them by normalized title, first occurrence wins.
//! The matching semantics are an explicit configuration choice because
//! deployments disagree on whether a wanted name must equal the full
//! title or merely appear inside it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::ChannelEntry;

/// How a wanted name is matched against an entry title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Case-folded equality against the full title
    Exact,
    /// Any wanted name contained (case-folded) within the title
    Substring,
}

/// What an empty wanted-name list means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyWantedPolicy {
    /// Nothing matches; the filter output is empty (set-membership
    /// against an empty set, the historical behavior)
    ExcludeAll,
    /// Every entry passes the name check (dedup still applies)
    Passthrough,
}

/// Filter over parsed channel entries
///
/// Applying the filter twice yields the same result as applying it once.
pub struct ChannelFilter {
    wanted: Vec<String>,
    mode: MatchMode,
    empty_policy: EmptyWantedPolicy,
}

impl ChannelFilter {
    /// Build a filter; wanted names are normalized once up front and
    /// blank names are discarded.
    pub fn new(wanted: &[String], mode: MatchMode, empty_policy: EmptyWantedPolicy) -> Self {
        let wanted = wanted
            .iter()
            .map(|name| normalize_title(name))
            .filter(|name| !name.is_empty())
            .collect();
        Self {
            wanted,
            mode,
            empty_policy,
        }
    }

    /// Select the ordered subset of matching entries, deduplicated by
    /// normalized title (first occurrence wins, later duplicates dropped).
    pub fn filter(&self, entries: Vec<ChannelEntry>) -> Vec<ChannelEntry> {
        if self.wanted.is_empty() && self.empty_policy == EmptyWantedPolicy::ExcludeAll {
            debug!("Wanted-name list is empty; excluding all entries");
            return Vec::new();
        }

        let total = entries.len();
        let mut seen: HashSet<String> = HashSet::new();
        let kept: Vec<ChannelEntry> = entries
            .into_iter()
            .filter(|entry| {
                let title = normalize_title(&entry.title);
                self.matches(&title) && seen.insert(title)
            })
            .collect();

        debug!("Filter kept {} of {} entries", kept.len(), total);
        kept
    }

    fn matches(&self, normalized_title: &str) -> bool {
        if self.wanted.is_empty() {
            // Non-empty policy handled above; only Passthrough reaches here.
            return true;
        }
        match self.mode {
            MatchMode::Exact => self.wanted.iter().any(|name| name == normalized_title),
            MatchMode::Substring => self
                .wanted
                .iter()
                .any(|name| normalized_title.contains(name.as_str())),
        }
    }
}

/// Case-folded, whitespace-trimmed title used for matching and dedup
fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}
