//! Playlist assembly
//!
//! Merges validated entries into output playlist documents, one per
//! contributing source, deterministically ordered (source-major, then
//! in-source discovery order). Document text and generated filenames are
//! held in a [`DocumentStore`] owned by the request — there is no
//! process-wide cache, and the store dies with the request.

use std::collections::HashSet;

use tracing::{debug, info};
use url::Url;

use crate::models::{ChannelEntry, PlaylistDocument, PlaylistSource, ValidationOutcome};

/// Result of assembling a validated entry set
///
/// `Empty` is an explicit "nothing found" marker, distinct from any
/// parse or fetch error; the caller decides the user-facing message.
#[derive(Debug, PartialEq, Eq)]
pub enum AssemblyOutcome {
    Documents(Vec<PlaylistDocument>),
    Empty,
}

/// Request-scoped store of assembled documents, keyed by generated
/// filename. Filenames are unique within the store; collisions across
/// sources are resolved at insertion time.
#[derive(Debug, Default)]
pub struct DocumentStore {
    used_names: HashSet<String>,
    documents: Vec<PlaylistDocument>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one source's validated entries as a document, deriving a
    /// filename from the source URL's trailing path segment.
    pub fn insert(&mut self, source_url: &Url, entries: Vec<ChannelEntry>) {
        let filename = self.reserve_filename(source_url);
        debug!(
            "Assembled {} with {} entries from {}",
            filename,
            entries.len(),
            source_url
        );
        self.documents.push(PlaylistDocument {
            filename,
            source_url: source_url.as_str().to_string(),
            entries,
        });
    }

    pub fn get(&self, filename: &str) -> Option<&PlaylistDocument> {
        self.documents
            .iter()
            .find(|document| document.filename == filename)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn into_documents(self) -> Vec<PlaylistDocument> {
        self.documents
    }

    /// Derive a filename that is unique within this store: trailing path
    /// segment first, parent-segment prefix on collision, then a numeric
    /// suffix as the last resort.
    fn reserve_filename(&mut self, url: &Url) -> String {
        let (base, parent) = filename_parts(url);

        let mut candidate = base.clone();
        if self.used_names.contains(&candidate) {
            if let Some(parent) = parent {
                candidate = format!("{parent}_{base}");
            }
        }
        let mut counter = 2;
        while self.used_names.contains(&candidate) {
            candidate = numbered(&base, counter);
            counter += 1;
        }

        self.used_names.insert(candidate.clone());
        candidate
    }
}

/// Base filename and optional parent path segment for a source URL
fn filename_parts(url: &Url) -> (String, Option<String>) {
    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|segment| !segment.is_empty()).collect())
        .unwrap_or_default();

    let base = segments
        .last()
        .map(|segment| sanitize(segment))
        .filter(|segment| !segment.is_empty())
        .or_else(|| url.host_str().map(sanitize))
        .unwrap_or_else(|| "playlist".to_string());
    let base = with_extension(&base);

    let parent = segments
        .len()
        .checked_sub(2)
        .map(|index| sanitize(segments[index]))
        .filter(|segment| !segment.is_empty());

    (base, parent)
}

fn with_extension(base: &str) -> String {
    if base.contains('.') {
        base.to_string()
    } else {
        format!("{base}.m3u")
    }
}

fn numbered(base: &str, counter: u32) -> String {
    match base.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}-{counter}.{ext}"),
        None => format!("{base}-{counter}"),
    }
}

/// Keep filenames filesystem-safe without losing determinism.
fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// Merge validated entries into per-source documents.
///
/// Entry order inside a document is the discovery order of the
/// validation outcomes, which the validator guarantees matches input
/// order; sources contribute in their configured order. A source none of
/// whose entries survived contributes no document.
pub fn assemble(sources: &[PlaylistSource], outcomes: &[ValidationOutcome]) -> AssemblyOutcome {
    let mut store = DocumentStore::new();

    for source in sources {
        let entries: Vec<ChannelEntry> = outcomes
            .iter()
            .filter(|outcome| {
                outcome.is_alive() && outcome.entry.source_url == source.url.as_str()
            })
            .map(|outcome| outcome.entry.clone())
            .collect();
        if entries.is_empty() {
            continue;
        }
        store.insert(&source.url, entries);
    }

    if store.is_empty() {
        info!("No entries survived validation; returning empty result");
        AssemblyOutcome::Empty
    } else {
        AssemblyOutcome::Documents(store.into_documents())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProbeFailure;
    use crate::models::ProbeOutcome;
    use crate::parser::parse_m3u;

    fn source(url: &str) -> PlaylistSource {
        PlaylistSource::new(Url::parse(url).unwrap())
    }

    fn alive(title: &str, stream: &str, source_url: &str) -> ValidationOutcome {
        ValidationOutcome {
            entry: ChannelEntry {
                title: title.to_string(),
                stream_url: stream.to_string(),
                source_url: source_url.to_string(),
            },
            outcome: ProbeOutcome::Alive,
        }
    }

    fn dead(title: &str, stream: &str, source_url: &str) -> ValidationOutcome {
        ValidationOutcome {
            entry: ChannelEntry {
                title: title.to_string(),
                stream_url: stream.to_string(),
                source_url: source_url.to_string(),
            },
            outcome: ProbeOutcome::Dead(ProbeFailure::Timeout),
        }
    }

    #[test]
    fn assembles_per_source_in_discovery_order() {
        let sources = vec![
            source("http://x.test/lists/first.m3u"),
            source("http://y.test/lists/second.m3u"),
        ];
        let outcomes = vec![
            alive("A", "http://a.test/1", "http://x.test/lists/first.m3u"),
            dead("B", "http://b.test/2", "http://x.test/lists/first.m3u"),
            alive("C", "http://c.test/3", "http://y.test/lists/second.m3u"),
        ];

        let AssemblyOutcome::Documents(documents) = assemble(&sources, &outcomes) else {
            panic!("expected documents");
        };
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].filename, "first.m3u");
        assert_eq!(documents[0].entries.len(), 1);
        assert_eq!(documents[0].entries[0].title, "A");
        assert_eq!(documents[1].filename, "second.m3u");
        assert_eq!(documents[1].entries[0].title, "C");
    }

    #[test]
    fn zero_surviving_entries_yield_the_empty_marker() {
        let sources = vec![source("http://x.test/list.m3u")];
        let outcomes = vec![dead("A", "http://a.test/1", "http://x.test/list.m3u")];
        assert_eq!(assemble(&sources, &outcomes), AssemblyOutcome::Empty);
        assert_eq!(assemble(&sources, &[]), AssemblyOutcome::Empty);
    }

    #[test]
    fn round_trip_preserves_titles_and_urls() {
        let sources = vec![source("http://x.test/list.m3u")];
        let outcomes = vec![
            alive("Channel A", "http://a.test/stream", "http://x.test/list.m3u"),
            alive("News, 24/7", "https://b.test/live?id=2", "http://x.test/list.m3u"),
        ];

        let AssemblyOutcome::Documents(documents) = assemble(&sources, &outcomes) else {
            panic!("expected documents");
        };
        let reparsed = parse_m3u(&documents[0].render(), "http://x.test/list.m3u").unwrap();
        assert_eq!(reparsed.len(), 2);
        assert_eq!(reparsed[0].title, "Channel A");
        assert_eq!(reparsed[0].stream_url, "http://a.test/stream");
        assert_eq!(reparsed[1].title, "News, 24/7");
        assert_eq!(reparsed[1].stream_url, "https://b.test/live?id=2");
    }

    #[test]
    fn filename_comes_from_trailing_path_segment() {
        let mut store = DocumentStore::new();
        store.insert(&Url::parse("http://host/lists/ru.m3u").unwrap(), vec![]);
        store.insert(&Url::parse("http://host/channels/1").unwrap(), vec![]);
        store.insert(&Url::parse("http://bare.host/").unwrap(), vec![]);

        let documents = store.into_documents();
        assert_eq!(documents[0].filename, "ru.m3u");
        assert_eq!(documents[1].filename, "1.m3u");
        assert_eq!(documents[2].filename, "bare.host");
    }

    #[test]
    fn filename_collisions_get_parent_prefix_then_numeric_suffix() {
        let mut store = DocumentStore::new();
        store.insert(&Url::parse("http://host/a/ru.m3u").unwrap(), vec![]);
        store.insert(&Url::parse("http://host/b/ru.m3u").unwrap(), vec![]);
        store.insert(&Url::parse("http://host/b/ru.m3u").unwrap(), vec![]);

        let documents = store.into_documents();
        assert_eq!(documents[0].filename, "ru.m3u");
        assert_eq!(documents[1].filename, "b_ru.m3u");
        assert_eq!(documents[2].filename, "ru-2.m3u");
    }

    #[test]
    fn store_lookup_by_generated_filename() {
        let mut store = DocumentStore::new();
        store.insert(&Url::parse("http://host/lists/ru.m3u").unwrap(), vec![]);
        assert!(store.get("ru.m3u").is_some());
        assert!(store.get("unknown.m3u").is_none());
        assert_eq!(store.len(), 1);
    }
}
