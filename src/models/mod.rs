//! Data model definitions
//!
//! All entities here are created and destroyed within the scope of one
//! playlist request; nothing outlives the request except the rendered
//! documents handed to the delivery collaborator.

use url::Url;

use crate::errors::ProbeFailure;

/// The `#EXTM3U` header sentinel every playlist document starts with
pub const PLAYLIST_HEADER: &str = "#EXTM3U";

/// The `#EXTINF` entry-info marker (matched case-insensitively)
pub const ENTRY_MARKER: &str = "#EXTINF";

/// One upstream playlist source, created per request
#[derive(Debug, Clone)]
pub struct PlaylistSource {
    pub url: Url,
}

impl PlaylistSource {
    pub fn new(url: Url) -> Self {
        Self { url }
    }
}

/// One channel entry parsed out of a playlist source
///
/// An entry always exists as a complete (title, stream URL) pair; the
/// parser drops anything where one half is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEntry {
    /// Display title, non-empty after trimming
    pub title: String,
    /// Absolute http(s) URL of the stream, kept byte-for-byte as found
    pub stream_url: String,
    /// URL of the source this entry was discovered in
    pub source_url: String,
}

/// Typed result of one liveness probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Alive,
    Dead(ProbeFailure),
}

impl ProbeOutcome {
    pub fn is_alive(&self) -> bool {
        matches!(self, Self::Alive)
    }
}

/// Validation result for one candidate entry, produced exactly once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub entry: ChannelEntry,
    pub outcome: ProbeOutcome,
}

impl ValidationOutcome {
    pub fn is_alive(&self) -> bool {
        self.outcome.is_alive()
    }
}

/// One assembled output playlist: validated entries from a single source,
/// in discovery order, behind the header sentinel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistDocument {
    /// Generated filename, unique within the request
    pub filename: String,
    /// URL of the source the entries came from
    pub source_url: String,
    pub entries: Vec<ChannelEntry>,
}

impl PlaylistDocument {
    /// Serialize the document in the exact wire format:
    /// header line, then consecutive `#EXTINF:-1,<title>` / `<url>` pairs,
    /// newline-separated with no blank lines between pairs.
    pub fn render(&self) -> String {
        let mut out = String::from(PLAYLIST_HEADER);
        out.push('\n');
        for entry in &self.entries {
            out.push_str("#EXTINF:-1,");
            out.push_str(&entry.title);
            out.push('\n');
            out.push_str(&entry.stream_url);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_is_byte_stable() {
        let doc = PlaylistDocument {
            filename: "list.m3u".to_string(),
            source_url: "http://host/list.m3u".to_string(),
            entries: vec![
                ChannelEntry {
                    title: "Channel A".to_string(),
                    stream_url: "http://a.test/stream".to_string(),
                    source_url: "http://host/list.m3u".to_string(),
                },
                ChannelEntry {
                    title: "Channel B".to_string(),
                    stream_url: "http://b.test/stream".to_string(),
                    source_url: "http://host/list.m3u".to_string(),
                },
            ],
        };

        assert_eq!(
            doc.render(),
            "#EXTM3U\n#EXTINF:-1,Channel A\nhttp://a.test/stream\n#EXTINF:-1,Channel B\nhttp://b.test/stream\n"
        );
        assert_eq!(doc.render(), doc.render());
    }
}
