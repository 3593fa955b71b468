//! M3U playlist parser
//!
//! Converts raw playlist text into an ordered sequence of [`ChannelEntry`]
//! values. Lines are first classified into a small tagged set and a scan
//! over the classified lines drives entry extraction, so there is no
//! ad-hoc prefix poking spread through the code.
//!
//! A source is rejected wholesale (no partial recovery) when the first
//! non-empty line is not the `#EXTM3U` header or when the text contains
//! zero `#EXTINF` markers. Everything else is recoverable: a dangling
//! info line with no usable URL after it is dropped with a warning.

use tracing::{debug, warn};
use url::Url;

use crate::errors::FormatError;
use crate::models::{ChannelEntry, ENTRY_MARKER, PLAYLIST_HEADER};

/// Classification of one playlist line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass<'a> {
    /// `#EXTM3U` header sentinel
    Header,
    /// `#EXTINF` entry-info marker; the title is the substring after the
    /// first comma, `None` when the line carries no comma at all
    Info { title: Option<&'a str> },
    /// A line usable as a stream URL (non-empty, not `#`-prefixed,
    /// absolute http or https)
    StreamUrl(&'a str),
    /// Any other `#`-prefixed directive or comment
    Comment,
    /// Empty or whitespace-only line
    Blank,
    /// Anything else (bare text that is not a usable URL)
    Unrecognized,
}

/// Classify a single line of playlist text
pub fn classify_line(line: &str) -> LineClass<'_> {
    let line = line.trim();
    if line.is_empty() {
        return LineClass::Blank;
    }
    let bytes = line.as_bytes();
    let ci_prefix = |prefix: &str| {
        bytes.len() >= prefix.len() && bytes[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
    };
    // "#EXTM3U" may carry trailing attributes, so prefix matching is used.
    if ci_prefix(PLAYLIST_HEADER) {
        return LineClass::Header;
    }
    if ci_prefix(ENTRY_MARKER) {
        return LineClass::Info {
            title: line.find(',').map(|pos| line[pos + 1..].trim()),
        };
    }
    if line.starts_with('#') {
        return LineClass::Comment;
    }
    if is_stream_url(line) {
        return LineClass::StreamUrl(line);
    }
    LineClass::Unrecognized
}

/// A line is accepted as a stream URL only when it parses as an absolute
/// http(s) URL.
fn is_stream_url(line: &str) -> bool {
    match Url::parse(line) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Parse raw playlist text into channel entries, in original order.
///
/// `source_url` tags every produced entry so later stages can group
/// entries back by source.
pub fn parse_m3u(content: &str, source_url: &str) -> Result<Vec<ChannelEntry>, FormatError> {
    let lines: Vec<&str> = content.lines().collect();
    let classified: Vec<LineClass> = lines.iter().map(|line| classify_line(line)).collect();

    // The first non-blank line must be the header sentinel; an empty file
    // has no header either.
    let first = classified.iter().find(|class| **class != LineClass::Blank);
    match first {
        Some(LineClass::Header) => {}
        _ => return Err(FormatError::MissingHeader),
    }

    let mut entries = Vec::new();
    let mut markers_seen = 0usize;
    let mut i = 0;
    while i < classified.len() {
        match &classified[i] {
            LineClass::Info { title } => {
                markers_seen += 1;
                let title = match title {
                    Some(title) if !title.is_empty() => *title,
                    _ => {
                        warn!(
                            "Dropping #EXTINF with missing title at line {} of {}",
                            i + 1,
                            source_url
                        );
                        i += 1;
                        continue;
                    }
                };
                match classified.get(i + 1) {
                    Some(LineClass::StreamUrl(url)) => {
                        entries.push(ChannelEntry {
                            title: title.to_string(),
                            stream_url: (*url).to_string(),
                            source_url: source_url.to_string(),
                        });
                        i += 2;
                    }
                    _ => {
                        // Dangling info line; the next line still gets
                        // classified on its own (it may open a new entry).
                        warn!(
                            "Dropping #EXTINF with no stream URL at line {} of {}",
                            i + 1,
                            source_url
                        );
                        i += 1;
                    }
                }
            }
            // Consecutive duplicate headers and stray directives are ignored.
            _ => i += 1,
        }
    }

    if markers_seen == 0 {
        return Err(FormatError::NoEntries);
    }

    debug!(
        "Parsed {} entries ({} markers) from {}",
        entries.len(),
        markers_seen,
        source_url
    );
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = "http://host/list.m3u";

    fn entry(title: &str, url: &str) -> ChannelEntry {
        ChannelEntry {
            title: title.to_string(),
            stream_url: url.to_string(),
            source_url: SRC.to_string(),
        }
    }

    #[test]
    fn parses_well_formed_pairs_in_order() {
        let text = "#EXTM3U\n#EXTINF:-1,Channel A\nhttp://a.test/stream\n#EXTINF:-1,Channel B\nhttp://b.test/stream";
        let entries = parse_m3u(text, SRC).unwrap();
        assert_eq!(
            entries,
            vec![
                entry("Channel A", "http://a.test/stream"),
                entry("Channel B", "http://b.test/stream"),
            ]
        );
    }

    #[test]
    fn missing_header_is_a_format_error() {
        let text = "#EXTINF:-1,Channel A\nhttp://a.test/stream";
        assert_eq!(parse_m3u(text, SRC), Err(FormatError::MissingHeader));
    }

    #[test]
    fn empty_file_is_a_format_error() {
        assert_eq!(parse_m3u("", SRC), Err(FormatError::MissingHeader));
        assert_eq!(parse_m3u("\n  \n", SRC), Err(FormatError::MissingHeader));
    }

    #[test]
    fn header_with_no_markers_is_a_format_error() {
        assert_eq!(
            parse_m3u("#EXTM3U\n# just a comment\n", SRC),
            Err(FormatError::NoEntries)
        );
    }

    #[test]
    fn consecutive_duplicate_headers_are_ignored() {
        let text = "#EXTM3U\n#EXTM3U\n#EXTINF:-1,Channel A\nhttp://a.test/stream";
        let entries = parse_m3u(text, SRC).unwrap();
        assert_eq!(entries, vec![entry("Channel A", "http://a.test/stream")]);
    }

    #[test]
    fn marker_is_case_insensitive() {
        let text = "#extm3u\n#extinf:-1,Channel A\nhttp://a.test/stream";
        let entries = parse_m3u(text, SRC).unwrap();
        assert_eq!(entries, vec![entry("Channel A", "http://a.test/stream")]);
    }

    #[test]
    fn dangling_info_line_is_dropped_not_fatal() {
        let text = "#EXTM3U\n#EXTINF:-1,Dead End\n#EXTINF:-1,Channel B\nhttp://b.test/stream";
        let entries = parse_m3u(text, SRC).unwrap();
        assert_eq!(entries, vec![entry("Channel B", "http://b.test/stream")]);
    }

    #[test]
    fn info_line_at_end_of_file_is_dropped() {
        let text = "#EXTM3U\n#EXTINF:-1,Channel A\nhttp://a.test/stream\n#EXTINF:-1,Trailing";
        let entries = parse_m3u(text, SRC).unwrap();
        assert_eq!(entries, vec![entry("Channel A", "http://a.test/stream")]);
    }

    #[test]
    fn non_url_follower_drops_the_entry() {
        let text = "#EXTM3U\n#EXTINF:-1,Channel A\nrtsp is not http\n#EXTINF:-1,Channel B\nhttps://b.test/stream";
        let entries = parse_m3u(text, SRC).unwrap();
        assert_eq!(entries, vec![entry("Channel B", "https://b.test/stream")]);
    }

    #[test]
    fn info_without_comma_or_title_is_dropped() {
        let text = "#EXTM3U\n#EXTINF:-1\nhttp://a.test/stream\n#EXTINF:-1,\nhttp://b.test/stream\n#EXTINF:-1,Channel C\nhttp://c.test/stream";
        let entries = parse_m3u(text, SRC).unwrap();
        assert_eq!(entries, vec![entry("Channel C", "http://c.test/stream")]);
    }

    #[test]
    fn title_is_substring_after_first_comma() {
        let text = "#EXTM3U\n#EXTINF:-1 tvg-id=\"x\",News, Weather & Sport\nhttp://a.test/stream";
        let entries = parse_m3u(text, SRC).unwrap();
        assert_eq!(
            entries,
            vec![entry("News, Weather & Sport", "http://a.test/stream")]
        );
    }

    #[test]
    fn classify_tags_every_line_kind() {
        assert_eq!(classify_line("#EXTM3U"), LineClass::Header);
        assert_eq!(classify_line("#EXTM3U url-tvg=\"x\""), LineClass::Header);
        assert_eq!(
            classify_line("#EXTINF:-1,Title"),
            LineClass::Info { title: Some("Title") }
        );
        assert_eq!(classify_line("#EXTINF:-1"), LineClass::Info { title: None });
        assert_eq!(
            classify_line("http://a.test/s"),
            LineClass::StreamUrl("http://a.test/s")
        );
        assert_eq!(classify_line("#EXTVLCOPT:opt"), LineClass::Comment);
        assert_eq!(classify_line("   "), LineClass::Blank);
        assert_eq!(classify_line("stray text"), LineClass::Unrecognized);
        assert_eq!(classify_line("ftp://a.test/s"), LineClass::Unrecognized);
    }
}
