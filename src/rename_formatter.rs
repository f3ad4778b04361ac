//! Canonical file names built from a chosen suggestion.

use std::path::PathBuf;

use crate::protocol::QueueItem;
use crate::suggestion::Suggestion;

const PADDED_FIELD_WIDTH: usize = 3;

fn pad_field(value: &str) -> String {
    format!("{value:0>width$}", width = PADDED_FIELD_WIDTH)
}

/// Keeps free-text fields from introducing extra path segments.
fn sanitize_segment_text(value: &str) -> String {
    value
        .chars()
        .map(|ch| {
            if ch == '/' || ch == '\\' || ch.is_control() {
                '-'
            } else {
                ch
            }
        })
        .collect()
}

/// Builds `"<camelot> | <bpm> > <artist> - <title>"` with zero-padded
/// camelot and bpm fields. Longer fields are left untouched.
pub fn format_stem(suggestion: &Suggestion) -> String {
    format!(
        "{} | {} > {} - {}",
        pad_field(&suggestion.camelot),
        pad_field(&suggestion.bpm),
        sanitize_segment_text(&suggestion.artist),
        sanitize_segment_text(&suggestion.title)
    )
}

/// Returns the path `item` should be renamed to.
///
/// Only the final path segment is rewritten: the first occurrence of the
/// item's stem in its file name is replaced with the formatted stem.
pub fn renamed_path(item: &QueueItem, suggestion: &Suggestion) -> PathBuf {
    let new_stem = format_stem(suggestion);
    let file_name = item
        .path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let new_file_name = if item.name.is_empty() || !file_name.contains(&item.name) {
        if item.extension.is_empty() {
            new_stem
        } else {
            format!("{new_stem}.{}", item.extension)
        }
    } else {
        file_name.replacen(&item.name, &new_stem, 1)
    };
    item.path.with_file_name(new_file_name)
}
