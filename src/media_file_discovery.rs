//! Expansion of user-supplied paths into queueable audio files.

use std::{
    collections::HashSet,
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

use log::{debug, warn};

const AUDIO_EXTENSIONS: [&str; 9] = [
    "aac", "aif", "aiff", "flac", "m4a", "mp3", "mp4", "ogg", "wav",
];

fn has_audio_extension(path: &Path) -> bool {
    let Some(extension) = path.extension().and_then(OsStr::to_str) else {
        return false;
    };
    let extension = extension.to_ascii_lowercase();
    AUDIO_EXTENSIONS.contains(&extension.as_str())
}

/// Gathers tracks in discovery order, keeping the first sighting of a path.
#[derive(Default)]
struct TrackCollector {
    seen: HashSet<PathBuf>,
    tracks: Vec<PathBuf>,
}

impl TrackCollector {
    fn push(&mut self, track: PathBuf) {
        if self.seen.insert(track.clone()) {
            self.tracks.push(track);
        } else {
            debug!("Skipping duplicate path {}", track.display());
        }
    }

    /// Adds every audio file below `folder`, sorted by path.
    fn push_folder(&mut self, folder: &Path) {
        let mut found = Vec::new();
        let mut pending = vec![folder.to_path_buf()];
        while let Some(directory) = pending.pop() {
            let entries = match fs::read_dir(&directory) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!("Cannot scan {}: {}", directory.display(), err);
                    continue;
                }
            };
            for entry in entries.flatten() {
                let path = entry.path();
                match entry.file_type() {
                    Ok(kind) if kind.is_dir() => pending.push(path),
                    Ok(kind) if kind.is_file() && has_audio_extension(&path) => found.push(path),
                    Ok(_) => {}
                    Err(err) => debug!("Cannot inspect {}: {}", path.display(), err),
                }
            }
        }
        found.sort();
        for track in found {
            self.push(track);
        }
    }
}

/// Expands files and folders given on the command line, in argument order.
///
/// Folders contribute their audio files sorted by path. Files are kept even
/// when their extension is unknown, since the user named them explicitly.
/// A path reached twice is queued once, at its first position.
pub fn collect_audio_files_from_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut collector = TrackCollector::default();
    for path in paths {
        if path.is_dir() {
            collector.push_folder(path);
        } else if path.is_file() {
            if !has_audio_extension(path) {
                debug!("Queueing {} with an unrecognized extension", path.display());
            }
            collector.push(path.clone());
        } else {
            warn!("Ignoring missing path {}", path.display());
        }
    }
    collector.tracks
}
