//! Extension allow-list for photo and video files.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Still image extensions, lowercase and without the dot
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "heic", "heif"];

/// Video container extensions, lowercase and without the dot
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm", "avi"];

/// Broad kind of an eligible media file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// Lowercased extension of `path`, or an empty string when there is none
pub fn lowercase_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Classify a path by its extension. `None` means the file is not eligible.
pub fn media_kind(path: &Path) -> Option<MediaKind> {
    let ext = lowercase_extension(path);
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

pub fn is_eligible(path: &Path) -> bool {
    media_kind(path).is_some()
}
