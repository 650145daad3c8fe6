//! Content date resolution for photos and videos.
//!
//! A [`DateResolver`] never fails a run: anything it cannot read is reported as
//! absent and the candidate is skipped with "no date found".

pub mod photo;
pub mod video;

use chrono::NaiveDate;
use std::path::Path;

use crate::filter::{media_kind, MediaKind};

pub use self::photo::ExifDateResolver;
pub use self::video::{ensure_tool_available, FfprobeDateResolver, FFPROBE};

/// Date a photo or video was taken. Only the month matters for bucketing.
pub type ContentDate = NaiveDate;

/// Resolves the content date of a media file
pub trait DateResolver {
    fn resolve(&self, path: &Path) -> Option<ContentDate>;
}

/// Default resolver: EXIF for still images, ffprobe for videos
#[derive(Debug, Default)]
pub struct MediaDateResolver {
    images: ExifDateResolver,
    videos: FfprobeDateResolver,
}

impl MediaDateResolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DateResolver for MediaDateResolver {
    fn resolve(&self, path: &Path) -> Option<ContentDate> {
        match media_kind(path)? {
            MediaKind::Image => self.images.resolve(path),
            MediaKind::Video => self.videos.resolve(path),
        }
    }
}
