use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ::exif::{DateTime, Exif, In, Reader, Tag, Value};
use chrono::NaiveDate;
use tracing::debug;

use super::{ContentDate, DateResolver};

/// Tags consulted in order of preference
const DATE_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

/// Reads the capture date from EXIF metadata (JPEG, HEIF/HEIC containers)
#[derive(Debug, Default)]
pub struct ExifDateResolver;

impl ExifDateResolver {
    pub fn new() -> Self {
        Self
    }
}

impl DateResolver for ExifDateResolver {
    fn resolve(&self, path: &Path) -> Option<ContentDate> {
        let file = File::open(path).ok()?;
        let mut reader = BufReader::new(file);
        let exif = match Reader::new().read_from_container(&mut reader) {
            Ok(exif) => exif,
            Err(e) => {
                debug!("No EXIF in {}: {}", path.display(), e);
                return None;
            }
        };
        date_from_exif(&exif)
    }
}

fn date_from_exif(exif: &Exif) -> Option<ContentDate> {
    DATE_TAGS.iter().find_map(|tag| {
        let field = exif.get_field(*tag, In::PRIMARY)?;
        match &field.value {
            Value::Ascii(parts) => parts.first().and_then(|raw| parse_exif_date(raw)),
            _ => None,
        }
    })
}

/// Parse an EXIF `YYYY:MM:DD HH:MM:SS` value. Zeroed placeholder dates are rejected.
fn parse_exif_date(raw: &[u8]) -> Option<ContentDate> {
    let parsed = DateTime::from_ascii(raw).ok()?;
    NaiveDate::from_ymd_opt(parsed.year.into(), parsed.month.into(), parsed.day.into())
}
