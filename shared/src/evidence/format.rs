use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_FORMAT_CANDIDATES: [&str; 4] = [
    "video/webm;codecs=vp9,opus",
    "video/webm;codecs=vp8,opus",
    "video/webm",
    "video/mp4",
];

/// Used when neither the negotiated format nor the recorder names one.
pub const FALLBACK_MIME_TYPE: &str = "video/webm";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RecordingFormat {
    /// Let the recorder pick.
    #[default]
    PlatformDefault,
    Mime(String),
}

impl RecordingFormat {
    pub fn mime_type(&self) -> Option<&str> {
        match self {
            RecordingFormat::PlatformDefault => None,
            RecordingFormat::Mime(m) => Some(m),
        }
    }
}

/// First candidate the probe accepts, in order. Never fails.
pub fn select_recording_format<S, F>(candidates: &[S], mut is_type_supported: F) -> RecordingFormat
where
    S: AsRef<str>,
    F: FnMut(&str) -> bool,
{
    candidates
        .iter()
        .map(AsRef::as_ref)
        .find(|c| is_type_supported(c))
        .map_or(RecordingFormat::PlatformDefault, |c| {
            RecordingFormat::Mime(c.to_string())
        })
}

/// `video/webm;codecs=vp9,opus` -> `webm`.
pub fn extension_for(mime_type: &str) -> &'static str {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "video/mp4" | "audio/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/ogg" => "ogv",
        "video/x-matroska" => "mkv",
        _ => "webm",
    }
}

/// `evidence-2024-05-01T10-20-30-123Z.webm` for the given instant.
pub fn artifact_file_name(stopped_at_ms: i64, mime_type: &str) -> String {
    let stamp = DateTime::<Utc>::from_timestamp_millis(stopped_at_ms)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("evidence-{stamp}.{}", extension_for(mime_type))
}
