mod http;
mod media;
mod timer;

pub use self::http::{post_json, HttpError, ValidatedUrl};
pub use self::media::{
    CameraFacing, CaptureConstraints, Media, MediaEnvironment, MediaError, MediaOperation,
    MediaOutput, MediaResult, RecorderEvent, StreamHandle, StreamId, TrackId, TrackInfo, TrackKind,
};
pub use self::timer::{Timer, TimerId, TimerIds, TimerOperation, TimerOutput};

// Render and Http come straight from Crux; media and timer are ours.
pub use crux_core::render::Render;
pub use crux_http::Http;

use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub http: Http<Event>,
    pub media: Media<Event>,
    pub timer: Timer<Event>,
}
