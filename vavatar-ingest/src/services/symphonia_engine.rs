//! Symphonia-backed decode engine
//!
//! Uses symphonia for format-agnostic probing (MP3, FLAC, AAC, WAV, OGG, ...).
//!
//! **Algorithm:**
//! 1. `load` probes the container and reads the default track's codec
//!    parameters on the blocking pool
//! 2. If the container declares a frame count, the duration is known
//!    immediately and published on the duration signal
//! 3. Otherwise `query_duration` walks the packets and sums their
//!    timestamps/durations (slower; needed for e.g. VBR MP3 without a
//!    Xing header)

use std::io::Cursor;
use std::time::Duration;
use symphonia::core::codecs::{CodecParameters, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tokio::sync::watch;
use tracing::debug;

use super::decode_engine::{DecodeEngine, EngineError, ProbeSource};

struct LoadedClip {
    source: ProbeSource,
    header_duration: Option<Duration>,
}

/// Decode engine probing clips with symphonia
pub struct SymphoniaEngine {
    loaded: Option<LoadedClip>,
    signal: watch::Sender<Option<Duration>>,
}

impl SymphoniaEngine {
    pub fn new() -> Self {
        let (signal, _) = watch::channel(None);
        Self {
            loaded: None,
            signal,
        }
    }
}

impl Default for SymphoniaEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DecodeEngine for SymphoniaEngine {
    fn name(&self) -> &'static str {
        "symphonia"
    }

    fn supports_in_memory(&self) -> bool {
        true
    }

    async fn reset(&mut self) -> Result<(), EngineError> {
        self.loaded = None;
        self.signal.send_replace(None);
        Ok(())
    }

    fn duration_signal(&mut self) -> watch::Receiver<Option<Duration>> {
        self.signal.subscribe()
    }

    async fn load(&mut self, source: ProbeSource) -> Result<(), EngineError> {
        let probe_source = source.clone();
        let header_duration = tokio::task::spawn_blocking(move || read_header_duration(&probe_source))
            .await
            .map_err(|e| EngineError::Task(e.to_string()))??;

        debug!(
            header_duration_ms = header_duration.map(|d| d.as_millis() as u64),
            "Clip loaded into symphonia engine"
        );

        self.loaded = Some(LoadedClip {
            source,
            header_duration,
        });
        if let Some(duration) = header_duration {
            self.signal.send_replace(Some(duration));
        }

        Ok(())
    }

    async fn query_duration(&mut self) -> Result<Option<Duration>, EngineError> {
        let loaded = self.loaded.as_ref().ok_or(EngineError::NotLoaded)?;
        if let Some(duration) = loaded.header_duration {
            return Ok(Some(duration));
        }

        let source = loaded.source.clone();
        tokio::task::spawn_blocking(move || count_packet_duration(&source))
            .await
            .map_err(|e| EngineError::Task(e.to_string()))?
    }
}

/// Open the clip and probe its container format
fn open_format(source: &ProbeSource) -> Result<Box<dyn FormatReader>, EngineError> {
    let media: Box<dyn MediaSource> = match source {
        ProbeSource::Memory { bytes, .. } => Box::new(Cursor::new(bytes.clone())),
        ProbeSource::File(path) => Box::new(std::fs::File::open(path).map_err(|e| {
            EngineError::Load(format!("Failed to open {}: {}", path.display(), e))
        })?),
    };
    let mss = MediaSourceStream::new(media, Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = source.extension() {
        hint.with_extension(&extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| EngineError::Load(format!("Failed to probe audio format: {}", e)))?;

    Ok(probed.format)
}

/// Codec parameters of the default audio track
fn default_track(format: &dyn FormatReader) -> Result<(u32, CodecParameters), EngineError> {
    format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .map(|t| (t.id, t.codec_params.clone()))
        .ok_or_else(|| EngineError::Load("No audio track found in clip".to_string()))
}

fn read_header_duration(source: &ProbeSource) -> Result<Option<Duration>, EngineError> {
    let format = open_format(source)?;
    let (_, params) = default_track(format.as_ref())?;
    Ok(params.n_frames.and_then(|frames| ticks_to_duration(&params, frames)))
}

fn count_packet_duration(source: &ProbeSource) -> Result<Option<Duration>, EngineError> {
    let mut format = open_format(source)?;
    let (track_id, params) = default_track(format.as_ref())?;

    let mut end_ts: u64 = 0;
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(EngineError::Query(format!("Error reading packet: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }
        end_ts = end_ts.max(packet.ts().saturating_add(packet.dur()));
    }

    debug!(end_ts, "Packet walk complete");

    if end_ts == 0 {
        return Ok(None);
    }
    Ok(ticks_to_duration(&params, end_ts))
}

/// Convert a timestamp in track time-base units into a duration
fn ticks_to_duration(params: &CodecParameters, ticks: u64) -> Option<Duration> {
    if let Some(time_base) = params.time_base {
        let time = time_base.calc_time(ticks);
        return Some(Duration::from_secs(time.seconds) + Duration::from_secs_f64(time.frac));
    }

    match params.sample_rate {
        Some(rate) if rate > 0 => Some(Duration::from_secs_f64(ticks as f64 / rate as f64)),
        _ => None,
    }
}
