//! # Symphonia Probe
//!
//! Decode-readiness check for buffers held by the preload cache.
//!
//! A buffer is ready when its container can be probed, a decoder exists for
//! its default track and the first audio packet decodes. That is as close to
//! "can play through" as we get without a playback channel.

use crate::decoder::format_detector::FormatDetector;
use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{AudioData, AudioProbe, BridgeError, StreamInfo};
use std::io::Cursor;
use std::time::Duration;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use tracing::{debug, instrument};

/// Corrupt packets tolerated before the first good one.
const MAX_BAD_PACKETS: usize = 8;

/// [`AudioProbe`] backed by Symphonia. Work runs on the blocking pool.
#[derive(Debug, Clone, Default)]
pub struct SymphoniaProbe;

impl SymphoniaProbe {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous probe of `data`.
    pub fn probe_blocking(data: &AudioData) -> BridgeResult<StreamInfo> {
        let hint = FormatDetector::hint_for(data);
        let source = Cursor::new(data.bytes.clone());
        let stream = MediaSourceStream::new(Box::new(source), Default::default());

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| BridgeError::Undecodable(format!("unrecognized container: {}", e)))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| BridgeError::Undecodable("no audio track".to_string()))?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let mut decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| BridgeError::Undecodable(format!("unsupported codec: {}", e)))?;

        let mut bad_packets = 0;
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(_)) => {
                    return Err(BridgeError::Undecodable(
                        "stream ended before any audio".to_string(),
                    ))
                }
                Err(e) => return Err(BridgeError::Undecodable(e.to_string())),
            };
            if packet.track_id() != track_id {
                continue;
            }
            match decoder.decode(&packet) {
                Ok(_) => break,
                Err(SymphoniaError::DecodeError(reason)) if bad_packets < MAX_BAD_PACKETS => {
                    bad_packets += 1;
                    debug!(reason, "Skipping corrupt packet");
                }
                Err(e) => return Err(BridgeError::Undecodable(e.to_string())),
            }
        }

        let sample_rate = params.sample_rate;
        let duration = match (params.n_frames, sample_rate) {
            (Some(frames), Some(rate)) if rate > 0 => {
                Some(Duration::from_secs_f64(frames as f64 / rate as f64))
            }
            _ => None,
        };

        Ok(StreamInfo {
            duration,
            sample_rate,
            channels: params.channels.map(|c| c.count() as u16),
            codec: FormatDetector::codec_name(params.codec),
        })
    }
}

#[async_trait]
impl AudioProbe for SymphoniaProbe {
    #[instrument(skip(self, data), fields(bytes = data.len(), hint = ?data.extension_hint))]
    async fn probe(&self, data: AudioData) -> BridgeResult<StreamInfo> {
        let info = tokio::task::spawn_blocking(move || Self::probe_blocking(&data))
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("probe task failed: {}", e)))??;
        debug!(duration = ?info.duration, codec = ?info.codec, "Probe succeeded");
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    /// Mono 16-bit PCM WAV of `samples` silent frames.
    fn wav(sample_rate: u32, samples: u32) -> Vec<u8> {
        let data_len = samples * 2;
        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        out.resize(44 + data_len as usize, 0);
        out
    }

    #[tokio::test]
    async fn test_probe_wav() {
        let data = AudioData::new(Bytes::from(wav(8_000, 8_000))).with_hint_from_url("a/b.wav");
        let info = SymphoniaProbe::new().probe(data).await.unwrap();

        assert_eq!(info.sample_rate, Some(8_000));
        assert_eq!(info.channels, Some(1));
        assert_eq!(info.duration, Some(Duration::from_secs(1)));
        assert!(info.codec.is_some());
    }

    #[tokio::test]
    async fn test_probe_rejects_html() {
        let data = AudioData::new(Bytes::from_static(b"<!doctype html><html></html>"))
            .with_hint_from_url("a/b.mp3");
        let err = SymphoniaProbe::new().probe(data).await.unwrap_err();
        assert!(matches!(err, BridgeError::Undecodable(_)));
    }

    #[test]
    fn test_probe_rejects_empty() {
        let err = SymphoniaProbe::probe_blocking(&AudioData::new(Bytes::new())).unwrap_err();
        assert!(matches!(err, BridgeError::Undecodable(_)));
    }
}
