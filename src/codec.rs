//! Audio sample encoding for the live transport.
//!
//! The capture side delivers mono f32 samples in [-1.0, 1.0]; the remote
//! service expects little-endian 16-bit PCM, base64-encoded into a realtime
//! media chunk. Pure functions, no state.

use base64::Engine;

/// Convert f32 samples to little-endian PCM16 bytes.
///
/// Samples are clamped to [-1.0, 1.0] and scaled asymmetrically (negative
/// values map onto the full -32768 range). Non-finite samples become silence.
pub fn pcm16_bytes(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);

    for &sample in samples {
        let s = if sample.is_finite() {
            sample.clamp(-1.0, 1.0)
        } else {
            0.0
        };

        let value = if s < 0.0 {
            (s * 32768.0) as i16
        } else {
            (s * 32767.0) as i16
        };

        bytes.extend_from_slice(&value.to_le_bytes());
    }

    bytes
}

/// Encode f32 samples as a base64 PCM16 payload.
///
/// Empty input yields an empty string, which callers treat as nothing to send.
pub fn encode_base64(samples: &[f32]) -> String {
    if samples.is_empty() {
        return String::new();
    }

    base64::engine::general_purpose::STANDARD.encode(pcm16_bytes(samples))
}
