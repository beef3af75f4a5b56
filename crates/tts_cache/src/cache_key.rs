//! Cache key derivation
//!
//! A cache key is a file name of the form
//! `TTS_{provider}_{language}_{sha256}.{ext}`. The hash covers every identity
//! component, so two requests share a key only if they are equal.

use sha2::{Digest, Sha256};

use crate::types::{AudioFormat, ConversionRequest};

/// Prefix of every cache file name
pub const CACHE_KEY_PREFIX: &str = "TTS";

/// Longest readable segment kept in a file name
const MAX_SEGMENT_LEN: usize = 32;

/// Derive the cache file name for a request identity
#[must_use]
pub fn derive_cache_key(provider_id: &str, language: &str, voice: &str, text: &str) -> String {
    derive_cache_key_with_format(provider_id, language, voice, text, AudioFormat::Wav)
}

/// Derive the cache file name with an explicit file format
#[must_use]
pub fn derive_cache_key_with_format(
    provider_id: &str,
    language: &str,
    voice: &str,
    text: &str,
    format: AudioFormat,
) -> String {
    let mut hasher = Sha256::new();
    for component in [provider_id, language, voice, text] {
        // Length prefix keeps ("ab", "c") and ("a", "bc") apart
        hasher.update((component.len() as u64).to_le_bytes());
        hasher.update(component.as_bytes());
    }
    let hash = hex::encode(hasher.finalize());

    format!(
        "{CACHE_KEY_PREFIX}_{}_{}_{hash}.{}",
        sanitize_segment(provider_id),
        sanitize_segment(language),
        format.extension()
    )
}

/// Derive the cache file name for a request
#[must_use]
pub fn cache_key_for(request: &ConversionRequest) -> String {
    derive_cache_key(
        &request.provider_id,
        &request.language,
        &request.voice,
        &request.text,
    )
}

/// Reduce a free-form value to characters safe inside a single path segment
fn sanitize_segment(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .take(MAX_SEGMENT_LEN)
        .collect();

    if cleaned.is_empty() {
        "none".to_string()
    } else {
        cleaned
    }
}
