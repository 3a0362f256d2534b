use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use flate2::read::GzDecoder;
use log::debug;
use std::io::Read;

use crate::config::{MAX_GARBAGE_RATIO, MIN_BASE64_LEN};
use crate::error::DecodeError;
use crate::models::{DecodedText, EncodingLayer};

const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_padding_mode(DecodePaddingMode::Indifferent)
    .with_decode_allow_trailing_bits(true);

const ENGINES: [GeneralPurpose; 2] = [
    GeneralPurpose::new(&alphabet::STANDARD, LENIENT),
    GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT),
];

/// Recover subscription text from a raw response body.
///
/// Layers are tried in order: gzip, plain UTF-8, base64 of the body, and
/// finally a base64 unwrap of whatever text the earlier stages produced,
/// since providers regularly encode twice.
pub fn decode(raw: &[u8]) -> Result<DecodedText, DecodeError> {
    if raw.is_empty() {
        return Err(DecodeError::Empty);
    }

    let mut layers = Vec::new();
    let bytes = match gunzip(raw) {
        Some(inflated) => {
            debug!("gzip layer: {} -> {} bytes", raw.len(), inflated.len());
            layers.push(EncodingLayer::Gzip);
            inflated
        }
        None => raw.to_vec(),
    };

    let mut text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            let bytes = err.into_bytes();
            match decode_base64(&bytes) {
                Some(inner) => {
                    layers.push(EncodingLayer::Base64);
                    String::from_utf8_lossy(&inner).into_owned()
                }
                None => {
                    debug!("payload is not valid UTF-8, decoding lossily");
                    String::from_utf8_lossy(&bytes).into_owned()
                }
            }
        }
    };

    if looks_like_base64(&text) {
        match unwrap_base64_text(&text) {
            Some(inner) => {
                debug!("base64 layer: {} -> {} chars", text.len(), inner.len());
                layers.push(EncodingLayer::Base64);
                text = inner;
            }
            None => debug!("text looks like base64 but does not decode to text, keeping it"),
        }
    }

    if text.trim().is_empty() {
        return Err(DecodeError::NoText);
    }

    Ok(DecodedText { text, layers })
}

/// Whitespace-stripped text of at least [`MIN_BASE64_LEN`] chars drawn only
/// from the standard or URL-safe base64 alphabets plus `=` padding.
pub fn looks_like_base64(text: &str) -> bool {
    let mut len = 0;
    for c in text.chars().filter(|c| !c.is_whitespace()) {
        if !(c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '-' | '_' | '=')) {
            return false;
        }
        len += 1;
    }
    len >= MIN_BASE64_LEN
}

fn gunzip(raw: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(raw).read_to_end(&mut out).ok()?;
    Some(out)
}

/// Decode base64 in either alphabet, with or without padding.
pub(crate) fn decode_base64(input: &[u8]) -> Option<Vec<u8>> {
    let clean: Vec<u8> = input.iter().copied().filter(|b| !b.is_ascii_whitespace()).collect();
    if clean.is_empty() {
        return None;
    }
    ENGINES.iter().find_map(|engine| engine.decode(&clean).ok())
}

fn unwrap_base64_text(text: &str) -> Option<String> {
    let inner = decode_base64(text.as_bytes())?;
    let inner = String::from_utf8_lossy(&inner).into_owned();
    is_plausible_text(&inner).then_some(inner)
}

fn is_plausible_text(text: &str) -> bool {
    if text.trim().is_empty() {
        return false;
    }
    let total = text.chars().count();
    let bad = text
        .chars()
        .filter(|&c| c == char::REPLACEMENT_CHARACTER || (c.is_control() && !c.is_whitespace()))
        .count();
    (bad as f64) / (total as f64) <= MAX_GARBAGE_RATIO
}
