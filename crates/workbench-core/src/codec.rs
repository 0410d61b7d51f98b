#![forbid(unsafe_code)]

//! Versioned envelope codec.
//!
//! A persisted model is the base64 encoding of `<json>//<version>`. The
//! version suffix lets readers pick the migration path before parsing the
//! payload. Payloads written before versioning was introduced carry no
//! suffix and decode as version 1.
//!
//! Encoding uses the URL-safe alphabet without padding. Decoding accepts
//! either alphabet, padded or not.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use thiserror::Error;

/// Separator between the JSON payload and its version.
pub const VERSION_SEPARATOR: &str = "//";

/// Version assumed for payloads without a version suffix.
pub const UNVERSIONED: u32 = 1;

const URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors raised while decoding an envelope.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("envelope is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("envelope payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("envelope version {raw:?} is not a valid version number")]
    InvalidVersion { raw: String },
}

/// A decoded envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub json: String,
    pub version: u32,
}

/// Encode `json` at `version`.
#[must_use]
pub fn encode(json: &str, version: u32) -> String {
    URL_SAFE.encode(format!("{json}{VERSION_SEPARATOR}{version}"))
}

/// Decode an envelope produced by [`encode`] (or an unversioned legacy one).
pub fn decode(encoded: &str) -> Result<Envelope, CodecError> {
    let encoded = encoded.trim();
    let bytes = if encoded.contains(['+', '/']) {
        STANDARD.decode(encoded)?
    } else {
        URL_SAFE.decode(encoded)?
    };
    let text = String::from_utf8(bytes)?;

    match text.rsplit_once(VERSION_SEPARATOR) {
        Some((json, raw)) if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) => {
            let version = raw.parse::<u32>().map_err(|_| CodecError::InvalidVersion {
                raw: raw.to_owned(),
            })?;
            Ok(Envelope {
                json: json.to_owned(),
                version,
            })
        }
        _ => Ok(Envelope {
            json: text,
            version: UNVERSIONED,
        }),
    }
}
