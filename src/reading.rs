use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::errors::{LifestreamError, PayloadDecodeSnafu, PayloadEncodingSnafu};

/// One decoded sample from the biometric sensor.
///
/// The sensor sends `{"temperature": n, "gsr": n, "bpm": n}`; the wire names are kept
/// for serialization so recorded files can be replayed through the same decoder.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    /// Skin temperature in degrees Celsius
    pub temperature: f64,
    /// Galvanic skin response (skin conductance), raw sensor units
    #[serde(rename = "gsr")]
    pub conductance: f64,
    /// Heart rate in beats per minute
    #[serde(rename = "bpm")]
    pub heart_rate: f64,
}

impl Reading {
    pub fn new(temperature: f64, conductance: f64, heart_rate: f64) -> Self {
        Self {
            temperature,
            conductance,
            heart_rate,
        }
    }
}

/// Decode a raw notification payload into a [`Reading`].
///
/// Fails if the payload is not UTF-8, not a JSON object, or any of the three fields is
/// missing or not a number. Unknown keys are ignored.
pub fn decode_reading(payload: &[u8]) -> Result<Reading, LifestreamError> {
    let text = std::str::from_utf8(payload).context(PayloadEncodingSnafu)?;
    serde_json::from_str(text).context(PayloadDecodeSnafu {
        payload: text.to_string(),
    })
}
