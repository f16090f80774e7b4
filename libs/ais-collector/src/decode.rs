use ais_api::{Record, resolve_path};
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::DecodeError;

/// Where aisstream.io puts the vessel MMSI in a position report.
pub const DEFAULT_KEY_PATH: &str = "Message.PositionReport.UserID";

/// Turns a raw feed payload into a [`Record`].
///
/// The payload is parsed only to extract the key; the stored body is the
/// original text, byte for byte.
#[derive(Debug, Clone)]
pub struct Decoder {
    key_path: String,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PATH)
    }
}

impl Decoder {
    pub fn new(key_path: impl Into<String>) -> Self {
        Self {
            key_path: key_path.into(),
        }
    }

    pub fn key_path(&self) -> &str {
        &self.key_path
    }

    pub fn decode(&self, payload: &[u8], captured_at: DateTime<Utc>) -> Result<Record, DecodeError> {
        let text = std::str::from_utf8(payload).map_err(|_| DecodeError::NotUtf8)?;
        let value: Value = serde_json::from_str(text)?;
        let key = match resolve_path(&value, &self.key_path) {
            None | Some(Value::Null) => return Err(DecodeError::MissingKey(self.key_path.clone())),
            Some(v) => self.render_key(v)?,
        };
        Ok(Record::new(captured_at, key, text))
    }

    fn render_key(&self, value: &Value) -> Result<String, DecodeError> {
        match value {
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    return Ok(u.to_string());
                }
                if let Some(i) = n.as_i64() {
                    return Ok(i.to_string());
                }
                match n.as_f64() {
                    Some(f) if f.is_finite() => Ok(format!("{f:.0}")),
                    _ => Err(self.invalid(value)),
                }
            }
            Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
            _ => Err(self.invalid(value)),
        }
    }

    fn invalid(&self, value: &Value) -> DecodeError {
        DecodeError::InvalidKey {
            path: self.key_path.clone(),
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 9, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn keeps_payload_verbatim() {
        let raw = r#"{"Message": {"PositionReport": {"UserID": 111111111, "Sog": 0.1}}, "MessageType":"PositionReport"}"#;
        let record = Decoder::default().decode(raw.as_bytes(), at()).unwrap();
        assert_eq!(record.key, "111111111");
        assert_eq!(record.payload, raw);
        assert_eq!(record.captured_at, at());
    }

    #[test]
    fn float_and_string_keys() {
        let d = Decoder::default();
        let r = d
            .decode(br#"{"Message":{"PositionReport":{"UserID":273450000.0}}}"#, at())
            .unwrap();
        assert_eq!(r.key, "273450000");
        let r = d
            .decode(br#"{"Message":{"PositionReport":{"UserID":"244660000"}}}"#, at())
            .unwrap();
        assert_eq!(r.key, "244660000");
    }

    #[test]
    fn rejects_missing_or_unusable_key() {
        let d = Decoder::default();
        assert!(matches!(
            d.decode(br#"{"Message":{"ShipStaticData":{"UserID":1}}}"#, at()),
            Err(DecodeError::MissingKey(_))
        ));
        assert!(matches!(
            d.decode(br#"{"Message":{"PositionReport":{"UserID":null}}}"#, at()),
            Err(DecodeError::MissingKey(_))
        ));
        assert!(matches!(
            d.decode(br#"{"Message":{"PositionReport":{"UserID":""}}}"#, at()),
            Err(DecodeError::InvalidKey { .. })
        ));
        assert!(matches!(
            d.decode(br#"{"Message":{"PositionReport":{"UserID":[1]}}}"#, at()),
            Err(DecodeError::InvalidKey { .. })
        ));
    }

    #[test]
    fn rejects_malformed_payloads() {
        let d = Decoder::default();
        assert!(matches!(d.decode(b"{not json", at()), Err(DecodeError::Json(_))));
        assert!(matches!(d.decode(&[0xff, 0xfe], at()), Err(DecodeError::NotUtf8)));
    }

    #[test]
    fn custom_key_path() {
        let d = Decoder::new("MetaData.MMSI");
        let r = d.decode(br#"{"MetaData":{"MMSI":123}}"#, at()).unwrap();
        assert_eq!(r.key, "123");
    }
}
