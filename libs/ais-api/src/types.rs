use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::{format_timestamp, parse_timestamp};

// ════════════════════════════════════════════════════════════════
//  Record
// ════════════════════════════════════════════════════════════════

/// One decoded position report.
///
/// `payload` is the original message body, kept verbatim so it can be
/// replayed or re-parsed later. Records are never mutated after decode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// Capture time (UTC), assigned at decode.
    pub captured_at: DateTime<Utc>,
    /// Vessel identifier (MMSI).
    pub key: String,
    /// Raw message body.
    pub payload: String,
}

impl Record {
    pub fn new(captured_at: DateTime<Utc>, key: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            captured_at,
            key: key.into(),
            payload: payload.into(),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Record", 3)?;
        s.serialize_field("timestamp", &format_timestamp(self.captured_at))?;
        s.serialize_field("mmsi", &WireKey(&self.key))?;
        s.serialize_field("raw_data", &self.payload)?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawKey {
            Number(u64),
            Text(String),
        }
        #[derive(Deserialize)]
        struct Raw {
            timestamp: String,
            mmsi: RawKey,
            raw_data: String,
        }
        let raw = Raw::deserialize(deserializer)?;
        let captured_at = parse_timestamp(&raw.timestamp).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid timestamp '{}'", raw.timestamp))
        })?;
        Ok(Record {
            captured_at,
            key: match raw.mmsi {
                RawKey::Number(n) => n.to_string(),
                RawKey::Text(s) => s,
            },
            payload: raw.raw_data,
        })
    }
}

/// Wire form of a record key: a JSON number when the key is a canonical
/// unsigned integer (every MMSI), the string itself otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireKey<'a>(pub &'a str);

impl Serialize for WireKey<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.parse::<u64>() {
            Ok(n) if n.to_string() == self.0 => serializer.serialize_u64(n),
            _ => serializer.serialize_str(self.0),
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  Geographic filter
// ════════════════════════════════════════════════════════════════

/// A `(latitude, longitude)` pair. Serialized as `[lat, lon]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Corner(pub f64, pub f64);

/// Diagonal box: south-west corner, then north-east corner.
/// Serialized as `[[sw_lat, sw_lon], [ne_lat, ne_lon]]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox(pub Corner, pub Corner);

impl BoundingBox {
    pub fn new(south_west: (f64, f64), north_east: (f64, f64)) -> Self {
        Self(
            Corner(south_west.0, south_west.1),
            Corner(north_east.0, north_east.1),
        )
    }

    /// Both corners within lat [-90, 90] / lon [-180, 180] and SW below NE.
    pub fn is_valid(&self) -> bool {
        let in_range = |c: Corner| (-90.0..=90.0).contains(&c.0) && (-180.0..=180.0).contains(&c.1);
        in_range(self.0) && in_range(self.1) && self.0.0 <= self.1.0
    }
}

/// Predefined subscription areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    /// Whole globe.
    Global,
    /// Eastern Atlantic, North Africa, Iberia and the Mediterranean basin.
    #[default]
    AtlanticMediterranean,
    /// Western Atlantic (incl. the US East Coast) through the Mediterranean.
    UsAtlanticMediterranean,
}

impl Region {
    pub fn boxes(&self) -> Vec<BoundingBox> {
        match self {
            Region::Global => vec![BoundingBox::new((-90.0, -180.0), (90.0, 180.0))],
            Region::AtlanticMediterranean => vec![BoundingBox::new(
                (25.076647686560193, -21.45976982501989),
                (47.955969745737974, 44.99448027942182),
            )],
            Region::UsAtlanticMediterranean => vec![BoundingBox::new(
                (4.767311413839607, -102.0289629925216),
                (46.46813850956005, 39.55708947212315),
            )],
        }
    }
}
