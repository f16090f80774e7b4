use chrono::{DateTime, SecondsFormat, Utc};

/// Resolve a dot-notation path in a `serde_json::Value`.
///
/// Supports nested field access via dot separation:
/// - `"UserID"` → `value["UserID"]`
/// - `"Message.PositionReport.UserID"` → `value["Message"]["PositionReport"]["UserID"]`
///
/// Returns `None` if any segment is missing.
pub fn resolve_path<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Fixed-width UTC timestamp: `2023-09-01T12:00:00.123Z`.
///
/// Every stored timestamp uses this form, so string order is time order.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse any RFC 3339 timestamp into UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn resolve_nested_path() {
        let v = json!({"Message": {"PositionReport": {"UserID": 111111111}}});
        assert_eq!(
            resolve_path(&v, "Message.PositionReport.UserID"),
            Some(&json!(111111111))
        );
        assert_eq!(resolve_path(&v, "Message.ShipStaticData.UserID"), None);
    }

    #[test]
    fn timestamps_are_fixed_width() {
        let a = Utc.with_ymd_and_hms(2023, 9, 1, 9, 0, 0).unwrap();
        let b = a + chrono::Duration::milliseconds(1500);
        let (fa, fb) = (format_timestamp(a), format_timestamp(b));
        assert_eq!(fa, "2023-09-01T09:00:00.000Z");
        assert_eq!(fb, "2023-09-01T09:00:01.500Z");
        assert!(fa < fb);
        assert_eq!(parse_timestamp(&fb), Some(b));
    }
}
