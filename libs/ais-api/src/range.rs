use chrono::NaiveDate;

/// Calendar date format used in query parameters and partition names.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("invalid '{field}' date '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { field: &'static str, value: String },

    #[error("'from' ({from}) is after 'to' ({to})")]
    Reversed { from: NaiveDate, to: NaiveDate },
}

/// Inclusive calendar-day interval `[from, to]`.
///
/// Construction validates `from <= to`; a `DateRange` value is always
/// well-formed, so resolving it never has to re-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateRange {
    /// `to` defaults to `from`.
    pub fn new(from: NaiveDate, to: Option<NaiveDate>) -> Result<Self, RangeError> {
        let to = to.unwrap_or(from);
        if from > to {
            return Err(RangeError::Reversed { from, to });
        }
        Ok(Self { from, to })
    }

    pub fn single(day: NaiveDate) -> Self {
        Self { from: day, to: day }
    }

    /// Parse request parameters. Missing `from` means `today`,
    /// missing `to` means `from`.
    pub fn parse(from: Option<&str>, to: Option<&str>, today: NaiveDate) -> Result<Self, RangeError> {
        let from = match from {
            Some(s) => parse_date("from", s)?,
            None => today,
        };
        let to = to.map(|s| parse_date("to", s)).transpose()?;
        Self::new(from, to)
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.from <= day && day <= self.to
    }

    pub fn day_count(&self) -> u32 {
        (self.to - self.from).num_days() as u32 + 1
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.from.format(DATE_FORMAT), self.to.format(DATE_FORMAT))
    }
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, RangeError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| RangeError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn to_defaults_to_from() {
        let r = DateRange::parse(Some("2023-09-01"), None, day("2024-01-01")).unwrap();
        assert_eq!(r.from(), day("2023-09-01"));
        assert_eq!(r.to(), day("2023-09-01"));
        assert_eq!(r.day_count(), 1);
    }

    #[test]
    fn from_defaults_to_today() {
        let r = DateRange::parse(None, None, day("2024-01-01")).unwrap();
        assert_eq!(r, DateRange::single(day("2024-01-01")));
    }

    #[test]
    fn reversed_range_rejected() {
        let err = DateRange::parse(Some("2023-09-03"), Some("2023-09-01"), day("2024-01-01")).unwrap_err();
        assert!(matches!(err, RangeError::Reversed { .. }));
    }

    #[test]
    fn malformed_dates_name_the_field() {
        let err = DateRange::parse(Some("2023/09/01"), None, day("2024-01-01")).unwrap_err();
        assert_eq!(
            err,
            RangeError::InvalidDate { field: "from", value: "2023/09/01".into() }
        );
        let err = DateRange::parse(Some("2023-09-01"), Some("tomorrow"), day("2024-01-01")).unwrap_err();
        assert!(matches!(err, RangeError::InvalidDate { field: "to", .. }));
    }

    #[test]
    fn bounds_are_inclusive_across_months() {
        let r = DateRange::new(day("2023-08-30"), Some(day("2023-09-02"))).unwrap();
        assert_eq!(r.day_count(), 4);
        assert!(r.contains(day("2023-08-30")));
        assert!(r.contains(day("2023-09-02")));
        assert!(!r.contains(day("2023-08-29")));
        assert!(r.contains(day("2023-08-31")));
        assert!(!r.contains(day("2023-09-03")));
    }
}
