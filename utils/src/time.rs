use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

pub fn get_epoch() -> i64 {
    Utc::now().timestamp_millis()
}

/// Parses an ISO-8601 / RFC 3339 timestamp (as found in EventBridge envelopes)
/// into epoch milliseconds.
pub fn iso_to_epoch_millis(timestamp: &str) -> Result<i64, chrono::ParseError> {
    DateTime::parse_from_rfc3339(timestamp).map(|dt| dt.timestamp_millis())
}

pub fn epoch_to_timestamp(epoch: i64) -> String {
    match Utc.timestamp_millis_opt(epoch).single() {
        Some(datetime) => datetime.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => epoch.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_epoch_to_timestamp() {
        let epoch = 1617000000000;
        let expected = "2021-03-29T06:40:00.000Z";
        assert_eq!(epoch_to_timestamp(epoch), expected);
    }

    #[test]
    fn test_iso_to_epoch_millis() {
        assert_eq!(iso_to_epoch_millis("2021-03-29T06:40:00Z").unwrap(), 1617000000000);
        assert_eq!(
            iso_to_epoch_millis("2021-03-29T08:40:00.250+02:00").unwrap(),
            1617000000250
        );
        assert!(iso_to_epoch_millis("yesterday").is_err());
    }
}
