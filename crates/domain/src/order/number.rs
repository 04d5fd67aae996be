use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Builds a human-facing order number: `ORD` + 8 hex chars + `-` + (unix seconds mod 10000).
///
/// Not guaranteed unique; the order store carries a unique constraint.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("ORD{}-{}", &uuid[..8], now.timestamp().rem_euclid(10_000))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn shape() {
        let now = Utc.timestamp_opt(1_700_001_234, 0).unwrap();
        let number = generate_order_number(now);

        assert!(number.starts_with("ORD"));
        let (head, tail) = number[3..].split_once('-').unwrap();
        assert_eq!(head.len(), 8);
        assert!(head.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(tail, "1234");
    }

    #[test]
    fn suffix_is_not_padded() {
        let now = Utc.timestamp_opt(1_700_000_007, 0).unwrap();
        assert!(generate_order_number(now).ends_with("-7"));
    }

    #[test]
    fn prefixes_differ() {
        let now = Utc::now();
        assert_ne!(generate_order_number(now), generate_order_number(now));
    }
}
