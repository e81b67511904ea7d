use chrono::{DateTime, Utc};

/// One normalized DNS answer record, ready for storage.
///
/// Built by the answer extractor from a resolver response; owner name and
/// rendered data carry no trailing root dot. Class and type keep both the
/// numeric code and the symbolic mnemonic so sinks never need to re-derive
/// one from the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    /// DNS transaction id, shared by every record of one response message.
    pub id: u16,

    /// Response timestamp observed at the resolver.
    pub time: DateTime<Utc>,

    /// Owner name, trailing root dot stripped.
    pub name: String,

    pub ttl: u32,

    /// Numeric class code (1 = IN).
    pub class: u16,

    /// Symbolic class mnemonic ("IN", "CH", ...).
    pub class_name: String,

    /// Numeric record type code (1 = A, 28 = AAAA, ...).
    pub rtype: u16,

    /// Symbolic record type mnemonic ("A", "AAAA", "CNAME", ...).
    pub type_name: String,

    /// Type-specific rendered payload, trailing root dot stripped.
    pub data: String,
}

impl Answer {
    /// Timestamp in the text layout the answers table uses
    /// (ISO-8601, space separator, microsecond precision).
    pub fn sql_time(&self) -> String {
        self.time.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

/// Strips the trailing root dot from a presentation-format domain name.
///
/// The bare root name "." becomes the empty string, matching how the
/// answers table has always stored it.
pub fn strip_root_dot(name: &str) -> &str {
    name.trim_end_matches('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn strips_trailing_root_dot() {
        assert_eq!(strip_root_dot("example.com."), "example.com");
        assert_eq!(strip_root_dot("example.com"), "example.com");
        assert_eq!(strip_root_dot("."), "");
    }

    #[test]
    fn sql_time_uses_microsecond_precision() {
        let answer = Answer {
            id: 0x1234,
            time: Utc.timestamp_opt(1_700_000_000, 123_456_000).unwrap(),
            name: "example.com".to_string(),
            ttl: 300,
            class: 1,
            class_name: "IN".to_string(),
            rtype: 1,
            type_name: "A".to_string(),
            data: "93.184.216.34".to_string(),
        };

        assert_eq!(answer.sql_time(), "2023-11-14 22:13:20.123456");
    }
}
