use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// One row of a frequency ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRow {
    #[serde(with = "big_int")]
    pub value: BigInt,
    pub count: u64,
}

impl CountRow {
    pub fn new(value: impl Into<BigInt>, count: u64) -> Self {
        Self {
            value: value.into(),
            count,
        }
    }
}

/// Parses a strictly decimal integer literal: optional sign, then digits only.
pub fn parse_integer_literal(raw: &str) -> Option<BigInt> {
    let digits = raw.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Serde adapter for big integers: a JSON integer when the value fits in
/// `i64`, a decimal string otherwise. Both forms are accepted on input.
pub mod big_int {
    use num_bigint::BigInt;
    use num_traits::ToPrimitive;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        match value.to_i64() {
            Some(small) => serializer.serialize_i64(small),
            None => serializer.serialize_str(&value.to_string()),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        let literal = match Value::deserialize(deserializer)? {
            Value::Number(number) => number.to_string(),
            Value::String(text) => text.trim().to_string(),
            other => return Err(D::Error::custom(format!("expected an integer, got {other}"))),
        };
        super::parse_integer_literal(&literal)
            .ok_or_else(|| D::Error::custom(format!("invalid integer literal '{literal}'")))
    }
}
