use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{
    domain::{big_int, parse_integer_literal, CountRow},
    error::WorkerError,
};

/// Value carried by `INPUT_NUMBER`. Only integers are counted; anything else
/// is kept verbatim so it can be logged and ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputValue {
    Integer(BigInt),
    NonInteger(String),
}

impl InputValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            // Numbers keep their literal text, so integers of any length
            // decode exactly and fraction or exponent forms stay non-integer.
            Value::Number(number) => {
                let literal = number.to_string();
                match parse_integer_literal(&literal) {
                    Some(v) => Self::Integer(v),
                    None => Self::NonInteger(literal),
                }
            }
            Value::String(text) => match parse_integer_literal(text.trim()) {
                Some(v) => Self::Integer(v),
                None => Self::NonInteger(text.clone()),
            },
            other => Self::NonInteger(other.to_string()),
        }
    }

    pub fn as_integer(&self) -> Option<&BigInt> {
        match self {
            Self::Integer(v) => Some(v),
            Self::NonInteger(_) => None,
        }
    }
}

impl Serialize for InputValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Integer(v) => big_int::serialize(v, serializer),
            Self::NonInteger(raw) => match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => serializer.serialize_f64(v),
                _ => serializer.serialize_str(raw),
            },
        }
    }
}

impl<'de> Deserialize<'de> for InputValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(|value| Self::from_json(&value))
    }
}

/// Requests sent from the controller to the worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    Start,
    Halt,
    Resume,
    Quit,
    RequestSnapshot,
    InputNumber { value: InputValue },
    SetInterval { ms: f64 },
}

impl Command {
    pub fn input(value: impl Into<BigInt>) -> Self {
        Self::InputNumber {
            value: InputValue::Integer(value.into()),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Halt => "HALT",
            Self::Resume => "RESUME",
            Self::Quit => "QUIT",
            Self::RequestSnapshot => "REQUEST_SNAPSHOT",
            Self::InputNumber { .. } => "INPUT_NUMBER",
            Self::SetInterval { .. } => "SET_INTERVAL",
        }
    }

    /// Decodes a raw wire message.
    ///
    /// The `type` tag must name a known command: a string tag that does not
    /// is reported as-is, a missing or non-string tag as `"unknown"`.
    /// Payload fields are read leniently; a missing `value` decodes to a
    /// non-integer and a missing or non-numeric `ms` to NaN, both of which
    /// the worker ignores. A numeric string `ms` is accepted.
    pub fn from_wire(message: &Value) -> Result<Self, WorkerError> {
        let tag = match message.get("type") {
            Some(Value::String(tag)) => tag.as_str(),
            _ => return Err(WorkerError::unknown_command()),
        };

        let command = match tag {
            "START" => Self::Start,
            "HALT" => Self::Halt,
            "RESUME" => Self::Resume,
            "QUIT" => Self::Quit,
            "REQUEST_SNAPSHOT" => Self::RequestSnapshot,
            "INPUT_NUMBER" => Self::InputNumber {
                value: InputValue::from_json(message.get("value").unwrap_or(&Value::Null)),
            },
            "SET_INTERVAL" => Self::SetInterval {
                ms: message.get("ms").map_or(f64::NAN, interval_ms),
            },
            other => return Err(WorkerError::UnhandledCommand(other.to_string())),
        };

        Ok(command)
    }
}

fn interval_ms(value: &Value) -> f64 {
    match value {
        Value::Number(number) => number.as_f64().unwrap_or(f64::NAN),
        Value::String(text) => text.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let message = Value::deserialize(deserializer)?;
        Self::from_wire(&message).map_err(D::Error::custom)
    }
}

/// Point-in-time view of the worker's aggregate state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub running: bool,
    pub total_inputs: u64,
    /// Sorted by count descending, then value ascending.
    pub top: Vec<CountRow>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_updated: DateTime<Utc>,
}

/// Events emitted by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerEvent {
    Snapshot {
        payload: Snapshot,
    },
    FibAlert {
        #[serde(with = "big_int")]
        value: BigInt,
    },
    QuitAck,
}

impl WorkerEvent {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Snapshot { .. } => "SNAPSHOT",
            Self::FibAlert { .. } => "FIB_ALERT",
            Self::QuitAck => "QUIT_ACK",
        }
    }
}
