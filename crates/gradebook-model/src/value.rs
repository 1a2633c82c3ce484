use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// JSON-friendly representation of a single grade-table cell value.
///
/// Raw rows only ever hold scalars: identifiers and info fields are
/// strings, scores are numbers, and a freshly added column is `Empty`
/// until data is upserted into it.
#[derive(Clone, Debug, PartialEq)]
pub enum GradeValue {
    /// Empty / unset cell value (e.g. a just-added column).
    Empty,
    /// Numeric value (scores, computed averages).
    Num(f64),
    /// Textual value (ids, info fields, letter grades).
    Str(String),
}

impl Default for GradeValue {
    fn default() -> Self {
        GradeValue::Empty
    }
}

impl GradeValue {
    /// Returns true if the value is [`GradeValue::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, GradeValue::Empty)
    }

    /// Numeric view of the value, if it is a number.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            GradeValue::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// String view of the value, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            GradeValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for GradeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradeValue::Empty => Ok(()),
            GradeValue::Num(n) => write!(f, "{n}"),
            GradeValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<f64> for GradeValue {
    fn from(value: f64) -> Self {
        GradeValue::Num(value)
    }
}

impl From<i32> for GradeValue {
    fn from(value: i32) -> Self {
        GradeValue::Num(value as f64)
    }
}

impl From<&str> for GradeValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            GradeValue::Empty
        } else {
            GradeValue::Str(value.to_string())
        }
    }
}

impl From<String> for GradeValue {
    fn from(value: String) -> Self {
        if value.is_empty() {
            GradeValue::Empty
        } else {
            GradeValue::Str(value)
        }
    }
}

// Persisted documents store cells as bare JSON scalars: numbers stay
// numbers, text stays text, and `Empty` round-trips through the empty
// string (the shape an empty column cell takes in stored tables).
impl Serialize for GradeValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            GradeValue::Empty => serializer.serialize_str(""),
            GradeValue::Num(n) => serializer.serialize_f64(*n),
            GradeValue::Str(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for GradeValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = GradeValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string, a number, or null")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<GradeValue, E> {
                Ok(GradeValue::Num(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<GradeValue, E> {
                Ok(GradeValue::Num(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<GradeValue, E> {
                Ok(GradeValue::Num(v as f64))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<GradeValue, E> {
                Ok(GradeValue::from(v))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<GradeValue, E> {
                Ok(GradeValue::from(v))
            }

            fn visit_unit<E: de::Error>(self) -> Result<GradeValue, E> {
                Ok(GradeValue::Empty)
            }

            fn visit_none<E: de::Error>(self) -> Result<GradeValue, E> {
                Ok(GradeValue::Empty)
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}
