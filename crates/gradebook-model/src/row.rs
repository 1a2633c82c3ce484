use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::value::GradeValue;

/// The non-calc fields of one entity (student) row.
///
/// Fields are an ordered sequence of `(col_id, value)` pairs. Rows held
/// by a table are kept in the schema's `col_index` order; a row built
/// directly by a consumer keeps whatever order it was given until it is
/// upserted.
///
/// Serializes as a JSON object whose key order is the field order, and
/// deserializes preserving document order, so persisted tables keep the
/// ordered-column shape.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawRow {
    fields: Vec<(String, GradeValue)>,
}

impl RawRow {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<GradeValue>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, col_id: &str) -> Option<&GradeValue> {
        self.fields
            .iter()
            .find(|(id, _)| id == col_id)
            .map(|(_, v)| v)
    }

    /// Set `col_id` to `value`, replacing an existing field in place or
    /// appending a new one at the end.
    pub fn set(&mut self, col_id: impl Into<String>, value: impl Into<GradeValue>) {
        let col_id = col_id.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(id, _)| *id == col_id) {
            Some((_, v)) => *v = value,
            None => self.fields.push((col_id, value)),
        }
    }

    pub fn col_ids(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(id, _)| id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GradeValue)> {
        self.fields.iter().map(|(id, v)| (id.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_pairs(self) -> Vec<(String, GradeValue)> {
        self.fields
    }

    pub fn to_pairs(&self) -> Vec<(String, GradeValue)> {
        self.fields.clone()
    }
}

impl Serialize for RawRow {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (col_id, value) in &self.fields {
            map.serialize_entry(col_id, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RawRow {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = RawRow;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column id to value")
            }

            fn visit_map<A>(self, mut access: A) -> Result<RawRow, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut fields: Vec<(String, GradeValue)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((col_id, value)) = access.next_entry::<String, GradeValue>()? {
                    if fields.iter().any(|(id, _)| *id == col_id) {
                        return Err(de::Error::custom(format!(
                            "duplicate column id '{col_id}' in row"
                        )));
                    }
                    fields.push((col_id, value));
                }
                Ok(RawRow { fields })
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

/// Ordered sequence of rows; the persisted shape of one course's data.
pub type RawTable = Vec<RawRow>;

/// Per-row, per-column edits to existing rows' existing columns.
///
/// `BTreeMap` keeps error accumulation over a batch deterministic.
pub type Patches = BTreeMap<String, BTreeMap<String, GradeValue>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_preserves_field_order() {
        let row = RawRow::from_pairs([("id", GradeValue::from("s1")), ("hw1", 85.into())]);
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"id":"s1","hw1":85.0}"#
        );

        let back: RawRow = serde_json::from_str(r#"{"hw1":85,"id":"s1"}"#).unwrap();
        let ids: Vec<_> = back.col_ids().collect();
        assert_eq!(ids, ["hw1", "id"]);
    }

    #[test]
    fn duplicate_keys_rejected() {
        let err = serde_json::from_str::<RawRow>(r#"{"id":"s1","id":"s2"}"#).unwrap_err();
        assert!(err.to_string().contains("duplicate column id"));
    }

    #[test]
    fn set_replaces_in_place() {
        let mut row = RawRow::from_pairs([("id", "s1"), ("hw1", "")]);
        row.set("hw1", 90.0);
        assert_eq!(row.get("hw1"), Some(&GradeValue::Num(90.0)));
        assert_eq!(row.len(), 2);
        row.set("hw2", 70.0);
        let ids: Vec<_> = row.col_ids().collect();
        assert_eq!(ids, ["id", "hw1", "hw2"]);
    }
}
