use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::ops::Index;
use std::sync::Arc;

/// Site metadata: arbitrary attributes such as `name`, `state` or `ll`.
pub type Meta = Map<String, Value>;

/// One row of element values. A value is a scalar, or a list when extra
/// sub-values (flags, observation time) were requested.
pub type Row = Vec<Value>;

pub(crate) const UID_FIELD: &str = "uid";
pub(crate) const DATE_FIELD: &str = "date";

static NULL: Value = Value::Null;

pub(crate) fn record_fields(elems: &[String]) -> Arc<[String]> {
    [UID_FIELD.to_string(), DATE_FIELD.to_string()]
        .into_iter()
        .chain(elems.iter().cloned())
        .collect()
}

/// A uniform data record: `uid`, `date`, then one value per element alias,
/// in request order.
///
/// Every record produced by one result or stream shares the same field list.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Arc<[String]>,
    values: Vec<Value>,
}

impl Record {
    pub(crate) fn new(fields: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(fields.len(), values.len());
        Self { fields, values }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .position(|name| name == field)
            .map(|i| &self.values[i])
    }

    pub fn uid(&self) -> &Value {
        &self.values[0]
    }

    pub fn date(&self) -> Option<&str> {
        self.values[1].as_str()
    }

    /// The element values, without `uid` and `date`.
    pub fn elements(&self) -> &[Value] {
        &self.values[2..]
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Index<&str> for Record {
    type Output = Value;

    fn index(&self, field: &str) -> &Value {
        self.get(field).unwrap_or(&NULL)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (field, value) in self.iter() {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}
