use treepack::Kind;

use crate::Decode;
use crate::Decoder;
use crate::Encode;
use crate::Encoder;
use crate::Result;

/// Any value a tree can hold.
///
/// Integers keep their signedness; map entries keep their stored order.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Array(Vec<Value>),
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Looks up `key` in a map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }
}

impl Encode for Value {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        match self {
            Value::Nil => enc.value().nil(),
            Value::Bool(v) => enc.value().bool(*v),
            Value::Int(v) => enc.value().i64(*v),
            Value::Uint(v) => enc.value().u64(*v),
            Value::F32(v) => enc.value().f32(*v),
            Value::F64(v) => enc.value().f64(*v),
            Value::Str(v) => enc.value().str(v),
            Value::Array(items) => items.encode(enc),
            Value::Map(entries) => {
                let mut map = enc.map()?;
                for (key, value) in entries {
                    map.encode(key, value)?;
                }
                map.finish()
            }
        }
    }
}

impl Decode for Value {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        let kind = dec.value().kind();
        match kind {
            Kind::Nil => Ok(Value::Nil),
            Kind::Bool => dec.value().bool().map(Value::Bool),
            Kind::Int => dec.value().i64().map(Value::Int),
            Kind::Uint => dec.value().u64().map(Value::Uint),
            Kind::F32 => dec.value().f32().map(Value::F32),
            Kind::F64 => dec.value().f64().map(Value::F64),
            Kind::Str => dec.value().string().map(Value::Str),
            Kind::Array => Vec::<Value>::decode(dec).map(Value::Array),
            Kind::Map => {
                let mut map = dec.map()?;
                let mut entries = Vec::with_capacity(map.len());
                for (key, node) in map.entries()? {
                    entries.push((key.to_owned(), map.decode_value(key, node)?));
                }
                Ok(Value::Map(entries))
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}
