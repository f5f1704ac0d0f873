//! `Encode` and `Decode` for std types.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::hash::BuildHasher;

use crate::macros::for_each_scalar;
use crate::macros::impl_scalar_codec;
use crate::Decode;
use crate::Decoder;
use crate::Encode;
use crate::Encoder;
use crate::Result;

for_each_scalar!(impl_scalar_codec);

impl Encode for isize {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.value().int(*self)
    }
}

impl Decode for isize {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        dec.value().int()
    }
}

impl Encode for usize {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.value().uint(*self)
    }
}

impl Decode for usize {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        dec.value().uint()
    }
}

impl Encode for str {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.value().str(self)
    }
}

impl Encode for String {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.value().str(self)
    }
}

impl Decode for String {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        dec.value().string()
    }
}

/// Unit is nil.
impl Encode for () {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.value().nil()
    }
}

/// Accepts any value.
impl Decode for () {
    fn decode(_dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(())
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        (**self).encode(enc)
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        (**self).encode(enc)
    }
}

impl<T: Decode> Decode for Box<T> {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        T::decode(dec).map(Box::new)
    }
}

/// `None` is nil.
impl<T: Encode> Encode for Option<T> {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        match self {
            Some(v) => v.encode(enc),
            None => enc.value().nil(),
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        if dec.value().is_nil() {
            return Ok(None);
        }
        T::decode(dec).map(Some)
    }
}

impl<T: Encode> Encode for [T] {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        let mut arr = enc.array()?;
        for item in self {
            arr.encode(item)?;
        }
        arr.finish()
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        self.as_slice().encode(enc)
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        let mut arr = dec.array()?;
        let mut out = Vec::with_capacity(arr.count());
        while !arr.is_at_end() {
            out.push(arr.decode()?);
        }
        Ok(out)
    }
}

impl<V: Encode, S: BuildHasher> Encode for HashMap<String, V, S> {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        let mut map = enc.map()?;
        for (key, value) in self {
            map.encode(key, value)?;
        }
        map.finish()
    }
}

impl<V: Decode, S: BuildHasher + Default> Decode for HashMap<String, V, S> {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        let mut map = dec.map()?;
        let mut out = HashMap::with_capacity_and_hasher(map.len(), S::default());
        for (key, node) in map.entries()? {
            let value = map.decode_value(key, node)?;
            out.entry(key.to_owned()).or_insert(value);
        }
        Ok(out)
    }
}

impl<V: Encode> Encode for BTreeMap<String, V> {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        let mut map = enc.map()?;
        for (key, value) in self {
            map.encode(key, value)?;
        }
        map.finish()
    }
}

impl<V: Decode> Decode for BTreeMap<String, V> {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        let mut map = dec.map()?;
        let mut out = BTreeMap::new();
        for (key, node) in map.entries()? {
            let value = map.decode_value(key, node)?;
            out.entry(key.to_owned()).or_insert(value);
        }
        Ok(out)
    }
}
