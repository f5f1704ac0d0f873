//! Scalar tables shared by the encoder and decoder views.

/// Defines the scalar types every view supports.
/// Arguments passed to callback:
/// 1. Method Name
/// 2. Rust Type
macro_rules! for_each_scalar {
    ($m:ident) => {
        $m!(bool, bool);
        $m!(u8, u8);
        $m!(u16, u16);
        $m!(u32, u32);
        $m!(u64, u64);
        $m!(i8, i8);
        $m!(i16, i16);
        $m!(i32, i32);
        $m!(i64, i64);
        $m!(f32, f32);
        $m!(f64, f64);
    };
}

/// `ValueEncoder::u32(self, v)`: writes the single value.
macro_rules! value_encoder_scalar {
    ($name:ident, $ty:ty) => {
        pub fn $name(self, v: $ty) -> crate::Result<()> {
            self.enc.write(|w| w.$name(v))
        }
    };
}

/// `MapEncoder::u32(&mut self, key, v)`: writes the key, then the value.
macro_rules! map_encoder_scalar {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self, key: &str, v: $ty) -> crate::Result<&mut Self> {
            self.key(key)?.$name(v)?;
            Ok(self)
        }
    };
}

/// `ArrayEncoder::u32(&mut self, v)`: appends one element.
macro_rules! array_encoder_scalar {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self, v: $ty) -> crate::Result<&mut Self> {
            self.element().$name(v)?;
            Ok(self)
        }
    };
}

/// `ValueDecoder::u32(&self)`: reads the current node.
macro_rules! value_decoder_scalar {
    ($name:ident, $ty:ty) => {
        pub fn $name(&self) -> crate::Result<$ty> {
            self.node.$name().map_err(|e| self.dec.corrupted(None, e.into()))
        }
    };
}

/// `MapDecoder::u32(&self, key)`: reads the value stored under `key`.
macro_rules! map_decoder_scalar {
    ($name:ident, $ty:ty) => {
        pub fn $name(&self, key: &str) -> crate::Result<$ty> {
            let node = self.child(key)?;
            node.$name().map_err(|e| self.corrupted(key, e.into()))
        }
    };
}

/// `ArrayDecoder::u32(&mut self)`: reads the element under the cursor and advances.
macro_rules! array_decoder_scalar {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self) -> crate::Result<$ty> {
            let node = self.peek()?;
            let v = node.$name().map_err(|e| self.corrupted(e.into()))?;
            self.index += 1;
            Ok(v)
        }
    };
}

/// `impl Encode for u32` and `impl Decode for u32`.
macro_rules! impl_scalar_codec {
    ($name:ident, $ty:ty) => {
        impl crate::Encode for $ty {
            fn encode(&self, enc: &mut crate::Encoder) -> crate::Result<()> {
                enc.value().$name(*self)
            }
        }

        impl crate::Decode for $ty {
            fn decode(dec: &mut crate::Decoder<'_>) -> crate::Result<Self> {
                dec.value().$name()
            }
        }
    };
}

pub(crate) use array_decoder_scalar;
pub(crate) use array_encoder_scalar;
pub(crate) use for_each_scalar;
pub(crate) use impl_scalar_codec;
pub(crate) use map_decoder_scalar;
pub(crate) use map_encoder_scalar;
pub(crate) use value_decoder_scalar;
pub(crate) use value_encoder_scalar;
