use crate::{error::SerdeErr, reader::ByteReader, writer::ByteWriter};

/// A type that can encode itself to, and decode itself from, a byte stream.
///
/// Multi-byte fixed-width integers are little-endian. Length-prefixed values
/// (strings, vectors) carry their length as an unsigned varint.
pub trait Serde: Sized + Clone + PartialEq {
    fn ser(&self, writer: &mut ByteWriter);
    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr>;
}

impl Serde for bool {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_u8(u8::from(*self));
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(reader.read_u8()? != 0)
    }
}

impl Serde for u8 {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_u8(*self);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        reader.read_u8()
    }
}

macro_rules! impl_serde_le_int {
    ($type:ty) => {
        impl Serde for $type {
            fn ser(&self, writer: &mut ByteWriter) {
                writer.write_bytes(&self.to_le_bytes());
            }

            fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
                const WIDTH: usize = std::mem::size_of::<$type>();
                let bytes = reader.read_bytes(WIDTH)?;
                let mut array = [0u8; WIDTH];
                array.copy_from_slice(bytes);
                Ok(<$type>::from_le_bytes(array))
            }
        }
    };
}

impl_serde_le_int!(u16);
impl_serde_le_int!(u32);
impl_serde_le_int!(u64);
impl_serde_le_int!(i32);
impl_serde_le_int!(i64);
impl_serde_le_int!(f32);
impl_serde_le_int!(f64);

impl Serde for String {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_var_u32(self.len() as u32);
        writer.write_bytes(self.as_bytes());
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let len = reader.read_var_u32()? as usize;
        let bytes = reader.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| SerdeErr::InvalidUtf8)
    }
}

impl<T: Serde> Serde for Option<T> {
    fn ser(&self, writer: &mut ByteWriter) {
        match self {
            Some(value) => {
                writer.write_u8(1);
                value.ser(writer);
            }
            None => writer.write_u8(0),
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        match reader.read_u8()? {
            0 => Ok(None),
            _ => Ok(Some(T::de(reader)?)),
        }
    }
}

impl<T: Serde> Serde for Vec<T> {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_var_u32(self.len() as u32);
        for item in self {
            item.ser(writer);
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let len = reader.read_var_u32()? as usize;
        let mut items = Vec::new();
        for _ in 0..len {
            items.push(T::de(reader)?);
        }
        Ok(items)
    }
}

impl<A: Serde, B: Serde> Serde for (A, B) {
    fn ser(&self, writer: &mut ByteWriter) {
        self.0.ser(writer);
        self.1.ser(writer);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok((A::de(reader)?, B::de(reader)?))
    }
}
