use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Error, ErrorKind, Result};

/// Utility trait for serializing data inside class files
///
/// Java class files have some peculiarities that make it useful to define an extra trait (instead
/// of just using `serde`):
///
///   - tags are always `u8`
///   - when serializing a sequence, the length of the sequence is usually `u16`
///
pub trait Serialize: Sized {
    /// Serialize construct into a binary output stream
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()>;
}

/// Inverse of [`Serialize`], used when reading back a class file we produced
pub trait Deserialize: Sized {
    /// Deserialize construct from a binary input stream
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self>;
}

/// Error for structurally invalid input (bad tags, bad magic, truncated lengths)
pub(crate) fn invalid_data(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidData, message.into())
}

impl Serialize for u8 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(*self)
    }
}

impl Serialize for u16 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u16::<BigEndian>(*self)
    }
}

impl Serialize for u32 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<BigEndian>(*self)
    }
}

impl Deserialize for u8 {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self> {
        reader.read_u8()
    }
}

impl Deserialize for u16 {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self> {
        reader.read_u16::<BigEndian>()
    }
}

impl Deserialize for u32 {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self> {
        reader.read_u32::<BigEndian>()
    }
}

/// Size in `u16` is the first thing serialized/deserialized
impl<A: Serialize> Serialize for Vec<A> {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        (self.len() as u16).serialize(writer)?;
        for elem in self {
            elem.serialize(writer)?;
        }
        Ok(())
    }
}

impl<A: Deserialize> Deserialize for Vec<A> {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self> {
        let len = u16::deserialize(reader)?;
        (0..len).map(|_| A::deserialize(reader)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_are_big_endian() {
        let mut bytes = vec![];
        0xCAu8.serialize(&mut bytes).unwrap();
        0x0034u16.serialize(&mut bytes).unwrap();
        0xCAFEBABEu32.serialize(&mut bytes).unwrap();
        assert_eq!(bytes, vec![0xCA, 0x00, 0x34, 0xCA, 0xFE, 0xBA, 0xBE]);
    }

    #[test]
    fn vectors_are_length_prefixed() {
        let mut bytes = vec![];
        vec![1u16, 2, 3].serialize(&mut bytes).unwrap();
        assert_eq!(bytes, vec![0, 3, 0, 1, 0, 2, 0, 3]);

        let decoded: Vec<u16> = Vec::deserialize(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded, vec![1, 2, 3]);
    }

    #[test]
    fn truncated_input_is_an_error() {
        let bytes = [0u8, 2, 0, 1];
        assert!(Vec::<u16>::deserialize(&mut &bytes[..]).is_err());
    }
}
