use super::{invalid_data, Deserialize, Serialize};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::fmt::{Display, Error as FmtError, Formatter};

/// Constants as in the constant pool
///
/// Note: only the constant kinds we generate are included. In particular, there are no numeric
/// constants (so every constant has width 1) and no interface method references.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.4
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    /// Class or an interface
    Class(Utf8ConstantIndex),

    /// Field
    FieldRef(ClassConstantIndex, NameAndTypeConstantIndex),

    /// Method
    MethodRef(ClassConstantIndex, NameAndTypeConstantIndex),

    /// Constant object of type `java.lang.String`
    String(Utf8ConstantIndex),

    /// Name and a type (eg. for a field or a method)
    NameAndType {
        name: Utf8ConstantIndex,
        descriptor: Utf8ConstantIndex,
    },

    /// Constant UTF-8 encoded raw string value
    ///
    /// Despite the name, the encoding is not quite UTF-8 (the encoding of the
    /// null character `\u{0000}` and the encoding of supplementary characters
    /// is different).
    Utf8(String),
}

impl Constant {
    pub const UTF8_TAG: u8 = 1;
    pub const CLASS_TAG: u8 = 7;
    pub const STRING_TAG: u8 = 8;
    pub const FIELD_REF_TAG: u8 = 9;
    pub const METHOD_REF_TAG: u8 = 10;
    pub const NAME_AND_TYPE_TAG: u8 = 12;

    /// Tag byte which starts the serialized constant
    pub fn tag(&self) -> u8 {
        match self {
            Constant::Utf8(_) => Constant::UTF8_TAG,
            Constant::Class(_) => Constant::CLASS_TAG,
            Constant::String(_) => Constant::STRING_TAG,
            Constant::FieldRef(_, _) => Constant::FIELD_REF_TAG,
            Constant::MethodRef(_, _) => Constant::METHOD_REF_TAG,
            Constant::NameAndType { .. } => Constant::NAME_AND_TYPE_TAG,
        }
    }

    /// Constant pool indices this constant refers to
    pub fn references(&self) -> Vec<ConstantIndex> {
        match self {
            Constant::Utf8(_) => vec![],
            Constant::Class(name) | Constant::String(name) => vec![name.0],
            Constant::FieldRef(class, name_and_type)
            | Constant::MethodRef(class, name_and_type) => {
                vec![class.0, name_and_type.0]
            }
            Constant::NameAndType { name, descriptor } => vec![name.0, descriptor.0],
        }
    }
}

impl Serialize for Constant {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.tag().serialize(writer)?;
        match self {
            Constant::Utf8(string) => {
                let buffer: Vec<u8> = encode_modified_utf8(string);
                let length = u16::try_from(buffer.len()).map_err(|_| {
                    invalid_data(format!("UTF-8 constant of {} bytes", buffer.len()))
                })?;
                length.serialize(writer)?;
                writer.write_all(&buffer)?;
            }
            Constant::Class(name) => name.serialize(writer)?,
            Constant::String(utf8) => utf8.serialize(writer)?,
            Constant::FieldRef(class, name_and_type)
            | Constant::MethodRef(class, name_and_type) => {
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::NameAndType { name, descriptor } => {
                name.serialize(writer)?;
                descriptor.serialize(writer)?;
            }
        };
        Ok(())
    }
}

impl Deserialize for Constant {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        let tag = u8::deserialize(reader)?;
        let constant = match tag {
            Constant::UTF8_TAG => {
                let len = u16::deserialize(reader)?;
                let mut buffer = vec![0u8; len as usize];
                reader.read_exact(&mut buffer)?;
                Constant::Utf8(decode_modified_utf8(&buffer)?)
            }
            Constant::CLASS_TAG => Constant::Class(Utf8ConstantIndex::deserialize(reader)?),
            Constant::STRING_TAG => Constant::String(Utf8ConstantIndex::deserialize(reader)?),
            Constant::FIELD_REF_TAG => Constant::FieldRef(
                ClassConstantIndex::deserialize(reader)?,
                NameAndTypeConstantIndex::deserialize(reader)?,
            ),
            Constant::METHOD_REF_TAG => Constant::MethodRef(
                ClassConstantIndex::deserialize(reader)?,
                NameAndTypeConstantIndex::deserialize(reader)?,
            ),
            Constant::NAME_AND_TYPE_TAG => Constant::NameAndType {
                name: Utf8ConstantIndex::deserialize(reader)?,
                descriptor: Utf8ConstantIndex::deserialize(reader)?,
            },
            other => return Err(invalid_data(format!("unsupported constant tag {}", other))),
        };
        Ok(constant)
    }
}

/// Rendered roughly the way `javap -v` shows constants
impl Display for Constant {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Constant::Utf8(string) => write!(f, "Utf8               {}", string),
            Constant::Class(name) => write!(f, "Class              #{}", name.0 .0),
            Constant::String(utf8) => write!(f, "String             #{}", utf8.0 .0),
            Constant::FieldRef(class, nat) => {
                write!(f, "Fieldref           #{}.#{}", class.0 .0, nat.0 .0)
            }
            Constant::MethodRef(class, nat) => {
                write!(f, "Methodref          #{}.#{}", class.0 .0, nat.0 .0)
            }
            Constant::NameAndType { name, descriptor } => {
                write!(f, "NameAndType        #{}:#{}", name.0 .0, descriptor.0 .0)
            }
        }
    }
}

/// Length in bytes of the [modified UTF-8][0] encoding of a string
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.4.7
pub fn encoded_utf8_len(string: &str) -> usize {
    string
        .chars()
        .map(|c| match c.len_utf8() {
            _ if c == '\u{0000}' => 2,
            4 => 6,
            len => len,
        })
        .sum()
}

/// Modified UTF-8 format used in class files.
///
/// See [this `DataInput` section for details][0]. Quoting from that section:
///
/// > The differences between this format and the standard UTF-8 format are the following:
/// >
/// >  * The null byte `\u0000` is encoded in 2-byte format rather than 1-byte, so that the encoded
/// >    strings never have embedded nulls.
/// >  * Only the 1-byte, 2-byte, and 3-byte formats are used.
/// >  * Supplementary characters are represented in the form of surrogate pairs.
///
/// [0]: https://docs.oracle.com/en/java/javase/17/docs/api/java.base/java/io/DataInput.html#modified-utf-8
pub fn encode_modified_utf8(string: &str) -> Vec<u8> {
    let mut buffer: Vec<u8> = vec![];
    for c in string.chars() {
        // Handle the exception for how `\u{0000}` is represented
        let len: usize = if c == '\u{0000}' { 2 } else { c.len_utf8() };
        let code: u32 = c as u32;

        match len {
            1 => buffer.push(code as u8),
            2 => {
                buffer.push((code >> 6 & 0x1F) as u8 | 0b1100_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }
            3 => {
                buffer.push((code >> 12 & 0x0F) as u8 | 0b1110_0000);
                buffer.push((code >> 6 & 0x3F) as u8 | 0b1000_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }

            // Supplementary characters: main divergence from unicode
            _ => {
                buffer.push(0b1110_1101);
                buffer.push(((code >> 16 & 0x0F) as u8).wrapping_sub(1) & 0x0F | 0b1010_0000);
                buffer.push((code >> 10 & 0x3F) as u8 | 0b1000_0000);

                buffer.push(0b1110_1101);
                buffer.push(((code >> 6 & 0x1F) as u8) | 0b1011_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }
        }
    }
    buffer
}

/// Inverse of [`encode_modified_utf8`]
pub fn decode_modified_utf8(bytes: &[u8]) -> std::io::Result<String> {
    fn continuation(bytes: &[u8], at: usize) -> std::io::Result<u32> {
        match bytes.get(at) {
            Some(b) if b & 0b1100_0000 == 0b1000_0000 => Ok((b & 0x3F) as u32),
            _ => Err(invalid_data("truncated modified UTF-8 sequence")),
        }
    }

    // Decode one 1, 2, or 3 byte unit, returning the code unit and the number of bytes consumed
    fn unit(bytes: &[u8], at: usize) -> std::io::Result<(u32, usize)> {
        let first = bytes[at] as u32;
        if first & 0x80 == 0 {
            Ok((first, 1))
        } else if first & 0xE0 == 0xC0 {
            Ok(((first & 0x1F) << 6 | continuation(bytes, at + 1)?, 2))
        } else if first & 0xF0 == 0xE0 {
            let code = (first & 0x0F) << 12
                | continuation(bytes, at + 1)? << 6
                | continuation(bytes, at + 2)?;
            Ok((code, 3))
        } else {
            Err(invalid_data(format!("invalid modified UTF-8 byte {:#x}", first)))
        }
    }

    let mut string = String::new();
    let mut at = 0;
    while at < bytes.len() {
        let (mut code, width) = unit(bytes, at)?;
        at += width;

        // Surrogate pairs are encoded as two separate 3-byte units
        if (0xD800..0xDC00).contains(&code) && at < bytes.len() {
            let (low, low_width) = unit(bytes, at)?;
            if (0xDC00..0xE000).contains(&low) {
                code = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                at += low_width;
            }
        }

        match char::from_u32(code) {
            Some(c) => string.push(c),
            None => return Err(invalid_data(format!("unpaired surrogate {:#x}", code))),
        }
    }
    Ok(string)
}

#[cfg(test)]
mod encode_modified_utf8_tests {
    use super::*;

    #[test]
    fn containing_null_byte() {
        assert_eq!(encode_modified_utf8("a\x00a"), vec![97, 192, 128, 97]);
    }

    #[test]
    fn simple_ascii() {
        assert_eq!(encode_modified_utf8("foo"), vec![102, 111, 111]);
        assert_eq!(
            encode_modified_utf8("hel10_World"),
            vec![104, 101, 108, 49, 48, 95, 87, 111, 114, 108, 100]
        );
    }

    #[test]
    fn two_and_three_byte_encodings() {
        assert_eq!(
            encode_modified_utf8("ĄǍǞ"),
            vec![196, 132, 199, 141, 199, 158]
        );
        assert_eq!(
            encode_modified_utf8("ऄअॲ"),
            vec![224, 164, 132, 224, 164, 133, 224, 165, 178]
        );
    }

    #[test]
    fn supplementary_characters() {
        assert_eq!(
            encode_modified_utf8("\u{10000}\u{dffff}\u{10FFFF}"),
            vec![
                237, 160, 128, 237, 176, 128, 237, 172, 191, 237, 191, 191, 237, 175, 191, 237,
                191, 191
            ]
        );
    }

    #[test]
    fn decoding_undoes_encoding() {
        let text = "x\u{0000}Ą ऄ \u{1F600}!";
        assert_eq!(decode_modified_utf8(&encode_modified_utf8(text)).unwrap(), text);
    }

    #[test]
    fn encoded_length_matches_encoding() {
        for text in ["", "foo", "a\x00a", "ĄǍǞ", "ऄअॲ", "\u{10000}\u{dffff}\u{10FFFF}"] {
            assert_eq!(encoded_utf8_len(text), encode_modified_utf8(text).len(), "{:?}", text);
        }
    }

    #[test]
    fn oversized_utf8_fails_to_serialize() {
        let mut bytes = vec![];
        let constant = Constant::Utf8("\u{0800}".repeat(30_000));
        assert!(constant.serialize(&mut bytes).is_err());
    }

    #[test]
    fn decoding_rejects_truncated_input() {
        assert!(decode_modified_utf8(&[224, 164]).is_err());
        assert!(decode_modified_utf8(&[0xFF]).is_err());
    }
}

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug, PartialOrd, Ord)]
pub struct ConstantIndex(pub u16);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct Utf8ConstantIndex(pub(crate) ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct StringConstantIndex(pub(crate) ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct NameAndTypeConstantIndex(pub(crate) ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct ClassConstantIndex(pub(crate) ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct FieldRefConstantIndex(pub(crate) ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct MethodRefConstantIndex(pub(crate) ConstantIndex);

macro_rules! typed_constant_index {
    ($($typed:ident),*) => {
        $(
            impl From<$typed> for ConstantIndex {
                fn from(typed: $typed) -> ConstantIndex {
                    typed.0
                }
            }

            impl Serialize for $typed {
                fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
                    self.0.serialize(writer)
                }
            }

            impl Deserialize for $typed {
                fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
                    Ok($typed(ConstantIndex::deserialize(reader)?))
                }
            }
        )*
    };
}

typed_constant_index!(
    Utf8ConstantIndex,
    StringConstantIndex,
    NameAndTypeConstantIndex,
    ClassConstantIndex,
    FieldRefConstantIndex,
    MethodRefConstantIndex
);

impl Serialize for ConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl Deserialize for ConstantIndex {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        Ok(ConstantIndex(u16::deserialize(reader)?))
    }
}
