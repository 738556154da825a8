use super::{invalid_data, Deserialize, Serialize, Utf8ConstantIndex};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::Result;

/// Attributes (used in classes, fields, methods, and even on some attributes)
///
/// The representation is designed to be easily extended with custom attributes.
/// While some attributes aren't essential, others are really important (eg. the
/// code attribute for including the actual bytecode).
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name_index: Utf8ConstantIndex,
    pub info: Vec<u8>,
}

impl Attribute {
    /// Encode an attribute-like value under the given (already allocated) name
    pub fn new<A: AttributeLike>(name_index: Utf8ConstantIndex, attribute: &A) -> Result<Self> {
        let mut info = vec![];
        attribute.serialize(&mut info)?;
        Ok(Attribute { name_index, info })
    }
}

impl Serialize for Attribute {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.name_index.serialize(writer)?;

        // Attribute info length is 4 bytes
        (self.info.len() as u32).serialize(writer)?;
        writer.write_all(&self.info)?;

        Ok(())
    }
}

impl Deserialize for Attribute {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self> {
        let name_index = Utf8ConstantIndex::deserialize(reader)?;
        let len = u32::deserialize(reader)?;
        let mut info = vec![0u8; len as usize];
        reader.read_exact(&mut info)?;
        Ok(Attribute { name_index, info })
    }
}

/// Attributes are all stored in the same way (see `Attribute`), but internally
/// they represent very different things. This trait is implemented by things
/// which can be turned into attributes.
pub trait AttributeLike: Serialize {
    /// Name of the attribute
    const NAME: &'static str;
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.3
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code_array: BytecodeArray,
    pub attributes: Vec<Attribute>,
}

impl Code {
    /// Decode the body of a `Code` attribute
    pub fn parse(info: &[u8]) -> Result<Code> {
        let mut reader = info;
        let code = Code::deserialize(&mut reader)?;
        if !reader.is_empty() {
            return Err(invalid_data("trailing bytes after code attribute"));
        }
        Ok(code)
    }
}

// We never generate exception handlers, so the exception table is always empty
impl Serialize for Code {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.max_stack.serialize(writer)?;
        self.max_locals.serialize(writer)?;
        self.code_array.serialize(writer)?;
        0u16.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}

impl Deserialize for Code {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self> {
        let max_stack = u16::deserialize(reader)?;
        let max_locals = u16::deserialize(reader)?;
        let code_array = BytecodeArray::deserialize(reader)?;
        let exception_table_length = u16::deserialize(reader)?;
        if exception_table_length != 0 {
            return Err(invalid_data("exception tables are not supported"));
        }
        let attributes = Vec::<Attribute>::deserialize(reader)?;
        Ok(Code {
            max_stack,
            max_locals,
            code_array,
            attributes,
        })
    }
}

impl AttributeLike for Code {
    const NAME: &'static str = "Code";
}

/// Encoded bytecode instructions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytecodeArray(pub Vec<u8>);

impl Serialize for BytecodeArray {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        let len = self.0.len() as u32;
        len.serialize(writer)?;
        writer.write_all(&self.0)?;
        Ok(())
    }
}

impl Deserialize for BytecodeArray {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self> {
        let len = u32::deserialize(reader)?;
        let mut bytes = vec![0u8; len as usize];
        reader.read_exact(&mut bytes)?;
        Ok(BytecodeArray(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jvm::ConstantIndex;

    #[test]
    fn code_attribute_layout() {
        let code = Code {
            max_stack: 1,
            max_locals: 1,
            code_array: BytecodeArray(vec![0x2a, 0xb7, 0x00, 0x01, 0xb1]),
            attributes: vec![],
        };
        let attribute = Attribute::new(Utf8ConstantIndex(ConstantIndex(9)), &code).unwrap();

        let mut bytes = vec![];
        attribute.serialize(&mut bytes).unwrap();
        assert_eq!(
            bytes,
            vec![
                0, 9, // name index
                0, 0, 0, 17, // attribute length
                0, 1, // max stack
                0, 1, // max locals
                0, 0, 0, 5, // code length
                0x2a, 0xb7, 0x00, 0x01, 0xb1, // code
                0, 0, // exception table length
                0, 0, // attribute count
            ]
        );

        assert_eq!(Code::parse(&attribute.info).unwrap(), code);
    }
}
