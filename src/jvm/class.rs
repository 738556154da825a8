use super::{
    invalid_data, Attribute, ClassAccessFlags, ClassConstantIndex, ConstantsPool, Deserialize,
    MethodAccessFlags, Serialize, Utf8ConstantIndex, Version,
};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::fs;
use std::path::Path;

/// Representation of the [`class` file format of the JVM][0]
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFile {
    pub version: Version,
    pub constants: ConstantsPool,
    pub access_flags: ClassAccessFlags,
    pub this_class: ClassConstantIndex,
    pub super_class: ClassConstantIndex,
    pub interfaces: Vec<ClassConstantIndex>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    /// Magic header bytes that go at the front of the serialized class file
    pub const MAGIC: [u8; 4] = [0xCA, 0xFE, 0xBA, 0xBE];

    /// Save the class file to disk
    pub fn save_to_path<P: AsRef<Path>>(
        &self,
        path: P,
        create_missing_directories: bool,
    ) -> std::io::Result<()> {
        let path = path.as_ref();
        if create_missing_directories {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut class_file = fs::File::create(path)?;
        self.serialize(&mut class_file)
    }

    /// Encode the class file in memory
    pub fn to_bytes(&self) -> std::io::Result<Vec<u8>> {
        let mut bytes = vec![];
        self.serialize(&mut bytes)?;
        Ok(bytes)
    }

    /// Decode a class file, rejecting trailing bytes
    pub fn parse(bytes: &[u8]) -> std::io::Result<ClassFile> {
        let mut reader = bytes;
        let class = ClassFile::deserialize(&mut reader)?;
        if !reader.is_empty() {
            return Err(invalid_data(format!(
                "{} trailing bytes after class file",
                reader.len()
            )));
        }
        Ok(class)
    }
}

impl Serialize for ClassFile {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&ClassFile::MAGIC)?;
        self.version.serialize(writer)?;
        self.constants.serialize(writer)?;
        self.access_flags.serialize(writer)?;
        self.this_class.serialize(writer)?;
        self.super_class.serialize(writer)?;
        self.interfaces.serialize(writer)?;
        self.fields.serialize(writer)?;
        self.methods.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}

impl Deserialize for ClassFile {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != ClassFile::MAGIC {
            return Err(invalid_data(format!("bad magic {:02x?}", magic)));
        }

        Ok(ClassFile {
            version: Version::deserialize(reader)?,
            constants: ConstantsPool::deserialize(reader)?,
            access_flags: ClassAccessFlags::deserialize(reader)?,
            this_class: ClassConstantIndex::deserialize(reader)?,
            super_class: ClassConstantIndex::deserialize(reader)?,
            interfaces: Vec::deserialize(reader)?,
            fields: Vec::deserialize(reader)?,
            methods: Vec::deserialize(reader)?,
            attributes: Vec::deserialize(reader)?,
        })
    }
}

/// Field declared by a class or interface
///
/// We never declare fields, but we still need to be able to read them back.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.5
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub access_flags: u16,
    pub name_index: Utf8ConstantIndex,
    pub descriptor_index: Utf8ConstantIndex,
    pub attributes: Vec<Attribute>,
}

impl Serialize for Field {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.access_flags.serialize(writer)?;
        self.name_index.serialize(writer)?;
        self.descriptor_index.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}

impl Deserialize for Field {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Field {
            access_flags: u16::deserialize(reader)?,
            name_index: Utf8ConstantIndex::deserialize(reader)?,
            descriptor_index: Utf8ConstantIndex::deserialize(reader)?,
            attributes: Vec::deserialize(reader)?,
        })
    }
}

/// Method declared by a class or interface
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.6
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub access_flags: MethodAccessFlags,
    pub name_index: Utf8ConstantIndex,
    pub descriptor_index: Utf8ConstantIndex,
    pub attributes: Vec<Attribute>,
}

impl Serialize for Method {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.access_flags.serialize(writer)?;
        self.name_index.serialize(writer)?;
        self.descriptor_index.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}

impl Deserialize for Method {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Method {
            access_flags: MethodAccessFlags::deserialize(reader)?,
            name_index: Utf8ConstantIndex::deserialize(reader)?,
            descriptor_index: Utf8ConstantIndex::deserialize(reader)?,
            attributes: Vec::deserialize(reader)?,
        })
    }
}
