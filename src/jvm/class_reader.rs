//! Queries over a parsed [`ClassFile`]
//!
//! These are mostly useful for inspecting our own output: checking that the constants pool has the
//! expected shape and listing method bodies in a `javap`-like format.

use super::{
    invalid_data, AttributeLike, ClassConstantIndex, ClassFile, Code, Constant, ConstantIndex,
    Instruction, Method, Utf8ConstantIndex,
};
use std::fmt;
use std::io;

/// Placeholder for names that don't resolve
const UNKNOWN: &str = "<?>";

impl ClassFile {
    /// Look up a constant by index
    pub fn constant(&self, index: impl Into<ConstantIndex>) -> Option<&Constant> {
        self.constants.get(index.into())
    }

    /// Look up the text of a `Utf8` constant
    pub fn utf8(&self, index: Utf8ConstantIndex) -> Option<&str> {
        match self.constant(index) {
            Some(Constant::Utf8(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Look up the name of a `Class` constant
    pub fn class_name(&self, index: ClassConstantIndex) -> Option<&str> {
        match self.constant(index) {
            Some(Constant::Class(name)) => self.utf8(*name),
            _ => None,
        }
    }

    /// Find a method by name
    pub fn find_method(&self, name: &str) -> Option<&Method> {
        self.methods
            .iter()
            .find(|method| self.utf8(method.name_index) == Some(name))
    }

    /// Decode the `Code` attribute of a method, if it has one
    pub fn method_code(&self, method: &Method) -> io::Result<Option<Code>> {
        for attribute in &method.attributes {
            if self.utf8(attribute.name_index) == Some(Code::NAME) {
                return Code::parse(&attribute.info).map(Some);
            }
        }
        Ok(None)
    }

    /// Render the class in a format loosely modelled after `javap -v`
    pub fn dump(&self) -> io::Result<String> {
        let mut out = String::new();
        self.write_dump(&mut out)?;
        Ok(out)
    }

    /// Same as [`ClassFile::dump`], but into any formatter
    pub fn write_dump<W: fmt::Write>(&self, out: &mut W) -> io::Result<()> {
        let listing_error =
            |_: fmt::Error| io::Error::new(io::ErrorKind::Other, "failed to write class listing");

        self.write_header(out).map_err(listing_error)?;
        for method in &self.methods {
            let code = self.method_code(method)?.ok_or_else(|| {
                let name = self.utf8(method.name_index).unwrap_or(UNKNOWN);
                invalid_data(format!("method {} has no code", name))
            })?;
            let instructions = Instruction::decode_all(&code.code_array.0)?;
            self.write_method(out, method, &code, &instructions)
                .map_err(listing_error)?;
        }
        Ok(())
    }

    fn write_header<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        writeln!(
            out,
            "class {} extends {}",
            self.class_name(self.this_class).unwrap_or(UNKNOWN),
            self.class_name(self.super_class).unwrap_or(UNKNOWN)
        )?;
        writeln!(
            out,
            "  version: {}.{}",
            self.version.major_version, self.version.minor_version
        )?;
        writeln!(out, "  flags: {:#06x}", self.access_flags.bits())?;
        writeln!(out, "Constant pool:")?;
        for (index, constant) in self.constants.iter() {
            writeln!(out, "{:>6} = {}", format!("#{}", index.0), constant)?;
        }
        Ok(())
    }

    fn write_method<W: fmt::Write>(
        &self,
        out: &mut W,
        method: &Method,
        code: &Code,
        instructions: &[Instruction],
    ) -> fmt::Result {
        writeln!(
            out,
            "{}{}",
            self.utf8(method.name_index).unwrap_or(UNKNOWN),
            self.utf8(method.descriptor_index).unwrap_or(UNKNOWN)
        )?;
        writeln!(out, "  flags: {:#06x}", method.access_flags.bits())?;
        writeln!(
            out,
            "  Code: stack={}, locals={}",
            code.max_stack, code.max_locals
        )?;
        let mut offset = 0;
        for insn in instructions {
            writeln!(out, "{:>7}: {}", offset, insn)?;
            offset += insn.width();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jvm::{BinaryName, ClassBuilder};

    fn hello_class() -> ClassFile {
        let name = BinaryName::from_string(String::from("Hello")).unwrap();
        let mut builder = ClassBuilder::new(name);
        builder.initialize().unwrap();
        builder.emit_print("Hello, world").unwrap();
        builder.finalize().unwrap()
    }

    #[test]
    fn names_resolve() {
        let class = hello_class();
        assert_eq!(class.class_name(class.this_class), Some("Hello"));
        assert_eq!(class.class_name(class.super_class), Some("java/lang/Object"));
        assert!(class.find_method("<init>").is_some());
        assert!(class.find_method("main").is_some());
        assert!(class.find_method("run").is_none());
    }

    /// Formatter that gives up after a fixed number of writes
    struct ShortWriter(usize);

    impl fmt::Write for ShortWriter {
        fn write_str(&mut self, _: &str) -> fmt::Result {
            if self.0 == 0 {
                return Err(fmt::Error);
            }
            self.0 -= 1;
            Ok(())
        }
    }

    #[test]
    fn dump_reports_formatter_failures() {
        let class = hello_class();
        assert!(class.write_dump(&mut ShortWriter(0)).is_err());
        assert!(class.write_dump(&mut ShortWriter(50)).is_err());
        assert!(class.write_dump(&mut ShortWriter(usize::MAX)).is_ok());
    }

    #[test]
    fn dump_lists_main() {
        let dump = hello_class().dump().unwrap();
        assert!(dump.contains("class Hello extends java/lang/Object"));
        assert!(dump.contains("#25 = Utf8               Hello, world"));
        assert!(dump.contains("main([Ljava/lang/String;)V"));
        assert!(dump.contains("      3: ldc #24"));
        assert!(dump.contains("      5: invokevirtual #18"));
    }
}
