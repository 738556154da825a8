use super::Error;
use crate::jvm::BinaryName;

pub struct Settings {
    /// Output class name, written as `my/output/Klass`
    pub output_class_name: BinaryName,

    /// Fail on lines that match none of the known shapes
    ///
    /// When this is off, such lines are skipped with a warning.
    pub strict_syntax: bool,

    /// How deeply `then`, `else`, `do`, and `call` may nest inside each other
    ///
    /// Function calls are inlined at compile time, so a recursive function would otherwise never
    /// finish compiling.
    pub max_nesting_depth: usize,
}

impl Settings {
    pub const DEFAULT_CLASS_NAME: &'static str = "Program";
    pub const DEFAULT_MAX_NESTING_DEPTH: usize = 64;

    pub fn new(output_class_name: impl Into<String>) -> Result<Settings, Error> {
        let output_class_name =
            BinaryName::from_string(output_class_name.into()).map_err(Error::MalformedName)?;

        Ok(Settings {
            output_class_name,
            strict_syntax: true,
            max_nesting_depth: Self::DEFAULT_MAX_NESTING_DEPTH,
        })
    }
}
