//! Translation from source lines into a JVM class
//!
//! The language is small enough that everything (variables, conditionals, loops, functions) is
//! evaluated while translating. The produced class has a `main` method that just prints out the
//! output the program would have produced.

mod errors;
mod line;
mod operand;
mod program;
mod settings;

pub use errors::*;
pub use line::*;
pub use operand::*;
pub use program::*;
pub use settings::*;

use crate::jvm::ClassFile;

/// Translate a whole program in one go
pub fn compile_source(source: &str, settings: Settings) -> Result<ClassFile, Error> {
    let mut translator = ProgramTranslator::new(settings)?;
    translator.parse_source(source)?;
    translator.result()
}
