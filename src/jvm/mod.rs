//! Generate (and read back) JVM class files
//!
//! ### Simple example
//!
//! Generating a class whose `main` prints a greeting:
//!
//! ```
//! use toy2class::jvm::*;
//!
//! # fn generate_class() -> Result<(), Error> {
//! let name = BinaryName::from_string(String::from("me/alec/Hello"))
//!     .map_err(Error::MalformedName)?;
//! let mut builder = ClassBuilder::new(name);
//! builder.initialize()?;
//! builder.emit_print("Hello, world")?;
//!
//! // Finally, encode the class into bytes
//! let class_file: ClassFile = builder.finalize()?;
//! let class_bytes: Vec<u8> = class_file.to_bytes()?;
//! assert_eq!(&class_bytes[..4], &ClassFile::MAGIC);
//! # Ok(())
//! # }
//! # generate_class().unwrap();
//! ```

mod access_flags;
mod attributes;
mod binary_format;
mod bytecode;
mod class;
mod class_builder;
mod class_reader;
mod code_builder;
mod constants;
mod constants_pool;
mod errors;
mod names;
mod version;

pub use access_flags::*;
pub use attributes::*;
pub use binary_format::*;
pub use bytecode::*;
pub use class::*;
pub use class_builder::*;
pub use code_builder::*;
pub use constants::*;
pub use constants_pool::*;
pub use errors::*;
pub use names::*;
pub use version::*;
