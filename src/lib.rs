//! Compiler from a tiny line-oriented language into JVM class files

pub mod jvm;
pub mod translate;
