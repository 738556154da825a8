//! This module contains the (very small) subset of JVM bytecode that we generate. The
//! representation mirrors the instruction encoding closely, except that:
//!
//!   - `aload_<n>` and `aload` are merged into one instruction, like in `javap` output
//!
//!   - the invoke instructions are abstracted into one instruction with an [`InvokeType`]
//!
//! There are no branch instructions at all: control flow in the source language is resolved at
//! compile time (see [`crate::translate`]), so every method body is straight-line code.

use super::{invalid_data, ConstantIndex, Deserialize, FieldRefConstantIndex};
use super::{MethodRefConstantIndex, Serialize};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::convert::TryFrom;
use std::fmt::{Display, Error as FmtError, Formatter};
use std::io::Result;

/// JVM bytecode instruction
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// Load a reference from a local variable (covers `aload` and `aload_{0,3}`)
    ALoad(u8),

    /// Push a constant from the pool
    ///
    /// Only the narrow form is supported: the constant index must fit in one byte.
    Ldc(u8),

    GetStatic(FieldRefConstantIndex),
    Invoke(InvokeType, MethodRefConstantIndex),
    Return,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InvokeType {
    Virtual,
    Special,
    Static,
}

impl Instruction {
    /// Number of bytes this instruction occupies in the code array
    pub fn width(&self) -> usize {
        match self {
            Instruction::ALoad(0..=3) | Instruction::Return => 1,
            Instruction::ALoad(_) | Instruction::Ldc(_) => 2,
            Instruction::GetStatic(_) | Instruction::Invoke(_, _) => 3,
        }
    }

    /// Decode a full code array
    pub fn decode_all(mut code: &[u8]) -> Result<Vec<Instruction>> {
        let mut instructions = vec![];
        while !code.is_empty() {
            instructions.push(Instruction::deserialize(&mut code)?);
        }
        Ok(instructions)
    }
}

impl Serialize for Instruction {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        match self {
            Instruction::ALoad(n @ 0..=3) => (0x2Au8 + n).serialize(writer)?,
            Instruction::ALoad(n) => {
                0x19u8.serialize(writer)?;
                n.serialize(writer)?;
            }
            Instruction::Ldc(idx) => {
                0x12u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::GetStatic(idx) => {
                0xb2u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::Invoke(InvokeType::Virtual, idx) => {
                0xb6u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::Invoke(InvokeType::Special, idx) => {
                0xb7u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::Invoke(InvokeType::Static, idx) => {
                0xb8u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::Return => 0xb1u8.serialize(writer)?,
        }
        Ok(())
    }
}

impl Deserialize for Instruction {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self> {
        let opcode = u8::deserialize(reader)?;
        let insn = match opcode {
            0x2A..=0x2D => Instruction::ALoad(opcode - 0x2A),
            0x19 => Instruction::ALoad(u8::deserialize(reader)?),
            0x12 => Instruction::Ldc(u8::deserialize(reader)?),
            0xb2 => Instruction::GetStatic(FieldRefConstantIndex::deserialize(reader)?),
            0xb6 => Instruction::Invoke(
                InvokeType::Virtual,
                MethodRefConstantIndex::deserialize(reader)?,
            ),
            0xb7 => Instruction::Invoke(
                InvokeType::Special,
                MethodRefConstantIndex::deserialize(reader)?,
            ),
            0xb8 => Instruction::Invoke(
                InvokeType::Static,
                MethodRefConstantIndex::deserialize(reader)?,
            ),
            0xb1 => Instruction::Return,
            other => return Err(invalid_data(format!("unsupported opcode {:#04x}", other))),
        };
        Ok(insn)
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::result::Result<(), FmtError> {
        match self {
            Instruction::ALoad(n @ 0..=3) => write!(f, "aload_{}", n),
            Instruction::ALoad(n) => write!(f, "aload {}", n),
            Instruction::Ldc(idx) => write!(f, "ldc #{}", idx),
            Instruction::GetStatic(idx) => write!(f, "getstatic #{}", ConstantIndex::from(*idx).0),
            Instruction::Invoke(typ, idx) => {
                let mnemonic = match typ {
                    InvokeType::Virtual => "invokevirtual",
                    InvokeType::Special => "invokespecial",
                    InvokeType::Static => "invokestatic",
                };
                write!(f, "{} #{}", mnemonic, ConstantIndex::from(*idx).0)
            }
            Instruction::Return => write!(f, "return"),
        }
    }
}

/// Narrow a constant index into the one-byte operand of `ldc`, if it fits
pub fn narrow_constant_index(index: ConstantIndex) -> Option<u8> {
    u8::try_from(index.0).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(insn: Instruction) -> Vec<u8> {
        let mut bytes = vec![];
        insn.serialize(&mut bytes).unwrap();
        assert_eq!(bytes.len(), insn.width());
        bytes
    }

    #[test]
    fn print_sequence_encoding() {
        let field = FieldRefConstantIndex(ConstantIndex(12));
        let method = MethodRefConstantIndex(ConstantIndex(18));
        assert_eq!(encode(Instruction::GetStatic(field)), vec![0xb2, 0, 12]);
        assert_eq!(encode(Instruction::Ldc(24)), vec![0x12, 24]);
        assert_eq!(
            encode(Instruction::Invoke(InvokeType::Virtual, method)),
            vec![0xb6, 0, 18]
        );
    }

    #[test]
    fn short_and_long_aload() {
        assert_eq!(encode(Instruction::ALoad(0)), vec![0x2a]);
        assert_eq!(encode(Instruction::ALoad(3)), vec![0x2d]);
        assert_eq!(encode(Instruction::ALoad(4)), vec![0x19, 4]);
    }

    #[test]
    fn decode_constructor_body() {
        let code = [0x2a, 0xb7, 0x00, 0x01, 0xb1];
        let method = MethodRefConstantIndex(ConstantIndex(1));
        assert_eq!(
            Instruction::decode_all(&code).unwrap(),
            vec![
                Instruction::ALoad(0),
                Instruction::Invoke(InvokeType::Special, method),
                Instruction::Return,
            ]
        );
    }

    #[test]
    fn ldc_operand_is_one_byte() {
        assert_eq!(narrow_constant_index(ConstantIndex(255)), Some(255));
        assert_eq!(narrow_constant_index(ConstantIndex(256)), None);
    }
}
