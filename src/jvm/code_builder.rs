use super::{BytecodeArray, Code, Error, Instruction, Serialize};

/// Builds up a straight-line method body
///
/// Since we never emit branches, there are no labels, blocks, or frames to track: the body is just
/// a sequence of instructions. The stack and locals budgets are fixed up front by the caller.
#[derive(Debug, Clone)]
pub struct CodeBuilder {
    instructions: Vec<Instruction>,

    /// Length in bytes of the code emitted so far
    len: usize,

    max_stack: u16,
    max_locals: u16,
}

impl CodeBuilder {
    /// Maximum length of the code array of a method
    ///
    /// The `code_length` field is a `u4`, but the JVM requires it to be less than 65536.
    pub const MAX_CODE_LENGTH: usize = 65535;

    pub fn new(max_stack: u16, max_locals: u16) -> CodeBuilder {
        CodeBuilder {
            instructions: vec![],
            len: 0,
            max_stack,
            max_locals,
        }
    }

    /// Push a new instruction, provided the method body still has space for it
    pub fn push_instruction(&mut self, insn: Instruction) -> Result<(), Error> {
        let len = self.len + insn.width();
        if len > Self::MAX_CODE_LENGTH {
            return Err(Error::MethodCodeOverflow(len));
        }
        log::trace!("{:>5}: {}", self.len, insn);
        self.len = len;
        self.instructions.push(insn);
        Ok(())
    }

    /// Length in bytes of the code so far
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Encode the instructions into a code attribute
    pub fn result(self) -> Result<Code, Error> {
        let mut bytes = Vec::with_capacity(self.len);
        for insn in &self.instructions {
            insn.serialize(&mut bytes)?;
        }
        debug_assert_eq!(bytes.len(), self.len);

        Ok(Code {
            max_stack: self.max_stack,
            max_locals: self.max_locals,
            code_array: BytecodeArray(bytes),
            attributes: vec![],
        })
    }
}
