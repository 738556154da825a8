use super::{encoded_utf8_len, Constant, ConstantIndex, Deserialize, Error, Serialize};
use byteorder::{ReadBytesExt, WriteBytesExt};

/// Class file constants pool
///
/// The pool is append only and indexing starts at 1 (index 0 is reserved). Unlike most class file
/// writers, the pool does _not_ deduplicate: every insertion gets fresh slots, even if an
/// identical constant is already present. Constants are inserted in runs, and a constant may refer
/// forward to other constants in its own run (eg. a method reference is placed before the class
/// and name-and-type it points to).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConstantsPool {
    constants: Vec<Constant>,
}

impl ConstantsPool {
    /// Make a fresh empty constants pool
    pub fn new() -> ConstantsPool {
        ConstantsPool { constants: vec![] }
    }

    /// Number of constants in the pool (the serialized count is one more than this)
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Index at which the next constant will be inserted
    pub fn next_index(&self) -> ConstantIndex {
        ConstantIndex(self.constants.len() as u16 + 1)
    }

    /// Check that a run of `requested` constants fits, returning the index it would start at
    ///
    /// Note: the largest valid index is 65534, since the pool count (which is one more than the
    /// number of constants) must fit in a `u16`. Once this succeeds, every index in the run can be
    /// computed with [`ConstantIndex::offset`] without overflowing.
    pub fn reserve(&self, requested: usize) -> Result<ConstantIndex, Error> {
        let start = self.constants.len();
        if start + requested >= u16::MAX as usize {
            return Err(Error::ConstantPoolOverflow {
                offset: start + 1,
                requested,
            });
        }
        Ok(self.next_index())
    }

    /// Push a run of constants into the pool, provided there is space for all of them
    ///
    /// Nothing is pushed if the run doesn't fit or if one of its UTF-8 constants is too long to
    /// encode. Returns the index of the first constant of the run.
    pub fn push_run(&mut self, run: Vec<Constant>) -> Result<ConstantIndex, Error> {
        let first = self.reserve(run.len())?;
        for constant in &run {
            if let Constant::Utf8(text) = constant {
                let length = encoded_utf8_len(text);
                if length > u16::MAX as usize {
                    return Err(Error::ConstantTooLong { length });
                }
            }
        }

        for constant in run {
            log::trace!("#{} = {}", self.next_index().0, constant);
            self.constants.push(constant);
        }
        Ok(first)
    }

    /// Get a constant from the pool
    pub fn get(&self, index: ConstantIndex) -> Option<&Constant> {
        match index.0 {
            0 => None,
            n => self.constants.get(n as usize - 1),
        }
    }

    /// Iterate through the constants along with their indices
    pub fn iter(&self) -> impl Iterator<Item = (ConstantIndex, &Constant)> + '_ {
        self.constants
            .iter()
            .enumerate()
            .map(|(i, constant)| (ConstantIndex(i as u16 + 1), constant))
    }

    /// Make sure every index mentioned by a constant points to a constant in the pool
    pub fn check_references(&self) -> Result<(), Error> {
        for (_, constant) in self.iter() {
            for referenced in constant.references() {
                if self.get(referenced).is_none() {
                    return Err(Error::MissingConstant(referenced));
                }
            }
        }
        Ok(())
    }
}

impl ConstantIndex {
    /// Index `n` slots further along in the pool
    ///
    /// Only meant for runs that [`ConstantsPool::reserve`] has already checked.
    pub fn offset(self, n: u16) -> ConstantIndex {
        ConstantIndex(self.0 + n)
    }
}

/// The count comes first and is one more than the number of constants
impl Serialize for ConstantsPool {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        (self.constants.len() as u16 + 1).serialize(writer)?;
        for constant in &self.constants {
            constant.serialize(writer)?;
        }
        Ok(())
    }
}

impl Deserialize for ConstantsPool {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        let count = u16::deserialize(reader)?;
        let constants = (1..count)
            .map(|_| Constant::deserialize(reader))
            .collect::<std::io::Result<Vec<Constant>>>()?;
        Ok(ConstantsPool { constants })
    }
}
