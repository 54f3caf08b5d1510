//! Register bank shared by all transactions
//!
//! A flat array of 16-bit values. Read transactions store their results into
//! their window of the bank; write transactions take the values they send
//! from it. Windows of different transactions may overlap.

/// Flat array of 16-bit values owned by the embedding application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterBank {
    values: Vec<u16>,
}

impl RegisterBank {
    /// Create a zero-filled bank with `len` registers
    pub fn new(len: usize) -> Self {
        Self {
            values: vec![0; len],
        }
    }

    /// Number of registers
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Read one register
    #[inline]
    pub fn get(&self, index: usize) -> Option<u16> {
        self.values.get(index).copied()
    }

    /// Write one register. Returns `false` if `index` is out of range.
    #[inline]
    pub fn set(&mut self, index: usize, value: u16) -> bool {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Whether the window `[offset, offset + count)` lies within the bank
    #[inline]
    pub fn fits(&self, offset: usize, count: usize) -> bool {
        offset
            .checked_add(count)
            .is_some_and(|end| end <= self.values.len())
    }

    /// Borrow the window `[offset, offset + count)`
    pub fn window(&self, offset: usize, count: usize) -> Option<&[u16]> {
        let end = offset.checked_add(count)?;
        self.values.get(offset..end)
    }

    /// Mutably borrow the window `[offset, offset + count)`
    pub fn window_mut(&mut self, offset: usize, count: usize) -> Option<&mut [u16]> {
        let end = offset.checked_add(count)?;
        self.values.get_mut(offset..end)
    }

    /// All registers
    #[inline]
    pub fn as_slice(&self) -> &[u16] {
        &self.values
    }

    /// All registers, mutable
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u16] {
        &mut self.values
    }
}

impl From<Vec<u16>> for RegisterBank {
    fn from(values: Vec<u16>) -> Self {
        Self { values }
    }
}

impl From<RegisterBank> for Vec<u16> {
    fn from(bank: RegisterBank) -> Self {
        bank.values
    }
}
