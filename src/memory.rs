/// LC3 can address 128KB of memory: 65,536 words.
pub const MEMORY_SIZE: usize = 0x10000;

/// Keyboard status register. Bit 15 is set while a character is waiting in [`KBDR`].
pub const KBSR: u16 = 0xFE00;
/// Keyboard data register. Holds the last character taken from the console.
pub const KBDR: u16 = 0xFE02;

/// Value of [`KBSR`] when a key is ready.
pub const KBSR_READY: u16 = 0x8000;

/// Flat word-addressed memory.
///
/// Plain storage only: the keyboard side effects of reading [`KBSR`] belong to
/// [`Machine`](crate::Machine), which owns the console.
pub struct Memory {
    words: Box<[u16]>,
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            words: vec![0; MEMORY_SIZE].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn read(&self, addr: u16) -> u16 {
        self.words[addr as usize]
    }

    #[inline]
    pub fn write(&mut self, addr: u16, val: u16) {
        self.words[addr as usize] = val;
    }

    /// Copy `words` into memory starting at `origin`.
    ///
    /// Words that would land past `0xFFFF` are dropped. Returns the amount written.
    pub fn write_block(&mut self, origin: u16, words: &[u16]) -> usize {
        let start = origin as usize;
        let count = words.len().min(MEMORY_SIZE - start);
        self.words[start..start + count].copy_from_slice(&words[..count]);
        count
    }

    /// View of `len` words from `origin`, clamped to the end of memory.
    #[cfg(test)]
    pub(crate) fn slice(&self, origin: u16, len: usize) -> &[u16] {
        let start = origin as usize;
        let end = (start + len).min(MEMORY_SIZE);
        &self.words[start..end]
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zeroed() {
        let mem = Memory::new();
        assert_eq!(mem.read(0x0000), 0);
        assert_eq!(mem.read(0x3000), 0);
        assert_eq!(mem.read(0xFFFF), 0);
    }

    #[test]
    fn full_address_range() {
        let mut mem = Memory::new();
        mem.write(0xFFFF, 0xBEEF);
        mem.write(0x0000, 0x1234);
        assert_eq!(mem.read(0xFFFF), 0xBEEF);
        assert_eq!(mem.read(0x0000), 0x1234);
    }

    #[test]
    fn block_stops_at_top_of_memory() {
        let mut mem = Memory::new();
        let written = mem.write_block(0xFFFE, &[1, 2, 3, 4]);
        assert_eq!(written, 2);
        assert_eq!(mem.slice(0xFFFE, 4), &[1, 2]);
        // Nothing wrapped around to the bottom
        assert_eq!(mem.read(0x0000), 0);
    }
}
