use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use log::{debug, warn};

use crate::memory::{Memory, MEMORY_SIZE};

#[derive(Debug)]
pub enum LoadError {
    /// File could not be opened or read.
    Io(io::Error),
    /// File does not contain an origin word.
    Truncated,
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Truncated => None,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read image: {}", err),
            Self::Truncated => write!(f, "image is missing its origin word"),
        }
    }
}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// Load a binary `.obj` image from `path` into memory.
///
/// Program counter and registers are not touched. On error, memory is left unchanged.
pub fn load(memory: &mut Memory, path: impl AsRef<Path>) -> Result<(), LoadError> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;

    debug!("read {} bytes from {}", buffer.len(), path.display());
    load_bytes(memory, &buffer)
}

/// Load an image that has already been read into a byte buffer.
///
/// The first big-endian word is the origin; every following word is placed from the
/// origin upward. Words that do not fit below `0x10000` are discarded.
pub fn load_bytes(memory: &mut Memory, bytes: &[u8]) -> Result<(), LoadError> {
    if bytes.len() < 2 {
        return Err(LoadError::Truncated);
    }
    if bytes.len() % 2 != 0 {
        warn!("image is not aligned to 16 bits, ignoring trailing byte");
    }

    let mut words = bytes
        .chunks_exact(2)
        .map(|word| u16::from_be_bytes([word[0], word[1]]));
    // Length checked above
    let Some(origin) = words.next() else {
        return Err(LoadError::Truncated);
    };
    let words: Vec<u16> = words.collect();

    let written = memory.write_block(origin, &words);
    if written < words.len() {
        warn!(
            "image at origin 0x{:04x} overruns memory, discarded {} words",
            origin,
            words.len() - written
        );
    }
    debug!(
        "loaded {} words at 0x{:04x}..0x{:04x}",
        written,
        origin,
        origin as usize + written
    );
    debug_assert!(origin as usize + written <= MEMORY_SIZE);
    Ok(())
}
