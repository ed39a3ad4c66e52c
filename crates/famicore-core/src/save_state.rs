//! Save-state envelope.
//!
//! Format: the four magic bytes `FCSS`, a little-endian u32 version, and a
//! postcard-encoded [`Snapshot`](crate::bus::Snapshot) of every mutable
//! field in the machine. A restored state continues emulation
//! bit-identically; states are not portable across versions.

use std::io::{Read, Write};

use crate::bus::Snapshot;

/// Magic bytes opening every save state.
pub const STATE_MAGIC: [u8; 4] = *b"FCSS";

/// Current save-state format version.
pub const STATE_VERSION: u32 = 1;

/// Errors produced while writing or reading save states.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// The stream does not start with the `FCSS` magic.
    #[error("not a famicore save state (bad magic)")]
    BadMagic,

    /// The state was written by an incompatible version.
    #[error("save-state version {found} not supported (expected {expected})")]
    VersionMismatch {
        /// Version found in the stream.
        found: u32,
        /// Version this build writes.
        expected: u32,
    },

    /// The payload failed to decode.
    #[error("corrupt save state: {0}")]
    Corrupt(String),

    /// The snapshot belongs to a different cartridge.
    #[error("save state was taken with mapper {found}, cartridge uses mapper {expected}")]
    MapperMismatch {
        /// Mapper id recorded in the state.
        found: u16,
        /// Mapper id of the loaded cartridge.
        expected: u16,
    },

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Serialize a snapshot into `writer`.
///
/// # Errors
///
/// I/O failures and (unlikely) encoding failures.
pub fn write_state(writer: &mut impl Write, snapshot: &Snapshot) -> Result<(), StateError> {
    let payload =
        postcard::to_allocvec(snapshot).map_err(|err| StateError::Corrupt(err.to_string()))?;

    writer.write_all(&STATE_MAGIC)?;
    writer.write_all(&STATE_VERSION.to_le_bytes())?;
    writer.write_all(&payload)?;
    Ok(())
}

/// Deserialize a snapshot from `reader`.
///
/// # Errors
///
/// [`StateError::BadMagic`], [`StateError::VersionMismatch`], or
/// [`StateError::Corrupt`] for malformed input, plus I/O failures.
pub fn read_state(reader: &mut impl Read) -> Result<Snapshot, StateError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != STATE_MAGIC {
        return Err(StateError::BadMagic);
    }

    let mut version = [0u8; 4];
    reader.read_exact(&mut version)?;
    let version = u32::from_le_bytes(version);
    if version != STATE_VERSION {
        return Err(StateError::VersionMismatch {
            found: version,
            expected: STATE_VERSION,
        });
    }

    let mut payload = Vec::new();
    reader.read_to_end(&mut payload)?;
    postcard::from_bytes(&payload).map_err(|err| StateError::Corrupt(err.to_string()))
}
