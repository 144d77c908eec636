use crate::programmer::State;
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

/// Any failure the pipeline can surface. Every variant is fatal to the run:
/// no stage retries, rolls back, or reports partial success.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An external tool (cargo or the probe tool) could not be started.
    #[error("failed to run `{tool}`: {source}")]
    Tool { tool: String, source: io::Error },
    /// An external tool ran and reported failure; its diagnostics went
    /// straight to the operator's stderr.
    #[error("`{tool}` exited with {status}")]
    ToolStatus { tool: String, status: ExitStatus },
    /// Reading or writing a pipeline artifact failed.
    #[error("{path}: {source}", path = .path.display())]
    Io { path: PathBuf, source: io::Error },
    /// The executable is not valid ELF.
    #[error("malformed executable: {0}")]
    Elf(#[from] goblin::error::Error),
    /// The executable was built for some other architecture.
    #[error("executable is for machine {machine:#06x}, not ARM")]
    WrongMachine { machine: u16 },
    /// The executable contains nothing to flash.
    #[error("executable has no loadable segments")]
    NoLoadableSegments,
    /// Two loadable segments claim the same flash addresses.
    #[error("loadable segments overlap at {addr:#010x}")]
    OverlappingSegments { addr: u32 },
    /// The image does not start at the flash origin, so the device would
    /// never find its vector table.
    #[error("image base {base:#010x} is not the flash origin {origin:#010x}")]
    BaseMismatch { base: u64, origin: u32 },
    /// The image cannot fit in the device's flash array.
    #[error("image of {len} bytes exceeds the {capacity} byte flash capacity")]
    ImageTooLarge { len: usize, capacity: u32 },
    /// A programmer backend failure with no finer classification.
    #[error("programmer error: {0}")]
    Device(String),
    /// A written byte read back with a different value.
    #[error("verify mismatch at {flash_addr:#010x}: wrote {wrote:#04x}, read {read:#04x}")]
    VerifyMismatch { flash_addr: u32, wrote: u8, read: u8 },
    /// An erase or write was requested in a session state that does not
    /// permit it, e.g. a write before the erase completed.
    #[error("operation not valid in flash session state {state:?}")]
    OutOfOrder { state: State },
}

pub type Result<T> = std::result::Result<T, Error>;
