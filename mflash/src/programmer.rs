//! Programmer stage: drive the debug probe to erase and write flash.

use crate::compile::tool_name;
use crate::image::FlashImage;
use crate::{Error, Result};
use std::ffi::OsString;
use std::io::Write;
use std::process::Command;

/// A flash programming backend.
///
/// `erase` clears the whole flash array; `write` programs `data` starting
/// at `addr` and verifies it where the backend is able to. Both block until
/// the device reports completion or failure; the debug link is exclusively
/// owned for the duration, so no two operations are ever in flight at once.
pub trait Programmer {
    fn erase(&mut self) -> Result<()>;
    fn write(&mut self, addr: u32, data: &[u8]) -> Result<()>;
}

/// Backend driving the `st-flash` tool from the stlink suite over an
/// ST-LINK probe.
#[derive(Debug, Clone)]
pub struct StFlash {
    program: OsString,
    serial: Option<String>,
}

impl StFlash {
    pub fn new() -> Self {
        StFlash {
            program: OsString::from("st-flash"),
            serial: None,
        }
    }

    /// Select a specific probe when several are attached.
    pub fn serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    /// Invoke a different st-flash program, e.g. one outside `PATH`.
    pub fn program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(ref serial) = self.serial {
            cmd.arg("--serial").arg(serial);
        }
        cmd
    }

    fn run(&self, cmd: &mut Command) -> Result<()> {
        let status = cmd.status().map_err(|source| Error::Tool {
            tool: tool_name(&self.program),
            source,
        })?;
        if !status.success() {
            // st-flash prints its own diagnostics; a missing or unresponsive
            // probe surfaces here as a non-zero exit.
            return Err(Error::ToolStatus {
                tool: tool_name(&self.program),
                status,
            });
        }
        Ok(())
    }
}

impl Default for StFlash {
    fn default() -> Self {
        StFlash::new()
    }
}

impl Programmer for StFlash {
    /// Full-chip erase. Erasing everything also clears any stale bytes
    /// beyond the extent of the image written afterwards.
    fn erase(&mut self) -> Result<()> {
        log::info!("Erasing flash (may take a few seconds)...");
        let mut cmd = self.command();
        cmd.arg("erase");
        self.run(&mut cmd)
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        // st-flash reads the image from disk; stage the bytes to a
        // temporary file that lives until the tool exits. st-flash reads
        // the region back and verifies it after writing.
        let mut staged = tempfile::NamedTempFile::new().map_err(|source| Error::Io {
            path: std::env::temp_dir(),
            source,
        })?;
        staged.write_all(data).map_err(|source| Error::Io {
            path: staged.path().to_path_buf(),
            source,
        })?;
        log::info!("Writing {:.2}kB at {:#010x}...", data.len() as f32 / 1024.0, addr);
        let mut cmd = self.command();
        cmd.arg("write").arg(staged.path()).arg(format!("{:#x}", addr));
        self.run(&mut cmd)
    }
}

/// Programming progress of one [`FlashSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Erasing,
    Erased,
    Writing,
    Verified,
    Failed,
}

/// One erase-then-write pass over the device flash.
///
/// The session only moves forward: `Idle → Erasing → Erased → Writing →
/// Verified/Failed`. `Verified` and `Failed` are terminal; there is no
/// path back to `Idle` and no resumable or partial programming. A write is
/// refused unless the erase completed in this session, so firmware is
/// never programmed over unerased or partially erased cells.
pub struct FlashSession<'a, P: Programmer> {
    programmer: &'a mut P,
    state: State,
}

impl<'a, P: Programmer> FlashSession<'a, P> {
    pub fn new(programmer: &'a mut P) -> Self {
        FlashSession {
            programmer,
            state: State::Idle,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Erase the whole flash array.
    pub fn erase(&mut self) -> Result<()> {
        if self.state != State::Idle {
            return Err(Error::OutOfOrder { state: self.state });
        }
        self.state = State::Erasing;
        match self.programmer.erase() {
            Ok(()) => {
                self.state = State::Erased;
                Ok(())
            }
            Err(e) => {
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    /// Write the image at its base address and verify it.
    pub fn program(&mut self, image: &FlashImage) -> Result<()> {
        if self.state != State::Erased {
            return Err(Error::OutOfOrder { state: self.state });
        }
        self.state = State::Writing;
        match self.programmer.write(image.base(), image.data()) {
            Ok(()) => {
                self.state = State::Verified;
                Ok(())
            }
            Err(e) => {
                self.state = State::Failed;
                Err(e)
            }
        }
    }
}
