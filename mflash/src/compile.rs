//! Compiler stage: cross-compile the firmware crate.

use crate::{Error, Result};
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::process::Command;

/// Target triple for the Cortex-M3 core of the STM32F103.
pub const TARGET: &str = "thumbv7m-none-eabi";

/// One release-profile cross build of a firmware crate.
#[derive(Debug, Clone)]
pub struct CargoBuild {
    project_dir: PathBuf,
    bin: String,
    target: String,
    cargo: OsString,
}

impl CargoBuild {
    /// Build the binary `bin` of the crate at `project_dir` for the
    /// Cortex-M3 target.
    pub fn new(project_dir: impl Into<PathBuf>, bin: impl Into<String>) -> Self {
        CargoBuild {
            project_dir: project_dir.into(),
            bin: bin.into(),
            target: TARGET.to_string(),
            cargo: OsString::from("cargo"),
        }
    }

    /// Invoke a different cargo program, e.g. a wrapper script.
    pub fn cargo(mut self, program: impl Into<OsString>) -> Self {
        self.cargo = program.into();
        self
    }

    /// Override the target triple.
    pub fn target(mut self, triple: impl Into<String>) -> Self {
        self.target = triple.into();
        self
    }

    /// Path the ELF artifact is written to by a successful build.
    pub fn artifact(&self) -> PathBuf {
        self.project_dir
            .join("target")
            .join(&self.target)
            .join("release")
            .join(&self.bin)
    }

    /// Run the cross build, blocking until the compiler exits.
    ///
    /// Compiler diagnostics are inherited, so errors land on the operator's
    /// stderr verbatim. A non-zero compiler exit aborts the pipeline; no
    /// partial artifact is consumed downstream.
    pub fn compile(&self) -> Result<PathBuf> {
        log::info!("Compiling {} for {} (release)...", self.bin, self.target);
        let status = Command::new(&self.cargo)
            .current_dir(&self.project_dir)
            .args(&["build", "--release", "--target"])
            .arg(&self.target)
            .args(&["--bin", &self.bin])
            .status()
            .map_err(|source| Error::Tool {
                tool: tool_name(&self.cargo),
                source,
            })?;
        if !status.success() {
            return Err(Error::ToolStatus {
                tool: tool_name(&self.cargo),
                status,
            });
        }
        Ok(self.artifact())
    }
}

pub(crate) fn tool_name(program: &OsStr) -> String {
    program.to_string_lossy().into_owned()
}
