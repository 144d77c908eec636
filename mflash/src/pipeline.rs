//! Sequential composition of the three stages.
//!
//! `build` covers compilation and extraction, `flash` covers the device
//! programming, and `run` chains the two with no skip path. Every stage
//! short-circuits the rest of the run on failure.

use crate::compile::CargoBuild;
use crate::device::FlashGeometry;
use crate::image::{self, FlashImage};
use crate::programmer::{FlashSession, Programmer};
use crate::{Error, Result};
use std::fs;
use std::path::PathBuf;

/// Artifacts of a successful build.
#[derive(Debug)]
pub struct BuildOutput {
    /// The compiled executable.
    pub elf: PathBuf,
    /// The raw image, saved next to the executable.
    pub bin: PathBuf,
    pub image: FlashImage,
}

/// Compiler and extraction stages: produce the ELF, extract the raw image
/// and save it as `<name>.bin` alongside the executable.
pub fn build(cargo: &CargoBuild, geometry: &FlashGeometry) -> Result<BuildOutput> {
    let elf = cargo.compile()?;
    let image = image::extract_file(&elf, geometry)?;
    let bin = elf.with_extension("bin");
    fs::write(&bin, image.data()).map_err(|source| Error::Io {
        path: bin.clone(),
        source,
    })?;
    log::info!(
        "Extracted {} byte image (crc32 {:#010x}) to {}",
        image.len(),
        image.crc32(),
        bin.display(),
    );
    Ok(BuildOutput { elf, bin, image })
}

/// Programmer stage: exactly one erase followed by exactly one write.
///
/// An erase failure is fatal and the write is never attempted, so the
/// device never receives firmware over unerased cells.
pub fn flash<P: Programmer>(programmer: &mut P, image: &FlashImage) -> Result<()> {
    let mut session = FlashSession::new(programmer);
    session.erase()?;
    session.program(image)?;
    log::info!("Programming completed successfully.");
    Ok(())
}

/// Build, then flash. A build failure means the device is never touched.
pub fn run<P: Programmer>(
    cargo: &CargoBuild,
    geometry: &FlashGeometry,
    programmer: &mut P,
) -> Result<BuildOutput> {
    let out = build(cargo, geometry)?;
    flash(programmer, &out.image)?;
    Ok(out)
}
