//! Image-extraction stage: ELF executable to raw flashable image.

use crate::device::FlashGeometry;
use crate::{Error, Result};
use crc::crc32;
use goblin::elf::header::EM_ARM;
use goblin::elf::program_header::PT_LOAD;
use goblin::elf::Elf;
use std::path::Path;

/// Raw flash image. `data` is written byte-for-byte starting at `base`;
/// addressing is implicit, there is no embedded address metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashImage {
    base: u32,
    data: Vec<u8>,
}

impl FlashImage {
    /// Wrap an already-extracted raw image, e.g. a `.bin` from a previous
    /// build, checking it against the flash extent before any device
    /// interaction.
    pub fn from_raw(base: u32, data: Vec<u8>, geometry: &FlashGeometry) -> Result<Self> {
        if base != geometry.origin {
            return Err(Error::BaseMismatch {
                base: base as u64,
                origin: geometry.origin,
            });
        }
        if !geometry.contains(base, data.len()) {
            return Err(Error::ImageTooLarge {
                len: data.len(),
                capacity: geometry.size,
            });
        }
        Ok(FlashImage { base, data })
    }

    /// Flash address of the first byte.
    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// IEEE CRC32 of the image contents, for the operator to compare
    /// against other tooling.
    pub fn crc32(&self) -> u32 {
        crc32::checksum_ieee(&self.data)
    }
}

/// Extract the raw image from an ELF executable.
///
/// Loadable segments are laid out in load-address order (`p_paddr`, the
/// flash address; initialised-data segments have their runtime address in
/// RAM). Gaps between segments and the word-alignment padding at the end
/// are filled with `0xFF`, the erased state of the flash cells. ELF
/// headers, symbol tables and debug sections are discarded.
///
/// This is a pure transformation: identical input always yields a
/// byte-identical image.
pub fn extract(elf_bytes: &[u8], geometry: &FlashGeometry) -> Result<FlashImage> {
    let elf = Elf::parse(elf_bytes)?;
    if elf.header.e_machine != EM_ARM {
        return Err(Error::WrongMachine {
            machine: elf.header.e_machine,
        });
    }

    let mut segments: Vec<_> = elf
        .program_headers
        .iter()
        .filter(|ph| ph.p_type == PT_LOAD && ph.p_filesz > 0)
        .collect();
    if segments.is_empty() {
        return Err(Error::NoLoadableSegments);
    }
    segments.sort_by_key(|ph| ph.p_paddr);

    let base = segments[0].p_paddr;
    if base != geometry.origin as u64 {
        return Err(Error::BaseMismatch {
            base,
            origin: geometry.origin,
        });
    }
    let base = base as u32;

    let mut data = Vec::new();
    for ph in &segments {
        let offset = (ph.p_paddr - base as u64) as usize;
        if offset < data.len() {
            return Err(Error::OverlappingSegments {
                addr: ph.p_paddr as u32,
            });
        }
        let extent = offset as u64 + ph.p_filesz;
        if extent > geometry.size as u64 {
            return Err(Error::ImageTooLarge {
                len: extent as usize,
                capacity: geometry.size,
            });
        }
        let start = ph.p_offset as usize;
        let bytes = elf_bytes
            .get(start..start + ph.p_filesz as usize)
            .ok_or_else(|| {
                goblin::error::Error::Malformed("segment extends past end of file".to_string())
            })?;
        data.resize(offset, 0xFF);
        data.extend_from_slice(bytes);
    }
    // Flash is written word-by-word; pad the tail to a multiple of 4.
    while data.len() % 4 != 0 {
        data.push(0xFF);
    }

    if !geometry.contains(base, data.len()) {
        return Err(Error::ImageTooLarge {
            len: data.len(),
            capacity: geometry.size,
        });
    }

    Ok(FlashImage { base, data })
}

/// Read an executable from disk and extract its image.
pub fn extract_file(path: &Path, geometry: &FlashGeometry) -> Result<FlashImage> {
    let bytes = std::fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    extract(&bytes, geometry)
}
