//! Flash layout of the target part.

/// Start address of the flash array. The device maps and boots from here,
/// so the vector table of any image must land at this address.
pub const FLASH_ORIGIN: u32 = 0x0800_0000;
/// Page size on low- and medium-density STM32F103 parts.
pub const FLASH_PAGE_SIZE: u32 = 1024;
/// Total flash on the STM32F103C8 (medium-density, 64 pages).
pub const FLASH_SIZE: u32 = 64 * 1024;
/// Final valid address in flash.
pub const FLASH_END: u32 = FLASH_ORIGIN + FLASH_SIZE - 1;

/// Flash extent of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashGeometry {
    pub origin: u32,
    pub size: u32,
}

/// Geometry of the STM32F103C8, the default target.
pub const STM32F103C8: FlashGeometry = FlashGeometry {
    origin: FLASH_ORIGIN,
    size: FLASH_SIZE,
};

impl FlashGeometry {
    /// Geometry for an F103 with a different capacity, e.g. the 128 KiB
    /// high-density parts. The origin is common to the whole family.
    pub fn with_size(size: u32) -> Self {
        FlashGeometry {
            origin: FLASH_ORIGIN,
            size,
        }
    }

    /// Final valid address in flash.
    pub fn end(&self) -> u32 {
        self.origin + self.size - 1
    }

    /// Whether `len` bytes starting at `addr` lie entirely within flash.
    pub fn contains(&self, addr: u32, len: usize) -> bool {
        addr >= self.origin && (addr - self.origin) as u64 + len as u64 <= self.size as u64
    }
}

impl Default for FlashGeometry {
    fn default() -> Self {
        STM32F103C8
    }
}
