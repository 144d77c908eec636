//! Build-and-flash pipeline for STM32F103 firmware.
//!
//! Three stages, strictly in order: cross-compile the firmware crate to an
//! ELF for `thumbv7m-none-eabi`, extract the loadable segments into a raw
//! image, and program the image at the start of device flash through an
//! ST-LINK probe. Each stage must fully succeed before the next begins, and
//! any failure aborts the whole run with a non-zero status.
//!
//! Interrupting the programmer stage mid-write leaves the device with a
//! mixture of old and new firmware. There is no recovery other than a full
//! rerun; the pipeline keeps no state between runs.

pub mod compile;
pub mod device;
mod error;
pub mod image;
pub mod pipeline;
pub mod programmer;

pub use error::{Error, Result};
