//! Pipeline-level tests against a recording mock programmer.

use mflash::compile::CargoBuild;
use mflash::device::{FlashGeometry, FLASH_ORIGIN};
use mflash::image::FlashImage;
use mflash::pipeline;
use mflash::programmer::{FlashSession, Programmer, State};
use mflash::Error;

/// Records every device interaction so tests can assert call counts and
/// ordering, standing in for a connected probe.
#[derive(Default)]
struct MockProgrammer {
    erases: usize,
    writes: Vec<(u32, Vec<u8>)>,
    fail_erase: bool,
}

impl Programmer for MockProgrammer {
    fn erase(&mut self) -> mflash::Result<()> {
        self.erases += 1;
        if self.fail_erase {
            return Err(Error::Device("no ST-LINK detected".to_string()));
        }
        Ok(())
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> mflash::Result<()> {
        assert_eq!(
            self.erases, 1,
            "write reached the device without a completed erase",
        );
        self.writes.push((addr, data.to_vec()));
        Ok(())
    }
}

fn image() -> FlashImage {
    FlashImage::from_raw(FLASH_ORIGIN, vec![0xAB; 256], &FlashGeometry::default()).unwrap()
}

#[test]
fn flash_performs_one_erase_then_one_write() {
    let mut mock = MockProgrammer::default();
    pipeline::flash(&mut mock, &image()).unwrap();
    assert_eq!(mock.erases, 1);
    assert_eq!(mock.writes, vec![(FLASH_ORIGIN, vec![0xAB; 256])]);
}

#[test]
fn erase_failure_prevents_the_write() {
    let mut mock = MockProgrammer {
        fail_erase: true,
        ..MockProgrammer::default()
    };
    let err = pipeline::flash(&mut mock, &image()).unwrap_err();
    assert!(matches!(err, Error::Device(_)));
    assert_eq!(mock.erases, 1);
    assert!(mock.writes.is_empty());
}

#[test]
fn write_without_erase_never_reaches_the_device() {
    let mut mock = MockProgrammer::default();
    let mut session = FlashSession::new(&mut mock);
    assert!(matches!(
        session.program(&image()),
        Err(Error::OutOfOrder { state: State::Idle }),
    ));
    assert!(mock.writes.is_empty());
}

#[test]
fn failed_build_means_zero_device_interaction() {
    let dir = tempfile::tempdir().unwrap();
    // `false` exits non-zero without touching the filesystem, standing in
    // for a firmware crate that fails to compile.
    let cargo = CargoBuild::new(dir.path(), "fw").cargo("false");
    let mut mock = MockProgrammer::default();
    let err = pipeline::run(&cargo, &FlashGeometry::default(), &mut mock).unwrap_err();
    assert!(matches!(err, Error::ToolStatus { .. }));
    assert_eq!(mock.erases, 0);
    assert!(mock.writes.is_empty());
}

#[test]
fn missing_toolchain_means_zero_device_interaction() {
    let dir = tempfile::tempdir().unwrap();
    let cargo = CargoBuild::new(dir.path(), "fw").cargo("/nonexistent/cargo-none");
    let mut mock = MockProgrammer::default();
    let err = pipeline::run(&cargo, &FlashGeometry::default(), &mut mock).unwrap_err();
    assert!(matches!(err, Error::Tool { .. }));
    assert_eq!(mock.erases, 0);
    assert!(mock.writes.is_empty());
}

#[test]
fn oversized_raw_image_is_rejected_host_side() {
    // The capacity bound is enforced before a session is even opened.
    let err = FlashImage::from_raw(
        FLASH_ORIGIN,
        vec![0; 65 * 1024],
        &FlashGeometry::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::ImageTooLarge { .. }));
}
