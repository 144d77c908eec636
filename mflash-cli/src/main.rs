//! Operator front end for the build-and-flash pipeline.
//!
//! Exit status is zero only when every stage of the requested operation
//! completed; any failure halts the remaining stages and exits non-zero.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use mflash::compile::CargoBuild;
use mflash::device::FlashGeometry;
use mflash::image::FlashImage;
use mflash::pipeline;
use mflash::programmer::{Programmer, StFlash};
use std::ffi::OsString;
use std::path::PathBuf;

/// Build STM32F103 firmware and flash it over an ST-LINK probe.
#[derive(Parser, Debug)]
#[command(name = "mflash", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Compile the firmware and extract the raw flash image.
    Build(BuildArgs),
    /// Erase the whole device flash.
    Erase(ProbeArgs),
    /// Erase, then write a raw image at the flash origin.
    Write(WriteArgs),
    /// Build, then erase and write the produced image.
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Firmware crate directory.
    #[arg(long, default_value = ".")]
    project_dir: PathBuf,
    /// Binary target to build.
    #[arg(long)]
    bin: String,
    /// Flash capacity in bytes, for parts larger than the 64 KiB C8.
    #[arg(long)]
    flash_size: Option<u32>,
}

#[derive(Args, Debug)]
struct ProbeArgs {
    /// st-flash program to invoke.
    #[arg(long, default_value = "st-flash")]
    st_flash: OsString,
    /// Probe serial number, when several ST-LINKs are attached.
    #[arg(long)]
    serial: Option<String>,
}

#[derive(Args, Debug)]
struct WriteArgs {
    /// Raw image file to program.
    image: PathBuf,
    /// Flash address to write at, in hexadecimal.
    #[arg(long, default_value = "0x8000000", value_parser = parse_hex)]
    address: u32,
    /// Flash capacity in bytes, for parts larger than the 64 KiB C8.
    #[arg(long)]
    flash_size: Option<u32>,
    #[command(flatten)]
    probe: ProbeArgs,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    build: BuildArgs,
    #[command(flatten)]
    probe: ProbeArgs,
}

fn parse_hex(s: &str) -> Result<u32, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid flash address {:?}: {}", s, e))
}

fn geometry(flash_size: Option<u32>) -> FlashGeometry {
    match flash_size {
        Some(size) => FlashGeometry::with_size(size),
        None => FlashGeometry::default(),
    }
}

fn probe(args: &ProbeArgs) -> StFlash {
    let mut probe = StFlash::new().program(args.st_flash.clone());
    if let Some(ref serial) = args.serial {
        probe = probe.serial(serial.clone());
    }
    probe
}

fn dispatch(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Cmd::Build(args) => {
            let cargo = CargoBuild::new(&args.project_dir, &args.bin);
            pipeline::build(&cargo, &geometry(args.flash_size))?;
        }
        Cmd::Erase(args) => {
            probe(&args).erase()?;
        }
        Cmd::Write(args) => {
            let data = std::fs::read(&args.image)
                .with_context(|| format!("reading {}", args.image.display()))?;
            let image = FlashImage::from_raw(args.address, data, &geometry(args.flash_size))?;
            pipeline::flash(&mut probe(&args.probe), &image)?;
        }
        Cmd::Run(args) => {
            let cargo = CargoBuild::new(&args.build.project_dir, &args.build.bin);
            pipeline::run(
                &cargo,
                &geometry(args.build.flash_size),
                &mut probe(&args.probe),
            )?;
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    if let Err(e) = dispatch(cli) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
