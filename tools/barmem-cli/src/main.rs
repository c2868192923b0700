use std::path::PathBuf;

use anyhow::Context;
use barmem::{BarHandle, MapMode};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "barmem-cli",
    about = "Peek, poke and stream 32-bit registers in a memory-mapped device window."
)]
struct Args {
    /// Device resource file (e.g. /sys/bus/pci/devices/<BDF>/resource0)
    resource: PathBuf,

    /// Use an in-process mock window instead of mapping the resource
    #[arg(long, action = clap::ArgAction::SetTrue)]
    mock: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read words starting at a byte offset
    Read {
        /// Byte offset of the first register (hex with 0x prefix, or decimal)
        #[arg(value_parser = parse_u64)]
        offset: u64,

        /// Number of words to read
        #[arg(long, default_value_t = 1, value_parser = parse_u32)]
        count: u32,

        /// One block copy instead of per-word accesses (memory-like targets only)
        #[arg(long, action = clap::ArgAction::SetTrue)]
        bulk: bool,
    },
    /// Write words starting at a byte offset
    Write {
        #[arg(value_parser = parse_u64)]
        offset: u64,

        /// Words to write, in increasing address order
        #[arg(required = true, value_parser = parse_u32)]
        words: Vec<u32>,

        /// One block copy instead of per-word accesses (memory-like targets only)
        #[arg(long, action = clap::ArgAction::SetTrue)]
        bulk: bool,
    },
    /// Drain words from a FIFO data port
    FifoRead {
        /// Byte offset of the FIFO data port
        #[arg(value_parser = parse_u64)]
        port: u64,

        /// Number of words to drain
        #[arg(value_parser = parse_u32)]
        count: u32,

        /// Byte offset of the fill-level register gating the transfer
        #[arg(
            long,
            value_parser = parse_u64,
            required_unless_present = "unchecked",
            conflicts_with = "unchecked"
        )]
        fill: Option<u64>,

        /// Skip fill-level polling entirely (availability is on you)
        #[arg(long, action = clap::ArgAction::SetTrue)]
        unchecked: bool,
    },
    /// Push words into a FIFO data port
    FifoWrite {
        /// Byte offset of the FIFO data port
        #[arg(value_parser = parse_u64)]
        port: u64,

        /// Words to push, in FIFO order
        #[arg(required = true, value_parser = parse_u32)]
        words: Vec<u32>,

        /// Byte offset of the fill-level register gating the transfer
        #[arg(
            long,
            value_parser = parse_u64,
            required_unless_present = "unchecked",
            conflicts_with = "unchecked"
        )]
        fill: Option<u64>,

        /// Skip fill-level polling entirely (free space is on you)
        #[arg(long, action = clap::ArgAction::SetTrue)]
        unchecked: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    run(args)
}

fn run(args: Args) -> anyhow::Result<()> {
    let mode = if args.mock {
        MapMode::Mock
    } else {
        MapMode::Device
    };
    let mut handle = BarHandle::open(&args.resource, mode)
        .with_context(|| format!("opening {}", args.resource.display()))?;

    match args.command {
        Command::Read {
            offset,
            count,
            bulk,
        } => {
            let words = if bulk {
                handle.read_range_memcpy(offset, count)?
            } else {
                handle.read_range(offset, count)?
            };
            for (i, word) in words.iter().enumerate() {
                println!("{:#010x}: {word:#010x}", offset + 4 * i as u64);
            }
        }
        Command::Write {
            offset,
            words,
            bulk,
        } => {
            if bulk {
                handle.write_range_memcpy(offset, &words)?;
            } else {
                handle.write_range(offset, &words)?;
            }
        }
        Command::FifoRead {
            port,
            count,
            fill,
            unchecked,
        } => {
            let words = if unchecked {
                handle.read_fifo_unchecked(port, count)?
            } else {
                let fill = fill.context("--fill is required without --unchecked")?;
                handle.read_fifo(fill, port, count)?
            };
            for (i, word) in words.iter().enumerate() {
                println!("[{i:4}] {word:#010x}");
            }
        }
        Command::FifoWrite {
            port,
            words,
            fill,
            unchecked,
        } => {
            if unchecked {
                handle.write_fifo_unchecked(port, &words)?;
            } else {
                let fill = fill.context("--fill is required without --unchecked")?;
                handle.write_fifo(fill, port, &words)?;
            }
        }
    }

    Ok(())
}

/// Accepts `0x`-prefixed hex or plain decimal.
fn parse_u64(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|err| format!("invalid value {s:?}: {err}"))
}

fn parse_u32(s: &str) -> Result<u32, String> {
    let value = parse_u64(s)?;
    u32::try_from(value).map_err(|_| format!("value {s:?} does not fit in 32 bits"))
}
