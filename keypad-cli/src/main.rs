mod halfkay;
mod hex;
mod layout;
mod simulate;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;

use halfkay::HalfKay;
use hex::FirmwareImage;
use simulate::{PinArgs, SimulateArgs};

#[derive(Parser)]
#[command(name = "keypad-cli")]
#[command(about = "4x4 keypad firmware tools: layout, simulation and flashing")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, ValueEnum)]
enum Format {
    Html,
    Text,
}

#[derive(Subcommand)]
enum Command {
    /// Render the keypad layout with its pin wiring
    Layout {
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
        #[command(flatten)]
        pins: PinArgs,
    },
    /// Run the scanner against a simulated keypad
    Simulate(SimulateArgs),
    /// Flash a .hex firmware file to Teensy via HalfKay bootloader
    Flash {
        /// Path to the Intel HEX firmware file
        firmware: String,
    },
    /// Detect if a Teensy is connected in bootloader mode
    Detect,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Command::Layout {
            format,
            output,
            pins,
        } => {
            let (strobe, sense) = pins.resolve()?;
            let rendered = match format {
                Format::Html => layout::generate_html(&strobe, &sense),
                Format::Text => layout::generate_text(&strobe, &sense),
            };
            match output {
                Some(path) => {
                    fs::write(&path, rendered).with_context(|| format!("writing {}", path))?;
                    println!("Layout written to {}", path);
                }
                None => print!("{}", rendered),
            }
        }
        Command::Simulate(args) => simulate::run(&args)?,
        Command::Flash { firmware } => {
            let contents =
                fs::read_to_string(&firmware).with_context(|| format!("reading {}", firmware))?;
            let image = FirmwareImage::parse(&contents).context("parsing Intel HEX file")?;

            println!(
                "Firmware: {} bytes at base address 0x{:04X}",
                image.data.len(),
                image.base
            );

            let teensy = HalfKay::open()?;
            teensy.flash(&image)?;
            println!("Teensy rebooted. Keypad firmware should be running.");
        }
        Command::Detect => {
            if HalfKay::detect()? {
                println!("Teensy bootloader detected (HalfKay mode).");
            } else {
                println!("Teensy bootloader not detected.");
                println!("Press the reset button on the Teensy to enter bootloader mode.");
            }
        }
    }

    Ok(())
}
