//! Decoder for sensor node uplinks.
//!
//! Paste a payload or a raw LoRa frame as captured by the receiver to see the
//! reading in human units.

mod decode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use sensor_node_firmware::config::frame::FRAME_VERSION;
use sensor_node_firmware::telemetry::{parse_frame, Payload, SensorReading};

use decode::{parse_hex, render_reading};

#[derive(Parser)]
#[command(name = "uplink-decoder")]
#[command(about = "Decode sensor node uplinks")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a 16-byte application payload
    Payload {
        /// Payload bytes in hex
        hex: String,
    },
    /// Validate a raw LoRa frame and decode its payload
    Frame {
        /// Frame bytes in hex
        hex: String,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Payload { hex } => {
            let bytes = parse_hex(&hex)?;
            let reading = Payload::decode(&bytes)?;
            print_reading(&reading);
        }
        Command::Frame { hex } => {
            let bytes = parse_hex(&hex)?;
            let frame = parse_frame(&bytes)?;

            println!("{}", "Frame".bold());
            println!("  Version: {}", FRAME_VERSION);
            println!("  Port:    {}", frame.port);
            println!("  Length:  {} bytes", frame.payload.len());
            println!("  CRC:     {}", "OK".green());
            println!();

            let reading = Payload::decode(&frame.payload)?;
            print_reading(&reading);
        }
    }

    Ok(())
}

fn print_reading(reading: &SensorReading) {
    println!("{}", "Reading".bold());
    for line in render_reading(reading) {
        match line.value {
            Some(value) => println!("  {:<17} {}", format!("{}:", line.label), value),
            None => println!("  {:<17} {}", format!("{}:", line.label), "invalid".red()),
        }
    }

    if !reading.is_complete() {
        println!();
        println!("{}", "Some measurements failed on the node".yellow());
    }
}
