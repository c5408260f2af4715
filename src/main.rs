use clap::{Parser, Subcommand};
use p1_rs::{
    init_logger, log_info, GasReading, P1Decoder, P1DeviceHandle, PowerReading, ReadingSink,
    SerialConfig, VoltageReading,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "p1-cli")]
#[command(about = "CLI tool for DSMR P1 smart meter telegrams")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor a P1 serial port and log decoded readings
    Monitor {
        port: String,
        #[arg(short, long, default_value = "115200")]
        baudrate: u32,
        /// Minimum seconds between power reading emissions
        #[arg(short, long, default_value = "10")]
        rate_limit: i64,
        /// Skip CRC validation of incoming telegrams
        #[arg(long)]
        disable_crc: bool,
    },
    /// Replay a capture file through the decoder
    Decode {
        file: PathBuf,
        #[arg(long)]
        disable_crc: bool,
    },
}

/// Sink that logs each reading as a JSON line.
struct JsonSink;

impl ReadingSink for JsonSink {
    fn power_reading(&mut self, reading: &PowerReading) {
        if let Ok(json) = serde_json::to_string(reading) {
            log_info(&format!("Power: {json}"));
        }
    }

    fn voltage_reading(&mut self, reading: &VoltageReading) {
        if let Ok(json) = serde_json::to_string(reading) {
            log_info(&format!("Voltage: {json}"));
        }
    }

    fn gas_reading(&mut self, reading: &GasReading) {
        if let Ok(json) = serde_json::to_string(reading) {
            log_info(&format!("Gas: {json}"));
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let cli = Cli::parse();
    let mut decoder = P1Decoder::new();
    let mut sink = JsonSink;

    match cli.command {
        Commands::Monitor { port, baudrate, rate_limit, disable_crc } => {
            let config = SerialConfig { baudrate, timeout: Duration::from_secs(5) };
            let mut handle = P1DeviceHandle::connect_with_config(&port, config).await?;
            log_info(&format!("Connected to P1 port {port}"));
            handle
                .monitor(&mut decoder, rate_limit, disable_crc, &mut sink)
                .await?;
        }
        Commands::Decode { file, disable_crc } => {
            let data = std::fs::read(&file)?;
            for chunk in data.chunks(64) {
                decoder.feed(chunk, 0, disable_crc, &mut sink);
            }
        }
    }

    Ok(())
}
