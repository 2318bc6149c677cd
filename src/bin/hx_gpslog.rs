//! GPS log dump utility
//! Streams the GPS track log out of an HX radio and writes it to a file

use hxsync::device::DeviceAccess;
use hxsync::{memory_map_for, DeviceModel, LiveDevice, ProgressFn, SerialConfig, SerialPort};
use std::env;
use std::fs::File;
use std::io::Write;
use std::sync::Arc;
use tracing_subscriber::{fmt::format::FmtSpan, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    let format_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::NONE);
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(format_layer)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 4 {
        eprintln!("Usage: {} <port> <model> <output.bin>", args[0]);
        eprintln!("Example: {} /dev/ttyUSB0 HX890 gpslog.bin", args[0]);
        std::process::exit(1);
    }
    let port_name = &args[1];
    let model = match args[2].to_uppercase().as_str() {
        "HX870" => DeviceModel::Hx870,
        "HX890" => DeviceModel::Hx890,
        other => anyhow::bail!("Unknown model {:?} (expected HX870 or HX890)", other),
    };
    let out_path = &args[3];

    let mut port = SerialPort::open(port_name, SerialConfig::default())?;
    port.clear_all()?;
    let mut device = LiveDevice::new(port, memory_map_for(model));

    let progress: ProgressFn = Arc::new(|done, total| {
        tracing::info!("{}/{} log lines", done, total);
    });

    tracing::info!("Reading GPS log...");
    let log = device.read_gps_log(Some(&progress)).await?;
    tracing::info!("Read {} bytes", log.len());

    File::create(out_path)?.write_all(&log)?;
    tracing::info!("Saved GPS log to {}", out_path);

    Ok(())
}
