//! Device memory dump utility
//! Downloads the full configuration memory of an HX radio to a .dat file

use hxsync::device::DeviceAccess;
use hxsync::{memory_map_for, DeviceModel, LiveDevice, MemoryImage, ProgressFn, SerialConfig, SerialPort};
use std::env;
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
        eprintln!("Usage: {} <port> <model> <output.dat>", args[0]);
        eprintln!("Example: {} /dev/ttyUSB0 HX890 backup.dat", args[0]);
        std::process::exit(1);
    }
    let port_name = &args[1];
    let model = match args[2].to_uppercase().as_str() {
        "HX870" => DeviceModel::Hx870,
        "HX890" => DeviceModel::Hx890,
        other => anyhow::bail!("Unknown model {:?} (expected HX870 or HX890)", other),
    };
    let out_path = &args[3];

    tracing::info!("Port: {}", port_name);
    tracing::info!("Model: {}", model);

    let mut port = SerialPort::open(port_name, SerialConfig::default())?;
    port.clear_all()?;

    let map = memory_map_for(model);
    let mut device = LiveDevice::new(port, map);

    let version = device.firmware_version().await?;
    tracing::info!("Firmware version: {}", version);

    let progress: ProgressFn = Arc::new(|done, total| {
        if done % 0x800 == 0 || done == total {
            tracing::info!("{}/{} bytes", done, total);
        }
    });

    tracing::info!("Downloading {} bytes...", map.total_size);
    let data = device
        .read_memory(0, map.total_size, Some(&progress))
        .await?;

    let image = MemoryImage::new(model, data)?;
    image.save_dat(out_path)?;
    tracing::info!("Saved image to {}", out_path);
    println!("{}", image.printable(0, 0x40));

    Ok(())
}
