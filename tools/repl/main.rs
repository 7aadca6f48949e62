use std::io::Write;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use xdm1041::serial::interface::BAUD_RATE;
use xdm1041::SerialInterface;

#[derive(Parser)]
#[command(name = "xdm-repl", about = "SCPI REPL over serial (OWON XDM1041 compatible)")]
struct Args {
    /// List available COM ports and exit
    #[arg(long)]
    list: bool,

    /// COM port (e.g. COM7 or /dev/ttyUSB0); defaults to the first detected XDM1041
    #[arg(long)]
    port: Option<String>,

    /// Read timeout in milliseconds
    #[arg(long, default_value_t = 1000)]
    timeout: u64,
}

fn list_com_ports() -> Result<()> {
    let ports = serialport::available_ports().context("enumerating serial ports")?;
    if ports.is_empty() {
        println!("No serial ports found.");
        return Ok(());
    }

    for port in ports {
        let mut line = port.port_name.clone();
        if let serialport::SerialPortType::UsbPort(usb) = &port.port_type {
            if let Some(product) = &usb.product {
                line += &format!(" - {}", product);
            }
            line += &format!(" (VID={:04x}, PID={:04x})", usb.vid, usb.pid);
            if let Some(manufacturer) = &usb.manufacturer {
                line += &format!(" [{}]", manufacturer);
            }
        }
        println!("{}", line);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.list {
        return list_com_ports();
    }

    let port = match args.port {
        Some(port) => port,
        None => {
            let devices = SerialInterface::discover_devices().context("device discovery")?;
            match devices.into_iter().next() {
                Some(device) => device.port_name,
                None => bail!("no XDM1041 detected; pass --port or try --list"),
            }
        }
    };

    let mut interface = SerialInterface::new();
    interface.set_read_timeout(Duration::from_millis(args.timeout));
    interface
        .open(&port)
        .with_context(|| format!("failed to open {}", port))?;

    println!("Connected to {} @ {} baud", port, BAUD_RATE);
    println!("SCPI interactive console");
    println!("  - Queries end with '?'");
    println!("  - Empty line exits");
    println!("{}", "-".repeat(60));

    let stdin = std::io::stdin();
    loop {
        print!("SCPI> ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if stdin.read_line(&mut input)? == 0 {
            break; // EOF
        }
        let cmd = input.trim();
        if cmd.is_empty() {
            break;
        }

        match interface.write_command(cmd).await {
            Ok(()) if cmd.ends_with('?') => match interface.read_line().await {
                Ok(reply) => println!("RX: {}", reply),
                Err(e) => println!("RX: <{}>", e),
            },
            Ok(()) => println!("TX: OK"),
            Err(e) => println!("TX failed: {}", e),
        }
    }

    interface.close();
    println!("Disconnected.");
    Ok(())
}
