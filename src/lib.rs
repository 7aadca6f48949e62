//! Serial driver and monitoring toolkit for the OWON XDM1041 bench
//! multimeter.
//!
//! The meter shows up as a USB serial device (CH340 bridge) speaking a
//! line-oriented SCPI dialect. [`serial::SerialInterface`] owns the port and
//! the line framing; [`serial::Xdm1041`] issues the query commands and turns
//! replies into typed values; [`display`] holds pure formatting helpers for
//! presenting readings.
//!
//! ```no_run
//! use xdm1041::{SerialInterface, Xdm1041};
//!
//! #[tokio::main]
//! async fn main() {
//!     let devices = SerialInterface::discover_devices().unwrap_or_default();
//!     let Some(device) = devices.first() else {
//!         eprintln!("no XDM1041 attached");
//!         return;
//!     };
//!     let mut dmm = Xdm1041::new();
//!     if dmm.open(&device.port_name) {
//!         println!("{}: {}", dmm.func().await, dmm.meas_num().await);
//!     }
//! }
//! ```

pub mod display;
pub mod serial;

pub use serial::{SerialDeviceInfo, SerialError, SerialInterface, Speed, Xdm1041};
