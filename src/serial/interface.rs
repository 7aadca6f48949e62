use std::io::Read;
use std::io::Write;
use std::time::{Duration, Instant};

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};

use super::{Result, SerialDeviceInfo, SerialError};

/// USB identities recognized as XDM1041 units (WCH CH340 serial bridge).
pub const SUPPORTED_DEVICES: &[(u16, u16)] = &[(0x1A86, 0x7523)];

pub const BAUD_RATE: u32 = 115200;

const COMMAND_TERMINATOR: &str = "\r\n";
const POLL_INTERVAL: Duration = Duration::from_millis(10);
const FLUSH_TIMEOUT: Duration = Duration::from_millis(100);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(1000);

/// Line-oriented serial transport for the instrument.
///
/// Owns the port handle and a receive buffer for partial lines. Waits are
/// bounded polling loops that sleep in short slices, so callers awaiting a
/// reply keep yielding to the surrounding event loop.
pub struct SerialInterface {
    port: Option<Box<dyn SerialPort>>,
    rx_buffer: Vec<u8>,
    read_timeout: Duration,
}

impl SerialInterface {
    pub fn new() -> Self {
        Self {
            port: None,
            rx_buffer: Vec::new(),
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Wrap an already-open transport; used by tests and simulators.
    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        let mut interface = Self::new();
        interface.attach(port);
        interface
    }

    /// Replace the transport with an already-open one; used by tests and simulators.
    pub fn attach(&mut self, port: Box<dyn SerialPort>) {
        self.rx_buffer.clear();
        self.port = Some(port);
    }

    /// Discover connected XDM1041 devices.
    pub fn discover_devices() -> Result<Vec<SerialDeviceInfo>> {
        let ports = serialport::available_ports()?;
        let mut devices = Vec::new();

        for port in ports {
            if let SerialPortType::UsbPort(usb_info) = port.port_type {
                if is_supported(usb_info.vid, usb_info.pid) {
                    devices.push(SerialDeviceInfo {
                        port_name: port.port_name.clone(),
                        vid: usb_info.vid,
                        pid: usb_info.pid,
                        serial_number: usb_info.serial_number.clone(),
                        manufacturer: usb_info.manufacturer.clone(),
                        product: usb_info.product.clone(),
                    });
                }
            }
        }

        Ok(devices)
    }

    /// Open `port_name` with the instrument's fixed parameters (115200 8-N-1,
    /// no flow control). An already-open connection is closed first.
    pub fn open(&mut self, port_name: &str) -> Result<()> {
        if self.is_open() {
            self.close();
        }
        self.rx_buffer.clear();

        let port = serialport::new(port_name, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            // port-level timeout only bounds a single read slice; the real
            // deadline is enforced by the polling loops below
            .timeout(POLL_INTERVAL)
            .open()
            .map_err(|e| SerialError::ConnectionFailed(e.to_string()))?;

        self.port = Some(port);
        log::info!("Opened {} at {} baud", port_name, BAUD_RATE);
        Ok(())
    }

    /// Idempotent; safe to call from any state.
    pub fn close(&mut self) {
        if self.port.take().is_some() {
            log::info!("Serial port closed");
        }
        self.rx_buffer.clear();
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Deadline for a full reply line; default 1000 ms.
    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    /// Discard all pending input, both OS-side and in the receive buffer.
    /// Replies to a previous, abandoned command must never leak into the
    /// next parse.
    fn drain_input(&mut self) -> Result<()> {
        let port = self.port.as_mut().ok_or(SerialError::NotOpen)?;
        port.clear(ClearBuffer::Input)?;
        self.rx_buffer.clear();
        Ok(())
    }

    /// Send one command, `\r\n`-terminated, and wait for the transport to
    /// confirm the bytes left the host.
    pub async fn write_command(&mut self, command: &str) -> Result<()> {
        self.drain_input()?;

        let frame = format!("{}{}", command, COMMAND_TERMINATOR);
        {
            let port = self.port.as_mut().ok_or(SerialError::NotOpen)?;
            let written = port.write(frame.as_bytes())?;
            if written < frame.len() {
                return Err(SerialError::ShortWrite {
                    written,
                    expected: frame.len(),
                });
            }
        }
        log::debug!("Sent command: {}", command);

        let deadline = Instant::now() + FLUSH_TIMEOUT;
        loop {
            let pending = self.port.as_mut().ok_or(SerialError::NotOpen)?.bytes_to_write()?;
            if pending == 0 {
                return Ok(());
            }
            if Instant::now() >= deadline {
                log::warn!("Command {:?} not flushed within {:?}", command, FLUSH_TIMEOUT);
                return Err(SerialError::WriteTimeout);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Read one `\n`-terminated line, trimmed of surrounding whitespace
    /// (including a trailing `\r`).
    ///
    /// Bytes after the delimiter stay buffered for the next call, and a
    /// timed-out read keeps any partial line it received so a later call can
    /// complete it.
    pub async fn read_line(&mut self) -> Result<String> {
        if !self.is_open() {
            return Err(SerialError::NotOpen);
        }
        let deadline = Instant::now() + self.read_timeout;

        loop {
            if let Some(line) = self.take_line() {
                log::debug!("Received reply: {}", line);
                return Ok(line);
            }
            if Instant::now() >= deadline {
                log::warn!("No reply line within {:?}", self.read_timeout);
                return Err(SerialError::ReadTimeout);
            }

            let mut received = false;
            {
                let port = self.port.as_mut().ok_or(SerialError::NotOpen)?;
                let pending = port.bytes_to_read()? as usize;
                if pending > 0 {
                    let mut chunk = vec![0u8; pending];
                    match port.read(&mut chunk) {
                        Ok(n) if n > 0 => {
                            self.rx_buffer.extend_from_slice(&chunk[..n]);
                            received = true;
                        }
                        Ok(_) => {}
                        Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                        Err(e) => return Err(SerialError::IoError(e)),
                    }
                }
            }

            if !received {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }
    }

    /// Split the first complete line out of the receive buffer, consuming it
    /// together with its delimiter.
    fn take_line(&mut self) -> Option<String> {
        let pos = self.rx_buffer.iter().position(|&b| b == b'\n')?;
        let consumed: Vec<u8> = self.rx_buffer.drain(..=pos).collect();
        let text = String::from_utf8_lossy(&consumed[..pos]);
        Some(text.trim().to_string())
    }
}

impl Default for SerialInterface {
    fn default() -> Self {
        Self::new()
    }
}

pub fn is_supported(vid: u16, pid: u16) -> bool {
    SUPPORTED_DEVICES.contains(&(vid, pid))
}
