//! Scripted stand-in for the instrument's serial port.
//!
//! Replies are queued as byte chunks; a chunk becomes readable on the next
//! readiness poll, so multi-chunk scripts exercise reassembly across the
//! driver's polling loop. Written bytes are recorded for assertions, and the
//! switches on [`MockState`] simulate stale input, short writes and a
//! transmit path that never flushes.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use xdm1041::{SerialInterface, Xdm1041};

#[derive(Default)]
pub struct MockState {
    /// Bytes readable right now; `clear(Input)` wipes these.
    pub available: Vec<u8>,
    /// Future reply chunks, promoted one per readiness poll.
    pub script: VecDeque<Vec<u8>>,
    /// Everything the driver wrote.
    pub written: Vec<u8>,
    /// Accept at most this many bytes per write call.
    pub accept_limit: Option<usize>,
    /// When set, written bytes never report as flushed.
    pub stuck_tx: bool,
    pub pending_tx: u32,
}

#[derive(Clone)]
pub struct MockPort {
    state: Arc<Mutex<MockState>>,
    timeout: Duration,
}

impl MockPort {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            timeout: Duration::from_millis(10),
        }
    }
}

/// Mock port plus a handle for scripting it after it moved into the driver.
pub fn scripted(replies: &[&[u8]]) -> (MockPort, Arc<Mutex<MockState>>) {
    let port = MockPort::new();
    {
        let mut state = port.state.lock().unwrap();
        state.script = replies.iter().map(|chunk| chunk.to_vec()).collect();
    }
    let handle = port.state.clone();
    (port, handle)
}

/// Interface over a scripted mock, with a short read deadline so timeout
/// tests stay fast.
pub fn interface_with(replies: &[&[u8]]) -> (SerialInterface, Arc<Mutex<MockState>>) {
    let (port, state) = scripted(replies);
    let mut interface = SerialInterface::from_port(Box::new(port));
    interface.set_read_timeout(Duration::from_millis(100));
    (interface, state)
}

/// Driver over a scripted mock.
pub fn driver_with_replies(replies: &[&[u8]]) -> (Xdm1041, Arc<Mutex<MockState>>) {
    let (interface, state) = interface_with(replies);
    (Xdm1041::with_interface(interface), state)
}

pub fn written_text(state: &Arc<Mutex<MockState>>) -> String {
    String::from_utf8_lossy(&state.lock().unwrap().written).to_string()
}

/// Queue a reply chunk after construction.
pub fn feed(state: &Arc<Mutex<MockState>>, bytes: &[u8]) {
    state.lock().unwrap().script.push_back(bytes.to_vec());
}

/// Make bytes readable immediately, as if an earlier exchange left them
/// behind.
pub fn preload_stale(state: &Arc<Mutex<MockState>>, bytes: &[u8]) {
    state.lock().unwrap().available.extend_from_slice(bytes);
}

impl io::Read for MockPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        if state.available.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data available"));
        }
        let n = buf.len().min(state.available.len());
        buf[..n].copy_from_slice(&state.available[..n]);
        state.available.drain(..n);
        Ok(n)
    }
}

impl io::Write for MockPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        let n = state.accept_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        state.written.extend_from_slice(&buf[..n]);
        if state.stuck_tx {
            state.pending_tx += n as u32;
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SerialPort for MockPort {
    fn name(&self) -> Option<String> {
        Some("mock".to_string())
    }

    fn baud_rate(&self) -> serialport::Result<u32> {
        Ok(115_200)
    }

    fn data_bits(&self) -> serialport::Result<DataBits> {
        Ok(DataBits::Eight)
    }

    fn flow_control(&self) -> serialport::Result<FlowControl> {
        Ok(FlowControl::None)
    }

    fn parity(&self) -> serialport::Result<Parity> {
        Ok(Parity::None)
    }

    fn stop_bits(&self) -> serialport::Result<StopBits> {
        Ok(StopBits::One)
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_baud_rate(&mut self, _baud_rate: u32) -> serialport::Result<()> {
        Ok(())
    }

    fn set_data_bits(&mut self, _data_bits: DataBits) -> serialport::Result<()> {
        Ok(())
    }

    fn set_flow_control(&mut self, _flow_control: FlowControl) -> serialport::Result<()> {
        Ok(())
    }

    fn set_parity(&mut self, _parity: Parity) -> serialport::Result<()> {
        Ok(())
    }

    fn set_stop_bits(&mut self, _stop_bits: StopBits) -> serialport::Result<()> {
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) -> serialport::Result<()> {
        self.timeout = timeout;
        Ok(())
    }

    fn write_request_to_send(&mut self, _level: bool) -> serialport::Result<()> {
        Ok(())
    }

    fn write_data_terminal_ready(&mut self, _level: bool) -> serialport::Result<()> {
        Ok(())
    }

    fn read_clear_to_send(&mut self) -> serialport::Result<bool> {
        Ok(false)
    }

    fn read_data_set_ready(&mut self) -> serialport::Result<bool> {
        Ok(false)
    }

    fn read_ring_indicator(&mut self) -> serialport::Result<bool> {
        Ok(false)
    }

    fn read_carrier_detect(&mut self) -> serialport::Result<bool> {
        Ok(false)
    }

    fn bytes_to_read(&self) -> serialport::Result<u32> {
        let mut state = self.state.lock().unwrap();
        if state.available.is_empty() {
            if let Some(chunk) = state.script.pop_front() {
                state.available.extend_from_slice(&chunk);
            }
        }
        Ok(state.available.len() as u32)
    }

    fn bytes_to_write(&self) -> serialport::Result<u32> {
        Ok(self.state.lock().unwrap().pending_tx)
    }

    fn clear(&self, buffer_to_clear: ClearBuffer) -> serialport::Result<()> {
        let mut state = self.state.lock().unwrap();
        match buffer_to_clear {
            ClearBuffer::Input => state.available.clear(),
            ClearBuffer::Output => state.pending_tx = 0,
            ClearBuffer::All => {
                state.available.clear();
                state.pending_tx = 0;
            }
        }
        Ok(())
    }

    fn try_clone(&self) -> serialport::Result<Box<dyn SerialPort>> {
        Ok(Box::new(self.clone()))
    }

    fn set_break(&self) -> serialport::Result<()> {
        Ok(())
    }

    fn clear_break(&self) -> serialport::Result<()> {
        Ok(())
    }
}
