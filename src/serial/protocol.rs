use serde::{Deserialize, Serialize};

use super::{Result, SerialError, SerialInterface};

/// SCPI command set understood by the XDM1041.
pub mod cmds {
    pub const IDN: &str = "*IDN?";
    pub const FUNC: &str = "FUNC?";
    pub const MEAS: &str = "MEAS?";
    pub const RATE: &str = "RATE?";
    pub const RATE_SLOW: &str = "RATE S";
    pub const RATE_MEDIUM: &str = "RATE M";
    pub const RATE_FAST: &str = "RATE F";
    pub const CONT_THRESHOLD: &str = "CONT:THRE?";
}

/// Measurement rate selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speed {
    Slow,
    Medium,
    Fast,
}

impl Speed {
    fn command(self) -> &'static str {
        match self {
            Speed::Slow => cmds::RATE_SLOW,
            Speed::Medium => cmds::RATE_MEDIUM,
            Speed::Fast => cmds::RATE_FAST,
        }
    }
}

/// Request/response driver for the XDM1041 bench multimeter.
///
/// Query methods never return errors directly: a failed exchange yields a
/// sentinel value (empty string, NaN, `false`, `Speed::Slow`) and records a
/// description in the last-error slot, which stays set until the caller
/// clears it or a connection is opened successfully. One command is
/// outstanding at a time; the `&mut self` receivers keep callers from
/// overlapping exchanges on the same connection.
pub struct Xdm1041 {
    interface: SerialInterface,
    last_error: Option<String>,
    continuity_threshold: Option<f64>,
}

impl Xdm1041 {
    pub fn new() -> Self {
        Self::with_interface(SerialInterface::new())
    }

    /// Build the driver around an existing transport; used by tests and
    /// simulators.
    pub fn with_interface(interface: SerialInterface) -> Self {
        Self {
            interface,
            last_error: None,
            continuity_threshold: None,
        }
    }

    /// Open `port_name` with the instrument's fixed serial parameters.
    /// Invalidates the cached continuity threshold; on success the
    /// last-error slot is cleared as well.
    pub fn open(&mut self, port_name: &str) -> bool {
        self.continuity_threshold = None;
        match self.interface.open(port_name) {
            Ok(()) => {
                self.last_error = None;
                true
            }
            Err(e) => {
                self.note_error(&e);
                false
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.interface.is_open()
    }

    /// Idempotent. Leaves the last-error slot untouched so callers can still
    /// read why the session failed.
    pub fn close(&mut self) {
        self.continuity_threshold = None;
        self.interface.close();
    }

    /// Instrument identification string, raw as reported.
    pub async fn idn(&mut self) -> String {
        match self.query(cmds::IDN).await {
            Ok(reply) => reply,
            Err(e) => {
                self.note_error(&e);
                String::new()
            }
        }
    }

    /// Active measurement function token (`VOLT`, `RES`, `CONT`, ...).
    pub async fn func(&mut self) -> String {
        match self.query(cmds::FUNC).await {
            Ok(reply) => {
                let func = strip_quotes(&reply);
                if func.is_empty() {
                    self.note_error(&SerialError::InvalidReply(reply));
                    return String::new();
                }
                func
            }
            Err(e) => {
                self.note_error(&e);
                String::new()
            }
        }
    }

    /// Current reading as reported, quotes stripped.
    pub async fn meas(&mut self) -> String {
        match self.query(cmds::MEAS).await {
            Ok(reply) => strip_quotes(&reply),
            Err(e) => {
                self.note_error(&e);
                String::new()
            }
        }
    }

    /// Current reading as a number; NaN when the exchange fails or the reply
    /// is not numeric.
    pub async fn meas_num(&mut self) -> f64 {
        match self.query(cmds::MEAS).await {
            Ok(reply) => {
                let text = strip_quotes(&reply);
                match text.parse::<f64>() {
                    Ok(value) => value,
                    Err(_) => {
                        self.note_error(&SerialError::InvalidReply(text));
                        f64::NAN
                    }
                }
            }
            Err(e) => {
                self.note_error(&e);
                f64::NAN
            }
        }
    }

    /// Selected measurement rate; defaults to `Slow` when the reply is
    /// unrecognized.
    pub async fn speed(&mut self) -> Speed {
        match self.query(cmds::RATE).await {
            Ok(reply) => match reply.chars().next() {
                Some('S') => Speed::Slow,
                Some('M') => Speed::Medium,
                Some('F') => Speed::Fast,
                _ => {
                    self.note_error(&SerialError::InvalidReply(reply));
                    Speed::Slow
                }
            },
            Err(e) => {
                self.note_error(&e);
                Speed::Slow
            }
        }
    }

    /// The instrument sends no reply to `RATE`; write success is command
    /// success.
    pub async fn set_speed(&mut self, speed: Speed) -> bool {
        match self.interface.write_command(speed.command()).await {
            Ok(()) => true,
            Err(e) => {
                self.note_error(&e);
                false
            }
        }
    }

    /// Continuity beep threshold. Treated as static for the session: fetched
    /// from the instrument once and cached until the connection is reopened.
    /// NaN when the exchange fails; failures are never cached.
    pub async fn continuity_threshold(&mut self) -> f64 {
        if let Some(value) = self.continuity_threshold {
            return value;
        }
        match self.query(cmds::CONT_THRESHOLD).await {
            Ok(reply) => match reply.parse::<f64>() {
                Ok(value) => {
                    self.continuity_threshold = Some(value);
                    value
                }
                Err(_) => {
                    self.note_error(&SerialError::InvalidReply(reply));
                    f64::NAN
                }
            },
            Err(e) => {
                self.note_error(&e);
                f64::NAN
            }
        }
    }

    /// Most recent error description, or empty when the last call succeeded
    /// and nothing failed since the slot was cleared.
    pub fn last_error(&self) -> &str {
        self.last_error.as_deref().unwrap_or("")
    }

    pub fn clear_last_error(&mut self) {
        self.last_error = None;
    }

    /// Get reference to the serial interface.
    pub fn interface(&self) -> &SerialInterface {
        &self.interface
    }

    /// Get mutable reference to the serial interface.
    pub fn interface_mut(&mut self) -> &mut SerialInterface {
        &mut self.interface
    }

    /// One exchange: drain, write, then wait for the reply line. A write
    /// failure propagates without attempting the read.
    async fn query(&mut self, command: &str) -> Result<String> {
        self.interface.write_command(command).await?;
        self.interface.read_line().await
    }

    fn note_error(&mut self, error: &SerialError) {
        log::warn!("{}", error);
        self.last_error = Some(error.to_string());
    }
}

impl Default for Xdm1041 {
    fn default() -> Self {
        Self::new()
    }
}

/// The instrument wraps text payloads in double quotes (`"VOLT"`).
fn strip_quotes(reply: &str) -> String {
    reply.replace('"', "").trim().to_string()
}
