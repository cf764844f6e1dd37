//! EEG amplifier remote control
//!
//! The amplifier's recording software exposes a TCP remote-control port
//! accepting single-character commands. The protocol has no
//! acknowledgements, so synchronization is sleep-based: every command is
//! followed by a fixed delay long enough for the recorder to settle.
//! Session setup is a four-message sequence carrying the workspace file,
//! experiment name and subject number.
//!
//! [`TcpEegRemote`] drives a live amplifier; [`NoopEegRemote`] swallows
//! the same calls for debugging without hardware. Both are selected by an
//! explicit constructor branch in [`connect_or_noop`].

use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{LabRecError, Result};

/// Default remote-control endpoint of the recording host
pub const DEFAULT_CONTROL_ADDR: &str = "100.1.1.3:6700";

/// Timeout for the initial TCP connect
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay between session-initialization messages
const DEFAULT_INIT_DELAY: Duration = Duration::from_secs(1);

/// Delay after mode switches and recording start/stop
const DEFAULT_SYNC_DELAY: Duration = Duration::from_secs(5);

/// Amplifier display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EegMode {
    /// Live signal display
    Monitor,
    /// Electrode impedance check
    Impedance,
}

impl EegMode {
    /// The single-character wire command for this mode
    pub fn command(&self) -> &'static str {
        match self {
            EegMode::Monitor => "M",
            EegMode::Impedance => "I",
        }
    }
}

/// Capability interface for EEG recording control
///
/// A session owns at most one implementation; which one is decided when
/// the experiment starts, not at call time.
pub trait EegControl {
    /// Run the session-initialization handshake
    fn initialize_session(&mut self, experiment_name: &str, subject_number: &str) -> Result<()>;

    /// Switch the amplifier display mode
    fn switch_mode(&mut self, mode: EegMode) -> Result<()>;

    /// Start recording
    fn start_recording(&mut self) -> Result<()>;

    /// Stop recording; `exit_remote` also leaves remote-control mode
    fn stop_recording(&mut self, exit_remote: bool) -> Result<()>;

    /// The last mode switched to, if any
    fn current_mode(&self) -> Option<EegMode>;

    /// Whether calls reach real hardware
    fn is_live(&self) -> bool {
        true
    }
}

/// Remote control of a live amplifier over TCP
pub struct TcpEegRemote {
    stream: TcpStream,
    config_file: String,
    current_mode: Option<EegMode>,
    init_delay: Duration,
    sync_delay: Duration,
}

impl TcpEegRemote {
    /// Connect to the recording host's remote-control port.
    ///
    /// `config_file` is the amplifier workspace the recording host loads
    /// during session initialization.
    pub fn connect(addr: impl ToSocketAddrs, config_file: impl Into<String>) -> Result<Self> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| LabRecError::Device("No address to connect to".to_string()))?;

        let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)?;
        tracing::info!("Connected to EEG remote control at {}", addr);

        Ok(Self {
            stream,
            config_file: config_file.into(),
            current_mode: None,
            init_delay: DEFAULT_INIT_DELAY,
            sync_delay: DEFAULT_SYNC_DELAY,
        })
    }

    /// Override the fixed synchronization delays
    ///
    /// The defaults suit a live amplifier; tests drop them to zero.
    pub fn with_delays(mut self, init_delay: Duration, sync_delay: Duration) -> Self {
        self.init_delay = init_delay;
        self.sync_delay = sync_delay;
        self
    }

    fn send(&mut self, message: &str) -> Result<()> {
        self.stream.write_all(message.as_bytes())?;
        Ok(())
    }
}

impl EegControl for TcpEegRemote {
    fn initialize_session(&mut self, experiment_name: &str, subject_number: &str) -> Result<()> {
        let messages = [
            format!("1{}", self.config_file),
            format!("2{}", experiment_name),
            format!("3{}", subject_number),
            "4".to_string(),
        ];

        for message in &messages {
            self.send(message)?;
            std::thread::sleep(self.init_delay);
        }

        tracing::info!(
            "EEG session initialized for {} subject {}",
            experiment_name,
            subject_number
        );
        Ok(())
    }

    fn switch_mode(&mut self, mode: EegMode) -> Result<()> {
        self.send(mode.command())?;
        self.current_mode = Some(mode);
        std::thread::sleep(self.sync_delay);
        Ok(())
    }

    fn start_recording(&mut self) -> Result<()> {
        self.send("S")?;
        // The recorder offers no acknowledgement that recording started.
        std::thread::sleep(self.sync_delay);
        Ok(())
    }

    fn stop_recording(&mut self, exit_remote: bool) -> Result<()> {
        let command = if exit_remote { "X" } else { "Q" };
        self.send(command)?;
        std::thread::sleep(self.sync_delay);
        Ok(())
    }

    fn current_mode(&self) -> Option<EegMode> {
        self.current_mode
    }
}

/// Debug fallback when no amplifier is reachable
///
/// Every call succeeds and is remembered, so tests and dry runs can
/// assert what would have been sent. EEG data is not saved.
#[derive(Debug, Default)]
pub struct NoopEegRemote {
    current_mode: Option<EegMode>,
    commands: Vec<String>,
}

impl NoopEegRemote {
    /// Create a no-op remote
    pub fn new() -> Self {
        Self::default()
    }

    /// The commands swallowed so far, in order
    pub fn commands(&self) -> &[String] {
        &self.commands
    }
}

impl EegControl for NoopEegRemote {
    fn initialize_session(&mut self, experiment_name: &str, subject_number: &str) -> Result<()> {
        tracing::debug!(
            "No-op EEG remote: initialize_session({}, {})",
            experiment_name,
            subject_number
        );
        self.commands.push(format!(
            "initialize_session {} {}",
            experiment_name, subject_number
        ));
        Ok(())
    }

    fn switch_mode(&mut self, mode: EegMode) -> Result<()> {
        tracing::debug!("No-op EEG remote: switch_mode({:?})", mode);
        self.commands.push(mode.command().to_string());
        self.current_mode = Some(mode);
        Ok(())
    }

    fn start_recording(&mut self) -> Result<()> {
        tracing::debug!("No-op EEG remote: start_recording");
        self.commands.push("S".to_string());
        Ok(())
    }

    fn stop_recording(&mut self, exit_remote: bool) -> Result<()> {
        tracing::debug!("No-op EEG remote: stop_recording(exit_remote={})", exit_remote);
        self.commands
            .push(if exit_remote { "X" } else { "Q" }.to_string());
        Ok(())
    }

    fn current_mode(&self) -> Option<EegMode> {
        self.current_mode
    }

    fn is_live(&self) -> bool {
        false
    }
}

/// Connect to the amplifier, falling back to the no-op remote.
///
/// The fallback is logged loudly: a run that continues this way produces
/// no EEG data.
pub fn connect_or_noop(
    addr: impl ToSocketAddrs,
    config_file: impl Into<String>,
) -> Box<dyn EegControl> {
    match TcpEegRemote::connect(addr, config_file) {
        Ok(remote) => Box::new(remote),
        Err(e) => {
            tracing::warn!(
                "EEG system not reachable ({}); continuing with no-op remote, EEG data will not be saved",
                e
            );
            Box::new(NoopEegRemote::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_commands() {
        assert_eq!(EegMode::Monitor.command(), "M");
        assert_eq!(EegMode::Impedance.command(), "I");
    }

    #[test]
    fn test_noop_remote_records_calls() {
        let mut remote = NoopEegRemote::new();
        remote.initialize_session("oddball", "12").unwrap();
        remote.switch_mode(EegMode::Impedance).unwrap();
        remote.start_recording().unwrap();
        remote.stop_recording(true).unwrap();

        assert_eq!(remote.current_mode(), Some(EegMode::Impedance));
        assert!(!remote.is_live());
        assert_eq!(
            remote.commands(),
            &["initialize_session oddball 12", "I", "S", "X"]
        );
    }
}
