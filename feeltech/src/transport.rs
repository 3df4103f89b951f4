/*!
Serial transport.

Owns the port and implements the request/response discipline the generator
expects:

- every command line is terminated with `\n`
- consecutive commands are at least 50 ms apart, since the firmware drops
  commands that arrive while it is still processing the previous one
- after a reply line has been read, whatever else is buffered is discarded
- after a timeout the link is considered out of sync and the input buffer is
  discarded before the next exchange
*/

use crate::config::LinkConfig;
use crate::error::{Error, Result};
use feeltech_protocol::wire::{COMMAND_INTERVAL_MS, LINE_TERMINATOR, MAX_LINE_LEN};
use feeltech_protocol::{Command, ProtocolError};
use serialport::{ClearBuffer, SerialPort};
use std::io::{self, Read, Write};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Byte stream the transport can drive
pub trait Port: Read + Write {
    /// Drop everything received but not yet read
    fn discard_input(&mut self) -> io::Result<()>;
}

impl Port for Box<dyn SerialPort> {
    fn discard_input(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}

/// Line and byte level access to the generator
#[derive(Debug)]
pub struct Transport<P: Port> {
    port: Option<P>,
    read_timeout: Duration,
    command_interval: Duration,
    last_command: Option<Instant>,
    out_of_sync: bool,
}

impl<P: Port> Transport<P> {
    /// Wrap an open port
    pub fn new(port: P, read_timeout: Duration) -> Self {
        Self {
            port: Some(port),
            read_timeout,
            command_interval: Duration::from_millis(COMMAND_INTERVAL_MS),
            last_command: None,
            // Nothing is known about what the port buffered before we got it
            out_of_sync: true,
        }
    }

    /// Wrap an open port using the timing from a link configuration
    pub fn with_config(port: P, config: &LinkConfig) -> Self {
        Self::new(port, config.read_timeout()).with_command_interval(config.command_interval())
    }

    /// Lengthen the gap between commands. The device minimum still applies.
    pub fn with_command_interval(mut self, interval: Duration) -> Self {
        self.command_interval = interval.max(Duration::from_millis(COMMAND_INTERVAL_MS));
        self
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn command_interval(&self) -> Duration {
        self.command_interval
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// Borrow the underlying port, if still open
    pub fn get_ref(&self) -> Option<&P> {
        self.port.as_ref()
    }

    /// Close the link. Every later operation fails with `InvalidState`.
    ///
    /// Returns false if the link was already closed.
    pub fn close(&mut self) -> bool {
        self.port.take().is_some()
    }

    fn port_mut(&mut self) -> Result<&mut P> {
        self.port
            .as_mut()
            .ok_or_else(|| Error::invalid_state("serial link is closed"))
    }

    /// Block until the device is ready to take another command
    pub(crate) fn wait_for_device(&self) {
        if let Some(last) = self.last_command {
            let elapsed = last.elapsed();
            if elapsed < self.command_interval {
                thread::sleep(self.command_interval - elapsed);
            }
        }
    }

    /// Count a raw exchange as a command, so the next line is paced after it
    pub(crate) fn mark_command_sent(&mut self) {
        self.last_command = Some(Instant::now());
    }

    /// Send one command line; the terminator is appended here
    pub fn send(&mut self, line: &[u8]) -> Result<()> {
        self.wait_for_device();

        let mut frame = Vec::with_capacity(line.len() + 1);
        frame.extend_from_slice(line);
        frame.push(LINE_TERMINATOR);

        let port = self.port_mut()?;
        port.write_all(&frame)?;
        port.flush()?;
        self.mark_command_sent();

        debug!("Sent command {:?}", String::from_utf8_lossy(line));
        Ok(())
    }

    /// Send an encoded command
    pub fn send_command(&mut self, command: &Command) -> Result<()> {
        self.send(command.to_string().as_bytes())
    }

    /// Read one line, without its terminator (and a trailing `\r`, if any)
    ///
    /// The read timeout bounds the whole line, not each byte.
    pub fn receive_line(&mut self) -> Result<Vec<u8>> {
        let deadline = Instant::now() + self.read_timeout;
        let port = self.port_mut()?;

        let mut line = Vec::with_capacity(32);
        let mut byte = [0u8; 1];
        let complete = loop {
            match port.read(&mut byte) {
                Ok(1) if byte[0] == LINE_TERMINATOR => break true,
                Ok(1) => {
                    line.push(byte[0]);
                    if line.len() > MAX_LINE_LEN {
                        break false;
                    }
                }
                // Nothing more will arrive on this stream
                Ok(_) => break false,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if is_timeout(&e) => {}
                Err(e) => return Err(e.into()),
            }
            if Instant::now() >= deadline {
                break false;
            }
        };

        if line.len() > MAX_LINE_LEN {
            self.out_of_sync = true;
            warn!("Reply exceeds {} bytes, link is out of sync", MAX_LINE_LEN);
            return Err(ProtocolError::LineTooLong(MAX_LINE_LEN).into());
        }
        if !complete {
            return Err(self.timed_out(line.len()));
        }

        if line.last() == Some(&b'\r') {
            line.pop();
        }
        debug!("Received line {:?}", String::from_utf8_lossy(&line));
        Ok(line)
    }

    /// Send a query and read its one-line reply
    ///
    /// Stale input is discarded first if the link is out of sync, and again
    /// once the reply has been read.
    pub fn exchange(&mut self, command: &Command) -> Result<Vec<u8>> {
        if !command.expects_reply() {
            return Err(Error::unsupported(format!("`{}` gets no reply", command)));
        }
        if self.out_of_sync {
            self.discard_input()?;
        }
        self.send_command(command)?;
        let reply = self.receive_line()?;
        self.discard_input()?;
        Ok(reply)
    }

    /// Read exactly `len` raw bytes
    pub fn read_exact(&mut self, len: usize) -> Result<Vec<u8>> {
        let deadline = Instant::now() + self.read_timeout;
        let port = self.port_mut()?;

        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            match port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => {
                    filled += n;
                    continue;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if is_timeout(&e) => {}
                Err(e) => return Err(e.into()),
            }
            if Instant::now() >= deadline {
                break;
            }
        }

        if filled < len {
            return Err(self.timed_out(filled));
        }
        trace!("Read {} raw bytes: {:02X?}", len, buf);
        Ok(buf)
    }

    /// Write raw bytes, bypassing line framing and command pacing
    pub fn write_exact(&mut self, bytes: &[u8]) -> Result<()> {
        let port = self.port_mut()?;
        port.write_all(bytes)?;
        port.flush()?;
        trace!("Wrote {} raw bytes: {:02X?}", bytes.len(), bytes);
        Ok(())
    }

    /// Drop buffered input and consider the link in sync again
    pub fn discard_input(&mut self) -> Result<()> {
        self.port_mut()?.discard_input()?;
        self.out_of_sync = false;
        Ok(())
    }

    fn timed_out(&mut self, partial: usize) -> Error {
        self.out_of_sync = true;
        warn!(
            "No complete response within {:?} ({} bytes received)",
            self.read_timeout, partial
        );
        Error::Timeout(self.read_timeout)
    }
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}
