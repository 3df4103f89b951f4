//! In-memory port that plays back canned device replies

use crate::transport::{Port, Transport};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::Duration;

/// Every `write` call releases the next scripted reply into the input
/// buffer, the way the device answers once it has seen a request.
#[derive(Debug, Default)]
pub(crate) struct ScriptedPort {
    pub writes: Vec<Vec<u8>>,
    pub discards: usize,
    input: VecDeque<u8>,
    replies: VecDeque<Vec<u8>>,
    write_limit: Option<usize>,
}

impl ScriptedPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I, B>(replies: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        Self {
            replies: replies.into_iter().map(|r| r.as_ref().to_vec()).collect(),
            ..Self::default()
        }
    }

    /// Bytes already sitting in the receive buffer before anything is sent
    pub fn with_stale_input(mut self, bytes: &[u8]) -> Self {
        self.input.extend(bytes);
        self
    }

    /// Fail every write after the first `writes` succeeded
    pub fn with_write_limit(mut self, writes: usize) -> Self {
        self.write_limit = Some(writes);
        self
    }

    /// Everything written, concatenated
    pub fn written(&self) -> Vec<u8> {
        self.writes.concat()
    }

    /// Each write as text, without the line terminator
    pub fn lines(&self) -> Vec<String> {
        self.writes
            .iter()
            .map(|w| String::from_utf8_lossy(w).trim_end_matches('\n').to_string())
            .collect()
    }

    pub fn into_transport(self) -> Transport<ScriptedPort> {
        Transport::new(self, Duration::from_millis(20))
    }
}

impl Read for ScriptedPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.input.len());
        for (slot, byte) in buf.iter_mut().zip(self.input.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for ScriptedPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.write_limit.is_some_and(|limit| self.writes.len() >= limit) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "port unplugged"));
        }
        self.writes.push(buf.to_vec());
        if let Some(reply) = self.replies.pop_front() {
            self.input.extend(reply);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Port for ScriptedPort {
    fn discard_input(&mut self) -> io::Result<()> {
        self.input.clear();
        self.discards += 1;
        Ok(())
    }
}

/// Route driver logs to the test harness output
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}
