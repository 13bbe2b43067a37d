//! Device-link abstraction shared by the generator core and the hardware crate.

use std::time::Duration;

/// Line-oriented link to the jetting-grid microcontroller.
///
/// Writes are raw bytes (ASCII commands or binary frames). Replies from the
/// device are newline-terminated ASCII lines. Implementations must not retry
/// on their own; a failed operation is reported to the caller as an error.
pub trait Transport {
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Block until one full line arrives (terminator stripped) or `timeout` expires.
    fn read_line(
        &mut self,
        timeout: Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;

    /// Send an ASCII command terminated by `\n` and wait for the single-line reply.
    fn query(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let mut line = Vec::with_capacity(command.len() + 1);
        line.extend_from_slice(command.as_bytes());
        line.push(b'\n');
        self.write_bytes(&line)?;
        self.read_line(timeout)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).write_bytes(data)
    }

    fn read_line(
        &mut self,
        timeout: Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_line(timeout)
    }
}
