use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Collect bytes from `next_byte` until a `\n` arrives, or fail once `timeout`
/// expires. `next_byte` returns `Ok(None)` when nothing is buffered yet; the
/// loop then sleeps `poll_interval` instead of spinning.
///
/// The terminator and a preceding `\r` are stripped.
pub fn read_line_with_timeout(
    mut next_byte: impl FnMut() -> Result<Option<u8>>,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<String> {
    let deadline = Instant::now() + timeout;
    let mut line = Vec::new();
    loop {
        match next_byte()? {
            Some(b'\n') => {
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }
            Some(b) => line.push(b),
            None => {
                if Instant::now() >= deadline {
                    return Err(HwError::Timeout);
                }
                std::thread::sleep(poll_interval);
            }
        }
    }
}
