//! Serial link to the controller over a UART or USB-serial device node.

use std::path::Path;
use std::time::Duration;

use jetgrid_traits::Transport;
use rppal::uart::{Parity, Uart};

use crate::error::{self, HwError};
use crate::util::read_line_with_timeout;

const POLL_INTERVAL: Duration = Duration::from_millis(1);

pub struct UartTransport {
    uart: Uart,
}

impl UartTransport {
    /// Open `path` at `baud`, 8N1, in non-blocking read mode.
    pub fn open(path: &Path, baud: u32) -> error::Result<Self> {
        let mut uart = Uart::with_path(path, baud, Parity::None, 8, 1)
            .map_err(|e| HwError::Uart(format!("open {}: {e}", path.display())))?;
        uart.set_read_mode(0, Duration::ZERO)
            .map_err(|e| HwError::Uart(e.to_string()))?;
        tracing::info!(path = %path.display(), baud, "serial port opened");
        Ok(Self { uart })
    }

    fn read_byte(&mut self) -> error::Result<Option<u8>> {
        let mut b = [0u8; 1];
        match self.uart.read(&mut b) {
            Ok(1) => Ok(Some(b[0])),
            Ok(_) => Ok(None),
            Err(e) => Err(HwError::Uart(e.to_string())),
        }
    }
}

impl Transport for UartTransport {
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut off = 0;
        while off < data.len() {
            let n = self
                .uart
                .write(&data[off..])
                .map_err(|e| HwError::Uart(e.to_string()))?;
            if n == 0 {
                std::thread::sleep(POLL_INTERVAL);
            }
            off += n;
        }
        self.uart.drain().map_err(|e| HwError::Uart(e.to_string()))?;
        Ok(())
    }

    fn read_line(
        &mut self,
        timeout: Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let line = read_line_with_timeout(|| self.read_byte(), timeout, POLL_INTERVAL)?;
        tracing::trace!(reply = %line, "serial read");
        Ok(line)
    }
}
