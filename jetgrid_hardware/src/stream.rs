//! `Transport` over any byte stream, e.g. a USB-serial device node whose line
//! settings were configured beforehand.
//!
//! A background thread owns the read half and forwards complete lines over a
//! channel, so `read_line` can honor its timeout even when the underlying
//! reader only offers blocking reads. The thread exits at end-of-stream, on a
//! read error, or once the transport is dropped and the next line arrives.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::time::Duration;

use crossbeam_channel as xch;
use jetgrid_traits::Transport;

use crate::error::{self, HwError};

pub struct StreamTransport<W: Write> {
    writer: W,
    lines: xch::Receiver<std::io::Result<String>>,
}

impl<W: Write> StreamTransport<W> {
    pub fn new<R: Read + Send + 'static>(reader: R, writer: W) -> Self {
        let (tx, rx) = xch::unbounded();
        std::thread::spawn(move || {
            let mut reader = BufReader::new(reader);
            loop {
                let mut buf = Vec::new();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {
                        while matches!(buf.last(), Some(b'\n' | b'\r')) {
                            buf.pop();
                        }
                        let line = String::from_utf8_lossy(&buf).into_owned();
                        if tx.send(Ok(line)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        break;
                    }
                }
            }
            tracing::trace!("stream reader exiting");
        });
        Self { writer, lines: rx }
    }
}

/// Open a character device (e.g. `/dev/ttyACM0`) for reading and writing.
pub fn open_device(path: &Path) -> error::Result<StreamTransport<File>> {
    let writer = OpenOptions::new().read(true).write(true).open(path)?;
    let reader = writer.try_clone()?;
    tracing::info!(path = %path.display(), "device opened");
    Ok(StreamTransport::new(reader, writer))
}

impl<W: Write> Transport for StreamTransport<W> {
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.writer.write_all(data).map_err(HwError::from)?;
        self.writer.flush().map_err(HwError::from)?;
        Ok(())
    }

    fn read_line(
        &mut self,
        timeout: Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        match self.lines.recv_timeout(timeout) {
            Ok(Ok(line)) => Ok(line),
            Ok(Err(e)) => Err(Box::new(HwError::Io(e))),
            Err(xch::RecvTimeoutError::Timeout) => Err(Box::new(HwError::Timeout)),
            Err(xch::RecvTimeoutError::Disconnected) => Err(Box::new(HwError::Closed)),
        }
    }
}
