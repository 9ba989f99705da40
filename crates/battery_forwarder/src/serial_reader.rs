//! Leitura de linhas do monitor de bateria pela porta serial.

use battery_core::config::Timings;
use serialport::SerialPort;
use std::io::{self, BufRead, BufReader, ErrorKind, Read};
use tracing::debug;

/// Fonte de linhas cruas para o forwarder.
pub trait LineSource {
    /// Lê até `\n` (inclusive) respeitando o timeout da fonte.
    ///
    /// Timeout sem dados devolve um vetor vazio, não um erro. Timeout no meio
    /// da linha devolve o que chegou até ali.
    fn read_line(&mut self) -> io::Result<Vec<u8>>;
}

/// Leitor de linhas sobre qualquer `Read` com timeout.
pub struct LineReader<R> {
    inner: BufReader<R>,
}

/// Leitor ligado a um dispositivo serial real.
pub type SerialLineReader = LineReader<Box<dyn SerialPort>>;

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
        }
    }
}

impl SerialLineReader {
    /// Abre a porta e espera o dispositivo estabilizar.
    pub fn open(port_name: &str, baud_rate: u32, timings: &Timings) -> Result<Self, serialport::Error> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(timings.read_timeout)
            .open()?;

        std::thread::sleep(timings.settle_delay);
        Ok(Self::new(port))
    }
}

impl<R: Read> LineSource for LineReader<R> {
    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let mut line = Vec::new();
        match self.inner.read_until(b'\n', &mut line) {
            Ok(_) => Ok(line),
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                if !line.is_empty() {
                    debug!("Timeout com linha parcial ({} bytes)", line.len());
                }
                Ok(line)
            }
            Err(e) => Err(e),
        }
    }
}
