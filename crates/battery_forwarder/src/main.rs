//! # Battery Forwarder
//!
//! Lê a telemetria JSON (uma linha por leitura) do monitor de bateria pela
//! porta serial e envia cada leitura normalizada para a API de monitoramento
//! via HTTP POST, respeitando um intervalo mínimo entre envios.
//!
//! ## Uso
//! ```bash
//! SERIAL_PORT=/dev/ttyUSB0 BAUDRATE=9600 API_KEY=... battery_forwarder
//! ```
//!
//! Variáveis: `API_URL`, `API_KEY`, `SERIAL_PORT`, `BAUDRATE`, `BATTERY_ID`,
//! `RUST_LOG`.

mod forwarder;
mod logging;
mod poster;
mod serial_reader;

use battery_core::config::{ForwarderConfig, Timings};
use forwarder::Forwarder;
use poster::HttpPoster;
use serial_reader::SerialLineReader;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

fn main() {
    // ── Logging ──
    logging::init();

    // ── Config ──
    let config = ForwarderConfig::from_env();
    for problem in config.validate() {
        warn!("Configuração: {problem}");
    }
    let timings = Timings::default();

    // ── Cliente HTTP ──
    let poster = match HttpPoster::new(&config, timings.http_timeout) {
        Ok(poster) => poster,
        Err(e) => {
            error!("Falha ao criar cliente HTTP: {e}");
            std::process::exit(1);
        }
    };

    // ── Porta serial ──
    info!("Abrindo porta serial {} @ {}...", config.serial_port, config.baudrate);
    let reader = match SerialLineReader::open(&config.serial_port, config.baudrate, &timings) {
        Ok(reader) => reader,
        Err(e) => {
            error!("Falha ao abrir porta serial: {e}");
            std::process::exit(1);
        }
    };

    // ── Ctrl+C ──
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst)) {
            warn!("Não foi possível instalar handler de Ctrl+C: {e}");
        }
    }

    info!(
        "Bateria {} → {} | intervalo {:.1}s | timeout HTTP {}s",
        config.battery_id,
        config.api_url,
        timings.post_interval.as_secs_f64(),
        timings.http_timeout.as_secs()
    );

    // ── Loop principal ──
    let mut forwarder = Forwarder::new(reader, poster, config.battery_id.clone(), timings);
    forwarder.run(&stop);
}
