//! Logging em stdout com timestamp local `[YYYY-MM-DD HH:MM:SS]`, sem
//! coluna de nível nem de target.

use chrono::{Local, NaiveDateTime};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timer do `tracing_subscriber` que usa o relógio local.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTimestamp;

impl FormatTime for LocalTimestamp {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        w.write_str(&render_timestamp(Local::now().naive_local()))
    }
}

fn render_timestamp(at: NaiveDateTime) -> String {
    format!("[{}]", at.format(TIMESTAMP_FORMAT))
}

/// Instala o subscriber global. `RUST_LOG` continua valendo como filtro.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_timer(LocalTimestamp)
        .with_level(false)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stdout)
        .init();
}
