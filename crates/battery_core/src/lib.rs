//! # Battery Core
//!
//! Crate compartilhada com os tipos, o protocolo de linha, a configuração e
//! o throttle do forwarder de telemetria de bateria.
//!
//! ## Módulos
//! - [`types`] – Registro recebido, percentual, status e payload da API
//! - [`protocol`] – Decodificação da linha serial e normalização para payload
//! - [`config`] – Configuração via variáveis de ambiente e tempos fixos
//! - [`throttle`] – Intervalo mínimo entre POSTs

pub mod types;
pub mod protocol;
pub mod config;
pub mod throttle;

// Re-exports convenientes
pub use types::{BatteryStatus, Payload};
pub use protocol::{DecodePolicy, ValidationError, normalize_line, parse_payload};
pub use config::{ForwarderConfig, Timings};
pub use throttle::Throttle;
