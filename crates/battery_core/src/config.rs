//! Configuração do forwarder via variáveis de ambiente.
//!
//! Não existe arquivo de configuração: cada campo tem um valor padrão e pode
//! ser sobrescrito por uma variável (`API_URL`, `API_KEY`, `SERIAL_PORT`,
//! `BAUDRATE`, `BATTERY_ID`). Os tempos do loop são fixos ([`Timings`]).

use std::time::Duration;
use tracing::{info, warn};

pub const ENV_API_URL: &str = "API_URL";
pub const ENV_API_KEY: &str = "API_KEY";
pub const ENV_SERIAL_PORT: &str = "SERIAL_PORT";
pub const ENV_BAUDRATE: &str = "BAUDRATE";
pub const ENV_BATTERY_ID: &str = "BATTERY_ID";

/// Timeout de leitura da serial.
pub const READ_TIMEOUT: Duration = Duration::from_secs(2);
/// Intervalo mínimo entre tentativas de POST.
pub const POST_INTERVAL: Duration = Duration::from_secs(5);
/// Timeout total de uma requisição HTTP.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
/// Pausa após abrir a serial.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);
/// Pausa após falha de transporte no POST.
pub const POST_FAILURE_BACKOFF: Duration = Duration::from_secs(2);
/// Pausa após erro inesperado numa iteração.
pub const UNEXPECTED_ERROR_BACKOFF: Duration = Duration::from_secs(1);
/// Pausa quando a serial não entregou nada dentro do timeout.
pub const IDLE_POLL: Duration = Duration::from_millis(200);

/// Configuração do forwarder (serial → HTTP).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwarderConfig {
    /// Endpoint que recebe o POST
    pub api_url: String,
    /// Valor do header `x-api-key`
    pub api_key: String,
    /// Caminho do dispositivo serial
    pub serial_port: String,
    pub baudrate: u32,
    /// Identificador fixo desta bateria/instalação
    pub battery_id: String,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            api_url: "https://stage.gwtpl.co/api/monitoring/add_battery_data".into(),
            api_key: String::new(),
            serial_port: "/dev/ttyUSB0".into(),
            baudrate: 9600,
            battery_id: "1".into(),
        }
    }
}

impl ForwarderConfig {
    /// Carrega a configuração do ambiente do processo.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Carrega a configuração a partir de uma função de busca.
    ///
    /// Valores vazios contam como ausentes. `BAUDRATE` que não seja inteiro
    /// gera um aviso e mantém o padrão.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = get(ENV_API_URL) {
            config.api_url = url;
        }
        if let Some(key) = get(ENV_API_KEY) {
            config.api_key = key;
        }
        if let Some(port) = get(ENV_SERIAL_PORT) {
            config.serial_port = port;
        }
        if let Some(raw) = get(ENV_BAUDRATE) {
            match raw.parse::<u32>() {
                Ok(baud) => config.baudrate = baud,
                Err(e) => warn!(
                    "{ENV_BAUDRATE} inválido ({raw:?}): {e}. Usando {}",
                    config.baudrate
                ),
            }
        }
        if let Some(id) = get(ENV_BATTERY_ID) {
            config.battery_id = id;
        }

        info!(
            "Configuração: {} @ {} baud → {} (bateria {})",
            config.serial_port, config.baudrate, config.api_url, config.battery_id
        );
        config
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            errors.push(format!("{ENV_API_URL} precisa ser http(s): {:?}", self.api_url));
        }
        if self.api_key.is_empty() {
            errors.push(format!("{ENV_API_KEY} vazio, a API deve recusar as requisições"));
        }
        if self.baudrate == 0 {
            errors.push(format!("{ENV_BAUDRATE} não pode ser 0"));
        }
        if self.battery_id.is_empty() {
            errors.push(format!("{ENV_BATTERY_ID} não pode ser vazio"));
        }

        errors
    }
}

/// Tempos fixos do loop. Não são expostos como variáveis de ambiente;
/// existem como struct para que os testes usem valores curtos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub read_timeout: Duration,
    pub post_interval: Duration,
    pub http_timeout: Duration,
    pub settle_delay: Duration,
    pub post_failure_backoff: Duration,
    pub unexpected_error_backoff: Duration,
    pub idle_poll: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            read_timeout: READ_TIMEOUT,
            post_interval: POST_INTERVAL,
            http_timeout: HTTP_TIMEOUT,
            settle_delay: SETTLE_DELAY,
            post_failure_backoff: POST_FAILURE_BACKOFF,
            unexpected_error_backoff: UNEXPECTED_ERROR_BACKOFF,
            idle_poll: IDLE_POLL,
        }
    }
}
