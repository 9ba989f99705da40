//! Envio do [`Payload`] para o endpoint de monitoramento via HTTP POST.

use battery_core::config::ForwarderConfig;
use battery_core::types::Payload;
use reqwest::blocking::Client;
use std::time::{Duration, Instant};

/// Header de autenticação esperado pela API.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Resultado de uma tentativa que chegou a receber resposta HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostOutcome {
    pub status: u16,
    pub elapsed: Duration,
}

impl PostOutcome {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Destino dos payloads normalizados.
pub trait PayloadSink {
    type Error: std::fmt::Display;

    /// Envia um payload. Qualquer resposta HTTP, inclusive 4xx/5xx, é `Ok`;
    /// `Err` fica para falhas de transporte.
    fn post(&mut self, payload: &Payload) -> Result<PostOutcome, Self::Error>;
}

/// Falhas de transporte (sem resposta HTTP).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("timeout: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("falha de conexão (recusada/inacessível/DNS/TLS): {0}")]
    Connect(#[source] reqwest::Error),

    #[error("erro ao montar/enviar requisição: {0}")]
    Request(#[source] reqwest::Error),

    #[error("{0}")]
    Other(#[source] reqwest::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e)
        } else if e.is_connect() {
            Self::Connect(e)
        } else if e.is_request() || e.is_builder() {
            Self::Request(e)
        } else {
            Self::Other(e)
        }
    }
}

/// Cliente HTTP do forwarder.
pub struct HttpPoster {
    client: Client,
    url: String,
    api_key: String,
}

impl HttpPoster {
    /// Monta o cliente com timeout total por requisição.
    pub fn new(config: &ForwarderConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, &config.api_url, &config.api_key))
    }

    pub fn with_client(client: Client, url: &str, api_key: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

impl PayloadSink for HttpPoster {
    type Error = TransportError;

    fn post(&mut self, payload: &Payload) -> Result<PostOutcome, TransportError> {
        let started = Instant::now();
        // `json` também define Content-Type: application/json
        let resp = self
            .client
            .post(&self.url)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(payload)
            .send()?;

        Ok(PostOutcome {
            status: resp.status().as_u16(),
            elapsed: started.elapsed(),
        })
    }
}
