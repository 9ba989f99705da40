//! Protocolo de linha do monitor de bateria.
//!
//! Cada leitura é uma linha de texto terminada em `\n` contendo um objeto
//! JSON, às vezes precedido por log do próprio firmware:
//!
//! ```text
//! LOG: device ok {"ac_status":"electricity","battery_voltage":"52.95","battery_percentage":"92.5"}
//! ```
//!
//! Etapas: bytes → texto ([`decode_line`]) → recorte do objeto
//! ([`extract_json_span`]) → [`Payload`] ([`parse_payload`]).

use crate::types::{BatteryStatus, Payload, Percentage, TelemetryRecord};
use serde_json::Value;

/// Erros de validação de uma linha. Todos levam ao descarte da linha.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("missing battery_percentage")]
    MissingPercentage,

    #[error("battery_percentage com tipo inválido: {0}")]
    InvalidPercentage(String),

    #[error("JSON inválido: {0}")]
    Json(#[from] serde_json::Error),

    #[error("esperado objeto JSON, recebido {0}")]
    NotAnObject(&'static str),
}

/// O que fazer com sequências UTF-8 inválidas vindas da serial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Remove os bytes inválidos.
    #[default]
    Drop,
    /// Substitui cada sequência inválida por U+FFFD.
    Replace,
}

/// Decodifica bytes da serial sem nunca falhar.
pub fn decode_line(bytes: &[u8], policy: DecodePolicy) -> String {
    match policy {
        DecodePolicy::Replace => String::from_utf8_lossy(bytes).into_owned(),
        DecodePolicy::Drop => {
            let mut out = String::with_capacity(bytes.len());
            for chunk in bytes.utf8_chunks() {
                out.push_str(chunk.valid());
            }
            out
        }
    }
}

/// Recorta do primeiro `{` ao último `}` (inclusive), descartando ruído
/// antes e depois. Sem os dois delimitadores a linha volta como está.
pub fn extract_json_span(line: &str) -> &str {
    match (line.find('{'), line.rfind('}')) {
        (Some(start), Some(end)) if end >= start => &line[start..=end],
        _ => line,
    }
}

/// Decodifica, apara e recorta uma linha crua.
///
/// Retorna `None` para linhas vazias, que são ignoradas em silêncio.
pub fn normalize_line(bytes: &[u8], policy: DecodePolicy) -> Option<String> {
    let text = decode_line(bytes, policy);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(extract_json_span(trimmed).to_string())
}

/// Converte o texto JSON de uma linha em [`Payload`].
pub fn parse_payload(line: &str, battery_id: &str) -> Result<Payload, ValidationError> {
    let value: Value = serde_json::from_str(line)?;
    let obj = match &value {
        Value::Object(obj) => obj,
        Value::Array(_) => return Err(ValidationError::NotAnObject("array")),
        Value::String(_) => return Err(ValidationError::NotAnObject("string")),
        Value::Number(_) => return Err(ValidationError::NotAnObject("número")),
        Value::Bool(_) => return Err(ValidationError::NotAnObject("bool")),
        Value::Null => return Err(ValidationError::NotAnObject("null")),
    };

    build_payload(&TelemetryRecord::from_object(obj), battery_id)
}

/// Normaliza um [`TelemetryRecord`] já extraído.
pub fn build_payload(record: &TelemetryRecord, battery_id: &str) -> Result<Payload, ValidationError> {
    let raw = record
        .battery_percentage
        .as_ref()
        .ok_or(ValidationError::MissingPercentage)?;
    let percentage = Percentage::from_value(raw)
        .ok_or_else(|| ValidationError::InvalidPercentage(raw.to_string()))?;

    Ok(Payload {
        battery_id: battery_id.to_string(),
        battery_percentage: percentage.normalized(),
        battery_status: BatteryStatus::from_ac_status(&record.ac_status),
    })
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
