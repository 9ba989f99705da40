//! Definição de tipos para a telemetria de bateria.
//!
//! A linha serial chega como JSON solto (campos opcionais, percentual como
//! número ou string). Aqui ela vira tipos fechados antes de ir para a API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

// ──────────────────────────────────────────────
// Percentual
// ──────────────────────────────────────────────

/// Percentual de bateria como veio do dispositivo: número ou string.
#[derive(Debug, Clone, PartialEq)]
pub enum Percentage {
    Number(Number),
    Text(String),
}

impl Percentage {
    /// Converte um valor JSON. `None` para tipos sem representação aceita
    /// (bool, array, objeto, null).
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    /// Forma textual enviada à API.
    pub fn normalized(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

// ──────────────────────────────────────────────
// Status da rede elétrica
// ──────────────────────────────────────────────

/// Status reportado para a API. Só existem estes dois valores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryStatus {
    Electricity,
    NoElectricity,
}

impl BatteryStatus {
    /// `Electricity` somente para `"electricity"` exato (case-sensitive).
    pub fn from_ac_status(ac_status: &str) -> Self {
        if ac_status == "electricity" {
            Self::Electricity
        } else {
            Self::NoElectricity
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electricity => "electricity",
            Self::NoElectricity => "no_electricity",
        }
    }
}

impl std::fmt::Display for BatteryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ──────────────────────────────────────────────
// Registro recebido
// ──────────────────────────────────────────────

/// Objeto JSON lido da serial, já reduzido aos campos que interessam.
///
/// Campos extras (`battery_voltage`, `ac_peak`…) são ignorados.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryRecord {
    /// `ac_status` convertido para string e sem espaços nas pontas
    /// (vazio se ausente)
    pub ac_status: String,
    /// Valor bruto de `battery_percentage` (`None` se ausente ou null)
    pub battery_percentage: Option<Value>,
}

impl TelemetryRecord {
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        let ac_status = match obj.get("ac_status") {
            None => String::new(),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(other) => other.to_string().trim().to_string(),
        };

        let battery_percentage = match obj.get("battery_percentage") {
            None | Some(Value::Null) => None,
            Some(v) => Some(v.clone()),
        };

        Self {
            ac_status,
            battery_percentage,
        }
    }
}

// ──────────────────────────────────────────────
// Payload enviado
// ──────────────────────────────────────────────

/// Corpo do POST para o endpoint de monitoramento.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub battery_id: String,
    pub battery_percentage: String,
    pub battery_status: BatteryStatus,
}

impl std::fmt::Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "bateria {} | {}% | {}",
            self.battery_id, self.battery_percentage, self.battery_status
        )
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
