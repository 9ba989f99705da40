//! Limitador de taxa dos POSTs.
//!
//! Garante um intervalo mínimo entre tentativas consecutivas (com ou sem
//! sucesso). Não enfileira nada: quem chega enquanto o gate está fechado
//! simplesmente espera, e o loop só lê a próxima linha depois do envio.

use std::time::{Duration, Instant};
use tracing::debug;

/// Estado do throttle, pertencente ao loop.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_attempt: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_attempt: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_attempt(&self) -> Option<Instant> {
        self.last_attempt
    }

    /// Quanto falta para liberar o próximo POST em `now`.
    pub fn delay_needed(&self, now: Instant) -> Duration {
        match self.last_attempt {
            Some(last) => self.interval.saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Bloqueia a thread até o gate abrir. Retorna o tempo dormido.
    pub fn wait(&self) -> Duration {
        let delay = self.delay_needed(Instant::now());
        if !delay.is_zero() {
            debug!("Throttle: aguardando {:.2}s", delay.as_secs_f64());
            std::thread::sleep(delay);
        }
        delay
    }

    /// Registra uma tentativa concluída em `at`.
    pub fn mark_attempt(&mut self, at: Instant) {
        self.last_attempt = Some(at);
    }
}
