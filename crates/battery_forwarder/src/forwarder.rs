//! Loop principal: serial → decodificação → payload → throttle → POST.
//!
//! ```text
//! Idle → ReadLine ─(sem dados)──────────────────────→ Idle (pausa curta)
//!           └→ Decode ─(linha vazia)────────────────→ Idle
//!                └→ Parse ─(inválida)───────────────→ Idle
//!                     └→ ThrottleWait → Post ───────→ Idle
//! ```
//!
//! Tudo roda numa única thread. O Ctrl+C só é verificado entre iterações.

use crate::poster::{PayloadSink, PostOutcome};
use crate::serial_reader::LineSource;
use battery_core::config::Timings;
use battery_core::protocol::{DecodePolicy, ValidationError, normalize_line, parse_payload};
use battery_core::throttle::Throttle;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Resultado de uma iteração.
#[derive(Debug)]
pub enum Step {
    /// Timeout da serial sem nenhum byte
    NoData,
    /// Linha vazia após decodificar/aparar
    Empty,
    /// Linha descartada na validação
    Invalid(ValidationError),
    /// POST concluído com resposta HTTP (qualquer status)
    Posted(PostOutcome),
    /// POST sem resposta (falha de transporte); payload descartado
    PostFailed(String),
}

/// Falhas fora do fluxo esperado de uma iteração.
#[derive(Debug, thiserror::Error)]
pub enum ForwarderError {
    #[error("erro de leitura da serial: {0}")]
    Serial(#[from] io::Error),
}

/// Contadores acumulados desde o início do loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwarderStats {
    pub lines: u64,
    pub invalid: u64,
    pub posted: u64,
    pub failed: u64,
}

impl std::fmt::Display for ForwarderStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} linhas | {} inválidas | {} POSTs | {} falhas",
            self.lines, self.invalid, self.posted, self.failed
        )
    }
}

pub struct Forwarder<S, P> {
    source: S,
    sink: P,
    throttle: Throttle,
    battery_id: String,
    timings: Timings,
    decode_policy: DecodePolicy,
    stats: ForwarderStats,
}

impl<S: LineSource, P: PayloadSink> Forwarder<S, P> {
    pub fn new(source: S, sink: P, battery_id: impl Into<String>, timings: Timings) -> Self {
        Self {
            source,
            sink,
            throttle: Throttle::new(timings.post_interval),
            battery_id: battery_id.into(),
            timings,
            decode_policy: DecodePolicy::default(),
            stats: ForwarderStats::default(),
        }
    }

    pub fn stats(&self) -> ForwarderStats {
        self.stats
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    /// Executa uma iteração completa, sem as pausas de backoff.
    pub fn step(&mut self) -> Result<Step, ForwarderError> {
        let bytes = self.source.read_line()?;
        if bytes.is_empty() {
            return Ok(Step::NoData);
        }
        self.stats.lines += 1;

        let Some(line) = normalize_line(&bytes, self.decode_policy) else {
            return Ok(Step::Empty);
        };

        let payload = match parse_payload(&line, &self.battery_id) {
            Ok(payload) => payload,
            Err(e) => {
                self.stats.invalid += 1;
                info!("Linha inválida ignorada: {e}");
                debug!("Conteúdo: {line}");
                return Ok(Step::Invalid(e));
            }
        };

        self.throttle.wait();
        let result = self.sink.post(&payload);
        // Conta como tentativa mesmo com erro HTTP ou falha de transporte
        self.throttle.mark_attempt(Instant::now());

        match result {
            Ok(outcome) => {
                self.stats.posted += 1;
                if outcome.is_success() {
                    info!("POST {} ({} ms): {payload}", outcome.status, outcome.elapsed.as_millis());
                } else {
                    warn!("POST {} ({} ms): {payload}", outcome.status, outcome.elapsed.as_millis());
                }
                Ok(Step::Posted(outcome))
            }
            Err(e) => {
                self.stats.failed += 1;
                error!("POST falhou: {e}");
                Ok(Step::PostFailed(e.to_string()))
            }
        }
    }

    /// Roda até `stop` virar `true`. Retorna os contadores finais.
    pub fn run(&mut self, stop: &AtomicBool) -> ForwarderStats {
        info!("Iniciando loop leitura → POST. Ctrl+C para parar.");

        while !stop.load(Ordering::SeqCst) {
            match self.step() {
                Ok(Step::NoData) => std::thread::sleep(self.timings.idle_poll),
                Ok(Step::PostFailed(_)) => std::thread::sleep(self.timings.post_failure_backoff),
                Ok(_) => {}
                Err(e) => {
                    error!("Erro inesperado: {e}");
                    std::thread::sleep(self.timings.unexpected_error_backoff);
                }
            }
        }

        info!("Encerrando... {}", self.stats);
        self.stats
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use battery_core::types::{BatteryStatus, Payload};
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    const VALID: &[u8] = b"{\"ac_status\":\"electricity\",\"battery_voltage\":\"52.95\",\"battery_percentage\":\"92.5\"}\n";

    /// Fonte roteirizada. Quando o roteiro acaba, liga `stop` e só devolve timeout.
    struct ScriptedSource {
        script: VecDeque<io::Result<Vec<u8>>>,
        stop: Arc<AtomicBool>,
    }

    impl ScriptedSource {
        fn new(script: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                script: script.into(),
                stop: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl LineSource for ScriptedSource {
        fn read_line(&mut self) -> io::Result<Vec<u8>> {
            match self.script.pop_front() {
                Some(item) => item,
                None => {
                    self.stop.store(true, Ordering::SeqCst);
                    Ok(Vec::new())
                }
            }
        }
    }

    /// Sink que grava cada tentativa e responde conforme o roteiro
    /// (padrão: 200).
    #[derive(Default)]
    struct RecordingSink {
        attempts: Vec<(Instant, Payload)>,
        responses: VecDeque<Result<u16, String>>,
    }

    impl PayloadSink for RecordingSink {
        type Error = String;

        fn post(&mut self, payload: &Payload) -> Result<PostOutcome, String> {
            self.attempts.push((Instant::now(), payload.clone()));
            let status = self.responses.pop_front().unwrap_or(Ok(200))?;
            Ok(PostOutcome {
                status,
                elapsed: Duration::ZERO,
            })
        }
    }

    fn fast_timings(post_interval: Duration) -> Timings {
        Timings {
            read_timeout: Duration::from_millis(10),
            post_interval,
            http_timeout: Duration::from_millis(100),
            settle_delay: Duration::ZERO,
            post_failure_backoff: Duration::from_millis(40),
            unexpected_error_backoff: Duration::from_millis(5),
            idle_poll: Duration::from_millis(1),
        }
    }

    fn forwarder(
        script: Vec<io::Result<Vec<u8>>>,
        sink: RecordingSink,
        post_interval: Duration,
    ) -> (Forwarder<ScriptedSource, RecordingSink>, Arc<AtomicBool>) {
        let source = ScriptedSource::new(script);
        let stop = Arc::clone(&source.stop);
        (Forwarder::new(source, sink, "1", fast_timings(post_interval)), stop)
    }

    #[test]
    fn valid_line_is_posted_normalized() {
        let (mut fwd, _) = forwarder(vec![Ok(VALID.to_vec())], RecordingSink::default(), Duration::ZERO);

        let step = fwd.step().unwrap();
        assert!(matches!(step, Step::Posted(PostOutcome { status: 200, .. })));

        let (_, payload) = &fwd.sink().attempts[0];
        assert_eq!(
            payload,
            &Payload {
                battery_id: "1".into(),
                battery_percentage: "92.5".into(),
                battery_status: BatteryStatus::Electricity,
            }
        );
    }

    #[test]
    fn noise_around_json_is_discarded() {
        let line = b"LOG: device ok {\"ac_status\":\"electricity\",\"battery_percentage\":\"80\"} trailing\r\n";
        let (mut fwd, _) = forwarder(vec![Ok(line.to_vec())], RecordingSink::default(), Duration::ZERO);

        assert!(matches!(fwd.step().unwrap(), Step::Posted(_)));
        assert_eq!(fwd.sink().attempts[0].1.battery_percentage, "80");
    }

    #[test]
    fn timeout_blank_and_invalid_lines_do_not_post() {
        let (mut fwd, _) = forwarder(
            vec![
                Ok(Vec::new()),
                Ok(b"   \r\n".to_vec()),
                Ok(b"{\"ac_status\":\"electricity\"}\n".to_vec()),
                Ok(b"{quebrado\n".to_vec()),
            ],
            RecordingSink::default(),
            Duration::ZERO,
        );

        assert!(matches!(fwd.step().unwrap(), Step::NoData));
        assert!(matches!(fwd.step().unwrap(), Step::Empty));
        assert!(matches!(
            fwd.step().unwrap(),
            Step::Invalid(ValidationError::MissingPercentage)
        ));
        assert!(matches!(fwd.step().unwrap(), Step::Invalid(ValidationError::Json(_))));

        assert!(fwd.sink().attempts.is_empty());
        assert!(fwd.throttle().last_attempt().is_none());
        assert_eq!(
            fwd.stats(),
            ForwarderStats {
                lines: 3,
                invalid: 2,
                posted: 0,
                failed: 0
            }
        );
    }

    #[test]
    fn consecutive_posts_respect_interval() {
        let interval = Duration::from_millis(60);
        let (mut fwd, _) = forwarder(
            vec![Ok(VALID.to_vec()), Ok(VALID.to_vec())],
            RecordingSink::default(),
            interval,
        );

        fwd.step().unwrap();
        fwd.step().unwrap();

        let attempts = &fwd.sink().attempts;
        assert_eq!(attempts.len(), 2);
        let gap = attempts[1].0.duration_since(attempts[0].0);
        assert!(gap >= interval, "intervalo entre POSTs: {gap:?}");
    }

    #[test]
    fn same_payload_twice_is_posted_twice() {
        let (mut fwd, stop) = forwarder(
            vec![Ok(VALID.to_vec()), Ok(VALID.to_vec())],
            RecordingSink::default(),
            Duration::ZERO,
        );

        let stats = fwd.run(&stop);

        assert_eq!(stats.posted, 2);
        let attempts = &fwd.sink().attempts;
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].1, attempts[1].1);
    }

    #[test]
    fn http_error_status_still_counts_as_attempt() {
        let sink = RecordingSink {
            responses: VecDeque::from([Ok(503)]),
            ..Default::default()
        };
        let (mut fwd, _) = forwarder(vec![Ok(VALID.to_vec())], sink, Duration::from_secs(5));

        assert!(matches!(
            fwd.step().unwrap(),
            Step::Posted(PostOutcome { status: 503, .. })
        ));
        assert!(fwd.throttle().last_attempt().is_some());
        assert_eq!(fwd.stats().posted, 1);
    }

    #[test]
    fn transport_failure_backs_off_and_loop_continues() {
        let sink = RecordingSink {
            responses: VecDeque::from([Err("connection refused".to_string()), Ok(201)]),
            ..Default::default()
        };
        let (mut fwd, stop) = forwarder(vec![Ok(VALID.to_vec()), Ok(VALID.to_vec())], sink, Duration::ZERO);

        let stats = fwd.run(&stop);

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.posted, 1);
        let attempts = &fwd.sink().attempts;
        assert_eq!(attempts.len(), 2);
        let gap = attempts[1].0.duration_since(attempts[0].0);
        assert!(gap >= Duration::from_millis(40), "sem backoff: {gap:?}");
    }

    #[test]
    fn serial_error_is_unexpected_and_loop_continues() {
        let (mut fwd, stop) = forwarder(
            vec![
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "desconectado")),
                Ok(VALID.to_vec()),
            ],
            RecordingSink::default(),
            Duration::ZERO,
        );

        let stats = fwd.run(&stop);

        assert_eq!(stats.posted, 1);
        assert_eq!(fwd.sink().attempts.len(), 1);
    }

    #[test]
    fn serial_error_surfaces_from_step() {
        let (mut fwd, _) = forwarder(
            vec![Err(io::Error::new(io::ErrorKind::BrokenPipe, "desconectado"))],
            RecordingSink::default(),
            Duration::ZERO,
        );
        assert!(matches!(fwd.step(), Err(ForwarderError::Serial(_))));
    }

    #[test]
    fn stop_flag_set_before_run_exits_immediately() {
        let (mut fwd, stop) = forwarder(vec![Ok(VALID.to_vec())], RecordingSink::default(), Duration::ZERO);
        stop.store(true, Ordering::SeqCst);

        let stats = fwd.run(&stop);

        assert_eq!(stats, ForwarderStats::default());
        assert!(fwd.sink().attempts.is_empty());
    }
}
