//! Duration probing against the shared decode engine
//!
//! The engine's duration signal races a bounded timer. If the signal
//! wins with a positive duration, that value is used and the timer is
//! dropped. If the timer wins (or the signal yields nothing usable), the
//! subscription is dropped and the engine is queried explicitly.
//! Engine errors never escape: they become an unsuccessful result.
//!
//! The timer starts once `load` has returned, so it bounds only the wait
//! for the signal. Time spent inside `load` (a slow container probe, for
//! instance) is not counted against it. Engines that read the header
//! during `load` usually have the signal set before the race begins.

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::acquirer::StagedAsset;
use super::decode_engine::{EngineError, EngineHandle};

/// Which path produced the duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationSource {
    /// The engine's duration-available signal
    Signal,
    /// Explicit query after the signal wait
    Fallback,
    /// Neither path produced a positive duration
    Unavailable,
}

/// Outcome of one probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub duration: Duration,
    pub succeeded: bool,
    pub source: DurationSource,
}

impl ProbeResult {
    pub fn resolved(duration: Duration, source: DurationSource) -> Self {
        Self {
            duration,
            succeeded: true,
            source,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            duration: Duration::ZERO,
            succeeded: false,
            source: DurationSource::Unavailable,
        }
    }
}

/// Probes clip durations one at a time through the shared engine
#[derive(Debug, Clone)]
pub struct DurationProbe {
    engine: EngineHandle,
    signal_timeout: Duration,
}

impl DurationProbe {
    pub fn new(engine: EngineHandle, signal_timeout: Duration) -> Self {
        Self {
            engine,
            signal_timeout,
        }
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn signal_timeout(&self) -> Duration {
        self.signal_timeout
    }

    /// Determine the clip's duration
    ///
    /// Holds the engine exclusively for the whole call. Never fails; an
    /// engine error yields `succeeded == false`.
    pub async fn probe(&self, asset: &StagedAsset) -> ProbeResult {
        match self.try_probe(asset).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    name = %asset.descriptor.name,
                    engine = self.engine.name(),
                    error = %e,
                    "Duration probe failed"
                );
                ProbeResult::unavailable()
            }
        }
    }

    async fn try_probe(&self, asset: &StagedAsset) -> Result<ProbeResult, EngineError> {
        let mut engine = self.engine.lock().await;

        engine.reset().await?;
        let mut signal = engine.duration_signal();
        engine.load(asset.probe_source()).await?;

        let signalled = tokio::select! {
            changed = signal.wait_for(|d| d.is_some()) => changed.ok().and_then(|d| *d),
            _ = tokio::time::sleep(self.signal_timeout) => {
                debug!(
                    name = %asset.descriptor.name,
                    timeout_ms = self.signal_timeout.as_millis() as u64,
                    "Duration signal timed out, querying engine"
                );
                None
            }
        };

        let result = match signalled.filter(|d| !d.is_zero()) {
            Some(duration) => ProbeResult::resolved(duration, DurationSource::Signal),
            None => {
                drop(signal);
                match engine.query_duration().await? {
                    Some(duration) if !duration.is_zero() => {
                        ProbeResult::resolved(duration, DurationSource::Fallback)
                    }
                    _ => ProbeResult::unavailable(),
                }
            }
        };

        // Leave the engine idle so it does not pin the staged file
        if let Err(e) = engine.reset().await {
            warn!(engine = self.engine.name(), error = %e, "Engine reset after probe failed");
        }

        debug!(
            name = %asset.descriptor.name,
            duration_ms = result.duration.as_millis() as u64,
            source = ?result.source,
            "Probe complete"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SelectionDescriptor;
    use crate::services::decode_engine::{DecodeEngine, ProbeSource};
    use tokio::sync::watch;

    /// Engine whose signal and query answers are fixed up front
    struct FixedEngine {
        signal_value: Option<Duration>,
        query_value: Option<Duration>,
        fail_load: bool,
        load_delay: Duration,
        signal: watch::Sender<Option<Duration>>,
    }

    impl FixedEngine {
        fn new(signal_value: Option<Duration>, query_value: Option<Duration>) -> Self {
            let (signal, _) = watch::channel(None);
            Self {
                signal_value,
                query_value,
                fail_load: false,
                load_delay: Duration::ZERO,
                signal,
            }
        }
    }

    #[async_trait::async_trait]
    impl DecodeEngine for FixedEngine {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn supports_in_memory(&self) -> bool {
            true
        }

        async fn reset(&mut self) -> Result<(), EngineError> {
            self.signal.send_replace(None);
            Ok(())
        }

        fn duration_signal(&mut self) -> watch::Receiver<Option<Duration>> {
            self.signal.subscribe()
        }

        async fn load(&mut self, _source: ProbeSource) -> Result<(), EngineError> {
            tokio::time::sleep(self.load_delay).await;
            if self.fail_load {
                return Err(EngineError::Load("corrupt header".to_string()));
            }
            if let Some(d) = self.signal_value {
                self.signal.send_replace(Some(d));
            }
            Ok(())
        }

        async fn query_duration(&mut self) -> Result<Option<Duration>, EngineError> {
            Ok(self.query_value)
        }
    }

    fn asset() -> StagedAsset {
        let descriptor = SelectionDescriptor::from_bytes("clip.wav", vec![0u8; 4]);
        StagedAsset {
            content: descriptor.raw_bytes.clone().unwrap(),
            descriptor,
            transient: None,
        }
    }

    fn probe(engine: FixedEngine) -> DurationProbe {
        DurationProbe::new(EngineHandle::new(engine), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_signal_wins() {
        let probe = probe(FixedEngine::new(Some(Duration::from_secs(90)), None));
        let result = probe.probe(&asset()).await;
        assert!(result.succeeded);
        assert_eq!(result.duration, Duration::from_secs(90));
        assert_eq!(result.source, DurationSource::Signal);
    }

    #[tokio::test]
    async fn test_fallback_after_timeout() {
        let probe = probe(FixedEngine::new(None, Some(Duration::from_secs(45))));
        let started = std::time::Instant::now();
        let result = probe.probe(&asset()).await;

        assert!(result.succeeded);
        assert_eq!(result.duration, Duration::from_secs(45));
        assert_eq!(result.source, DurationSource::Fallback);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_zero_signal_falls_back_to_query() {
        let probe = probe(FixedEngine::new(
            Some(Duration::ZERO),
            Some(Duration::from_secs(12)),
        ));
        let result = probe.probe(&asset()).await;
        assert_eq!(result.source, DurationSource::Fallback);
        assert_eq!(result.duration, Duration::from_secs(12));
    }

    #[tokio::test]
    async fn test_both_paths_zero_is_unavailable() {
        let probe = probe(FixedEngine::new(Some(Duration::ZERO), Some(Duration::ZERO)));
        let result = probe.probe(&asset()).await;
        assert_eq!(result, ProbeResult::unavailable());
    }

    #[tokio::test]
    async fn test_engine_error_is_contained() {
        let mut engine = FixedEngine::new(Some(Duration::from_secs(3)), None);
        engine.fail_load = true;
        let result = probe(engine).probe(&asset()).await;
        assert!(!result.succeeded);
    }

    #[tokio::test]
    async fn test_slow_load_does_not_eat_signal_wait() {
        let mut engine = FixedEngine::new(Some(Duration::from_secs(7)), None);
        engine.load_delay = Duration::from_millis(120);
        let result = probe(engine).probe(&asset()).await;

        assert!(result.succeeded);
        assert_eq!(result.source, DurationSource::Signal);
        assert_eq!(result.duration, Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_timer_starts_after_load() {
        let mut engine = FixedEngine::new(None, Some(Duration::from_secs(4)));
        engine.load_delay = Duration::from_millis(80);
        let started = std::time::Instant::now();
        let result = probe(engine).probe(&asset()).await;

        assert_eq!(result.source, DurationSource::Fallback);
        assert!(started.elapsed() >= Duration::from_millis(130));
    }
}
