//! Scripted decode engine
//!
//! Each clip's content is its script key (see `helpers::clip`). The
//! engine records every load so tests can synchronise with the probe.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use vavatar_ingest::services::{DecodeEngine, EngineError, ProbeSource};

/// How the engine answers for one clip
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Script {
    /// Duration published on the signal right after load
    Signal(Duration),
    /// No signal; the explicit query answers
    QueryOnly(Duration),
    /// Signal and query both report zero (unreadable clip)
    Zero,
    /// Load fails
    Fail,
    /// Load never completes
    Hang,
}

#[derive(Debug, Default)]
struct Observed {
    loads: Vec<String>,
    file_loads: usize,
    resets: usize,
}

/// Read side of the engine's activity log
#[derive(Debug, Clone, Default)]
pub struct EngineObserver {
    observed: Arc<Mutex<Observed>>,
    loaded: Arc<Notify>,
}

impl EngineObserver {
    pub fn loads(&self) -> Vec<String> {
        self.observed.lock().unwrap().loads.clone()
    }

    pub fn file_loads(&self) -> usize {
        self.observed.lock().unwrap().file_loads
    }

    pub fn resets(&self) -> usize {
        self.observed.lock().unwrap().resets
    }

    /// Wait until the clip with this key has been loaded
    pub async fn wait_for_load(&self, key: &str) {
        loop {
            let notified = self.loaded.notified();
            if self.loads().iter().any(|k| k == key) {
                return;
            }
            notified.await;
        }
    }
}

pub struct ScriptedEngine {
    scripts: HashMap<String, Script>,
    in_memory: bool,
    current: Option<Script>,
    signal: watch::Sender<Option<Duration>>,
    observer: EngineObserver,
}

impl ScriptedEngine {
    pub fn new(in_memory: bool) -> Self {
        let (signal, _) = watch::channel(None);
        Self {
            scripts: HashMap::new(),
            in_memory,
            current: None,
            signal,
            observer: EngineObserver::default(),
        }
    }

    pub fn script(mut self, key: &str, script: Script) -> Self {
        self.scripts.insert(key.to_string(), script);
        self
    }

    pub fn observer(&self) -> EngineObserver {
        self.observer.clone()
    }
}

#[async_trait::async_trait]
impl DecodeEngine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn supports_in_memory(&self) -> bool {
        self.in_memory
    }

    async fn reset(&mut self) -> Result<(), EngineError> {
        self.current = None;
        self.signal.send_replace(None);
        self.observer.observed.lock().unwrap().resets += 1;
        Ok(())
    }

    fn duration_signal(&mut self) -> watch::Receiver<Option<Duration>> {
        self.signal.subscribe()
    }

    async fn load(&mut self, source: ProbeSource) -> Result<(), EngineError> {
        let (key, from_file) = match &source {
            ProbeSource::Memory { bytes, .. } => (String::from_utf8_lossy(bytes).to_string(), false),
            ProbeSource::File(path) => {
                let bytes = std::fs::read(path).map_err(|e| EngineError::Load(e.to_string()))?;
                (String::from_utf8_lossy(&bytes).to_string(), true)
            }
        };

        {
            let mut observed = self.observer.observed.lock().unwrap();
            observed.loads.push(key.clone());
            if from_file {
                observed.file_loads += 1;
            }
        }
        self.observer.loaded.notify_waiters();

        let script = self.scripts.get(&key).copied().unwrap_or(Script::Fail);
        self.current = Some(script);

        match script {
            Script::Signal(duration) => {
                self.signal.send_replace(Some(duration));
            }
            Script::Zero => {
                self.signal.send_replace(Some(Duration::ZERO));
            }
            Script::QueryOnly(_) => {}
            Script::Fail => return Err(EngineError::Load(format!("cannot decode '{}'", key))),
            Script::Hang => std::future::pending::<()>().await,
        }
        Ok(())
    }

    async fn query_duration(&mut self) -> Result<Option<Duration>, EngineError> {
        match self.current {
            Some(Script::Signal(d)) | Some(Script::QueryOnly(d)) => Ok(Some(d)),
            Some(Script::Zero) => Ok(Some(Duration::ZERO)),
            Some(_) => Ok(None),
            None => Err(EngineError::NotLoaded),
        }
    }
}
