//! Test doubles and common utilities for contract tests
//!
//! Every double counts its calls so tests can assert on side effects
//! (prompts shown, documents loaded, lines written) and not just results.

#![allow(dead_code)]

use async_trait::async_trait;
use seismo_core::error::{Error, FetchError};
use seismo_core::traits::{Clipboard, Confirmer, DocumentLoader, Notifier, TraceEntry, TraceLog};
use seismo_core::{
    ChangeRecorder, EngineConfig, Fetcher, MemoryTraceLog, MonitorEngine, MonitorEvent,
    SourceRegistry, SourceSpec,
};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Semaphore, mpsc};

/// DocumentLoader with per-URL scripted responses
///
/// Each URL has a queue of responses. The last response in a queue repeats
/// forever. When gated, every load waits for one permit from the gate first.
pub struct MockLoader {
    responses: Mutex<HashMap<String, VecDeque<Result<Value, FetchError>>>>,
    load_count: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    gate: Option<Arc<Semaphore>>,
}

impl MockLoader {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            load_count: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            gate: None,
        }
    }

    /// Loader whose loads block until the returned semaphore hands out permits
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let mut loader = Self::new();
        loader.gate = Some(gate.clone());
        (loader, gate)
    }

    /// Queue responses for `url`
    pub fn script(self, url: &str, responses: Vec<Result<Value, FetchError>>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), responses.into());
        self
    }

    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_response(&self, url: &str) -> Result<Value, FetchError> {
        let mut responses = self.responses.lock().unwrap();
        let Some(queue) = responses.get_mut(url) else {
            return Err(FetchError::network("Please check your internet"));
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(FetchError::network("Please check your internet")))
        }
    }
}

#[async_trait]
impl DocumentLoader for MockLoader {
    async fn load(&self, url: &str) -> Result<Value, FetchError> {
        self.load_count.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        // Take the response before waiting so call order decides the value
        let response = self.next_response(url);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response
    }

    fn loader_name(&self) -> &'static str {
        "mock"
    }
}

/// Confirmer answering from a script
///
/// `Some(answer)` answers, `None` behaves like an unreachable dialog. When
/// the script runs out, `default` is used.
pub struct ScriptedConfirmer {
    script: Mutex<VecDeque<Option<bool>>>,
    default: Option<bool>,
    questions: Mutex<Vec<String>>,
    ask_count: Arc<AtomicUsize>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedConfirmer {
    pub fn always(answer: bool) -> Self {
        Self::scripted(Vec::new(), Some(answer))
    }

    pub fn unreachable() -> Self {
        Self::scripted(Vec::new(), None)
    }

    pub fn scripted(script: Vec<Option<bool>>, default: Option<bool>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            default,
            questions: Mutex::new(Vec::new()),
            ask_count: Arc::new(AtomicUsize::new(0)),
            gate: None,
        }
    }

    /// Confirmer that waits for a permit before answering `answer`
    pub fn gated(answer: bool) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let mut confirmer = Self::always(answer);
        confirmer.gate = Some(gate.clone());
        (confirmer, gate)
    }

    pub fn ask_count(&self) -> usize {
        self.ask_count.load(Ordering::SeqCst)
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Confirmer for ScriptedConfirmer {
    async fn confirm(&self, question: &str) -> Result<bool, Error> {
        self.ask_count.fetch_add(1, Ordering::SeqCst);
        self.questions.lock().unwrap().push(question.to_string());

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        let answer = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.default);
        answer.ok_or_else(|| Error::operator("no dialog available"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Alert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub title: String,
    pub body: String,
}

/// Notifier that keeps everything it was told
#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    pub fn alerts(&self) -> Vec<Notification> {
        self.all()
            .into_iter()
            .filter(|n| n.level == Level::Alert)
            .collect()
    }

    pub fn infos(&self) -> Vec<Notification> {
        self.all()
            .into_iter()
            .filter(|n| n.level == Level::Info)
            .collect()
    }

    fn push(&self, level: Level, title: &str, body: &str) {
        self.seen.lock().unwrap().push(Notification {
            level,
            title: title.to_string(),
            body: body.to_string(),
        });
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str) {
        self.push(Level::Info, title, body);
    }

    fn alert(&self, title: &str, body: &str) {
        self.push(Level::Alert, title, body);
    }
}

/// Clipboard keeping every write
#[derive(Default)]
pub struct MemoryClipboard {
    writes: Mutex<Vec<String>>,
    broken: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clipboard whose writes always fail
    pub fn broken() -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            broken: true,
        }
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clipboard for MemoryClipboard {
    async fn write_text(&self, text: &str) -> Result<(), Error> {
        if self.broken {
            return Err(Error::operator("no clipboard utility found"));
        }
        self.writes.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// TraceLog whose appends always fail
#[derive(Default)]
pub struct FailingTraceLog {
    append_count: AtomicUsize,
}

impl FailingTraceLog {
    pub fn append_count(&self) -> usize {
        self.append_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TraceLog for FailingTraceLog {
    async fn append(&self, _entry: &TraceEntry) -> Result<(), Error> {
        self.append_count.fetch_add(1, Ordering::SeqCst);
        Err(Error::trace_log("disk full"))
    }

    async fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}

/// Everything a contract test needs to poke at an engine
pub struct Harness {
    pub engine: Arc<MonitorEngine>,
    pub events: mpsc::Receiver<MonitorEvent>,
    pub loader: Arc<MockLoader>,
    pub confirmer: Arc<ScriptedConfirmer>,
    pub notifier: Arc<RecordingNotifier>,
    pub trace: MemoryTraceLog,
}

impl Harness {
    /// Engine over `specs` with an in-memory trace log
    pub fn new(specs: Vec<SourceSpec>, loader: MockLoader, confirmer: ScriptedConfirmer) -> Self {
        let loader = Arc::new(loader);
        let confirmer = Arc::new(confirmer);
        let notifier = Arc::new(RecordingNotifier::new());
        let trace = MemoryTraceLog::new();

        let recorder = ChangeRecorder::new(
            confirmer.clone(),
            notifier.clone(),
            Some(Arc::new(trace.clone())),
        );
        let (engine, events) = MonitorEngine::new(
            SourceRegistry::from_specs(specs),
            Fetcher::new(loader.clone()),
            recorder,
            &EngineConfig::default(),
        )
        .expect("engine construction succeeds");

        Self {
            engine: Arc::new(engine),
            events,
            loader,
            confirmer,
            notifier,
            trace,
        }
    }

    /// Current stored value of `name`
    pub async fn retrieved(&self, name: &str) -> String {
        self.engine
            .registry()
            .retrieved(name)
            .await
            .expect("source exists")
    }

    /// Drain all events emitted so far
    pub fn drain_events(&mut self) -> Vec<MonitorEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Engine whose recorder writes to a failing trace log
pub fn engine_with_failing_trace(
    specs: Vec<SourceSpec>,
    loader: MockLoader,
) -> (
    Arc<MonitorEngine>,
    Arc<RecordingNotifier>,
    Arc<FailingTraceLog>,
) {
    let notifier = Arc::new(RecordingNotifier::new());
    let trace = Arc::new(FailingTraceLog::default());
    let recorder = ChangeRecorder::new(
        Arc::new(ScriptedConfirmer::always(true)),
        notifier.clone(),
        Some(trace.clone()),
    );
    let (engine, _events) = MonitorEngine::new(
        SourceRegistry::from_specs(specs),
        Fetcher::new(Arc::new(loader)),
        recorder,
        &EngineConfig::default(),
    )
    .expect("engine construction succeeds");

    (Arc::new(engine), notifier, trace)
}

/// JSON document `{"v": value}`
pub fn doc(value: &str) -> Result<Value, FetchError> {
    Ok(serde_json::json!({ "v": value }))
}

pub const URL: &str = "https://example.com/data.json";

/// Remote source reading `//v` from [`URL`]
pub fn remote(name: &str) -> SourceSpec {
    SourceSpec::remote(name, URL, "//v")
}
