//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::{BTreeSet, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use kafka_protocol::messages::metadata_response::MetadataResponseTopic;
use kafka_protocol::messages::{
    ApiKey, MetadataRequest, MetadataResponse, RequestHeader, ResponseHeader, TopicName,
};
use kafka_protocol::protocol::{Decodable, Encodable, StrBytes};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use stream_bootstrap::broker::{
    AdminOptions, BootstrapServers, MetadataClient, MetadataConnector, MetadataError, ResponseError,
};
use stream_bootstrap::engine::{
    EngineError, EngineSettings, LifecycleState, StateListener, StreamEngine,
    UncaughtErrorHandler,
};
use stream_bootstrap::lifecycle::ProcessExit;

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

pub type Step = Result<BTreeSet<String>, MetadataError>;

pub fn topics(names: &[&str]) -> Step {
    Ok(names.iter().map(|s| s.to_string()).collect())
}

/// `count` topics named `fb-0`, `fb-1`, ... plus one unrelated topic.
pub fn fb_topics(count: usize) -> Step {
    let mut names: BTreeSet<String> = (0..count).map(|i| format!("fb-{}", i)).collect();
    names.insert("audit-log".to_string());
    Ok(names)
}

pub fn timeout_error() -> Step {
    Err(MetadataError::Timeout(Duration::from_secs(20)))
}

pub fn unreachable_error() -> Step {
    Err(MetadataError::Unreachable {
        broker: "kafka:9092".to_string(),
        source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
    })
}

pub fn broker_error(code: ResponseError) -> Step {
    Err(MetadataError::Broker(code))
}

/// Shared counters of a scripted client, readable after the client is gone.
#[derive(Clone, Default)]
pub struct ClientStats {
    pub connects: Arc<AtomicU32>,
    pub calls: Arc<AtomicU32>,
    pub released: Arc<AtomicBool>,
}

impl ClientStats {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// Connector handing out a client that replays a fixed script. Once the
/// script is exhausted the client blocks forever.
pub struct ScriptedConnector {
    steps: Mutex<VecDeque<Step>>,
    pub stats: ClientStats,
}

impl ScriptedConnector {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            stats: ClientStats::default(),
        }
    }
}

impl MetadataConnector for ScriptedConnector {
    type Client = ScriptedClient;

    fn connect(&self, _servers: &BootstrapServers, _options: &AdminOptions) -> ScriptedClient {
        self.stats.connects.fetch_add(1, Ordering::SeqCst);
        ScriptedClient {
            steps: std::mem::take(&mut *self.steps.lock().unwrap()),
            stats: self.stats.clone(),
        }
    }
}

pub struct ScriptedClient {
    steps: VecDeque<Step>,
    stats: ClientStats,
}

impl MetadataClient for ScriptedClient {
    async fn list_topics(&mut self) -> Step {
        self.stats.calls.fetch_add(1, Ordering::SeqCst);
        match self.steps.pop_front() {
            Some(step) => step,
            None => std::future::pending().await,
        }
    }
}

impl Drop for ScriptedClient {
    fn drop(&mut self) {
        self.stats.released.store(true, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Observable side of a [`ScriptedEngine`].
#[derive(Clone, Default)]
pub struct EngineProbe {
    pub state: Arc<AtomicU8>,
    pub events: Arc<Mutex<Vec<&'static str>>>,
    pub closes: Arc<AtomicUsize>,
    pub settings: Arc<Mutex<Option<EngineSettings>>>,
    pub uncaught: Arc<Mutex<Option<UncaughtErrorHandler>>>,
    listener: Arc<Mutex<Option<StateListener>>>,
}

impl EngineProbe {
    pub fn state(&self) -> LifecycleState {
        LifecycleState::from(self.state.load(Ordering::SeqCst))
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Move to `next`, notifying the listener like a real engine would.
    pub fn transition(&self, next: LifecycleState) {
        let listener = self.listener.lock().unwrap();
        let prev = self.state();
        if !prev.can_transition_to(next) {
            return;
        }
        self.state.store(next as u8, Ordering::SeqCst);
        if let Some(listener) = listener.as_ref() {
            listener(prev, next);
        }
    }

    /// Fire the registered uncaught-error handler, if any.
    pub fn raise_uncaught(&self, unit: &str, message: &str) -> bool {
        let handler = self.uncaught.lock().unwrap();
        match handler.as_ref() {
            Some(handler) => {
                let err = std::io::Error::new(std::io::ErrorKind::Other, message.to_string());
                handler(unit, &err);
                true
            }
            None => false,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Run the script on a background thread, like a real engine.
    Background,
    /// Run the script inside `start`, before it returns.
    Inline,
    /// Drop the listener inside `start` without notifying it.
    DropListener,
    /// Fail `start`.
    Fail,
    /// Fail `clean_up`.
    FailCleanUp,
}

pub struct ScriptedEngine {
    probe: EngineProbe,
    script: Vec<(Duration, LifecycleState)>,
    mode: StartMode,
}

impl ScriptedEngine {
    pub fn new(script: Vec<(Duration, LifecycleState)>, mode: StartMode) -> (Self, EngineProbe) {
        let probe = EngineProbe::default();
        (
            Self {
                probe: probe.clone(),
                script,
                mode,
            },
            probe,
        )
    }

    fn record(&self, event: &'static str) {
        self.probe.events.lock().unwrap().push(event);
    }
}

impl StreamEngine for ScriptedEngine {
    fn state(&self) -> LifecycleState {
        self.probe.state()
    }

    fn set_state_listener(&self, listener: StateListener) {
        self.record("set_state_listener");
        *self.probe.listener.lock().unwrap() = Some(listener);
    }

    fn set_uncaught_error_handler(&self, handler: UncaughtErrorHandler) {
        self.record("set_uncaught_error_handler");
        *self.probe.uncaught.lock().unwrap() = Some(handler);
    }

    fn clean_up(&self) -> Result<(), EngineError> {
        self.record("clean_up");
        match self.mode {
            StartMode::FailCleanUp => Err(EngineError::clean_up("state directory not writable")),
            _ => Ok(()),
        }
    }

    fn start(&self) -> Result<(), EngineError> {
        self.record("start");
        match self.mode {
            StartMode::Fail => Err(EngineError::start("state directory locked")),
            StartMode::FailCleanUp => Ok(()),
            StartMode::DropListener => {
                self.probe.listener.lock().unwrap().take();
                Ok(())
            }
            StartMode::Inline => {
                for (_, next) in &self.script {
                    self.probe.transition(*next);
                }
                Ok(())
            }
            StartMode::Background => {
                let probe = self.probe.clone();
                let script = self.script.clone();
                std::thread::spawn(move || {
                    for (delay, next) in script {
                        std::thread::sleep(delay);
                        probe.transition(next);
                    }
                });
                Ok(())
            }
        }
    }

    fn close(&self) {
        self.record("close");
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        self.probe.transition(LifecycleState::Stopped);
    }
}

/// Factory handing out `engine` once, recording the settings it was given.
pub fn factory_for<G>(
    engine: ScriptedEngine,
) -> impl Fn(G, &EngineSettings) -> Result<ScriptedEngine, EngineError> {
    let slot = Mutex::new(Some(engine));
    move |_graph: G, settings: &EngineSettings| {
        let engine = slot
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| EngineError::create("engine already created"))?;
        *engine.probe.settings.lock().unwrap() = Some(settings.clone());
        Ok(engine)
    }
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Poll `condition` every 10 ms for up to a second.
pub async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(ms(10)).await;
    }
    condition()
}

// ---------------------------------------------------------------------------
// Process exit
// ---------------------------------------------------------------------------

/// Panics instead of exiting so tests can observe the exit status.
pub struct PanicExit;

impl ProcessExit for PanicExit {
    fn exit(&self, code: i32) -> ! {
        panic!("process exit with status {}", code)
    }
}

/// Records the exit in the engine's event log, then panics like [`PanicExit`].
pub struct RecordingExit {
    probe: EngineProbe,
    pub code: Arc<Mutex<Option<i32>>>,
}

impl RecordingExit {
    pub fn new(probe: EngineProbe) -> Self {
        Self {
            probe,
            code: Arc::new(Mutex::new(None)),
        }
    }
}

impl ProcessExit for RecordingExit {
    fn exit(&self, code: i32) -> ! {
        self.probe.events.lock().unwrap().push("exit");
        *self.code.lock().unwrap() = Some(code);
        panic!("process exit with status {}", code)
    }
}

// ---------------------------------------------------------------------------
// Fake broker
// ---------------------------------------------------------------------------

/// `(name, error_code, is_internal)`
pub type FakeTopic = (&'static str, i16, bool);

/// Start a broker that answers Metadata v1 requests on every accepted
/// connection with the given responses in order, repeating the last one.
pub async fn start_fake_broker(responses: Vec<Vec<FakeTopic>>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let served = Arc::new(AtomicUsize::new(0));
    let responses = Arc::new(responses);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let served = served.clone();
            let responses = responses.clone();
            tokio::spawn(async move {
                loop {
                    let len = match socket.read_i32().await {
                        Ok(len) => len as usize,
                        Err(_) => break,
                    };
                    let mut buf = vec![0u8; len];
                    if socket.read_exact(&mut buf).await.is_err() {
                        break;
                    }
                    let mut buf = Bytes::from(buf);
                    let header = RequestHeader::decode(&mut buf, 1).unwrap();
                    assert_eq!(header.request_api_key, ApiKey::Metadata as i16);
                    let request = MetadataRequest::decode(&mut buf, 1).unwrap();
                    assert!(request.topics.is_none(), "expected a request for all topics");

                    let n = served.fetch_add(1, Ordering::SeqCst);
                    let topics = &responses[n.min(responses.len() - 1)];
                    let frame = metadata_frame(header.correlation_id, topics);
                    if socket.write_all(&frame).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    addr
}

fn metadata_frame(correlation_id: i32, topics: &[FakeTopic]) -> Vec<u8> {
    let topics = topics
        .iter()
        .map(|(name, error_code, internal)| {
            MetadataResponseTopic::default()
                .with_name(Some(TopicName(StrBytes::from_string(name.to_string()))))
                .with_error_code(*error_code)
                .with_is_internal(*internal)
        })
        .collect();

    let mut body = BytesMut::new();
    ResponseHeader::default()
        .with_correlation_id(correlation_id)
        .encode(&mut body, 0)
        .unwrap();
    MetadataResponse::default()
        .with_topics(topics)
        .encode(&mut body, 1)
        .unwrap();

    let mut frame = (body.len() as i32).to_be_bytes().to_vec();
    frame.extend_from_slice(&body);
    frame
}

/// Accepts connections and never answers.
pub async fn start_silent_broker() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
