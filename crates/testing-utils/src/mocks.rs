//! Test doubles for the remote management service and for node tasks.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use composer_core::traits::{
    NodeTask, RemoteClientProvider, RemoteResourceClient, RemoteResponse, RemovalTask,
    TaskFactory,
};
use composer_core::{ComposedNodeId, ComposerError, ComposerResult, TaskSpec};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub uri: String,
    pub body: Option<Value>,
}

#[derive(Debug, Default)]
struct MockRemoteState {
    resources: HashMap<String, Value>,
    failures: HashSet<(String, String)>,
    calls: Vec<RecordedCall>,
}

/// In-memory management service.
///
/// GET returns a registered resource or fails as not found. Writes succeed with
/// `204` unless a failure was scripted with [`MockRemoteClient::fail_on`]; a
/// successful DELETE removes the resource.
#[derive(Debug, Clone, Default)]
pub struct MockRemoteClient {
    state: Arc<Mutex<MockRemoteState>>,
}

impl MockRemoteClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(self, uri: &str, body: Value) -> Self {
        self.add_resource(uri, body);
        self
    }

    pub fn add_resource(&self, uri: &str, body: Value) {
        self.state
            .lock()
            .unwrap()
            .resources
            .insert(uri.to_string(), body);
    }

    pub fn remove_resource(&self, uri: &str) {
        self.state.lock().unwrap().resources.remove(uri);
    }

    pub fn has_resource(&self, uri: &str) -> bool {
        self.state.lock().unwrap().resources.contains_key(uri)
    }

    /// Make every `method` call on `uri` fail.
    pub fn fail_on(&self, method: &str, uri: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert((method.to_string(), uri.to_string()));
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failures.clear();
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Recorded calls without the GETs, as `"METHOD uri"`.
    pub fn writes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.method != "GET")
            .map(|call| format!("{} {}", call.method, call.uri))
            .collect()
    }

    pub fn call_count(&self, method: &str, uri: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.method == method && call.uri == uri)
            .count()
    }

    fn handle(&self, method: &str, uri: &str, body: Option<&Value>) -> ComposerResult<RemoteResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall {
            method: method.to_string(),
            uri: uri.to_string(),
            body: body.cloned(),
        });
        if state
            .failures
            .contains(&(method.to_string(), uri.to_string()))
        {
            return Err(ComposerError::remote(method, uri, "scripted failure"));
        }
        match method {
            "GET" => state
                .resources
                .get(uri)
                .map(|body| RemoteResponse::new(200, Some(body.clone())))
                .ok_or_else(|| ComposerError::remote(method, uri, "404 Not Found")),
            "DELETE" => {
                state.resources.remove(uri);
                Ok(RemoteResponse::no_content())
            }
            _ => Ok(RemoteResponse::no_content()),
        }
    }
}

#[async_trait]
impl RemoteResourceClient for MockRemoteClient {
    async fn get(&self, uri: &str) -> ComposerResult<RemoteResponse> {
        self.handle("GET", uri, None)
    }

    async fn post(&self, uri: &str, body: Option<&Value>) -> ComposerResult<RemoteResponse> {
        self.handle("POST", uri, body)
    }

    async fn patch(&self, uri: &str, body: &Value) -> ComposerResult<RemoteResponse> {
        self.handle("PATCH", uri, Some(body))
    }

    async fn delete(&self, uri: &str) -> ComposerResult<RemoteResponse> {
        self.handle("DELETE", uri, None)
    }
}

/// Serves every managed service from the same mock.
impl RemoteClientProvider for MockRemoteClient {
    fn client_for(&self, _service: Option<&str>) -> ComposerResult<Arc<dyn RemoteResourceClient>> {
        Ok(Arc::new(self.clone()))
    }
}

pub const RECORDING_TASK: &str = "recording";

/// Shared, ordered log of task executions.
pub type ExecutionLog = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone, Deserialize)]
struct RecordingParameters {
    name: String,
    #[serde(default)]
    fail: bool,
    #[serde(default)]
    delay_ms: u64,
}

/// Node task that appends its name to an [`ExecutionLog`] and optionally fails.
pub struct RecordingTask {
    node_id: ComposedNodeId,
    name: String,
    fail: bool,
    delay: Duration,
    log: ExecutionLog,
}

impl RecordingTask {
    pub fn new(node_id: ComposedNodeId, name: &str, fail: bool, log: ExecutionLog) -> Self {
        Self {
            node_id,
            name: name.to_string(),
            fail,
            delay: Duration::ZERO,
            log,
        }
    }
}

#[async_trait]
impl NodeTask for RecordingTask {
    fn node_id(&self) -> &ComposedNodeId {
        &self.node_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> ComposerResult<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.log.lock().unwrap().push(self.name.clone());
        if self.fail {
            return Err(ComposerError::TaskExecution(format!("{} failed", self.name)));
        }
        Ok(())
    }
}

/// Builds [`RecordingTask`]s from `{"name": .., "fail": .., "delay_ms": ..}`.
#[derive(Clone, Default)]
pub struct RecordingTaskFactory {
    log: ExecutionLog,
}

impl RecordingTaskFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> ExecutionLog {
        self.log.clone()
    }

    pub fn executed(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl TaskFactory for RecordingTaskFactory {
    fn task_type(&self) -> &str {
        RECORDING_TASK
    }

    fn create(&self, node: &ComposedNodeId, parameters: &Value) -> ComposerResult<Box<dyn NodeTask>> {
        let parameters: RecordingParameters = serde_json::from_value(parameters.clone())?;
        let mut task = RecordingTask::new(node.clone(), &parameters.name, parameters.fail, self.log.clone());
        task.delay = Duration::from_millis(parameters.delay_ms);
        Ok(Box::new(task))
    }
}

/// Spec for a [`RecordingTask`].
pub fn recording_spec(name: &str) -> TaskSpec {
    TaskSpec::new(RECORDING_TASK, json!({ "name": name }))
}

pub fn failing_spec(name: &str) -> TaskSpec {
    TaskSpec::new(RECORDING_TASK, json!({ "name": name, "fail": true }))
}

pub fn slow_spec(name: &str, delay_ms: u64) -> TaskSpec {
    TaskSpec::new(RECORDING_TASK, json!({ "name": name, "delay_ms": delay_ms }))
}

/// Removal task logging `"<name>:disassemble"` and `"<name>:deallocate"`.
pub struct RecordingRemovalTask {
    node_id: ComposedNodeId,
    name: String,
    fail_disassemble: bool,
    fail_deallocate: bool,
    log: ExecutionLog,
}

impl RecordingRemovalTask {
    pub fn new(node_id: ComposedNodeId, name: &str, log: ExecutionLog) -> Self {
        Self {
            node_id,
            name: name.to_string(),
            fail_disassemble: false,
            fail_deallocate: false,
            log,
        }
    }

    pub fn failing_disassemble(mut self) -> Self {
        self.fail_disassemble = true;
        self
    }

    pub fn failing_deallocate(mut self) -> Self {
        self.fail_deallocate = true;
        self
    }

    fn record(&self, phase: &str, fail: bool) -> ComposerResult<()> {
        self.log.lock().unwrap().push(format!("{}:{phase}", self.name));
        if fail {
            return Err(ComposerError::TaskExecution(format!("{} {phase} failed", self.name)));
        }
        Ok(())
    }
}

#[async_trait]
impl RemovalTask for RecordingRemovalTask {
    fn node_id(&self) -> &ComposedNodeId {
        &self.node_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn disassemble(&self) -> ComposerResult<()> {
        self.record("disassemble", self.fail_disassemble)
    }

    async fn deallocate(&self) -> ComposerResult<()> {
        self.record("deallocate", self.fail_deallocate)
    }
}
