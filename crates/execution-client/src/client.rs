//! Execution client
//!
//! Sends the workflow's logical plan to the backend and reports the outcome
//! as events. Every `execute_workflow` call emits one `Started` event
//! synchronously and one `Ended` event when the request settles.
//!
//! Each run gets a monotonic token that correlates its events. The
//! execution ID is only ever the one the server issued: it is taken from
//! the latest run's settled response, so pause and resume fail before any
//! request until an execution has been acknowledged. An older run that
//! settles late still emits `Ended`, flagged `stale`, but changes nothing.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use workflow_graph::{EventChannel, EventStream, WorkflowGraph};

use crate::config::ExecutionConfig;
use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::error::{ControlAction, ExecutionError, Result, TransportError};
use crate::request::LogicalPlan;
use crate::result::{classify, is_execution_successful, ExecutionResult};
use crate::transport::{ExecutionTransport, ReqwestTransport};

/// Lifecycle of the current execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    Idle,
    Running,
    Paused,
    Resuming,
    Completed,
    Failed,
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Resuming => "resuming",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Events published by the execution client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExecutionEvent {
    /// An execution request is about to be sent
    Started { run: u64 },

    /// An execution request settled
    Ended {
        run: u64,
        result: ExecutionResult,
        /// A newer run was started before this one settled
        stale: bool,
    },

    /// A pause or resume request settled
    PauseResume {
        action: ControlAction,
        result: ExecutionResult,
    },
}

impl ExecutionEvent {
    pub fn started(self) -> Option<u64> {
        match self {
            Self::Started { run } => Some(run),
            _ => None,
        }
    }

    pub fn ended(self) -> Option<ExecutionResult> {
        match self {
            Self::Ended { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn pause_resume(self) -> Option<(ControlAction, ExecutionResult)> {
        match self {
            Self::PauseResume { action, result } => Some((action, result)),
            _ => None,
        }
    }
}

struct ClientState {
    state: ExecutionState,
    execution_id: Option<String>,
    latest_run: u64,
}

struct Inner {
    config: ExecutionConfig,
    transport: Arc<dyn ExecutionTransport>,
    state: Mutex<ClientState>,
    events: EventChannel<ExecutionEvent>,
}

/// Handle to the execution backend; clones share state and events
#[derive(Clone)]
pub struct ExecutionClient {
    inner: Arc<Inner>,
}

impl ExecutionClient {
    /// Create a client over the default HTTP transport
    pub fn new(config: ExecutionConfig) -> std::result::Result<Self, TransportError> {
        let transport = ReqwestTransport::new(config.timeout())?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: ExecutionConfig, transport: Arc<dyn ExecutionTransport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                state: Mutex::new(ClientState {
                    state: ExecutionState::Idle,
                    execution_id: None,
                    latest_run: 0,
                }),
                events: EventChannel::with_capacity(EVENT_CHANNEL_CAPACITY),
            }),
        }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.inner.config
    }

    pub fn state(&self) -> ExecutionState {
        self.inner.state.lock().state
    }

    pub fn execution_id(&self) -> Option<String> {
        self.inner.state.lock().execution_id.clone()
    }

    pub fn subscribe(&self) -> EventStream<ExecutionEvent, ExecutionEvent> {
        self.inner.events.subscribe()
    }

    /// Run tokens of started executions
    pub fn started_stream(&self) -> EventStream<ExecutionEvent, u64> {
        self.inner.events.subscribe_filtered(ExecutionEvent::started)
    }

    /// Results of settled executions, stale ones included
    pub fn ended_stream(&self) -> EventStream<ExecutionEvent, ExecutionResult> {
        self.inner.events.subscribe_filtered(ExecutionEvent::ended)
    }

    pub fn pause_resume_stream(&self) -> EventStream<ExecutionEvent, (ControlAction, ExecutionResult)> {
        self.inner.events.subscribe_filtered(ExecutionEvent::pause_resume)
    }

    /// Execute the graph's current state
    ///
    /// `Started` is emitted before this returns. The handle resolves to the
    /// classified result once `Ended` has been emitted. Must be called
    /// inside a tokio runtime.
    pub fn execute_workflow(&self, graph: &WorkflowGraph) -> JoinHandle<ExecutionResult> {
        let plan = LogicalPlan::from_graph(graph);
        let body = serde_json::to_value(&plan);

        let run = {
            let mut state = self.inner.state.lock();
            state.latest_run += 1;
            state.state = ExecutionState::Running;
            state.latest_run
        };

        log::info!("Executing workflow with {} operators (run {})", plan.operators.len(), run);
        self.inner.events.emit(ExecutionEvent::Started { run });

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let url = inner.config.url(&inner.config.execute_path);
            let response = match body {
                Ok(body) => inner.transport.post(&url, body).await,
                Err(e) => Err(TransportError::Other(format!("Failed to encode plan: {}", e))),
            };
            let classified = classify(response, &inner.config.server_name);

            let stale = {
                let mut state = inner.state.lock();
                let stale = state.latest_run != run;
                if !stale {
                    if let Some(id) = classified.execution_id {
                        state.execution_id = Some(id);
                    }
                    state.state = if is_execution_successful(&classified.result) {
                        ExecutionState::Completed
                    } else {
                        ExecutionState::Failed
                    };
                }
                stale
            };

            if stale {
                log::info!("Run {} settled after a newer run started", run);
            } else {
                log::debug!("Run {} ended with code {}", run, classified.result.code());
            }

            inner.events.emit(ExecutionEvent::Ended {
                run,
                result: classified.result.clone(),
                stale,
            });
            classified.result
        })
    }

    /// Pause the running execution
    ///
    /// Fails without sending anything when no execution ID has been issued
    /// by the server yet or the execution is not running.
    pub fn pause_workflow(&self) -> Result<JoinHandle<ExecutionResult>> {
        self.control(ControlAction::Pause)
    }

    /// Resume the paused execution
    pub fn resume_workflow(&self) -> Result<JoinHandle<ExecutionResult>> {
        self.control(ControlAction::Resume)
    }

    fn control(&self, action: ControlAction) -> Result<JoinHandle<ExecutionResult>> {
        let (run, execution_id) = {
            let mut state = self.inner.state.lock();
            let execution_id = state
                .execution_id
                .clone()
                .ok_or(ExecutionError::MissingExecutionId { action })?;

            let allowed = match action {
                ControlAction::Pause => state.state == ExecutionState::Running,
                ControlAction::Resume => state.state == ExecutionState::Paused,
            };
            if !allowed {
                return Err(ExecutionError::InvalidState {
                    action,
                    state: state.state,
                });
            }
            if action == ControlAction::Resume {
                state.state = ExecutionState::Resuming;
            }
            (state.latest_run, execution_id)
        };

        let path = match action {
            ControlAction::Pause => &self.inner.config.pause_path,
            ControlAction::Resume => &self.inner.config.resume_path,
        };
        let url = self.inner.config.url(path);
        let body = serde_json::json!({ "executionID": execution_id });
        log::info!("Requesting {} of execution {}", action, execution_id);

        let inner = self.inner.clone();
        Ok(tokio::spawn(async move {
            let response = inner.transport.post(&url, body).await;
            let result = classify(response, &inner.config.server_name).result;
            let succeeded = is_execution_successful(&result);

            {
                let mut state = inner.state.lock();
                if state.latest_run == run {
                    match (action, state.state, succeeded) {
                        (ControlAction::Pause, ExecutionState::Running, true) => {
                            state.state = ExecutionState::Paused;
                        }
                        (ControlAction::Resume, ExecutionState::Resuming, true) => {
                            state.state = ExecutionState::Running;
                        }
                        (ControlAction::Resume, ExecutionState::Resuming, false) => {
                            state.state = ExecutionState::Paused;
                        }
                        _ => {}
                    }
                }
            }

            if !succeeded {
                log::warn!("Failed to {} execution: {:?}", action, result.message());
            }
            inner.events.emit(ExecutionEvent::PauseResume {
                action,
                result: result.clone(),
            });
            result
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{scan_result_facade, MockTransport};
    use serde_json::json;
    use std::time::Duration;

    fn client(transport: &Arc<MockTransport>) -> ExecutionClient {
        let _ = env_logger::builder().is_test(true).try_init();
        ExecutionClient::with_transport(ExecutionConfig::default(), transport.clone())
    }

    fn control_requests(transport: &MockTransport) -> usize {
        transport
            .requests()
            .iter()
            .filter(|(url, _)| url.ends_with("/api/pause") || url.ends_with("/api/resume"))
            .count()
    }

    /// Settle one execution that the server acknowledges as `id`, then start
    /// a second one that stays in flight for `running_for`
    async fn running_execution(
        transport: &Arc<MockTransport>,
        id: &str,
        running_for: Duration,
    ) -> (ExecutionClient, JoinHandle<ExecutionResult>) {
        transport.respond(
            "/api/execute",
            Duration::ZERO,
            200,
            json!({"code": 0, "result": [], "executionID": id}),
        );
        transport.respond("/api/execute", running_for, 200, json!({"code": 0, "result": []}));
        let client = client(transport);
        let facade = scan_result_facade();

        client.execute_workflow(facade.graph()).await.unwrap();
        let running = client.execute_workflow(facade.graph());
        (client, running)
    }

    #[tokio::test]
    async fn test_started_is_synchronous_and_ended_follows() {
        let transport = Arc::new(MockTransport::new());
        transport.respond("/api/execute", Duration::ZERO, 200, json!({"code": 0, "result": []}));
        let client = client(&transport);
        let facade = scan_result_facade();

        let mut started = client.started_stream();
        let mut ended = client.ended_stream();

        let handle = client.execute_workflow(facade.graph());
        assert_eq!(started.try_next(), Some(1));
        assert_eq!(client.state(), ExecutionState::Running);

        let result = handle.await.unwrap();
        assert_eq!(result, ExecutionResult::Completed { tables: vec![] });
        assert_eq!(ended.drain(), vec![result]);
        assert!(started.drain().is_empty());
        assert_eq!(client.state(), ExecutionState::Completed);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1["links"][0], json!({"origin": "scan", "destination": "result"}));
    }

    #[tokio::test]
    async fn test_execution_id_comes_from_server() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            "/api/execute",
            Duration::ZERO,
            200,
            json!({"code": 0, "result": [], "executionID": "server-7"}),
        );
        let client = client(&transport);

        let handle = client.execute_workflow(scan_result_facade().graph());
        assert_eq!(client.execution_id(), None);

        handle.await.unwrap();
        assert_eq!(client.execution_id().as_deref(), Some("server-7"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_before_any_acknowledged_execution() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            "/api/execute",
            Duration::from_secs(10),
            200,
            json!({"code": 0, "result": [], "executionID": "server-1"}),
        );
        let client = client(&transport);

        let execution = client.execute_workflow(scan_result_facade().graph());
        tokio::task::yield_now().await;
        assert_eq!(client.state(), ExecutionState::Running);

        let err = tokio_test::assert_err!(client.pause_workflow());
        assert_eq!(
            err,
            ExecutionError::MissingExecutionId {
                action: ControlAction::Pause
            }
        );
        assert_eq!(control_requests(&transport), 0);

        execution.await.unwrap();
        assert_eq!(client.execution_id().as_deref(), Some("server-1"));
    }

    #[tokio::test]
    async fn test_backend_errors_are_results() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            "/api/execute",
            Duration::ZERO,
            400,
            json!({"code": 1, "message": "mock backend error message"}),
        );
        transport.respond(
            "/api/execute",
            Duration::ZERO,
            500,
            json!({"code": 1, "message": "mock server error message"}),
        );
        let client = client(&transport);
        let facade = scan_result_facade();

        let result = client.execute_workflow(facade.graph()).await.unwrap();
        assert_eq!(result.message(), Some("mock backend error message"));
        assert_eq!(client.state(), ExecutionState::Failed);
        assert_eq!(client.execution_id(), None);

        let result = client.execute_workflow(facade.graph()).await.unwrap();
        assert_eq!(result.code(), 1);
        assert_eq!(result.message(), Some("Texera server error: mock server error message"));
    }

    #[tokio::test]
    async fn test_network_failure() {
        let transport = Arc::new(MockTransport::new());
        transport.fail("/api/execute", "connection refused");
        let client = client(&transport);

        let result = client.execute_workflow(scan_result_facade().graph()).await.unwrap();
        assert_eq!(result.code(), 1);
        assert_eq!(result.message(), Some("Could not reach Texera server"));
        assert!(!is_execution_successful(&result));
        assert_eq!(client.state(), ExecutionState::Failed);
    }

    #[tokio::test]
    async fn test_pause_resume_without_id() {
        let transport = Arc::new(MockTransport::new());
        let client = client(&transport);

        let err = tokio_test::assert_err!(client.pause_workflow());
        assert_eq!(err.to_string(), "Workflow ID undefined when attempting to pause");
        let err = tokio_test::assert_err!(client.resume_workflow());
        assert_eq!(err.to_string(), "Workflow ID undefined when attempting to resume");

        assert!(transport.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_and_resume_running_execution() {
        let transport = Arc::new(MockTransport::new());
        transport.respond("/api/pause", Duration::ZERO, 200, json!({"code": 0}));
        transport.respond("/api/resume", Duration::ZERO, 200, json!({"code": 0}));
        let (client, execution) = running_execution(&transport, "server-1", Duration::from_secs(10)).await;
        let mut controls = client.pause_resume_stream();
        assert_eq!(client.state(), ExecutionState::Running);

        let paused = client.pause_workflow().unwrap().await.unwrap();
        assert!(is_execution_successful(&paused));
        assert_eq!(client.state(), ExecutionState::Paused);
        assert!(matches!(
            client.pause_workflow(),
            Err(ExecutionError::InvalidState { .. })
        ));

        let resume = client.resume_workflow().unwrap();
        assert_eq!(client.state(), ExecutionState::Resuming);
        resume.await.unwrap();
        assert_eq!(client.state(), ExecutionState::Running);

        let events = controls.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, ControlAction::Pause);
        assert_eq!(events[1].0, ControlAction::Resume);

        let requests = transport.requests();
        let pause = requests.iter().find(|(url, _)| url.ends_with("/api/pause")).unwrap();
        assert_eq!(pause.1, json!({ "executionID": "server-1" }));

        execution.await.unwrap();
        assert_eq!(client.state(), ExecutionState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_pause_keeps_running() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            "/api/pause",
            Duration::ZERO,
            500,
            json!({"code": 1, "message": "engine busy"}),
        );
        let (client, execution) = running_execution(&transport, "server-1", Duration::from_secs(10)).await;
        let mut controls = client.pause_resume_stream();

        let result = client.pause_workflow().unwrap().await.unwrap();
        assert!(!is_execution_successful(&result));
        assert_eq!(client.state(), ExecutionState::Running);

        let events = controls.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0], (ControlAction::Pause, result));

        execution.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_resume_returns_to_paused() {
        let transport = Arc::new(MockTransport::new());
        transport.respond("/api/pause", Duration::ZERO, 200, json!({"code": 0}));
        transport.fail("/api/resume", "connection reset");
        let (client, execution) = running_execution(&transport, "server-1", Duration::from_secs(10)).await;

        client.pause_workflow().unwrap().await.unwrap();
        let mut controls = client.pause_resume_stream();

        let resume = client.resume_workflow().unwrap();
        assert_eq!(client.state(), ExecutionState::Resuming);
        let result = resume.await.unwrap();

        assert_eq!(result.message(), Some("Could not reach Texera server"));
        assert_eq!(client.state(), ExecutionState::Paused);
        let events = controls.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, ControlAction::Resume);

        execution.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_is_flagged_stale() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            "/api/execute",
            Duration::from_millis(500),
            200,
            json!({"code": 0, "result": [], "executionID": "first"}),
        );
        transport.respond(
            "/api/execute",
            Duration::from_millis(10),
            400,
            json!({"code": 1, "message": "second failed"}),
        );
        let client = client(&transport);
        let facade = scan_result_facade();
        let mut events = client.subscribe();

        let first = client.execute_workflow(facade.graph());
        tokio::task::yield_now().await;
        let second = client.execute_workflow(facade.graph());

        second.await.unwrap();
        first.await.unwrap();

        assert_eq!(client.state(), ExecutionState::Failed);
        // The stale run's server ID is never adopted
        assert_eq!(client.execution_id(), None);

        let ended: Vec<(u64, bool)> = events
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                ExecutionEvent::Ended { run, stale, .. } => Some((run, stale)),
                _ => None,
            })
            .collect();
        assert_eq!(ended, vec![(2, false), (1, true)]);
    }
}
