/*!
Scripted device client and process runner

Both record every call so tests can assert that a rejected command never
reached an external collaborator.
*/

use async_trait::async_trait;
use edge_agent::edgex::EdgexClient;
use edge_agent::exec::ProcessRunner;
use edge_agent::{AgentError, Result};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgexCall {
    pub method: &'static str,
    pub args: Vec<String>,
}

/// EdgeX client double. Answers every call with the configured response,
/// or fails when an error message is set.
#[derive(Clone)]
pub struct MockEdgexClient {
    calls: Arc<Mutex<Vec<EdgexCall>>>,
    response: Arc<Mutex<String>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl MockEdgexClient {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            response: Arc::new(Mutex::new("pong".to_string())),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    pub fn respond_with(&self, response: &str) {
        *self.response.lock().unwrap() = response.to_string();
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn get_calls(&self) -> Vec<EdgexCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, method: &'static str, args: &[String]) -> Result<String> {
        self.calls.lock().unwrap().push(EdgexCall {
            method,
            args: args.to_vec(),
        });
        log::info!("🔧 [MOCK] EdgeX {} {:?}", method, args);

        match self.failure.lock().unwrap().as_ref() {
            Some(message) => Err(AgentError::Device(message.clone())),
            None => Ok(self.response.lock().unwrap().clone()),
        }
    }
}

impl Default for MockEdgexClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EdgexClient for MockEdgexClient {
    async fn push_operation(&self, args: &[String]) -> Result<String> {
        self.record("push_operation", args)
    }

    async fn fetch_config(&self, services: &[String]) -> Result<String> {
        self.record("fetch_config", services)
    }

    async fn fetch_metrics(&self, services: &[String]) -> Result<String> {
        self.record("fetch_metrics", services)
    }

    async fn ping(&self) -> Result<String> {
        self.record("ping", &[])
    }
}

/// Process runner double. Returns the configured output, or an
/// `Execution` error with the configured exit status.
#[derive(Clone, Default)]
pub struct RecordingRunner {
    calls: Arc<Mutex<Vec<(String, Vec<String>)>>>,
    output: Arc<Mutex<Vec<u8>>>,
    exit_status: Arc<Mutex<Option<i32>>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self, output: &[u8]) {
        *self.output.lock().unwrap() = output.to_vec();
    }

    pub fn exit_with(&self, status: i32) {
        *self.exit_status.lock().unwrap() = Some(status);
    }

    pub fn get_calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for RecordingRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<Vec<u8>> {
        self.calls
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_vec()));

        let output = self.output.lock().unwrap().clone();
        match *self.exit_status.lock().unwrap() {
            Some(status) => Err(AgentError::Execution {
                program: program.to_string(),
                status: Some(status),
                output: String::from_utf8_lossy(&output).into_owned(),
            }),
            None => Ok(output),
        }
    }
}
