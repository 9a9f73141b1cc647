use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use shipline_broker::{ContextualUpdate, Result, Tool, ToolOutput};

/// Test tool returning a fixed payload and counting invocations.
pub struct RecordingTool {
    name: String,
    result: Value,
    updates: Vec<ContextualUpdate>,
    calls: Arc<AtomicUsize>,
}

impl RecordingTool {
    pub fn new(name: &str, result: Value) -> Self {
        Self {
            name: name.to_string(),
            result,
            updates: Vec::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_update(mut self, update: ContextualUpdate) -> Self {
        self.updates.push(update);
        self
    }

    #[allow(dead_code)]
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, _parameters: Value) -> Result<ToolOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut output = ToolOutput::new(self.result.clone());
        output.updates = self.updates.clone();
        Ok(output)
    }
}

/// Test tool that always fails with the given description.
pub struct FailingTool {
    name: String,
    description: String,
}

impl FailingTool {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, _parameters: Value) -> Result<ToolOutput> {
        Err(shipline_broker::BrokerError::ToolExecution(
            self.description.clone(),
        ))
    }
}
