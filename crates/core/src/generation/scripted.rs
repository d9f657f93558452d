//! In-process generators that never touch the network.

use super::{GenerationRequest, StructuredGenerator};
use crate::error::GenerationError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Backend that refuses every call. Selecting it runs the whole pipeline on
/// stage fallbacks.
#[derive(Debug, Default, Clone)]
pub struct OfflineGenerator;

impl OfflineGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StructuredGenerator for OfflineGenerator {
    fn name(&self) -> &str {
        "offline"
    }

    async fn complete(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
        Err(GenerationError::Configuration {
            message: "offline mode: no generation backend".to_string(),
        })
    }
}

type Reply = Result<String, GenerationError>;

#[derive(Default)]
struct Script {
    queues: HashMap<String, VecDeque<Reply>>,
    defaults: HashMap<String, Reply>,
    log: Vec<GenerationRequest>,
}

/// Deterministic backend answering from per-schema queues.
///
/// Replies are looked up by the request's schema name: the queued replies
/// are served first-in first-out, then the default for that schema if one
/// was set. Anything else is a `Configuration` error.
#[derive(Default)]
pub struct ScriptedGenerator {
    script: Mutex<Script>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON reply for `schema`.
    pub fn with_response(self, schema: &str, value: Value) -> Self {
        self.push(schema, Ok(value.to_string()));
        self
    }

    /// Queue raw response text for `schema`, e.g. JSON wrapped in prose.
    pub fn with_raw(self, schema: &str, text: impl Into<String>) -> Self {
        self.push(schema, Ok(text.into()));
        self
    }

    /// Queue a failure for `schema`.
    pub fn with_failure(self, schema: &str, error: GenerationError) -> Self {
        self.push(schema, Err(error));
        self
    }

    /// Reply used for `schema` once its queue is drained.
    pub fn with_default(self, schema: &str, value: Value) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script
                .defaults
                .insert(schema.to_string(), Ok(value.to_string()));
        }
        self
    }

    pub fn push(&self, schema: &str, reply: Reply) {
        if let Ok(mut script) = self.script.lock() {
            script
                .queues
                .entry(schema.to_string())
                .or_default()
                .push_back(reply);
        }
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.script
            .lock()
            .map(|script| script.log.clone())
            .unwrap_or_default()
    }

    /// Schema names of the requests received so far.
    pub fn calls(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|request| request.schema.name().to_string())
            .collect()
    }
}

#[async_trait]
impl StructuredGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let mut script = self.script.lock().map_err(|e| GenerationError::Configuration {
            message: format!("script lock poisoned: {}", e),
        })?;
        script.log.push(request.clone());

        let key = request.schema.name();
        if let Some(reply) = script.queues.get_mut(key).and_then(VecDeque::pop_front) {
            return reply;
        }
        script
            .defaults
            .get(key)
            .cloned()
            .unwrap_or_else(|| {
                Err(GenerationError::Configuration {
                    message: format!("no scripted reply for '{}'", key),
                })
            })
    }
}
