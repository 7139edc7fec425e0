//! The worker: owns all table state, processes envelopes one at a time
//!
//! Per-request flow: parse → install closure → dispatch → build result →
//! tear down closure. Teardown runs on every path, so no closure binding
//! ever outlives its request. Because the worker processes envelopes
//! strictly in sequence, at most one closure context is live at any instant.

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::eval::{Environment, Predicate, UpdateProgram};
use crate::observability::Logger;
use crate::protocol::{Request, RequestEnvelope, ResultEnvelope};
use crate::table::TableRegistry;

use super::errors::{EngineError, EngineResult};

/// Worker tuning knobs
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Emit an INFO line per processed operation
    pub log_operations: bool,
    /// Upper bound on closure payload width; 0 = unbounded
    pub max_closure_names: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            log_operations: true,
            max_closure_names: 0,
        }
    }
}

/// The operation engine behind the channel
#[derive(Debug, Default)]
pub struct Worker {
    registry: TableRegistry,
    env: Environment,
    config: WorkerConfig,
}

impl Worker {
    /// Create a worker with default configuration
    pub fn new() -> Self {
        Self::with_config(WorkerConfig::default())
    }

    /// Create a worker with explicit configuration
    pub fn with_config(config: WorkerConfig) -> Self {
        Self {
            registry: TableRegistry::new(),
            env: Environment::new(),
            config,
        }
    }

    /// Process one raw envelope into at most one result envelope.
    ///
    /// Returns `None` only when the envelope is malformed beyond recovery of
    /// a request id; such envelopes are logged and dropped because no result
    /// can be attributed.
    pub fn handle(&mut self, raw: &str) -> Option<ResultEnvelope> {
        let envelope = match RequestEnvelope::parse(raw) {
            Ok(envelope) => envelope,
            Err(error) => {
                let payload = error.payload();
                return match error.request_id() {
                    Some(request_id) => {
                        let id = request_id.to_string();
                        Logger::warn(
                            "REQUEST_REJECTED",
                            &[("requestId", id.as_str()), ("code", &payload.code)],
                        );
                        Some(ResultEnvelope::failure(request_id, payload))
                    }
                    None => {
                        Logger::error("REQUEST_DROPPED", &[("reason", &payload.message)]);
                        None
                    }
                };
            }
        };

        let request_id = envelope.request_id;

        // All-or-nothing closure install; a rejected payload produces an
        // error result without running the operation
        let installed = match &envelope.closure {
            Some(closure) => {
                match self
                    .env
                    .install_closure(closure, self.config.max_closure_names)
                {
                    Ok(names) => names,
                    Err(error) => {
                        let engine_error = EngineError::from(error);
                        self.log_failure(&envelope, &engine_error);
                        return Some(ResultEnvelope::failure(request_id, engine_error.payload()));
                    }
                }
            }
            None => Vec::new(),
        };

        // A panic on the dispatch path must not take the worker down; it
        // becomes a generic error result like any other fault
        let outcome = catch_unwind(AssertUnwindSafe(|| self.dispatch(&envelope.request)))
            .unwrap_or_else(|_| {
                Err(EngineError::Generic(
                    "unexpected fault while executing the operation".to_string(),
                ))
            });

        // Unconditional teardown, success or error
        self.env.remove_names(&installed);

        Some(match outcome {
            Ok(data) => {
                if self.config.log_operations {
                    let id = request_id.to_string();
                    Logger::info(
                        "OPERATION_COMPLETE",
                        &[
                            ("op", envelope.request.op()),
                            ("requestId", id.as_str()),
                            ("table", envelope.request.table()),
                        ],
                    );
                }
                ResultEnvelope::success(request_id, data)
            }
            Err(error) => {
                self.log_failure(&envelope, &error);
                ResultEnvelope::failure(request_id, error.payload())
            }
        })
    }

    fn log_failure(&self, envelope: &RequestEnvelope, error: &EngineError) {
        let id = envelope.request_id.to_string();
        let payload = error.payload();
        Logger::error(
            "OPERATION_FAILED",
            &[
                ("op", envelope.request.op()),
                ("requestId", id.as_str()),
                ("table", envelope.request.table()),
                ("code", &payload.code),
                ("message", &payload.message),
            ],
        );
    }

    /// Execute a parsed request against the registry
    fn dispatch(&mut self, request: &Request) -> EngineResult<Value> {
        match request {
            Request::CreateTable { table, item_type } => {
                self.registry.create(table, item_type.clone())?;
                Ok(json!("Table Created"))
            }
            Request::DropTable { table } => {
                self.registry.drop(table)?;
                Ok(json!("Table Deleted"))
            }
            Request::AddRecord { table, record } => {
                let inserted = self.registry.get_mut(table)?.add(record.clone())?;
                Ok(json!(inserted))
            }
            Request::GetRecords { table, predicate } => {
                let table = self.registry.get(table)?;
                let predicate = Predicate::compile(predicate)?;
                let records = table.get(&predicate, &self.env)?;
                Ok(Value::Array(records))
            }
            Request::ReplaceRecords {
                table,
                new_record,
                predicate,
            } => {
                let predicate = Predicate::compile(predicate)?;
                let table = self.registry.get_mut(table)?;
                let replaced = table.replace(new_record, &predicate, &self.env)?;
                Ok(json!(replaced))
            }
            Request::UpdateRecords {
                table,
                update_fn,
                predicate,
            } => {
                let predicate = Predicate::compile(predicate)?;
                let program = UpdateProgram::compile(update_fn)?;
                let table = self.registry.get_mut(table)?;
                let updated = table.update(&program, &predicate, &self.env)?;
                Ok(json!(updated))
            }
            Request::DeleteRecords { table, predicate } => {
                let predicate = Predicate::compile(predicate)?;
                let table = self.registry.get_mut(table)?;
                let removed = table.delete(&predicate, &self.env)?;
                Ok(json!(removed))
            }
            Request::FindRecord { table, predicate } => {
                let table = self.registry.get(table)?;
                let predicate = Predicate::compile(predicate)?;
                let found = table.find(&predicate, &self.env)?;
                Ok(found.unwrap_or(Value::Null))
            }
            Request::CountRecords { table, predicate } => {
                let table = self.registry.get(table)?;
                let predicate = Predicate::compile(predicate)?;
                let count = table.count(&predicate, &self.env)?;
                Ok(json!(count))
            }
            Request::GetTopRecords {
                table,
                predicate,
                start_row,
                max_rows,
                sort_property,
                descending,
            } => {
                let table = self.registry.get(table)?;
                let predicate = Predicate::compile(predicate)?;
                let page = table.get_top(
                    &predicate,
                    &self.env,
                    *start_row,
                    *max_rows,
                    sort_property,
                    *descending,
                )?;
                Ok(Value::Array(page))
            }
        }
    }

    /// Run the worker over its channels until the request side closes.
    ///
    /// One envelope is processed fully — closure teardown included — before
    /// the next is received, which is the discipline that keeps closure
    /// contexts from leaking across requests.
    pub async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<String>,
        results: mpsc::UnboundedSender<String>,
    ) {
        Logger::info("WORKER_STARTED", &[]);
        while let Some(raw) = requests.recv().await {
            if let Some(result) = self.handle(&raw) {
                if results.send(result.to_json()).is_err() {
                    Logger::error("RESULT_CHANNEL_CLOSED", &[]);
                    break;
                }
            }
        }
        Logger::info("WORKER_STOPPED", &[]);
    }

    /// Spawn the worker on a tokio task.
    ///
    /// Returns the controller-side endpoints: the request sender and the
    /// result receiver. Dropping the sender stops the worker.
    pub fn spawn(self) -> (mpsc::UnboundedSender<String>, mpsc::UnboundedReceiver<String>) {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        tokio::spawn(self.run(request_rx, result_tx));
        (request_tx, result_rx)
    }
}
