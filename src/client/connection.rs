//! Controller-side channel wiring
//!
//! A [`Connection`] owns the request sender and a background task that pumps
//! result envelopes into the [`Correlator`]. `submit` never blocks: it
//! records the handler, sends the envelope, and returns. The
//! one-method-per-operation façade lives above this layer; envelope
//! construction is [`RequestEnvelope`]'s job.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::engine::Worker;
use crate::protocol::{ErrorPayload, RequestEnvelope};

use super::correlator::Correlator;
use super::errors::{ClientError, ClientResult};

/// One controller endpoint of a spawned worker
pub struct Connection {
    requests: mpsc::UnboundedSender<String>,
    correlator: Arc<Correlator>,
}

impl Connection {
    /// Wrap existing channel endpoints and start the result pump
    pub fn new(
        requests: mpsc::UnboundedSender<String>,
        mut results: mpsc::UnboundedReceiver<String>,
    ) -> Self {
        let correlator = Arc::new(Correlator::new());

        let pump = Arc::clone(&correlator);
        tokio::spawn(async move {
            while let Some(raw) = results.recv().await {
                pump.process_raw(&raw);
            }
        });

        Self {
            requests,
            correlator,
        }
    }

    /// Spawn a worker and connect to it
    pub fn open(worker: Worker) -> Self {
        let (requests, results) = worker.spawn();
        Self::new(requests, results)
    }

    /// Send an envelope; the handler runs when the matching result arrives.
    ///
    /// Never blocks. A send failure unregisters the handler and reports
    /// `ChannelClosed` immediately.
    pub fn submit(
        &self,
        envelope: RequestEnvelope,
        handler: impl FnOnce(Option<ErrorPayload>, Value) + Send + 'static,
    ) -> ClientResult<()> {
        let request_id = envelope.request_id;
        self.correlator.register(request_id, Box::new(handler));

        if self.requests.send(envelope.to_json()).is_err() {
            self.correlator.discard(request_id);
            return Err(ClientError::ChannelClosed);
        }
        Ok(())
    }

    /// Submit and await the single result for this envelope
    pub async fn call(&self, envelope: RequestEnvelope) -> ClientResult<(Option<ErrorPayload>, Value)> {
        let (tx, rx) = oneshot::channel();
        self.submit(envelope, move |error, data| {
            let _ = tx.send((error, data));
        })?;
        rx.await.map_err(|_| ClientError::ChannelClosed)
    }

    /// Number of requests still awaiting a result
    pub fn pending_len(&self) -> usize {
        self.correlator.pending_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn seeded_connection() -> Connection {
        let connection = Connection::open(Worker::new());
        connection
            .call(RequestEnvelope::create_table("t"))
            .await
            .unwrap();
        for name in ["a", "b", "c"] {
            connection
                .call(RequestEnvelope::add_record("t", json!({"name": name})))
                .await
                .unwrap();
        }
        connection
    }

    #[tokio::test]
    async fn test_end_to_end_query_flow() {
        let connection = seeded_connection().await;

        let (error, count) = connection
            .call(RequestEnvelope::count_records("t", "true"))
            .await
            .unwrap();
        assert!(error.is_none());
        assert_eq!(count, json!(3));

        let (error, removed) = connection
            .call(RequestEnvelope::delete_records("t", "item.name == 'b'"))
            .await
            .unwrap();
        assert!(error.is_none());
        assert_eq!(removed, json!(1));

        let (_, rest) = connection
            .call(RequestEnvelope::get_records("t", "true"))
            .await
            .unwrap();
        assert_eq!(rest, json!([{"name": "a"}, {"name": "c"}]));

        assert_eq!(connection.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_error_results_are_correlated() {
        let connection = Connection::open(Worker::new());

        let (error, data) = connection
            .call(RequestEnvelope::drop_table("ghost"))
            .await
            .unwrap();
        assert_eq!(error.unwrap().code, "EMBER_TABLE_NOT_FOUND");
        assert_eq!(data, Value::Null);
    }

    #[tokio::test]
    async fn test_submit_does_not_block() {
        let connection = seeded_connection().await;

        // Fire several requests before any result is consumed
        let mut receivers = Vec::new();
        for _ in 0..4 {
            let (tx, rx) = oneshot::channel();
            connection
                .submit(RequestEnvelope::count_records("t", "true"), move |_, data| {
                    let _ = tx.send(data);
                })
                .unwrap();
            receivers.push(rx);
        }

        for rx in receivers {
            assert_eq!(rx.await.unwrap(), json!(3));
        }
    }

    #[tokio::test]
    async fn test_closure_scoped_to_single_request() {
        let connection = seeded_connection().await;

        let (error, matched) = connection
            .call(
                RequestEnvelope::count_records("t", "item.name == value")
                    .with_closure(json!({"value": "a"})),
            )
            .await
            .unwrap();
        assert!(error.is_none());
        assert_eq!(matched, json!(1));

        // Next request without the closure must fail, not reuse the binding
        let (error, _) = connection
            .call(RequestEnvelope::count_records("t", "item.name == value"))
            .await
            .unwrap();
        assert_eq!(error.unwrap().code, "EMBER_EVAL_ERROR");
    }

    #[tokio::test]
    async fn test_submit_to_dead_worker_fails_fast() {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (_result_tx, result_rx) = mpsc::unbounded_channel::<String>();
        drop(request_rx);
        let connection = Connection::new(request_tx, result_rx);

        let result = connection.call(RequestEnvelope::create_table("t")).await;
        assert_eq!(result, Err(ClientError::ChannelClosed));
        assert_eq!(connection.pending_len(), 0);
    }
}
