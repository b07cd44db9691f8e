use std::sync::Arc;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::{
    engine::{ExecutionArgs, ExecutionEngine},
    messenger,
    protocol::{ExecutionResult, GraphqlError, Message, OperationRequest},
    transport::Outbound,
};

/// How an operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every result was sent and the operation is due its `complete`.
    Completed,
    /// Cancelled by the client or the session. Nothing was sent after the cancellation.
    Cancelled,
    /// The transport stopped accepting messages.
    TransportClosed,
}

/// Turns a `subscribe` request into `next`/`error`/`complete` messages.
pub struct Dispatcher<E> {
    engine: Arc<E>,
    outbound: Outbound,
}

impl<E> Clone for Dispatcher<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            outbound: self.outbound.clone(),
        }
    }
}

impl<E: ExecutionEngine> Dispatcher<E> {
    pub fn new(engine: Arc<E>, outbound: Outbound) -> Self {
        Self { engine, outbound }
    }

    /// Runs the operation until it is exhausted or `cancellation` fires, then sends `complete`.
    ///
    /// A standalone entry point for callers that don't track ids themselves.
    /// Sessions use [`Dispatcher::execute`] and send `complete` once the id is released.
    pub async fn dispatch(&self, id: &str, request: OperationRequest, cancellation: &CancellationToken) -> Outcome {
        let outcome = self.execute(id, request, cancellation).await;

        if outcome != Outcome::Completed || cancellation.is_cancelled() {
            return outcome;
        }

        if self.outbound.send(messenger::complete(id)).await {
            Outcome::Completed
        } else {
            Outcome::TransportClosed
        }
    }

    /// Like [`Dispatcher::dispatch`], but leaves the `complete` to the caller.
    ///
    /// Cancellation is checked before every send and while waiting on the
    /// engine, so nothing is emitted for `id` once it has fired.
    pub async fn execute(&self, id: &str, request: OperationRequest, cancellation: &CancellationToken) -> Outcome {
        tokio::select! {
            biased;
            () = cancellation.cancelled() => {
                tracing::debug!(id, "Operation cancelled");
                Outcome::Cancelled
            }
            outcome = self.run(id, request) => outcome,
        }
    }

    async fn run(&self, id: &str, request: OperationRequest) -> Outcome {
        let OperationRequest {
            query,
            variables,
            operation_name,
            extensions,
        } = request;

        let document = match self.engine.parse(&query) {
            Ok(document) => document,
            Err(error) => return self.fail(id, vec![error]).await,
        };

        let errors = self.engine.validate(&document);
        if !errors.is_empty() {
            return self.fail(id, errors).await;
        }

        let Some(kind) = self.engine.operation_kind(&document, operation_name.as_deref()) else {
            return self.fail(id, vec![GraphqlError::unidentified_operation()]).await;
        };

        tracing::debug!(id, %kind, "Executing operation");

        let args = ExecutionArgs {
            document,
            variables,
            operation_name,
            extensions,
        };

        if kind.is_streaming() {
            let mut stream = match self.engine.execute_stream(args).await {
                Ok(stream) => stream,
                Err(errors) => return self.fail(id, errors).await,
            };

            while let Some(result) = stream.next().await {
                if !self.outbound.send(messenger::next(id, result)).await {
                    return Outcome::TransportClosed;
                }
            }
        } else {
            let result = self.engine.execute(args).await;

            if !self.outbound.send(result_message(id, result)).await {
                return Outcome::TransportClosed;
            }
        }

        Outcome::Completed
    }

    async fn fail(&self, id: &str, errors: Vec<GraphqlError>) -> Outcome {
        if self.outbound.send(messenger::error(id, errors)).await {
            Outcome::Completed
        } else {
            Outcome::TransportClosed
        }
    }
}

fn result_message(id: &str, result: ExecutionResult) -> Message {
    if result.is_request_error() {
        messenger::error(id, result.errors)
    } else {
        messenger::next(id, result)
    }
}
