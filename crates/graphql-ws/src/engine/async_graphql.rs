use std::future::Future;

use ::async_graphql::{
    parser::{
        parse_query,
        types::{DocumentOperations, ExecutableDocument, OperationType},
    },
    Executor, ServerError, Variables,
};
use futures_util::{stream, StreamExt};

use super::{ExecutionArgs, ExecutionEngine, OperationKind, ResultStream};
use crate::protocol::{ExecutionResult, GraphqlError};

/// Runs operations with an `async_graphql` executor, usually a `Schema`.
///
/// `async_graphql` validates documents as part of execution, so `validate`
/// accepts everything and validation failures come back as request errors
/// from the executors.
pub struct AsyncGraphqlEngine<E> {
    executor: E,
}

impl<E: Executor> AsyncGraphqlEngine<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }
}

#[derive(Debug)]
pub struct AsyncGraphqlDocument {
    source: String,
    document: ExecutableDocument,
}

impl<E: Executor> ExecutionEngine for AsyncGraphqlEngine<E> {
    type Document = AsyncGraphqlDocument;

    fn parse(&self, query: &str) -> Result<Self::Document, GraphqlError> {
        match parse_query(query) {
            Ok(document) => Ok(AsyncGraphqlDocument {
                source: query.to_owned(),
                document,
            }),
            Err(error) => Err(into_graphql_error(ServerError::from(error))),
        }
    }

    fn validate(&self, _document: &Self::Document) -> Vec<GraphqlError> {
        Vec::new()
    }

    fn operation_kind(&self, document: &Self::Document, operation_name: Option<&str>) -> Option<OperationKind> {
        let operation = match (&document.document.operations, operation_name) {
            (DocumentOperations::Single(operation), _) => operation,
            (DocumentOperations::Multiple(operations), Some(name)) => operations.get(name)?,
            (DocumentOperations::Multiple(operations), None) if operations.len() == 1 => operations.values().next()?,
            (DocumentOperations::Multiple(_), None) => return None,
        };

        Some(match operation.node.ty {
            OperationType::Query => OperationKind::Query,
            OperationType::Mutation => OperationKind::Mutation,
            OperationType::Subscription => OperationKind::Subscription,
        })
    }

    fn execute(&self, args: ExecutionArgs<Self::Document>) -> impl Future<Output = ExecutionResult> + Send {
        let request = into_request(args);

        async move { into_execution_result(self.executor.execute(request).await) }
    }

    fn execute_stream(
        &self,
        args: ExecutionArgs<Self::Document>,
    ) -> impl Future<Output = Result<ResultStream, Vec<GraphqlError>>> + Send {
        let results = self
            .executor
            .execute_stream(into_request(args), None)
            .map(into_execution_result)
            .boxed();

        async move {
            // subscriptions that fail to start come back as the only item of the stream
            let (first, rest) = results.into_future().await;

            match first {
                Some(result) if result.is_request_error() => Err(result.errors),
                Some(result) => Ok(stream::once(async move { result }).chain(rest).boxed()),
                None => Ok(rest),
            }
        }
    }
}

fn into_request(
    ExecutionArgs {
        document,
        variables,
        operation_name,
        extensions,
    }: ExecutionArgs<AsyncGraphqlDocument>,
) -> ::async_graphql::Request {
    let mut request = ::async_graphql::Request::new(document.source);

    if let Some(variables) = variables {
        request = request.variables(Variables::from_json(serde_json::Value::Object(variables)));
    }

    if let Some(name) = operation_name {
        request = request.operation_name(name);
    }

    for (key, value) in extensions.into_iter().flatten() {
        match ::async_graphql::Value::from_json(value) {
            Ok(value) => {
                request.extensions.insert(key, value);
            }
            Err(error) => tracing::debug!("Dropping request extension {key}: {error}"),
        }
    }

    request
}

// async-graphql always serializes `data`, so request errors are recognized by
// a null result whose errors don't point into the response.
fn into_execution_result(response: ::async_graphql::Response) -> ExecutionResult {
    let result = serde_json::to_value(&response).and_then(serde_json::from_value::<ExecutionResult>);

    let mut result = match result {
        Ok(result) => result,
        Err(error) => {
            tracing::error!("Could not convert an async-graphql response: {error}");
            return ExecutionResult::request_error([GraphqlError::internal_server_error()]);
        }
    };

    let is_request_error = matches!(result.data, Some(None))
        && !result.errors.is_empty()
        && result.errors.iter().all(|error| error.path.is_empty());

    if is_request_error {
        result.data = None;
    }

    result
}

fn into_graphql_error(error: ServerError) -> GraphqlError {
    serde_json::to_value(&error)
        .and_then(serde_json::from_value)
        .unwrap_or_else(|_| GraphqlError::new(error.message))
}
