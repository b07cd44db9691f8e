//! The contract between a session and whatever parses, validates and executes GraphQL.

#[cfg(feature = "async-graphql")]
mod async_graphql;

use std::future::Future;

use futures_util::stream::BoxStream;

use crate::protocol::{ExecutionResult, GraphqlError, JsonMap};

#[cfg(feature = "async-graphql")]
pub use self::async_graphql::{AsyncGraphqlDocument, AsyncGraphqlEngine};

pub type ResultStream = BoxStream<'static, ExecutionResult>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    /// Subscriptions produce a stream of results, everything else a single one.
    pub fn is_streaming(self) -> bool {
        matches!(self, OperationKind::Subscription)
    }
}

/// Everything an executor needs besides the schema, which the engine owns.
#[derive(Debug, Clone)]
pub struct ExecutionArgs<D> {
    pub document: D,
    pub variables: Option<JsonMap>,
    pub operation_name: Option<String>,
    pub extensions: Option<JsonMap>,
}

/// A GraphQL implementation bound to a schema.
///
/// The engine is shared by every session of a server, hence `Send + Sync`.
/// `execute_stream` must return a lazy stream: dropping it has to stop the
/// underlying subscription.
pub trait ExecutionEngine: Send + Sync + 'static {
    type Document: Send + 'static;

    fn parse(&self, query: &str) -> Result<Self::Document, GraphqlError>;

    /// Validates a document against the schema. An empty list means the document is valid.
    fn validate(&self, document: &Self::Document) -> Vec<GraphqlError>;

    /// The kind of the operation that will run, or `None` if the document and
    /// operation name don't designate exactly one operation.
    fn operation_kind(&self, document: &Self::Document, operation_name: Option<&str>) -> Option<OperationKind>;

    fn execute(&self, args: ExecutionArgs<Self::Document>) -> impl Future<Output = ExecutionResult> + Send;

    /// Starts a streaming operation. Errors that keep the operation from
    /// starting are returned instead of a stream, every item of a started
    /// stream is a `next` payload.
    fn execute_stream(
        &self,
        args: ExecutionArgs<Self::Document>,
    ) -> impl Future<Output = Result<ResultStream, Vec<GraphqlError>>> + Send;
}
