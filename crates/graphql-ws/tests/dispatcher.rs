mod utils;

use graphql_ws::{
    dispatcher::Outcome, Dispatcher, ExecutionResult, GraphqlError, OperationRequest, Outbound, Outgoing,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use utils::{data, MockEngine};

fn sent(outgoing: &mut graphql_ws::transport::OutgoingReceiver) -> Vec<serde_json::Value> {
    let mut messages = Vec::new();

    while let Ok(message) = outgoing.try_recv() {
        match message {
            Outgoing::Message(message) => messages.push(serde_json::to_value(message).unwrap()),
            Outgoing::Close(frame) => unreachable!("dispatching never closes, got {frame:?}"),
        }
    }

    messages
}

#[tokio::test]
async fn dispatch_ends_with_complete() {
    let (outbound, mut outgoing) = Outbound::channel(16);
    let dispatcher = Dispatcher::new(MockEngine::new(), outbound);

    let outcome = dispatcher
        .dispatch("1", OperationRequest::new("{ hello }"), &CancellationToken::new())
        .await;

    assert_eq!(outcome, Outcome::Completed);
    insta::assert_json_snapshot!(sent(&mut outgoing), @r#"
    [
      {
        "type": "next",
        "id": "1",
        "payload": {
          "data": {
            "hello": "world"
          }
        }
      },
      {
        "type": "complete",
        "id": "1"
      }
    ]
    "#);
}

#[tokio::test]
async fn execute_leaves_complete_to_the_caller() {
    let (outbound, mut outgoing) = Outbound::channel(16);
    let dispatcher = Dispatcher::new(MockEngine::new(), outbound);

    let outcome = dispatcher
        .execute("1", OperationRequest::new("syntax error"), &CancellationToken::new())
        .await;

    assert_eq!(outcome, Outcome::Completed);

    let messages = sent(&mut outgoing);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["type"], "error");
}

#[tokio::test]
async fn every_streamed_item_is_sent_as_next() {
    let engine = MockEngine::new();
    let items = engine.stream();
    items.send(data(json!({"greetings": "a"}))).unwrap();
    items
        .send(ExecutionResult::request_error([GraphqlError::new("boom")]))
        .unwrap();
    items.send(data(json!({"greetings": "c"}))).unwrap();
    drop(items);

    let (outbound, mut outgoing) = Outbound::channel(16);
    let dispatcher = Dispatcher::new(engine, outbound);

    let outcome = dispatcher
        .dispatch(
            "s",
            OperationRequest::new("subscription { greetings }"),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome, Outcome::Completed);
    insta::assert_json_snapshot!(sent(&mut outgoing), @r#"
    [
      {
        "type": "next",
        "id": "s",
        "payload": {
          "data": {
            "greetings": "a"
          }
        }
      },
      {
        "type": "next",
        "id": "s",
        "payload": {
          "errors": [
            {
              "message": "boom"
            }
          ]
        }
      },
      {
        "type": "next",
        "id": "s",
        "payload": {
          "data": {
            "greetings": "c"
          }
        }
      },
      {
        "type": "complete",
        "id": "s"
      }
    ]
    "#);
}

#[tokio::test]
async fn streams_that_fail_to_start_send_error() {
    let (outbound, mut outgoing) = Outbound::channel(16);
    let dispatcher = Dispatcher::new(MockEngine::new(), outbound);

    let outcome = dispatcher
        .dispatch(
            "s",
            OperationRequest::new("subscription { requestError }"),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome, Outcome::Completed);

    let types = sent(&mut outgoing)
        .into_iter()
        .map(|message| message["type"].as_str().unwrap().to_owned())
        .collect::<Vec<_>>();
    assert_eq!(types, ["error", "complete"]);
}

#[tokio::test]
async fn cancelled_operations_send_nothing() {
    let (outbound, mut outgoing) = Outbound::channel(16);
    let dispatcher = Dispatcher::new(MockEngine::new(), outbound);

    let cancellation = CancellationToken::new();
    cancellation.cancel();

    let outcome = dispatcher
        .dispatch("1", OperationRequest::new("{ hello }"), &cancellation)
        .await;

    assert_eq!(outcome, Outcome::Cancelled);
    assert!(sent(&mut outgoing).is_empty());
}

#[tokio::test]
async fn closed_transports_stop_the_operation() {
    let (outbound, outgoing) = Outbound::channel(16);
    drop(outgoing);

    let dispatcher = Dispatcher::new(MockEngine::new(), outbound);

    let outcome = dispatcher
        .dispatch(
            "s",
            OperationRequest::new("subscription { greetings }"),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome, Outcome::TransportClosed);
}
