use std::time::Duration;

use async_graphql::{EmptyMutation, Object, Schema, Subscription};
use futures_util::{stream, Stream, StreamExt};

pub type DemoSchema = Schema<Query, EmptyMutation, Greetings>;

const GREETINGS: [&str; 5] = ["Hi", "Bonjour", "Hola", "Ciao", "Zdravo"];

pub struct Query;

#[Object]
impl Query {
    async fn hello(&self) -> &str {
        "world"
    }
}

pub struct Greetings;

#[Subscription]
impl Greetings {
    /// Greets in a few languages, one greeting per `interval_ms`.
    async fn greetings(&self, #[graphql(default = 0)] interval_ms: u32) -> impl Stream<Item = &'static str> {
        let interval = Duration::from_millis(u64::from(interval_ms));

        stream::iter(GREETINGS).then(move |greeting| async move {
            if !interval.is_zero() {
                tokio::time::sleep(interval).await;
            }
            greeting
        })
    }
}

pub fn build() -> DemoSchema {
    Schema::new(Query, EmptyMutation, Greetings)
}
