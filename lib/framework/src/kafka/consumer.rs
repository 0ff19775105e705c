use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::time::Duration;
use std::time::Instant;

use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::Utc;
use futures::future::join_all;
use rdkafka::ClientConfig;
use rdkafka::Message as _;
use rdkafka::Timestamp;
use rdkafka::config::RDKafkaLogLevel;
use rdkafka::consumer::BaseConsumer;
use rdkafka::consumer::CommitMode;
use rdkafka::consumer::Consumer as _;
use rdkafka::error::KafkaError;
use rdkafka::message::BorrowedMessage;
use rdkafka::util::Timeout;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::Instrument as _;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::info_span;

use super::topic::Topic;
use crate::exception::WeatherRsResult;
use crate::json::from_json;
use crate::log;

pub struct Message<T: DeserializeOwned> {
    pub key: Option<String>,
    pub payload: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> Message<T> {
    pub fn new(key: Option<String>, payload: Option<String>) -> Self {
        Message {
            key,
            payload,
            timestamp: None,
            _marker: PhantomData,
        }
    }

    /// Decodes the payload, treating a missing, empty or undecodable payload
    /// as an absent value rather than an error.
    pub fn value(&self) -> Option<T> {
        let payload = self.payload.as_deref()?;
        if payload.is_empty() {
            return None;
        }
        match from_json(payload) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(payload, "undecodable payload, error={e}");
                None
            }
        }
    }
}

trait MessageHandler<S>: Send {
    fn handle(&self, state: S, messages: Vec<BorrowedMessage>) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

impl<F, Fut, S> MessageHandler<S> for F
where
    F: Fn(S, Vec<BorrowedMessage>) -> Fut + Send,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn handle(&self, state: S, messages: Vec<BorrowedMessage>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(self(state, messages))
    }
}

pub struct ConsumerConfig {
    pub poll_max_wait_time: Duration,
    pub poll_max_records: usize,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            poll_max_wait_time: Duration::from_secs(1),
            poll_max_records: 1000,
        }
    }
}

pub struct MessageConsumer<S> {
    config: ClientConfig,
    handlers: HashMap<&'static str, Box<dyn MessageHandler<S>>>,
    poll_max_wait_time: Duration,
    poll_max_records: usize,
}

impl<S> MessageConsumer<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(bootstrap_servers: &str, group_id: &str, config: ConsumerConfig) -> Self {
        Self {
            config: ClientConfig::new()
                .set("group.id", group_id)
                .set("bootstrap.servers", bootstrap_servers)
                .set("enable.auto.commit", "false")
                .set_log_level(RDKafkaLogLevel::Info)
                .to_owned(),
            handlers: HashMap::new(),
            poll_max_wait_time: config.poll_max_wait_time,
            poll_max_records: config.poll_max_records,
        }
    }

    pub fn add_handler<H, Fut, M>(&mut self, topic: &Topic<M>, handler: H)
    where
        H: Fn(S, Message<M>) -> Fut + Copy + Send + Sync + 'static,
        Fut: Future<Output = WeatherRsResult<()>> + Send + 'static,
        M: DeserializeOwned + Send + 'static,
    {
        let topic = topic.name;
        let handler = move |state: S, messages: Vec<BorrowedMessage>| {
            let messages: Vec<Message<M>> = messages.into_iter().map(Message::from).collect();
            handle_messages(topic, messages, handler, state)
        };

        self.handlers.insert(topic, Box::new(handler));
    }

    pub async fn start(self, state: S, mut shutdown_signal: broadcast::Receiver<()>) -> WeatherRsResult<()> {
        let handlers = self.handlers;
        let consumer: BaseConsumer = self.config.create()?;
        let topics: Vec<&str> = handlers.keys().copied().collect();
        consumer.subscribe(&topics)?;

        info!("kafka consumer started, topics={:?}", topics);

        loop {
            match poll_message_groups(&consumer, self.poll_max_wait_time, self.poll_max_records) {
                Ok(topic_messages) => {
                    let mut handles = Vec::with_capacity(topic_messages.len());
                    for (topic, messages) in topic_messages {
                        if let Some(handler) = handlers.get(topic.as_str()) {
                            handles.push(tokio::spawn(handler.handle(state.clone(), messages)));
                        }
                    }
                    join_all(handles).await;
                    if let Err(e) = consumer.commit_consumer_state(CommitMode::Async) {
                        error!(error = ?e, "failed to commit messages");
                    }
                }
                Err(e) => {
                    error!(error = ?e, "failed to poll messages");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }

            if shutdown_signal.try_recv().is_ok() {
                info!("kafka consumer stopped, topics={:?}", topics);
                return Ok(());
            }
        }
    }
}

impl<T: DeserializeOwned> From<BorrowedMessage<'_>> for Message<T> {
    fn from(message: BorrowedMessage) -> Message<T> {
        let key = message.key().map(|data| String::from_utf8_lossy(data).to_string());
        let payload = message.payload().map(|data| String::from_utf8_lossy(data).to_string());

        let timestamp = match message.timestamp() {
            Timestamp::CreateTime(time) => DateTime::from_timestamp_millis(time),
            _ => None,
        };

        Message {
            key,
            payload,
            timestamp,
            _marker: PhantomData,
        }
    }
}

fn poll_message_groups(
    consumer: &BaseConsumer,
    max_wait_time: Duration,
    max_records: usize,
) -> Result<HashMap<String, Vec<BorrowedMessage<'_>>>, KafkaError> {
    let mut messages: HashMap<String, Vec<BorrowedMessage>> = HashMap::new();
    let start_time = Instant::now();
    let mut count = 0;
    loop {
        let elapsed = start_time.elapsed();
        if elapsed >= max_wait_time {
            break;
        }

        if batch_full(count, max_records) {
            break;
        }

        if let Some(result) = consumer.poll(Timeout::After(max_wait_time.saturating_sub(elapsed))) {
            let message = result?;
            let topic = message.topic().to_owned();
            messages.entry(topic).or_default().push(message);
            count += 1;
        }
    }
    Ok(messages)
}

fn batch_full(count: usize, max_records: usize) -> bool {
    count >= max_records
}

struct MessageNode<M>
where
    M: DeserializeOwned,
{
    message: Message<M>,
    next: Option<Vec<MessageNode<M>>>,
}

// messages sharing a key are handled sequentially in delivery order,
// distinct keys are handled concurrently
async fn handle_messages<H, S, M, Fut>(topic: &'static str, messages: Vec<Message<M>>, handler: H, state: S)
where
    S: Clone + Send + Sync + 'static,
    H: Fn(S, Message<M>) -> Fut + Copy + Send + Sync + 'static,
    Fut: Future<Output = WeatherRsResult<()>> + Send,
    M: DeserializeOwned + Send + 'static,
{
    let mut handles = Vec::with_capacity(messages.len());
    let mut nodes: HashMap<String, MessageNode<M>> = HashMap::new();
    for message in messages {
        if let Some(ref key) = message.key {
            if let Some(node) = nodes.get_mut(key) {
                if let Some(ref mut next) = node.next {
                    next.push(MessageNode { message, next: None });
                } else {
                    node.next = Some(vec![MessageNode { message, next: None }]);
                }
            } else {
                nodes.insert(key.to_owned(), MessageNode { message, next: None });
            }
        } else {
            let state = state.clone();
            handles.push(tokio::spawn(async move {
                handle_message(topic, message, handler, state).await;
            }));
        }
    }

    for node in nodes.into_values() {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            handle_message(topic, node.message, handler, state.clone()).await;
            if let Some(next) = node.next {
                for next_node in next {
                    handle_message(topic, next_node.message, handler, state.clone()).await;
                }
            }
        }));
    }

    join_all(handles).await;
}

async fn handle_message<H, S, M, Fut>(topic: &'static str, message: Message<M>, handler: H, state: S)
where
    H: Fn(S, Message<M>) -> Fut,
    Fut: Future<Output = WeatherRsResult<()>>,
    M: DeserializeOwned,
{
    let span = info_span!("message", topic, key = message.key);
    async {
        debug!(key = message.key, payload = message.payload, "[message]");
        if let Some(timestamp) = message.timestamp {
            debug!(timestamp = timestamp.to_rfc3339_opts(SecondsFormat::Millis, true), "[message]");
            let lag = Utc::now() - timestamp;
            debug!("lag={lag}");
        }
        if let Err(e) = handler(state, message).await {
            log::log_exception(&e);
        }
    }
    .instrument(span)
    .await;
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::Message;

    #[derive(Debug, Deserialize, PartialEq)]
    struct TestMessage {
        name: String,
    }

    #[test]
    fn value_of_absent_payload() {
        let message: Message<TestMessage> = Message::new(Some("key".to_string()), None);
        assert!(message.value().is_none());
    }

    #[test]
    fn value_of_empty_payload() {
        let message: Message<TestMessage> = Message::new(Some("key".to_string()), Some(String::new()));
        assert!(message.value().is_none());
    }

    #[test]
    fn value_of_undecodable_payload() {
        let message: Message<TestMessage> = Message::new(None, Some("not json".to_string()));
        assert!(message.value().is_none());
    }

    #[test]
    fn batch_full() {
        // a poll batch holds up to max_records messages, not max_records - 1
        assert!(!super::batch_full(999, 1000));
        assert!(super::batch_full(1000, 1000));
    }

    #[test]
    fn value_of_valid_payload() {
        let message: Message<TestMessage> = Message::new(None, Some(r#"{"name":"test"}"#.to_string()));
        assert_eq!(
            message.value(),
            Some(TestMessage {
                name: "test".to_string()
            })
        );
    }
}
