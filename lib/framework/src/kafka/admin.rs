use rdkafka::ClientConfig;
use rdkafka::admin::AdminClient;
use rdkafka::admin::AdminOptions;
use rdkafka::admin::NewTopic;
use rdkafka::admin::TopicReplication;
use rdkafka::client::DefaultClientContext;
use rdkafka::types::RDKafkaErrorCode;
use tracing::info;

use crate::exception::WeatherRsResult;

/// Declares a topic at startup, a no-op when the topic already exists.
pub async fn create_topic(
    bootstrap_servers: &str,
    name: &str,
    partitions: i32,
    replication: i32,
) -> WeatherRsResult<()> {
    let admin: AdminClient<DefaultClientContext> = ClientConfig::new()
        .set("bootstrap.servers", bootstrap_servers)
        .create()?;

    let topic = NewTopic::new(name, partitions, TopicReplication::Fixed(replication));
    let results = admin.create_topics(&[topic], &AdminOptions::new()).await?;
    for result in results {
        match result {
            Ok(topic) => info!(topic, partitions, replication, "topic created"),
            Err((_, RDKafkaErrorCode::TopicAlreadyExists)) => {}
            Err((topic, code)) => {
                return Err(exception!(message = format!("failed to create topic, topic={topic}, code={code}")));
            }
        }
    }
    Ok(())
}
