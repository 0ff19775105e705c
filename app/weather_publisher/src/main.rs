use std::time::Duration;

use framework::asset::asset_path;
use framework::exception::WeatherRsResult;
use framework::json;
use framework::kafka::admin::create_topic;
use framework::kafka::producer::Producer;
use framework::kafka::topic::Topic;
use framework::log;
use framework::schedule::Scheduler;
use framework::shutdown::Shutdown;
use serde::Deserialize;

use crate::job::publish_weather_job;
use crate::weather::WeatherGenerator;
use crate::weather::WeatherReport;

mod job;
mod weather;

#[derive(Debug, Deserialize, Clone)]
struct AppConfig {
    kafka_uri: String,
    #[serde(default = "default_publish_interval_ms")]
    publish_interval_ms: u64,
}

fn default_publish_interval_ms() -> u64 {
    10_000
}

pub struct AppState {
    generator: WeatherGenerator,
    producer: Producer,
    topics: Topics,
}

struct Topics {
    weather: Topic<WeatherReport>,
}

#[tokio::main]
async fn main() -> WeatherRsResult<()> {
    log::init();

    let config: AppConfig = json::load_file(&asset_path("assets/conf.json")?)?;

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    shutdown.listen();

    // precondition for keyed publishing, no-op once the topic exists
    create_topic(&config.kafka_uri, "weather", 3, 1).await?;

    let state = Box::leak(Box::new(AppState {
        generator: WeatherGenerator::default(),
        producer: Producer::new(&config.kafka_uri, env!("CARGO_BIN_NAME")),
        topics: Topics {
            weather: Topic::new("weather"),
        },
    }));

    let mut scheduler = Scheduler::new();
    scheduler.schedule_fixed_rate(
        "publish_weather",
        publish_weather_job,
        Duration::from_millis(config.publish_interval_ms),
    );
    scheduler.start(state, signal).await
}
