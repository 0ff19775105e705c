use framework::asset::asset_path;
use framework::exception::WeatherRsResult;
use framework::json;
use framework::kafka::consumer::ConsumerConfig;
use framework::kafka::consumer::MessageConsumer;
use framework::kafka::topic::Topic;
use framework::log;
use framework::shutdown::Shutdown;
use serde::Deserialize;

use crate::kafka::weather_report_handler;

mod kafka;

#[derive(Debug, Deserialize, Clone)]
struct AppConfig {
    kafka_uri: String,
}

pub struct AppState {}

#[tokio::main]
async fn main() -> WeatherRsResult<()> {
    log::init();

    let config: AppConfig = json::load_file(&asset_path("assets/conf.json")?)?;

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    shutdown.listen();

    let state = Box::leak(Box::new(AppState {}));

    let mut consumer = MessageConsumer::new(&config.kafka_uri, "weather-group", ConsumerConfig::default());
    consumer.add_handler(&Topic::new("weather"), weather_report_handler);
    consumer.start(state, signal).await
}
