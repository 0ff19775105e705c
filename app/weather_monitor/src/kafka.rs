use chrono::NaiveDate;
use framework::exception::WeatherRsResult;
use framework::kafka::consumer::Message;
use serde::Deserialize;
use tracing::info;
use tracing::warn;

use crate::AppState;

// weather message schema from the publisher
#[derive(Debug, Deserialize)]
pub struct WeatherReport {
    pub city: String,
    pub date: NaiveDate,
    pub temperature: f64,
    pub condition: String,
}

/// Pure observer: one info line per report, one warning per empty or
/// undecodable delivery. The report itself is never inspected further.
pub async fn weather_report_handler(_state: &'static AppState, message: Message<WeatherReport>) -> WeatherRsResult<()> {
    match message.value() {
        Some(report) => info!(
            "received weather, city={}, date={}, temperature={:.1}, condition={}",
            report.city, report.date, report.temperature, report.condition
        ),
        None => warn!(key = message.key, "empty weather message"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fmt::Debug;
    use std::fmt::Write as _;
    use std::sync::Arc;
    use std::sync::Mutex;

    use framework::kafka::consumer::Message;
    use tracing::Event;
    use tracing::Level;
    use tracing::Subscriber;
    use tracing::field::Field;
    use tracing::field::Visit;
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::Context;
    use tracing_subscriber::layer::SubscriberExt as _;

    use super::WeatherReport;
    use super::weather_report_handler;
    use crate::AppState;

    #[derive(Default)]
    struct CapturedLogs {
        warns: Vec<String>,
        infos: Vec<String>,
    }

    #[derive(Default, Clone)]
    struct CaptureLayer {
        logs: Arc<Mutex<CapturedLogs>>,
    }

    impl<S: Subscriber> Layer<S> for CaptureLayer {
        fn on_event(&self, event: &Event<'_>, _context: Context<'_, S>) {
            let mut visitor = LineVisitor::default();
            event.record(&mut visitor);
            let mut logs = self.logs.lock().unwrap();
            match *event.metadata().level() {
                Level::WARN => logs.warns.push(visitor.line),
                Level::INFO => logs.infos.push(visitor.line),
                _ => {}
            }
        }
    }

    #[derive(Default)]
    struct LineVisitor {
        line: String,
    }

    impl Visit for LineVisitor {
        fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
            let _ = write!(self.line, "{}={:?} ", field.name(), value);
        }
    }

    fn state() -> &'static AppState {
        Box::leak(Box::new(AppState {}))
    }

    #[tokio::test]
    async fn warn_once_on_absent_value() {
        let layer = CaptureLayer::default();
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(layer.clone()));

        let message: Message<WeatherReport> = Message::new(Some("Moscow".to_string()), None);
        weather_report_handler(state(), message).await.unwrap();

        let logs = layer.logs.lock().unwrap();
        assert_eq!(logs.warns.len(), 1);
        assert!(logs.warns[0].contains("Moscow"), "warn={}", logs.warns[0]);
        assert!(logs.infos.is_empty(), "infos={:?}", logs.infos);
    }

    #[tokio::test]
    async fn warn_once_on_undecodable_value() {
        let layer = CaptureLayer::default();
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(layer.clone()));

        let message: Message<WeatherReport> = Message::new(Some("Moscow".to_string()), Some("{broken".to_string()));
        weather_report_handler(state(), message).await.unwrap();

        let logs = layer.logs.lock().unwrap();
        assert_eq!(logs.warns.len(), 1);
        assert!(logs.warns[0].contains("Moscow"), "warn={}", logs.warns[0]);
        assert!(logs.infos.is_empty(), "infos={:?}", logs.infos);
    }

    #[tokio::test]
    async fn info_once_on_present_value() {
        let layer = CaptureLayer::default();
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(layer.clone()));

        let payload = r#"{"city":"Magadan","date":"2024-01-15","temperature":3.5,"condition":"rain"}"#;
        let message: Message<WeatherReport> = Message::new(Some("Magadan".to_string()), Some(payload.to_string()));
        weather_report_handler(state(), message).await.unwrap();

        let logs = layer.logs.lock().unwrap();
        assert_eq!(logs.infos.len(), 1);
        assert!(logs.infos[0].contains("Magadan"), "info={}", logs.infos[0]);
        assert!(logs.infos[0].contains("2024-01-15"), "info={}", logs.infos[0]);
        assert!(logs.infos[0].contains("rain"), "info={}", logs.infos[0]);
        assert!(logs.warns.is_empty(), "warns={:?}", logs.warns);
    }
}
