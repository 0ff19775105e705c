use framework::exception::WeatherRsResult;
use framework::schedule::JobContext;
use tracing::info;

use crate::AppState;
use crate::weather::WeatherReport;

/// Where a tick's reports go; in production the kafka producer, keyed by
/// city so all reports of one city stay on one partition.
trait ReportSink {
    async fn publish(&self, report: &WeatherReport) -> WeatherRsResult<()>;
}

impl ReportSink for AppState {
    async fn publish(&self, report: &WeatherReport) -> WeatherRsResult<()> {
        self.producer
            .send(&self.topics.weather, Some(report.city.clone()), report)
            .await?;
        info!(
            "published weather, city={}, date={}, temperature={:.1}, condition={}",
            report.city, report.date, report.temperature, report.condition
        );
        Ok(())
    }
}

pub async fn publish_weather_job(state: &'static AppState, context: JobContext) -> WeatherRsResult<()> {
    let today = context.scheduled_time.date_naive();
    let reports = state.generator.generate(today, &mut rand::rng());
    publish_reports(state, reports).await
}

// one publish per report; a failed publish aborts the rest of the tick
async fn publish_reports(sink: &impl ReportSink, reports: Vec<WeatherReport>) -> WeatherRsResult<()> {
    for report in reports {
        sink.publish(&report).await?;
    }
    Ok(())
}
