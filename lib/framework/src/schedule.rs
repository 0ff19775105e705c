use std::pin::Pin;
use std::time::Duration;

use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time;
use tracing::Instrument as _;
use tracing::debug;
use tracing::info;
use tracing::info_span;

use crate::exception::WeatherRsResult;
use crate::log;

pub struct JobContext {
    pub name: &'static str,
    pub scheduled_time: DateTime<Utc>,
}

trait Job<S>: Send {
    fn execute(&self, state: S, context: JobContext) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

impl<F, Fut, S> Job<S> for F
where
    F: Fn(S, JobContext) -> Fut + Send,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn execute(&self, state: S, context: JobContext) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(self(state, context))
    }
}

struct Schedule<S> {
    name: &'static str,
    job: Box<dyn Job<S>>,
    interval: Duration,
}

#[derive(Default)]
pub struct Scheduler<S> {
    schedules: Vec<Schedule<S>>,
}

impl<S> Scheduler<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self { schedules: Vec::new() }
    }

    pub fn schedule_fixed_rate<J, Fut>(&mut self, name: &'static str, job: J, interval: Duration)
    where
        J: Fn(S, JobContext) -> Fut + Copy + Send + Sync + 'static,
        Fut: Future<Output = WeatherRsResult<()>> + Send + 'static,
    {
        let job = move |state: S, context| process_job(job, state, context);
        self.schedules.push(Schedule {
            name,
            job: Box::new(job),
            interval,
        });
    }

    pub async fn start(self, state: S, shutdown_signal: broadcast::Receiver<()>) -> WeatherRsResult<()> {
        let mut handles = vec![];
        for schedule in self.schedules {
            let state = state.clone();
            let mut shutdown_signal = shutdown_signal.resubscribe();
            handles.push(tokio::spawn(async move {
                time::sleep(Duration::from_secs(3)).await; // initial delay
                let mut previous = Utc::now();
                loop {
                    let context = JobContext {
                        name: schedule.name,
                        scheduled_time: next_time(previous, schedule.interval),
                    };
                    info!(
                        name = context.name,
                        scheduled_time = context.scheduled_time.to_rfc3339_opts(SecondsFormat::Millis, true),
                        "scheduled job"
                    );
                    let waiting_time = (context.scheduled_time - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                    previous = context.scheduled_time;
                    tokio::select! {
                        _ = shutdown_signal.recv() => {
                            return;
                        }
                        () = time::sleep(waiting_time) => {
                            // awaited inline, ticks of the same job never overlap
                            schedule.job.execute(state.clone(), context).await;
                        }
                    }
                }
            }));
        }
        info!("scheduler started");
        for handle in handles {
            handle.await?;
        }
        info!("scheduler stopped");
        Ok(())
    }
}

fn next_time(previous: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    previous + interval
}

async fn process_job<S, J, Fut>(job: J, state: S, context: JobContext)
where
    J: Fn(S, JobContext) -> Fut,
    Fut: Future<Output = WeatherRsResult<()>>,
{
    let name = context.name;
    let scheduled_time = context.scheduled_time.to_rfc3339_opts(SecondsFormat::Millis, true);
    let span = info_span!("job", name, scheduled_time);
    async {
        debug!(name, "[job]");
        if let Err(e) = job(state, context).await {
            log::log_exception(&e);
        }
    }
    .instrument(span)
    .await;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::DateTime;
    use chrono::Utc;

    #[test]
    fn next_time() {
        let previous: DateTime<Utc> = "2024-01-15T08:00:00Z".parse().unwrap();
        let next = super::next_time(previous, Duration::from_millis(10_000));
        assert_eq!(next, "2024-01-15T08:00:10Z".parse::<DateTime<Utc>>().unwrap());
    }
}
