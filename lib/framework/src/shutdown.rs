use tokio::signal;
use tokio::sync::broadcast;
use tracing::error;
use tracing::info;

pub struct Shutdown {
    sender: broadcast::Sender<()>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    // broadcasts once SIGINT or SIGTERM arrives
    pub fn listen(self) {
        tokio::spawn(async move {
            let terminate = async {
                #[cfg(unix)]
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut signal) => {
                        signal.recv().await;
                    }
                    Err(e) => error!(error = ?e, "failed to install SIGTERM handler"),
                }
                #[cfg(not(unix))]
                std::future::pending::<()>().await;
            };

            tokio::select! {
                result = signal::ctrl_c() => {
                    if let Err(e) = result {
                        error!(error = ?e, "failed to listen for ctrl_c");
                    }
                }
                () = terminate => {}
            }

            info!("shutting down");
            if self.sender.send(()).is_err() {
                error!("no shutdown subscriber");
            }
        });
    }
}
