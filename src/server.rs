use actix_web::{dev, middleware::Logger, rt, web, App, HttpServer};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::WebConfig;
use crate::routes::configure_routes;
use crate::state::AppState;

/// How long the listener gets to wind down once connections are force-closed.
const FORCE_CLOSE_GRACE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Serving,
    ShuttingDown,
    Stopped,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// In-flight requests drained within the shutdown timeout.
    Graceful,
    /// The timeout elapsed and remaining connections were closed.
    Forced,
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Listener failed: {0}")]
    Listener(#[source] io::Error),

    #[error("Server did not stop within {0:?} after force-closing connections")]
    ForcedShutdown(Duration),
}

/// Owns the HTTP listener from bind until it has stopped.
pub struct Server {
    inner: dev::Server,
    addrs: Vec<SocketAddr>,
    shutdown_timeout: Duration,
    state: LifecycleState,
}

impl Server {
    /// Binds the configured address. Nothing is accepted until [`Server::run`].
    pub fn bind(config: &WebConfig, state: AppState) -> Result<Self, ServerError> {
        let data = web::Data::new(state);

        let http = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .wrap(Logger::default())
                .configure(configure_routes)
        })
        // Shutdown is driven by the caller's cancellation token.
        .disable_signals()
        .client_request_timeout(config.read_timeout)
        .client_disconnect_timeout(config.write_timeout)
        // Whole seconds are enforced by `parse_whole_seconds`.
        .shutdown_timeout(config.shutdown_timeout.as_secs().max(1))
        .bind(config.address.as_str())
        .map_err(|source| ServerError::Bind {
            address: config.address.clone(),
            source,
        })?;

        let addrs = http.addrs();

        Ok(Server {
            inner: http.run(),
            addrs,
            shutdown_timeout: config.shutdown_timeout,
            state: LifecycleState::Starting,
        })
    }

    pub fn local_addrs(&self) -> &[SocketAddr] {
        &self.addrs
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Serves until `shutdown` is cancelled or the listener fails.
    pub async fn run(self, shutdown: CancellationToken) -> Result<ShutdownOutcome, ServerError> {
        let Server {
            inner,
            addrs,
            shutdown_timeout,
            mut state,
        } = self;

        let handle = inner.handle();
        let mut serving = rt::spawn(inner);

        transition(&mut state, LifecycleState::Serving);
        info!("API listening on {:?}", addrs);

        tokio::select! {
            result = &mut serving => {
                transition(&mut state, LifecycleState::Failed);
                let err = match result {
                    Ok(Ok(())) => {
                        io::Error::new(io::ErrorKind::Other, "listener exited before shutdown")
                    }
                    Ok(Err(e)) => e,
                    Err(e) => io::Error::new(io::ErrorKind::Other, e),
                };
                error!("Listening and serving failed: {}", err);
                return Err(ServerError::Listener(err));
            }
            _ = shutdown.cancelled() => {}
        }

        transition(&mut state, LifecycleState::ShuttingDown);

        let outcome = match tokio::time::timeout(shutdown_timeout, handle.stop(true)).await {
            Ok(()) => ShutdownOutcome::Graceful,
            Err(_) => {
                warn!(
                    "Graceful shutdown did not complete in {:?}, closing remaining connections",
                    shutdown_timeout
                );
                ShutdownOutcome::Forced
            }
        };

        let stopped = async {
            if outcome == ShutdownOutcome::Forced {
                handle.stop(false).await;
            }
            let _ = (&mut serving).await;
        };

        if tokio::time::timeout(FORCE_CLOSE_GRACE, stopped).await.is_err() {
            transition(&mut state, LifecycleState::Failed);
            error!("Could not stop server");
            serving.abort();
            return Err(ServerError::ForcedShutdown(FORCE_CLOSE_GRACE));
        }

        transition(&mut state, LifecycleState::Stopped);
        Ok(outcome)
    }
}

fn transition(state: &mut LifecycleState, next: LifecycleState) {
    info!("Server {:?} -> {:?}", state, next);
    *state = next;
}

/// Process shutdown signals, registered up front so a failure to install
/// the handlers surfaces before the listener starts.
pub struct ShutdownSignals {
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    #[cfg(unix)]
    pub fn register() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(ShutdownSignals {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    #[cfg(not(unix))]
    pub fn register() -> io::Result<Self> {
        Ok(ShutdownSignals {})
    }

    /// Resolves on SIGINT or SIGTERM.
    #[cfg(unix)]
    pub async fn recv(mut self) -> io::Result<()> {
        tokio::select! {
            _ = self.sigterm.recv() => info!("Received SIGTERM"),
            _ = self.sigint.recv() => info!("Received SIGINT"),
        }
        Ok(())
    }

    /// Resolves on Ctrl+C.
    #[cfg(not(unix))]
    pub async fn recv(self) -> io::Result<()> {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
        Ok(())
    }
}
