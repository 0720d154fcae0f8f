//! The supervisor owns the poll/diff/notify lifecycle.
//!
//! It alternates between two phases: idle, waiting for the next tick or a
//! shutdown signal, and polling, sweeping every entity/source pair. Within a
//! sweep each pair is independent: it is fetched, diffed against its stored
//! record, its events are delivered and only then is the new record
//! committed. A failure anywhere in that chain skips the commit, so the next
//! sweep retries the same pair from the same baseline (at-least-once
//! delivery, no lost events).

mod builder;

use std::sync::Arc;

pub use builder::SupervisorBuilder;
use thiserror::Error;
use tokio::{signal, sync::Semaphore, task::JoinSet};

use crate::{
    config::AppConfig,
    engine::{diff::diff_items, leaderboard::diff_board, router::EventRouter},
    models::Snapshot,
    notification::{error::NotificationError, Notifier},
    persistence::{error::PersistenceError, traits::StateStore},
    sources::{state_key, SourceError, SourceWatcher},
};

/// Errors that can occur while assembling or running the supervisor.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A required configuration was not provided to the `SupervisorBuilder`.
    #[error("Missing configuration for Supervisor")]
    MissingConfig,

    /// A state store was not provided to the `SupervisorBuilder`.
    #[error("Missing state store for Supervisor")]
    MissingStateStore,

    /// A notifier was not provided to the `SupervisorBuilder`.
    #[error("Missing notifier for Supervisor")]
    MissingNotifier,

    /// No watchers were provided to the `SupervisorBuilder`.
    #[error("No watchers configured for Supervisor")]
    MissingWatchers,

    /// A state store operation outside a pair sweep failed.
    #[error("State store error: {0}")]
    StateStore(#[from] PersistenceError),
}

/// What can go wrong for one entity/source pair within a sweep. Always
/// non-fatal: logged, counted, and retried next sweep.
#[derive(Debug, Error)]
enum PairError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Notification(#[from] NotificationError),
}

/// Counters for one completed sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Pairs polled.
    pub pairs: usize,

    /// Events delivered.
    pub events: usize,

    /// Pairs that failed and were left uncommitted.
    pub failures: usize,
}

/// The primary runtime manager: schedules sweeps, fans work out over the
/// watchers, and coordinates graceful shutdown.
pub struct Supervisor {
    config: Arc<AppConfig>,
    store: Arc<dyn StateStore>,
    notifier: Arc<dyn Notifier>,
    router: Arc<EventRouter>,
    watchers: Vec<Arc<dyn SourceWatcher>>,
    cancellation_token: tokio_util::sync::CancellationToken,
}

impl Supervisor {
    /// Returns a new `SupervisorBuilder`, the public entry point for
    /// creating a supervisor.
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }

    pub(crate) fn new(
        config: AppConfig,
        store: Arc<dyn StateStore>,
        notifier: Arc<dyn Notifier>,
        watchers: Vec<Arc<dyn SourceWatcher>>,
    ) -> Self {
        let router = Arc::new(EventRouter::new(&config));
        Self {
            config: Arc::new(config),
            store,
            notifier,
            router,
            watchers,
            cancellation_token: tokio_util::sync::CancellationToken::new(),
        }
    }

    /// A handle that requests graceful shutdown when cancelled, exactly as
    /// the installed signal handler does.
    pub fn shutdown_handle(&self) -> tokio_util::sync::CancellationToken {
        self.cancellation_token.clone()
    }

    /// Runs the poll loop until a shutdown signal arrives. The first sweep
    /// starts immediately; later sweeps follow the configured interval. A
    /// signal during a sweep gives the sweep up to the configured shutdown
    /// timeout to finish before it is abandoned.
    pub async fn run(self) -> Result<(), SupervisorError> {
        let cancellation_token = self.cancellation_token.clone();
        tokio::spawn(async move {
            let ctrl_c = signal::ctrl_c();
            #[cfg(unix)]
            let terminate = async {
                signal::unix::signal(signal::unix::SignalKind::terminate())
                    .expect("Failed to register SIGTERM handler")
                    .recv()
                    .await;
            };
            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => tracing::info!("SIGINT received, initiating graceful shutdown."),
                _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown."),
            }
            cancellation_token.cancel();
        });

        let mut interval = tokio::time::interval(self.config.check_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    tracing::debug!("Entering polling phase.");
                    let sweep = self.run_once();
                    tokio::pin!(sweep);
                    tokio::select! {
                        summary = &mut sweep => {
                            tracing::info!(
                                pairs = summary.pairs,
                                events = summary.events,
                                failures = summary.failures,
                                "Sweep complete, entering idle phase."
                            );
                        }
                        _ = self.cancellation_token.cancelled() => {
                            // Pair commits are atomic, so abandoning a sweep
                            // at worst re-delivers on the next run.
                            let shutdown_timeout = self.config.shutdown_timeout;
                            tracing::info!(
                                ?shutdown_timeout,
                                "Shutdown requested mid-sweep, waiting for the sweep to finish."
                            );
                            match tokio::time::timeout(shutdown_timeout, &mut sweep).await {
                                Ok(summary) => tracing::info!(
                                    pairs = summary.pairs,
                                    events = summary.events,
                                    failures = summary.failures,
                                    "Sweep finished before shutdown."
                                ),
                                Err(_) => tracing::warn!(
                                    ?shutdown_timeout,
                                    "Sweep did not finish within the shutdown timeout, abandoning it."
                                ),
                            }
                            break;
                        }
                    }
                }
                _ = self.cancellation_token.cancelled() => break,
            }
        }

        tracing::info!("Supervisor shutdown complete.");
        Ok(())
    }

    /// Sweeps every pair once, with bounded concurrency. Pair failures are
    /// logged and counted but never abort the sweep.
    pub async fn run_once(&self) -> SweepSummary {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut join_set: JoinSet<Result<usize, ()>> = JoinSet::new();

        for watcher in &self.watchers {
            let watcher = Arc::clone(watcher);
            let store = Arc::clone(&self.store);
            let notifier = Arc::clone(&self.notifier);
            let router = Arc::clone(&self.router);
            let semaphore = Arc::clone(&semaphore);

            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let key = state_key(watcher.source(), watcher.entity());
                match Self::check_pair(&*watcher, &*store, &*router, &*notifier).await {
                    Ok(events) => Ok(events),
                    Err(error) => {
                        tracing::warn!(%key, %error, "Pair check failed, state not committed.");
                        Err(())
                    }
                }
            });
        }

        let mut summary = SweepSummary::default();
        while let Some(result) = join_set.join_next().await {
            summary.pairs += 1;
            match result {
                Ok(Ok(events)) => summary.events += events,
                Ok(Err(())) => summary.failures += 1,
                Err(join_error) => {
                    tracing::error!(%join_error, "Pair task panicked.");
                    summary.failures += 1;
                }
            }
        }
        summary
    }

    /// Fetch, diff, deliver, commit for one pair. Delivery happens before
    /// the commit so a crash in between re-delivers rather than loses.
    async fn check_pair(
        watcher: &dyn SourceWatcher,
        store: &dyn StateStore,
        router: &EventRouter,
        notifier: &dyn Notifier,
    ) -> Result<usize, PairError> {
        let source = watcher.source();
        let entity = watcher.entity().to_string();
        let key = state_key(source, &entity);

        let snapshot = watcher.fetch().await?;
        let previous = store.get(&key).await?;
        let now = chrono::Utc::now();

        let outcome = match &snapshot {
            Snapshot::Items(items) => {
                diff_items(previous.as_ref(), items, &entity, &key, source, now)
            }
            Snapshot::Ranked(board) => diff_board(previous.as_ref(), board, &key, now),
        };

        for event in &outcome.events {
            let route = router.route(event);
            notifier.deliver(event, &route).await?;
        }

        store.put(&outcome.record).await?;
        Ok(outcome.events.len())
    }
}
