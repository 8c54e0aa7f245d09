use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use super::projector::BudgetSnapshot;
use crate::category::models::BudgetOverview;
use crate::category::service::CategorySummaryService;
use crate::errors::AppError;
use crate::notify::{ChangeFeed, ChannelStatus, Collection, SubscriptionFilter};
use crate::store::models::PeriodFilter;

/// Where the loop refetches authoritative aggregates from. Injected so
/// the loop itself never knows whether it talks to a service in-process
/// or over HTTP.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync + 'static {
    async fn fetch(&self) -> Result<BudgetOverview, AppError>;
}

/// Fetcher backed by the in-process summary service.
pub struct ServiceSnapshotFetcher {
    service: CategorySummaryService,
    owner_id: Uuid,
    period: PeriodFilter,
}

impl ServiceSnapshotFetcher {
    pub fn new(service: CategorySummaryService, owner_id: Uuid, period: PeriodFilter) -> Self {
        Self {
            service,
            owner_id,
            period,
        }
    }
}

#[async_trait]
impl SnapshotFetcher for ServiceSnapshotFetcher {
    async fn fetch(&self) -> Result<BudgetOverview, AppError> {
        self.service.overview(self.owner_id, self.period).await
    }
}

/// Client-visible warning flags. One warning per disconnect, cleared on
/// reconnect; one reload warning per failed refetch, cleared on the next
/// success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcilerWarnings {
    pub channel_down: bool,
    pub reload_needed: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ReconcilerConfig {
    /// Quiet window after the last change signal before refetching.
    pub debounce: Duration,
    /// Bound of the signal queue between the forwarders and the worker.
    pub queue_depth: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            queue_depth: 32,
        }
    }
}

enum Signal {
    Changed,
    Status(ChannelStatus),
}

/// Keeps a client's budget snapshot in step with the server.
///
/// Change signals from the notification feed land in a bounded queue; one
/// worker drains it, collapses bursts behind a debounce window, and
/// refetches the authoritative overview. Reconnects refetch immediately,
/// since anything that happened during the outage produced no signals.
/// Dropping the handle aborts the worker and forwarders and releases the
/// pending debounce timer.
pub struct Reconciler {
    snapshots: watch::Receiver<BudgetSnapshot>,
    warnings: watch::Receiver<ReconcilerWarnings>,
    worker: JoinHandle<()>,
    forwarders: Vec<JoinHandle<()>>,
}

impl Reconciler {
    /// Subscribe with the standard scoping: the owner's categories plus
    /// the global transaction collection.
    pub fn for_owner(
        feed: &ChangeFeed,
        owner_id: Uuid,
        fetcher: Arc<dyn SnapshotFetcher>,
        config: ReconcilerConfig,
    ) -> Self {
        Self::spawn(
            feed,
            vec![
                SubscriptionFilter::scoped(Collection::Categories, owner_id),
                SubscriptionFilter::unscoped(Collection::Transactions),
            ],
            fetcher,
            config,
        )
    }

    pub fn spawn(
        feed: &ChangeFeed,
        filters: Vec<SubscriptionFilter>,
        fetcher: Arc<dyn SnapshotFetcher>,
        config: ReconcilerConfig,
    ) -> Self {
        let (signal_tx, signal_rx) = mpsc::channel(config.queue_depth);
        let mut forwarders = Vec::with_capacity(filters.len() + 1);

        for filter in filters {
            let mut changes = feed.subscribe_changes();
            let tx = signal_tx.clone();
            forwarders.push(tokio::spawn(async move {
                loop {
                    match changes.recv().await {
                        Ok(event) => {
                            if filter.matches(&event) && tx.send(Signal::Changed).await.is_err() {
                                break;
                            }
                        }
                        // Dropped signals collapse into a single refetch
                        // trigger; the payloads never mattered.
                        Err(broadcast::error::RecvError::Lagged(_)) => {
                            if tx.send(Signal::Changed).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }));
        }

        let mut status = feed.subscribe_status();
        let status_tx = signal_tx;
        forwarders.push(tokio::spawn(async move {
            loop {
                match status.recv().await {
                    Ok(state) => {
                        if status_tx.send(Signal::Status(state)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));

        let (snapshot_tx, snapshots) = watch::channel(BudgetSnapshot::default());
        let (warning_tx, warnings) = watch::channel(ReconcilerWarnings::default());
        let worker = tokio::spawn(worker_loop(
            signal_rx,
            fetcher,
            snapshot_tx,
            warning_tx,
            config.debounce,
        ));

        Self {
            snapshots,
            warnings,
            worker,
            forwarders,
        }
    }

    /// Authoritative snapshots as the worker publishes them.
    pub fn snapshots(&self) -> watch::Receiver<BudgetSnapshot> {
        self.snapshots.clone()
    }

    pub fn warnings(&self) -> ReconcilerWarnings {
        *self.warnings.borrow()
    }

    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.worker.abort();
        for forwarder in &self.forwarders {
            forwarder.abort();
        }
    }
}

async fn worker_loop(
    mut signals: mpsc::Receiver<Signal>,
    fetcher: Arc<dyn SnapshotFetcher>,
    snapshots: watch::Sender<BudgetSnapshot>,
    warnings: watch::Sender<ReconcilerWarnings>,
    debounce: Duration,
) {
    let mut connected = true;

    // Start from authoritative data instead of a default snapshot.
    refetch(&fetcher, &snapshots, &warnings).await;

    loop {
        let Some(signal) = signals.recv().await else {
            debug!("reconciliation feed closed; worker exiting");
            return;
        };

        match signal {
            Signal::Status(state) => {
                if apply_status(state, &mut connected, &warnings) {
                    refetch(&fetcher, &snapshots, &warnings).await;
                }
            }
            Signal::Changed => {
                // Debounce window: each further change replaces the timer,
                // so a burst collapses into one refetch.
                let mut deadline = tokio::time::Instant::now() + debounce;
                loop {
                    tokio::select! {
                        maybe = signals.recv() => match maybe {
                            None => return,
                            Some(Signal::Changed) => {
                                deadline = tokio::time::Instant::now() + debounce;
                            }
                            Some(Signal::Status(state)) => {
                                // A reconnect refetches right away anyway;
                                // the pending window is folded into it.
                                if apply_status(state, &mut connected, &warnings) {
                                    break;
                                }
                            }
                        },
                        _ = tokio::time::sleep_until(deadline) => break,
                    }
                }
                refetch(&fetcher, &snapshots, &warnings).await;
            }
        }
    }
}

/// Track connectivity; returns true when a reconnect requires an
/// immediate refetch.
fn apply_status(
    state: ChannelStatus,
    connected: &mut bool,
    warnings: &watch::Sender<ReconcilerWarnings>,
) -> bool {
    match state {
        ChannelStatus::Disconnected => {
            if *connected {
                *connected = false;
                warnings.send_modify(|w| w.channel_down = true);
            }
            false
        }
        ChannelStatus::Connected => {
            if !*connected {
                *connected = true;
                warnings.send_modify(|w| w.channel_down = false);
                // Events during the outage were unobservable.
                true
            } else {
                false
            }
        }
    }
}

async fn refetch(
    fetcher: &Arc<dyn SnapshotFetcher>,
    snapshots: &watch::Sender<BudgetSnapshot>,
    warnings: &watch::Sender<ReconcilerWarnings>,
) {
    match fetcher.fetch().await {
        Ok(overview) => {
            snapshots.send_modify(|s| *s = s.sync_with_server(overview));
            warnings.send_if_modified(|w| {
                let was_set = w.reload_needed;
                w.reload_needed = false;
                was_set
            });
        }
        Err(err) => {
            // Keep the last-known snapshot, optimistic or stale.
            warn!(%err, "authoritative refetch failed");
            warnings.send_modify(|w| w.reload_needed = true);
        }
    }
}
