use tokio::sync::broadcast;
use uuid::Uuid;

/// Collections a change signal can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Transactions,
    AccountTransactions,
    Accounts,
    Categories,
}

/// A "something changed" signal. Carries no row data; consumers refetch
/// authoritative state instead of trusting the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub owner_id: Uuid,
    pub row_id: Option<Uuid>,
}

/// Connectivity of the notification channel itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Connected,
    Disconnected,
}

/// What a subscriber wants to hear about: one collection, optionally
/// scoped to a single owner's rows.
#[derive(Debug, Clone, Copy)]
pub struct SubscriptionFilter {
    pub collection: Collection,
    pub owner_id: Option<Uuid>,
}

impl SubscriptionFilter {
    pub fn scoped(collection: Collection, owner_id: Uuid) -> Self {
        Self {
            collection,
            owner_id: Some(owner_id),
        }
    }

    pub fn unscoped(collection: Collection) -> Self {
        Self {
            collection,
            owner_id: None,
        }
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        self.collection == event.collection
            && self.owner_id.map_or(true, |owner| owner == event.owner_id)
    }
}

/// In-process publish/subscribe feed for change signals and channel
/// connectivity. The writer and mutator publish after successful store
/// writes; the reconciliation loop consumes.
#[derive(Clone)]
pub struct ChangeFeed {
    changes: broadcast::Sender<ChangeEvent>,
    status: broadcast::Sender<ChannelStatus>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity);
        let (status, _) = broadcast::channel(capacity);
        Self { changes, status }
    }

    /// Publish a change signal. Dropped silently when nobody listens.
    pub fn publish(&self, collection: Collection, owner_id: Uuid, row_id: Option<Uuid>) {
        let _ = self.changes.send(ChangeEvent {
            collection,
            owner_id,
            row_id,
        });
    }

    pub fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<ChannelStatus> {
        self.status.subscribe()
    }

    /// Report a connectivity transition of the underlying channel.
    pub fn set_status(&self, status: ChannelStatus) {
        let _ = self.status.send(status);
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(64)
    }
}
