//! Household-scoped change fan-out.
//!
//! The store stays the single source of truth; the bus only tells subscribers that a row
//! changed. Delivery is best-effort:
//! - each subscriber owns a bounded queue and publishing never blocks on it,
//! - a full queue drops the event for that subscriber only,
//! - within one (household, table) stream events carry a gap-free sequence number, so a
//!   subscriber that lost events sees a `Notice::Resync` and refetches,
//! - nothing is replayed; a reconnecting client starts a fresh subscription and resyncs.

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError, bounded};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::models::inventory::HouseholdId;

pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    Locations,
    Containers,
    Consumables,
    NonConsumables,
    ConditionLogs,
    ActivityLog,
    ShoppingListItems,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// One row-level change. `row` is the row as committed; clients may still refetch derived
/// fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub household_id: HouseholdId,
    pub table: ChangeTable,
    pub op: ChangeOp,
    pub row_id: i64,
    pub row: Value,
    /// Position in this household's stream for `table`, starting at 1.
    pub seq: u64,
    pub published_at: DateTime<Utc>,
}

/// What a subscriber reads off its channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Change(ChangeEvent),
    /// Events for `table` were lost; refetch it before trusting later changes.
    Resync { table: ChangeTable, missed: u64 },
}

/// Outcome of a publish, for logging and tests. Publishers must not act on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub dropped: usize,
    pub pruned: usize,
}

type SubscriberId = u64;

struct Slot {
    id: SubscriberId,
    tables: Option<BTreeSet<ChangeTable>>,
    sender: Sender<ChangeEvent>,
}

impl Slot {
    fn wants(&self, table: ChangeTable) -> bool {
        self.tables.as_ref().is_none_or(|t| t.contains(&table))
    }
}

#[derive(Default)]
struct Channel {
    slots: Vec<Slot>,
    sequences: HashMap<ChangeTable, u64>,
}

struct Registry {
    channels: Mutex<HashMap<HouseholdId, Channel>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, HashMap<HouseholdId, Channel>> {
        // a panicking subscriber thread must not take the whole bus down
        self.channels.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remove(&self, household_id: HouseholdId, id: SubscriberId) {
        let mut channels = self.lock();
        if let Some(channel) = channels.get_mut(&household_id) {
            channel.slots.retain(|s| s.id != id);
        }
    }
}

/// Cheap to clone; all clones share one subscriber registry.
#[derive(Clone)]
pub struct RealtimeBus {
    registry: Arc<Registry>,
}

impl Default for RealtimeBus {
    fn default() -> Self {
        RealtimeBus::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

impl RealtimeBus {
    pub fn new(buffer: usize) -> Self {
        RealtimeBus {
            registry: Arc::new(Registry {
                channels: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                buffer: buffer.max(1),
            }),
        }
    }

    /// Subscribe to every table of a household.
    pub fn subscribe(&self, household_id: HouseholdId) -> Subscription {
        self.subscribe_filtered(household_id, None)
    }

    pub fn subscribe_tables(&self, household_id: HouseholdId, tables: &[ChangeTable]) -> Subscription {
        self.subscribe_filtered(household_id, Some(tables.iter().copied().collect()))
    }

    fn subscribe_filtered(&self, household_id: HouseholdId, tables: Option<BTreeSet<ChangeTable>>) -> Subscription {
        let (sender, receiver) = bounded(self.registry.buffer);
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut channels = self.registry.lock();
            channels.entry(household_id).or_default().slots.push(Slot { id, tables, sender });
        }
        debug!("Realtime: subscriber {} joined household {}", id, household_id);
        Subscription {
            id,
            household_id,
            receiver,
            registry: Arc::clone(&self.registry),
            last_seq: HashMap::new(),
            pending: None,
        }
    }

    pub fn subscriber_count(&self, household_id: HouseholdId) -> usize {
        self.registry.lock().get(&household_id).map_or(0, |c| c.slots.len())
    }

    /// Fan a change out to the household's subscribers.
    ///
    /// Sequencing and sending happen under the registry lock, so events for one table
    /// reach every subscriber in publish order.
    pub fn publish(
        &self,
        household_id: HouseholdId,
        table: ChangeTable,
        op: ChangeOp,
        row_id: i64,
        row: Value,
    ) -> Delivery {
        let mut channels = self.registry.lock();
        let channel = channels.entry(household_id).or_default();
        let seq = {
            let s = channel.sequences.entry(table).or_insert(0);
            *s += 1;
            *s
        };
        let event = ChangeEvent {
            household_id,
            table,
            op,
            row_id,
            row,
            seq,
            published_at: Utc::now(),
        };

        let mut delivery = Delivery::default();
        channel.slots.retain(|slot| {
            if !slot.wants(table) {
                return true;
            }
            match slot.sender.try_send(event.clone()) {
                Ok(()) => {
                    delivery.delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    delivery.dropped += 1;
                    true
                }
                Err(TrySendError::Disconnected(_)) => {
                    delivery.pruned += 1;
                    false
                }
            }
        });
        if delivery.dropped > 0 || delivery.pruned > 0 {
            debug!(
                "Realtime: household {} {:?}#{} dropped={} pruned={}",
                household_id, table, seq, delivery.dropped, delivery.pruned
            );
        }
        delivery
    }

    /// Publish a serializable row. Serialization failures are logged and skipped.
    pub fn publish_row<T: Serialize>(
        &self,
        household_id: HouseholdId,
        table: ChangeTable,
        op: ChangeOp,
        row_id: i64,
        row: &T,
    ) -> Delivery {
        match serde_json::to_value(row) {
            Ok(value) => self.publish(household_id, table, op, row_id, value),
            Err(e) => {
                debug!("Realtime: could not serialize {:?} row {}: {}", table, row_id, e);
                Delivery::default()
            }
        }
    }

    /// Drop every subscriber of a household. Their receivers report disconnection.
    pub fn close_household(&self, household_id: HouseholdId) -> usize {
        let removed = self.registry.lock().remove(&household_id).map_or(0, |c| c.slots.len());
        if removed > 0 {
            info!("Realtime: closed household {} channel ({} subscriber(s))", household_id, removed);
        }
        removed
    }
}

/// A client's view of one household channel. Dropping it unsubscribes.
pub struct Subscription {
    id: SubscriberId,
    household_id: HouseholdId,
    receiver: Receiver<ChangeEvent>,
    registry: Arc<Registry>,
    last_seq: HashMap<ChangeTable, u64>,
    pending: Option<ChangeEvent>,
}

impl Subscription {
    pub fn household_id(&self) -> HouseholdId {
        self.household_id
    }

    /// Block until the next notice; `None` once the channel is closed.
    pub fn recv(&mut self) -> Option<Notice> {
        loop {
            if let Some(event) = self.pending.take() {
                return Some(Notice::Change(event));
            }
            let event = self.receiver.recv().ok()?;
            if let Some(notice) = self.accept(event) {
                return Some(notice);
            }
        }
    }

    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Notice, RecvTimeoutError> {
        loop {
            if let Some(event) = self.pending.take() {
                return Ok(Notice::Change(event));
            }
            let event = self.receiver.recv_timeout(timeout)?;
            if let Some(notice) = self.accept(event) {
                return Ok(notice);
            }
        }
    }

    pub fn try_recv(&mut self) -> Result<Notice, TryRecvError> {
        loop {
            if let Some(event) = self.pending.take() {
                return Ok(Notice::Change(event));
            }
            let event = self.receiver.try_recv()?;
            if let Some(notice) = self.accept(event) {
                return Ok(notice);
            }
        }
    }

    /// Everything currently queued, without blocking.
    pub fn drain(&mut self) -> Vec<Notice> {
        let mut out = Vec::new();
        while let Ok(notice) = self.try_recv() {
            out.push(notice);
        }
        out
    }

    /// Track per-table sequence numbers. Duplicates are swallowed; a gap yields a resync
    /// notice and parks the event so it is returned next.
    fn accept(&mut self, event: ChangeEvent) -> Option<Notice> {
        let previous = self.last_seq.get(&event.table).copied();
        match previous {
            Some(prev) if event.seq <= prev => None,
            Some(prev) if event.seq > prev + 1 => {
                let table = event.table;
                let missed = event.seq - prev - 1;
                self.last_seq.insert(table, event.seq);
                self.pending = Some(event);
                Some(Notice::Resync { table, missed })
            }
            _ => {
                self.last_seq.insert(event.table, event.seq);
                Some(Notice::Change(event))
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.remove(self.household_id, self.id);
        debug!("Realtime: subscriber {} left household {}", self.id, self.household_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread;

    const HOME: HouseholdId = HouseholdId(1);

    fn changes(notices: Vec<Notice>) -> Vec<ChangeEvent> {
        notices
            .into_iter()
            .filter_map(|n| match n {
                Notice::Change(e) => Some(e),
                Notice::Resync { .. } => None,
            })
            .collect()
    }

    #[test]
    fn fans_out_to_every_subscriber_of_the_household() {
        let bus = RealtimeBus::default();
        let mut a = bus.subscribe(HOME);
        let mut b = bus.subscribe(HOME);
        let mut other = bus.subscribe(HouseholdId(2));

        let delivery = bus.publish(HOME, ChangeTable::Consumables, ChangeOp::Update, 7, json!({"id": 7}));
        assert_eq!(delivery.delivered, 2);
        assert_eq!(changes(a.drain()).len(), 1);
        assert_eq!(changes(b.drain()).len(), 1);
        assert!(other.drain().is_empty());
    }

    #[test]
    fn table_filter_limits_delivery() {
        let bus = RealtimeBus::default();
        let mut feed = bus.subscribe_tables(HOME, &[ChangeTable::ActivityLog]);
        bus.publish(HOME, ChangeTable::Consumables, ChangeOp::Insert, 1, json!({}));
        bus.publish(HOME, ChangeTable::ActivityLog, ChangeOp::Insert, 1, json!({}));
        let got = changes(feed.drain());
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].table, ChangeTable::ActivityLog);
    }

    #[test]
    fn preserves_publish_order_within_a_table() {
        let bus = RealtimeBus::default();
        let mut sub = bus.subscribe(HOME);
        for id in 1..=20 {
            bus.publish(HOME, ChangeTable::Consumables, ChangeOp::Update, id, json!({"id": id}));
        }
        let ids = changes(sub.drain()).into_iter().map(|e| e.row_id).collect::<Vec<_>>();
        assert_eq!(ids, (1..=20).collect::<Vec<_>>());
    }

    #[test]
    fn slow_subscriber_does_not_block_others_and_sees_resync() {
        let bus = RealtimeBus::new(2);
        let mut slow = bus.subscribe(HOME);
        let mut fast = bus.subscribe(HOME);

        for id in 1..=5 {
            bus.publish(HOME, ChangeTable::Consumables, ChangeOp::Update, id, json!({}));
            // the fast client keeps up
            assert!(matches!(fast.try_recv(), Ok(Notice::Change(_))));
        }

        // slow kept seq 1 and 2, lost 3 and 4
        assert!(matches!(slow.try_recv(), Ok(Notice::Change(e)) if e.seq == 1));
        assert!(matches!(slow.try_recv(), Ok(Notice::Change(e)) if e.seq == 2));
        assert!(slow.try_recv().is_err());

        bus.publish(HOME, ChangeTable::Consumables, ChangeOp::Update, 6, json!({}));
        assert_eq!(
            slow.try_recv().expect("resync"),
            Notice::Resync {
                table: ChangeTable::Consumables,
                missed: 3
            }
        );
        assert!(matches!(slow.try_recv(), Ok(Notice::Change(e)) if e.seq == 6));
    }

    #[test]
    fn dropping_a_subscription_unsubscribes_only_it() {
        let bus = RealtimeBus::default();
        let keep = bus.subscribe(HOME);
        let gone = bus.subscribe(HOME);
        assert_eq!(bus.subscriber_count(HOME), 2);
        drop(gone);
        assert_eq!(bus.subscriber_count(HOME), 1);
        assert_eq!(keep.household_id(), HOME);
    }

    #[test]
    fn closing_a_household_disconnects_its_subscribers() {
        let bus = RealtimeBus::default();
        let mut sub = bus.subscribe(HOME);
        assert_eq!(bus.close_household(HOME), 1);
        assert!(sub.recv().is_none());
    }

    #[test]
    fn concurrent_subscribe_and_unsubscribe_keep_unrelated_subscribers() {
        let bus = RealtimeBus::default();
        let mut steady = bus.subscribe(HOME);

        let handles = (0..8)
            .map(|_| {
                let bus = bus.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        let sub = bus.subscribe(HOME);
                        bus.publish(HOME, ChangeTable::ShoppingListItems, ChangeOp::Insert, 1, json!({}));
                        drop(sub);
                    }
                })
            })
            .collect::<Vec<_>>();
        for h in handles {
            h.join().expect("worker");
        }

        assert_eq!(bus.subscriber_count(HOME), 1);
        let mut seen = 0;
        while let Ok(notice) = steady.try_recv() {
            if matches!(notice, Notice::Change(_)) {
                seen += 1;
            }
        }
        // the steady subscriber saw every event up to its buffer size
        assert_eq!(seen, DEFAULT_SUBSCRIBER_BUFFER.min(400));
    }
}
