pub mod manager;

use log::trace;
use std::collections::VecDeque;
use tokio::sync::oneshot;

/// Identifies a parked consumer, unique for the lifetime of a queue manager.
pub type WaiterId = u64;

/// The sending half of a parked consumer's delivery channel. It is used at most once.
pub type DeliverySink = oneshot::Sender<String>;

/// A consumer which is waiting for a message to arrive.
#[derive(Debug)]
pub struct Waiter {
    pub id: WaiterId,
    pub sink: DeliverySink,
}

/// One entry of a queue.
#[derive(Debug)]
pub enum Slot {
    Message(String),
    Waiter(Waiter),
    /// A waiter which left before it was served. It is skipped and dropped lazily.
    Vacant(WaiterId),
}

impl Slot {
    fn waiter_id(&self) -> Option<WaiterId> {
        match self {
            Slot::Message(_) => None,
            Slot::Waiter(waiter) => Some(waiter.id),
            Slot::Vacant(id) => Some(*id),
        }
    }
}

/// Representation of a queue.
///
/// A queue contains either buffered messages (pending supply) or parked consumers (pending
/// demand) but never both. A message which arrives when there are waiters is handed over to the
/// oldest waiter, a consumer which comes when there are messages gets the oldest message.
///
/// Waiters are parked with increasing ids, so the waiter slots are sorted by id and a leaving
/// waiter is found by binary search. Its slot becomes vacant instead of being removed from the
/// middle of the queue.
#[derive(Debug, Default)]
pub struct Queue {
    slots: VecDeque<Slot>,
    /// True if the slots are waiters.
    has_waiters: bool,
    /// Waiter slots which are not vacant.
    live_waiters: usize,
}

impl Queue {
    /// Number of buffered messages.
    pub fn message_count(&self) -> usize {
        if self.has_waiters {
            0
        } else {
            self.slots.len()
        }
    }

    /// Number of parked consumers.
    pub fn waiter_count(&self) -> usize {
        self.live_waiters
    }

    /// Deliver the value to the oldest waiter or buffer it if nobody waits.
    ///
    /// Waiters whose receiving side is already gone are skipped, so the value always ends up
    /// either in a live consumer or at the tail of the queue.
    pub fn put(&mut self, mut value: String) {
        while let Some(waiter) = self.pop_waiter() {
            match waiter.sink.send(value) {
                Ok(()) => {
                    trace!("Message handed over to waiter {}", waiter.id);

                    return;
                }
                Err(returned) => {
                    trace!("Waiter {} is gone, trying the next one", waiter.id);

                    value = returned;
                }
            }
        }

        self.slots.push_back(Slot::Message(value));
    }

    /// Take the oldest buffered message.
    pub fn take(&mut self) -> Option<String> {
        if self.has_waiters {
            return None;
        }

        match self.slots.pop_front() {
            Some(Slot::Message(value)) => Some(value),
            Some(other) => {
                self.slots.push_front(other);

                None
            }
            None => None,
        }
    }

    /// Append a waiter. The queue must not have buffered messages and the id must be greater than
    /// the id of any waiter parked before.
    pub fn park(&mut self, waiter: Waiter) {
        debug_assert!(self.has_waiters || self.slots.is_empty());
        debug_assert!(self.slots.back().and_then(Slot::waiter_id) < Some(waiter.id));

        self.slots.push_back(Slot::Waiter(waiter));
        self.has_waiters = true;
        self.live_waiters += 1;
    }

    /// Remove the waiter with the given id. Returns false if the waiter is not in the queue
    /// anymore, which means a producer has already served it.
    pub fn remove_waiter(&mut self, id: WaiterId) -> bool {
        if !self.has_waiters {
            return false;
        }

        let Ok(index) = self.slots.binary_search_by(|slot| slot.waiter_id().cmp(&Some(id))) else {
            return false;
        };

        if !matches!(self.slots[index], Slot::Waiter(_)) {
            return false;
        }

        self.slots[index] = Slot::Vacant(id);
        self.live_waiters -= 1;
        self.compact();

        true
    }

    /// Put back a message which was delivered to a consumer that went away before it could use
    /// the message. It was the oldest message, so it goes to the head.
    pub fn give_back(&mut self, value: String) {
        if self.has_waiters {
            self.put(value);
        } else {
            self.slots.push_front(Slot::Message(value));
        }
    }

    fn pop_waiter(&mut self) -> Option<Waiter> {
        if !self.has_waiters {
            return None;
        }

        let waiter = match self.slots.pop_front() {
            Some(Slot::Waiter(waiter)) => {
                self.live_waiters -= 1;

                Some(waiter)
            }
            Some(other) => {
                self.slots.push_front(other);

                None
            }
            None => None,
        };

        self.compact();

        waiter
    }

    /// Drop vacant slots from both ends, so the head is always a live waiter.
    fn compact(&mut self) {
        if self.live_waiters == 0 {
            self.slots.clear();
            self.has_waiters = false;

            return;
        }

        while matches!(self.slots.front(), Some(Slot::Vacant(_))) {
            self.slots.pop_front();
        }

        while matches!(self.slots.back(), Some(Slot::Vacant(_))) {
            self.slots.pop_back();
        }
    }
}
