use crate::queue::{Queue, Waiter, WaiterId};
use log::{debug, trace};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;

// QueueManager
//   handles:
//     - put a message (enqueue or hand over to the oldest waiter)
//     - get a message (dequeue, or wait with timeout)
//
//   A single lock guards the queue map and all the queues. It is held only while the slots are
//   manipulated and never while a consumer waits for a message.
//
//   Waiting consumer
//     parks a waiter slot with the sending half of a oneshot channel and waits on the receiving
//     half with a timeout. Delivery (by put) and expiry (by the waiter itself) are both resolved
//     under the lock, so the second one always sees what the first one did:
//       - slot removed by the waiter: put never sees it
//       - slot already served by put: the value is in the channel, the waiter returns it

/// Snapshot of a queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Buffered messages.
    pub messages: usize,
    /// Consumers waiting for a message.
    pub waiters: usize,
}

/// Handle of the queue manager. Cloning it is cheap, all the clones see the same queues.
#[derive(Clone, Debug, Default)]
pub struct QueueManager {
    state: Arc<Mutex<QueueManagerState>>,
}

#[derive(Debug, Default)]
struct QueueManagerState {
    /// Queues are created on first use and never removed.
    queues: HashMap<String, Queue>,
    next_waiter_id: WaiterId,
}

impl QueueManagerState {
    fn queue_mut(&mut self, queue_name: &str) -> &mut Queue {
        self.queues.entry(queue_name.to_owned()).or_insert_with(|| {
            debug!("Queue {} created", queue_name);

            Queue::default()
        })
    }
}

/// The result of looking for a message with the intention of waiting.
enum Ticket<'a> {
    Ready(String),
    Parked(PendingGet<'a>),
}

impl QueueManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a message into the queue or hand it over to the consumer waiting the longest on that
    /// queue. Empty queue names and empty values are ignored.
    pub fn put(&self, queue_name: &str, value: String) {
        if queue_name.is_empty() || value.is_empty() {
            return;
        }

        trace!("Put to {}: {:?}", queue_name, value);

        self.lock().queue_mut(queue_name).put(value);
    }

    /// Get the oldest message of the queue.
    ///
    /// Without timeout it returns immediately. With timeout, if the queue is empty, it waits
    /// until a message arrives or the timeout elapses. Consumers waiting on the same queue are
    /// served in the order they started to wait.
    pub async fn get(&self, queue_name: &str, timeout: Option<Duration>) -> Option<String> {
        if queue_name.is_empty() {
            return None;
        }

        let Some(timeout) = timeout else {
            return self.lock().queue_mut(queue_name).take();
        };

        match self.take_or_park(queue_name) {
            Ticket::Ready(value) => Some(value),
            Ticket::Parked(pending) => pending.wait(timeout).await,
        }
    }

    /// Statistics of a queue, `None` if the queue has never been used.
    pub fn stats(&self, queue_name: &str) -> Option<QueueStats> {
        self.lock().queues.get(queue_name).map(|queue| QueueStats {
            messages: queue.message_count(),
            waiters: queue.waiter_count(),
        })
    }

    /// Number of queues ever used.
    pub fn queue_count(&self) -> usize {
        self.lock().queues.len()
    }

    fn take_or_park(&self, queue_name: &str) -> Ticket<'_> {
        let mut state = self.lock();
        let id = state.next_waiter_id;
        let queue = state.queue_mut(queue_name);

        if let Some(value) = queue.take() {
            return Ticket::Ready(value);
        }

        let (sink, delivery) = oneshot::channel();

        queue.park(Waiter { id, sink });
        state.next_waiter_id += 1;

        trace!("Waiter {} parked on {}", id, queue_name);

        Ticket::Parked(PendingGet {
            manager: self,
            queue_name: queue_name.to_owned(),
            id,
            delivery,
            released: false,
        })
    }

    fn lock(&self) -> MutexGuard<'_, QueueManagerState> {
        // The state is consistent after every critical section, a panic cannot leave it torn.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A consumer parked in a queue. If it is dropped before it finished waiting (the client went
/// away) it removes its slot, and gives back the message which has been delivered to it in the
/// meantime.
struct PendingGet<'a> {
    manager: &'a QueueManager,
    queue_name: String,
    id: WaiterId,
    delivery: oneshot::Receiver<String>,
    released: bool,
}

impl PendingGet<'_> {
    async fn wait(mut self, timeout: Duration) -> Option<String> {
        match tokio::time::timeout(timeout, &mut self.delivery).await {
            Ok(Ok(value)) => {
                self.released = true;

                Some(value)
            }
            Ok(Err(_)) => self.release(false),
            Err(_) => {
                trace!("Waiter {} on {} timed out", self.id, self.queue_name);

                self.release(false)
            }
        }
    }

    /// Remove the waiter slot. If it is not there anymore a producer served it, so the value is
    /// already in the channel. That value is returned or, if `give_back` is set, put back.
    fn release(&mut self, give_back: bool) -> Option<String> {
        self.released = true;

        let mut state = self.manager.lock();
        let queue = state.queues.get_mut(&self.queue_name)?;

        if queue.remove_waiter(self.id) {
            return None;
        }

        let value = self.delivery.try_recv().ok()?;

        if give_back {
            debug!("Waiter {} on {} is gone, message is put back", self.id, self.queue_name);

            queue.give_back(value);

            None
        } else {
            Some(value)
        }
    }
}

impl Drop for PendingGet<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.release(true);
        }
    }
}
