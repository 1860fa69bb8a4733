//! Mailboxes with selective receive.
//!
//! A [`Mailbox`] queues messages in arrival order. Receiving takes a
//! [`Behavior`] and removes the oldest message the behavior matches; messages
//! it does not match stay queued, in order, for a later behavior.
//!
//! The matching handler never runs under the mailbox lock. The behavior is
//! probed with [`Behavior::get_intermediate`] while the queue is locked, the
//! matched message is removed, the lock is released, and only then is the
//! deferred call invoked. Handlers are therefore free to enqueue into the
//! same mailbox.
//!
//! ```rust
//! use relay_core::{Behavior, make_message};
//! use relay_runtime::Mailbox;
//!
//! let mailbox = Mailbox::new();
//! mailbox.enqueue(make_message!("later")).unwrap();
//! mailbox.enqueue(make_message!(42u32)).unwrap();
//!
//! let numbers = Behavior::new().on(|n: &u32| assert_eq!(*n, 42));
//! assert!(mailbox.try_receive(&numbers));
//! assert_eq!(mailbox.len(), 1);
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use relay_core::{Behavior, Intermediate, Message};
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::MailboxConfig;
use crate::sync::{Condvar, Mutex, now, wait_until};

/// Errors returned by mailbox operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailboxError {
    /// The mailbox was closed and holds no matching message.
    #[error("mailbox is closed")]
    Closed,

    /// The mailbox holds `capacity` messages already.
    #[error("mailbox is full ({capacity} messages)")]
    Full { capacity: usize },
}

/// Result type for mailbox operations.
pub type MailboxResult<T> = Result<T, MailboxError>;

#[derive(Default)]
struct MailboxState {
    queue: VecDeque<Message>,
    closed: bool,
}

impl MailboxState {
    /// Removes the oldest message `behavior` matches and defers its call.
    fn take_matching(&mut self, behavior: &Behavior) -> Option<Intermediate> {
        let (index, intermediate) = self
            .queue
            .iter()
            .enumerate()
            .find_map(|(index, msg)| behavior.get_intermediate(msg).map(|im| (index, im)))?;
        self.queue.remove(index);
        trace!(index, remaining = self.queue.len(), "message dequeued");
        Some(intermediate)
    }
}

/// A message queue with selective, blocking receive.
#[derive(Default)]
pub struct Mailbox {
    state: Mutex<MailboxState>,
    ready: Condvar,
    capacity: Option<usize>,
    default_timeout: Option<Duration>,
}

impl Mailbox {
    /// Creates an unbounded mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mailbox from configuration.
    pub fn from_config(config: &MailboxConfig) -> Self {
        Self {
            capacity: config.capacity,
            default_timeout: config.receive_timeout.map(|t| t.to_duration()),
            ..Self::default()
        }
    }

    /// Limits the number of queued messages.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Sets the timeout used by [`receive_default`](Self::receive_default).
    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Returns the timeout used by [`receive_default`](Self::receive_default).
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    /// Appends a message and wakes blocked receivers.
    pub fn enqueue(&self, message: Message) -> MailboxResult<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(MailboxError::Closed);
        }
        if let Some(capacity) = self.capacity {
            if state.queue.len() >= capacity {
                debug!(capacity, "mailbox full, message rejected");
                return Err(MailboxError::Full { capacity });
            }
        }
        state.queue.push_back(message);
        trace!(len = state.queue.len(), "message enqueued");
        drop(state);

        // Receivers may hold different behaviors, so every one of them rescans.
        self.ready.notify_all();
        Ok(())
    }

    /// Closes the mailbox. Queued messages can still be received.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.ready.notify_all();
        debug!("mailbox closed");
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().queue.is_empty()
    }

    /// Handles the oldest message `behavior` matches, without blocking.
    ///
    /// Returns `false` if no queued message matches.
    pub fn try_receive(&self, behavior: &Behavior) -> bool {
        let intermediate = self.state.lock().take_matching(behavior);
        match intermediate {
            Some(intermediate) => {
                intermediate.invoke();
                true
            }
            None => false,
        }
    }

    /// Blocks until a message matching `behavior` arrives, then handles it.
    pub fn receive(&self, behavior: &Behavior) -> MailboxResult<()> {
        let mut state = self.state.lock();
        loop {
            if let Some(intermediate) = state.take_matching(behavior) {
                drop(state);
                intermediate.invoke();
                return Ok(());
            }
            if state.closed {
                return Err(MailboxError::Closed);
            }
            self.ready.wait(&mut state);
        }
    }

    /// Like [`receive`](Self::receive), giving up after `timeout`.
    ///
    /// Returns `Ok(false)` if the timeout elapsed without a matching message.
    pub fn receive_timeout(&self, behavior: &Behavior, timeout: Duration) -> MailboxResult<bool> {
        let Some(deadline) = now().checked_add(timeout) else {
            return self.receive(behavior).map(|()| true);
        };

        let mut state = self.state.lock();
        loop {
            if let Some(intermediate) = state.take_matching(behavior) {
                drop(state);
                intermediate.invoke();
                return Ok(true);
            }
            if state.closed {
                return Err(MailboxError::Closed);
            }
            if !wait_until(&self.ready, &mut state, deadline) {
                let intermediate = state.take_matching(behavior);
                drop(state);
                return Ok(match intermediate {
                    Some(intermediate) => {
                        intermediate.invoke();
                        true
                    }
                    None => {
                        trace!(?timeout, "receive timed out");
                        false
                    }
                });
            }
        }
    }

    /// Receives with the configured timeout, or blocks if none is configured.
    pub fn receive_default(&self, behavior: &Behavior) -> MailboxResult<bool> {
        match self.default_timeout {
            Some(timeout) => self.receive_timeout(behavior, timeout),
            None => self.receive(behavior).map(|()| true),
        }
    }
}

impl std::fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Mailbox")
            .field("len", &state.queue.len())
            .field("closed", &state.closed)
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::RelativeTimeout;
    use relay_core::make_message;
    use static_assertions::assert_impl_all;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    assert_impl_all!(Mailbox: Send, Sync);

    fn recorder() -> (Behavior, Arc<parking_lot::Mutex<Vec<String>>>) {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let (a, b) = (Arc::clone(&log), Arc::clone(&log));
        let behavior = Behavior::new()
            .on(move |n: &u32| a.lock().push(format!("u32:{n}")))
            .on(move |s: &String| b.lock().push(format!("str:{s}")));
        (behavior, log)
    }

    #[test]
    fn test_try_receive_empty() {
        let (behavior, log) = recorder();
        assert!(!Mailbox::new().try_receive(&behavior));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_selective_receive_keeps_order() {
        let mailbox = Mailbox::new();
        mailbox.enqueue(make_message!(1.5f64)).unwrap();
        mailbox.enqueue(make_message!(7u32)).unwrap();
        mailbox.enqueue(make_message!(2.5f64)).unwrap();
        mailbox.enqueue(make_message!("x")).unwrap();

        let (behavior, log) = recorder();
        assert!(mailbox.try_receive(&behavior));
        assert!(mailbox.try_receive(&behavior));
        assert!(!mailbox.try_receive(&behavior));
        assert_eq!(*log.lock(), vec!["u32:7", "str:x"]);

        // Skipped messages remain, oldest first.
        let floats = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&floats);
        let float_behavior = Behavior::new().on(move |f: &f64| sink.lock().push(*f));
        assert!(mailbox.try_receive(&float_behavior));
        assert!(mailbox.try_receive(&float_behavior));
        assert_eq!(*floats.lock(), vec![1.5, 2.5]);
        assert!(mailbox.is_empty());
    }

    #[test]
    fn test_handler_can_enqueue_into_same_mailbox() {
        let mailbox = Arc::new(Mailbox::new());
        let inner = Arc::clone(&mailbox);
        let behavior = Behavior::new().on(move |n: &u32| {
            inner.enqueue(make_message!(n + 1)).unwrap();
        });

        mailbox.enqueue(make_message!(1u32)).unwrap();
        assert!(mailbox.try_receive(&behavior));
        assert_eq!(mailbox.len(), 1);
    }

    #[test]
    fn test_receive_blocks_until_enqueued() {
        let mailbox = Arc::new(Mailbox::new());
        let (behavior, log) = recorder();

        let sender = Arc::clone(&mailbox);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            sender.enqueue(make_message!(true)).unwrap();
            sender.enqueue(make_message!(9u32)).unwrap();
        });

        mailbox.receive(&behavior).unwrap();
        handle.join().unwrap();
        assert_eq!(*log.lock(), vec!["u32:9"]);
        assert_eq!(mailbox.len(), 1);
    }

    #[test]
    fn test_receive_timeout_elapses() {
        let mailbox = Mailbox::new();
        mailbox.enqueue(make_message!(false)).unwrap();
        let (behavior, log) = recorder();

        let start = now();
        let handled = mailbox
            .receive_timeout(&behavior, Duration::from_millis(20))
            .unwrap();
        assert!(!handled);
        assert!(now().duration_since(start) >= Duration::from_millis(20));
        assert!(log.lock().is_empty());
        assert_eq!(mailbox.len(), 1);
    }

    #[test]
    fn test_receive_timeout_handles_message() {
        let mailbox = Arc::new(Mailbox::new());
        let (behavior, log) = recorder();

        let sender = Arc::clone(&mailbox);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            sender.enqueue(make_message!("hi")).unwrap();
        });

        assert!(
            mailbox
                .receive_timeout(&behavior, Duration::from_secs(5))
                .unwrap()
        );
        handle.join().unwrap();
        assert_eq!(*log.lock(), vec!["str:hi"]);
    }

    #[test]
    fn test_close_wakes_receivers() {
        let mailbox = Arc::new(Mailbox::new());
        let (behavior, _log) = recorder();

        let closer = Arc::clone(&mailbox);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            closer.close();
        });

        assert_eq!(mailbox.receive(&behavior), Err(MailboxError::Closed));
        handle.join().unwrap();
        assert_eq!(
            mailbox.enqueue(make_message!(1u32)),
            Err(MailboxError::Closed)
        );
    }

    #[test]
    fn test_closed_mailbox_drains_queued_messages() {
        let mailbox = Mailbox::new();
        mailbox.enqueue(make_message!(3u32)).unwrap();
        mailbox.close();

        let (behavior, log) = recorder();
        assert_eq!(mailbox.receive(&behavior), Ok(()));
        assert_eq!(mailbox.receive(&behavior), Err(MailboxError::Closed));
        assert_eq!(*log.lock(), vec!["u32:3"]);
    }

    #[test]
    fn test_capacity() {
        let mailbox = Mailbox::new().with_capacity(1);
        mailbox.enqueue(make_message!(1u32)).unwrap();
        assert_eq!(
            mailbox.enqueue(make_message!(2u32)),
            Err(MailboxError::Full { capacity: 1 })
        );
    }

    #[test]
    fn test_from_config_and_receive_default() {
        let config = MailboxConfig {
            receive_timeout: Some(RelativeTimeout::milliseconds(5)),
            capacity: Some(4),
        };
        let mailbox = Mailbox::from_config(&config);
        assert_eq!(mailbox.capacity(), Some(4));
        assert_eq!(mailbox.default_timeout(), Some(Duration::from_millis(5)));

        let (behavior, _log) = recorder();
        assert_eq!(mailbox.receive_default(&behavior), Ok(false));
    }

    #[test]
    fn test_many_senders() {
        let mailbox = Arc::new(Mailbox::new());
        let total = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&total);
        let behavior = Behavior::new().on(move |n: &usize| {
            sink.fetch_add(*n, Ordering::SeqCst);
        });

        let senders: Vec<_> = (0..4)
            .map(|_| {
                let mailbox = Arc::clone(&mailbox);
                thread::spawn(move || {
                    for n in 1..=25usize {
                        mailbox.enqueue(make_message!(n)).unwrap();
                    }
                })
            })
            .collect();

        for _ in 0..100 {
            assert!(
                mailbox
                    .receive_timeout(&behavior, Duration::from_secs(5))
                    .unwrap()
            );
        }
        for sender in senders {
            sender.join().unwrap();
        }
        assert_eq!(total.load(Ordering::SeqCst), 4 * (25 * 26 / 2));
    }
}
