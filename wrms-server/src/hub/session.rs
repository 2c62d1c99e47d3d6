//! Observer sessions
//!
//! A session is one live observer connection: the voter id it acts as, a
//! bounded outbound event queue, and a writer that drains the queue into the
//! session's transport. The writer only ever waits on its own queue and its
//! own transport.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use wrms_common::WrmsEvent;

use crate::scheduler::VoterId;

/// Number of events a join-time replay can contain (play, add, upvoted, downvoted)
pub const MAX_REPLAY_EVENTS: usize = 4;

static NEXT_SESSION_KEY: AtomicU64 = AtomicU64::new(1);

/// Unique key of one connection
///
/// Distinct from the voter id: two tabs sharing a `UUID` cookie vote as the
/// same voter but are separate sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey(u64);

impl SessionKey {
    fn next() -> Self {
        Self(NEXT_SESSION_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Hub-side half of a session: where events are pushed
#[derive(Debug)]
pub struct SessionHandle {
    pub key: SessionKey,
    pub voter: VoterId,
    tx: mpsc::Sender<Arc<WrmsEvent>>,
}

/// Why an event could not be queued for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// The session's queue is full: the consumer is too slow
    Full,
    /// The session's writer is gone
    Closed,
}

impl SessionHandle {
    /// Queue an event without waiting
    pub fn deliver(&self, event: Arc<WrmsEvent>) -> Result<(), DeliveryError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// Writer-side half of a session
#[derive(Debug)]
pub struct Session {
    pub key: SessionKey,
    pub voter: VoterId,
    rx: mpsc::Receiver<Arc<WrmsEvent>>,
}

/// Create both halves of a new session for `voter`
pub fn channel(voter: VoterId, capacity: usize) -> (SessionHandle, Session) {
    let key = SessionKey::next();
    let (tx, rx) = mpsc::channel(capacity.max(MAX_REPLAY_EVENTS));
    (
        SessionHandle { key, voter, tx },
        Session { key, voter, rx },
    )
}

/// Transport a session writer delivers events to
pub trait EventSink: Send {
    /// Write one event to the transport
    fn send_event(&mut self, event: &WrmsEvent) -> impl Future<Output = crate::Result<()>> + Send;

    /// Release the transport
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// How a session writer ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterExit {
    /// The hub dropped the session (unregister, overflow, or shutdown)
    QueueClosed,
    /// A transport write failed
    WriteFailed,
    /// The connection closed from the client side
    Cancelled,
}

impl Session {
    /// Receive the next queued event; `None` once the hub has dropped the session
    pub async fn recv(&mut self) -> Option<Arc<WrmsEvent>> {
        self.rx.recv().await
    }

    /// Take a queued event without waiting
    pub fn try_recv(&mut self) -> Option<Arc<WrmsEvent>> {
        self.rx.try_recv().ok()
    }

    /// Drain the queue into `sink` until the queue closes, a write fails,
    /// or `cancel` completes; the sink is closed in every case
    pub async fn run<S, C>(mut self, mut sink: S, cancel: C) -> WriterExit
    where
        S: EventSink,
        C: Future<Output = ()> + Send,
    {
        let exit = tokio::select! {
            exit = Self::pump(self.key, &mut self.rx, &mut sink) => exit,
            _ = cancel => WriterExit::Cancelled,
        };

        // Discard anything still queued; the hub stops delivering once unregistered
        self.rx.close();
        sink.close().await;
        debug!("{} writer ended: {:?}", self.key, exit);
        exit
    }

    async fn pump<S: EventSink>(
        key: SessionKey,
        rx: &mut mpsc::Receiver<Arc<WrmsEvent>>,
        sink: &mut S,
    ) -> WriterExit {
        while let Some(event) = rx.recv().await {
            debug!("Sending {} event to {}", event.cmd, key);
            if let Err(e) = sink.send_event(&event).await {
                warn!("Sending {} event to {} failed: {}", event.cmd, key, e);
                return WriterExit::WriteFailed;
            }
        }
        WriterExit::QueueClosed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use uuid::Uuid;

    /// Sink that records events and fails after `fail_after` writes
    struct RecordingSink {
        written: Arc<std::sync::Mutex<Vec<WrmsEvent>>>,
        fail_after: Option<usize>,
        closed: Arc<std::sync::atomic::AtomicBool>,
    }

    impl EventSink for RecordingSink {
        async fn send_event(&mut self, event: &WrmsEvent) -> crate::Result<()> {
            let mut written = self.written.lock().unwrap();
            if Some(written.len()) == self.fail_after {
                return Err(Error::Http("transport closed".to_string()));
            }
            written.push(event.clone());
            Ok(())
        }

        async fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn sink(fail_after: Option<usize>) -> (RecordingSink, Arc<std::sync::Mutex<Vec<WrmsEvent>>>, Arc<std::sync::atomic::AtomicBool>) {
        let written = Arc::new(std::sync::Mutex::new(Vec::new()));
        let closed = Arc::new(std::sync::atomic::AtomicBool::new(false));
        (
            RecordingSink {
                written: written.clone(),
                fail_after,
                closed: closed.clone(),
            },
            written,
            closed,
        )
    }

    #[test]
    fn test_keys_are_unique_per_connection() {
        let voter = Uuid::new_v4();
        let (a, _) = channel(voter, 8);
        let (b, _) = channel(voter, 8);
        assert_ne!(a.key, b.key);
        assert_eq!(a.voter, b.voter);
    }

    #[test]
    fn test_deliver_reports_full_and_closed() {
        let (handle, session) = channel(Uuid::new_v4(), 1);
        // Capacity is raised to fit a full replay
        for _ in 0..MAX_REPLAY_EVENTS {
            handle.deliver(Arc::new(WrmsEvent::pause())).unwrap();
        }
        assert_eq!(handle.deliver(Arc::new(WrmsEvent::pause())), Err(DeliveryError::Full));

        drop(session);
        assert_eq!(handle.deliver(Arc::new(WrmsEvent::pause())), Err(DeliveryError::Closed));
    }

    #[tokio::test]
    async fn test_writer_drains_in_order_until_queue_closes() {
        let (handle, session) = channel(Uuid::new_v4(), 16);
        let (sink, written, closed) = sink(None);

        handle.deliver(Arc::new(WrmsEvent::add(vec![]))).unwrap();
        handle.deliver(Arc::new(WrmsEvent::pause())).unwrap();
        drop(handle);

        let exit = session.run(sink, std::future::pending()).await;
        assert_eq!(exit, WriterExit::QueueClosed);
        assert!(closed.load(Ordering::SeqCst));

        let cmds: Vec<_> = written.lock().unwrap().iter().map(|e| e.cmd).collect();
        assert_eq!(cmds, vec![wrms_common::EventKind::Add, wrms_common::EventKind::Pause]);
    }

    #[tokio::test]
    async fn test_writer_stops_on_write_failure() {
        let (handle, session) = channel(Uuid::new_v4(), 16);
        let (sink, written, closed) = sink(Some(1));

        for _ in 0..3 {
            handle.deliver(Arc::new(WrmsEvent::pause())).unwrap();
        }

        let exit = session.run(sink, std::future::pending()).await;
        assert_eq!(exit, WriterExit::WriteFailed);
        assert_eq!(written.lock().unwrap().len(), 1);
        assert!(closed.load(Ordering::SeqCst));

        // The writer is gone, so further deliveries fail
        assert_eq!(handle.deliver(Arc::new(WrmsEvent::pause())), Err(DeliveryError::Closed));
    }

    #[tokio::test]
    async fn test_writer_cancelled_by_connection_close() {
        let (_handle, session) = channel(Uuid::new_v4(), 16);
        let (sink, _, closed) = sink(None);

        let exit = session.run(sink, async {}).await;
        assert_eq!(exit, WriterExit::Cancelled);
        assert!(closed.load(Ordering::SeqCst));
    }
}
