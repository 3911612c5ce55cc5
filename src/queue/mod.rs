//! Serialized reverse-geocoding queue
//!
//! Burst reverse lookups (a moving map cursor, for instance) would overwhelm
//! the provider's rate limit if issued directly. `RequestSerializer` turns
//! them into a smooth serial stream: strict FIFO, at most one request in
//! flight, and a short cooldown between items.

use crate::coord::Coordinates;
use crate::error::{Error, Result};
use crate::geocode::{GeocodeBackend, GeocodeRunner, ResolvedAddress};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};
use uuid::Uuid;

/// A pending reverse-resolution request
///
/// The result slot is resolved exactly once: by success, failure, or
/// cancellation. `oneshot::Sender::send` consumes the sender, so a second
/// resolution is unrepresentable.
struct GeocodeRequest {
    id: Uuid,
    coords: Coordinates,
    slot: oneshot::Sender<Result<ResolvedAddress>>,
}

/// Queue contents plus the drain-task handle
///
/// A live handle doubles as the "processing" flag: the drain task is
/// spawned only when absent, and it observes requests appended while it
/// runs without a new trigger.
struct QueueState {
    pending: VecDeque<GeocodeRequest>,
    drain: Option<JoinHandle<()>>,
}

/// Single-flight FIFO queue over the reverse-resolution path
pub struct RequestSerializer<B> {
    runner: Arc<GeocodeRunner<B>>,
    state: Arc<Mutex<QueueState>>,
    cooldown: Duration,
}

impl<B: GeocodeBackend> RequestSerializer<B> {
    /// Create a serializer with the default cooldown
    pub fn new(runner: Arc<GeocodeRunner<B>>) -> Self {
        Self::with_cooldown(runner, crate::constants::timeouts::QUEUE_COOLDOWN)
    }

    /// Create a serializer with a specific cooldown between requests
    pub fn with_cooldown(runner: Arc<GeocodeRunner<B>>, cooldown: Duration) -> Self {
        Self {
            runner,
            state: Arc::new(Mutex::new(QueueState {
                pending: VecDeque::new(),
                drain: None,
            })),
            cooldown,
        }
    }

    /// Enqueue a reverse lookup; suspends until the request is resolved
    ///
    /// Requests complete in enqueue order. A request cancelled by `clear`
    /// resolves with `Error::Cancelled`.
    pub async fn enqueue(&self, coords: Coordinates) -> Result<ResolvedAddress> {
        let (tx, rx) = oneshot::channel();
        let id = Uuid::new_v4();

        {
            let mut state = self.state.lock().await;
            state.pending.push_back(GeocodeRequest {
                id,
                coords,
                slot: tx,
            });
            debug!(%id, queued = state.pending.len(), "enqueued reverse lookup");

            let draining = state
                .drain
                .as_ref()
                .map(|handle| !handle.is_finished())
                .unwrap_or(false);
            if !draining {
                state.drain = Some(tokio::spawn(drain(
                    Arc::clone(&self.runner),
                    Arc::clone(&self.state),
                    self.cooldown,
                )));
            }
        }

        // A dropped sender means the request was cancelled out from under
        // us (queue cleared while in flight).
        rx.await.map_err(|_| Error::Cancelled)?
    }

    /// Cancel the in-flight drain and resolve every pending request with
    /// `Cancelled`, leaving the queue empty
    pub async fn clear(&self) {
        let (handle, pending) = {
            let mut state = self.state.lock().await;
            (state.drain.take(), std::mem::take(&mut state.pending))
        };

        if let Some(handle) = handle {
            handle.abort();
            // The in-flight request's slot is dropped with the task; its
            // caller observes Cancelled.
            let _ = handle.await;
        }

        let cancelled = pending.len();
        for request in pending {
            let _ = request.slot.send(Err(Error::Cancelled));
        }
        info!(cancelled, "cleared reverse-lookup queue");
    }

    /// Number of requests waiting (excluding any in flight)
    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.pending.len()
    }
}

/// Drain loop: pop, resolve, cool down, repeat until the queue is empty
async fn drain<B: GeocodeBackend>(
    runner: Arc<GeocodeRunner<B>>,
    state: Arc<Mutex<QueueState>>,
    cooldown: Duration,
) {
    loop {
        let request = {
            let mut state = state.lock().await;
            match state.pending.pop_front() {
                Some(request) => request,
                None => {
                    // Clear the processing flag under the same lock that
                    // found the queue empty, so enqueue never misses it.
                    state.drain = None;
                    return;
                }
            }
        };

        // The caller may have abandoned the request while it sat in the
        // queue; don't spend a provider call on a dead slot.
        if request.slot.is_closed() {
            debug!(id = %request.id, "skipping abandoned reverse lookup");
            continue;
        }

        debug!(id = %request.id, "processing queued reverse lookup");
        let result = runner.resolve_address(request.coords).await;
        if request.slot.send(result).is_err() {
            debug!(id = %request.id, "caller gone before resolution");
        }

        sleep(cooldown).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::AddressComponents;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Backend that tracks how many reverse lookups run concurrently and
    /// in what order
    struct GaugeBackend {
        active: AtomicUsize,
        max_active: AtomicUsize,
        order: StdMutex<Vec<i64>>,
        delay: Duration,
    }

    impl GaugeBackend {
        fn new(delay: Duration) -> Self {
            Self {
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                order: StdMutex::new(Vec::new()),
                delay,
            }
        }
    }

    impl GeocodeBackend for GaugeBackend {
        async fn search(
            &self,
            _query: &str,
            _center: Coordinates,
            _radius_meters: f64,
        ) -> Result<Option<Coordinates>> {
            Ok(None)
        }

        async fn reverse(&self, coords: Coordinates) -> Result<Option<AddressComponents>> {
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);
            sleep(self.delay).await;
            self.order.lock().unwrap().push(coords.lat as i64);
            self.active.fetch_sub(1, Ordering::SeqCst);

            Ok(Some(AddressComponents {
                street: Some(format!("Street {}", coords.lat as i64)),
                ..Default::default()
            }))
        }
    }

    /// Capture drain-loop diagnostics in test output
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("pinpoint=debug")
            .with_test_writer()
            .try_init();
    }

    fn serializer(delay: Duration) -> (Arc<GaugeBackend>, RequestSerializer<GaugeBackend>) {
        let backend = Arc::new(GaugeBackend::new(delay));
        let runner = Arc::new(GeocodeRunner::new(Arc::clone(&backend)));
        let queue = RequestSerializer::with_cooldown(runner, Duration::from_millis(10));
        (backend, queue)
    }

    #[tokio::test]
    async fn test_single_request() {
        let (_, queue) = serializer(Duration::from_millis(5));
        let addr = queue.enqueue(Coordinates::new(1.0, 1.0)).await.unwrap();
        assert_eq!(addr.formatted(), "Street 1");
        assert_eq!(queue.pending_len().await, 0);
    }

    #[tokio::test]
    async fn test_fifo_order_and_single_flight() {
        init_tracing();
        let (backend, queue) = serializer(Duration::from_millis(20));

        // join! polls the futures in order, so enqueue order is 1..=5.
        let (r1, r2, r3, r4, r5) = tokio::join!(
            queue.enqueue(Coordinates::new(1.0, 0.0)),
            queue.enqueue(Coordinates::new(2.0, 0.0)),
            queue.enqueue(Coordinates::new(3.0, 0.0)),
            queue.enqueue(Coordinates::new(4.0, 0.0)),
            queue.enqueue(Coordinates::new(5.0, 0.0)),
        );

        assert_eq!(r1.unwrap().formatted(), "Street 1");
        assert_eq!(r2.unwrap().formatted(), "Street 2");
        assert_eq!(r3.unwrap().formatted(), "Street 3");
        assert_eq!(r4.unwrap().formatted(), "Street 4");
        assert_eq!(r5.unwrap().formatted(), "Street 5");

        assert_eq!(*backend.order.lock().unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(backend.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_enqueue_during_drain_is_picked_up() {
        let (backend, queue) = serializer(Duration::from_millis(20));
        let queue = Arc::new(queue);

        let q1 = Arc::clone(&queue);
        let first = tokio::spawn(async move { q1.enqueue(Coordinates::new(1.0, 0.0)).await });

        // Let the drain start on the first request, then add a second.
        sleep(Duration::from_millis(5)).await;
        let second = queue.enqueue(Coordinates::new(2.0, 0.0)).await;

        assert!(first.await.unwrap().is_ok());
        assert!(second.is_ok());
        assert_eq!(*backend.order.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_clear_cancels_all_pending() {
        init_tracing();
        let (_, queue) = serializer(Duration::from_secs(10));
        let queue = Arc::new(queue);

        let mut handles = Vec::new();
        for i in 1..=3 {
            let q = Arc::clone(&queue);
            handles.push(tokio::spawn(async move {
                q.enqueue(Coordinates::new(i as f64, 0.0)).await
            }));
        }

        // Let all three register; the first is in flight on the slow
        // backend, two are pending.
        sleep(Duration::from_millis(50)).await;
        queue.clear().await;

        for handle in handles {
            let result = handle.await.unwrap();
            assert!(matches!(result, Err(Error::Cancelled)));
        }
        assert_eq!(queue.pending_len().await, 0);
    }

    #[tokio::test]
    async fn test_abandoned_request_skipped_without_provider_call() {
        init_tracing();
        let (backend, queue) = serializer(Duration::from_millis(20));
        let queue = Arc::new(queue);

        // Keep the drain busy on a slow first request so it cannot pop the
        // abandoned one before it is dropped.
        let q1 = Arc::clone(&queue);
        let first = tokio::spawn(async move { q1.enqueue(Coordinates::new(1.0, 0.0)).await });
        sleep(Duration::from_millis(5)).await;

        // Poll the enqueue once so the request registers, then drop it
        // while the drain is still in flight on the first.
        let abandoned = tokio::time::timeout(
            Duration::ZERO,
            queue.enqueue(Coordinates::new(2.0, 0.0)),
        )
        .await;
        assert!(abandoned.is_err());

        // The drain skips the dead slot and only the live requests cost
        // provider calls.
        let addr = queue.enqueue(Coordinates::new(3.0, 0.0)).await.unwrap();
        assert_eq!(addr.formatted(), "Street 3");
        assert!(first.await.unwrap().is_ok());
        assert_eq!(*backend.order.lock().unwrap(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_queue_usable_after_clear() {
        let (_, queue) = serializer(Duration::from_millis(5));
        queue.clear().await;

        let addr = queue.enqueue(Coordinates::new(7.0, 0.0)).await.unwrap();
        assert_eq!(addr.formatted(), "Street 7");
    }

    #[tokio::test]
    async fn test_invalid_coordinates_resolve_with_error() {
        let (backend, queue) = serializer(Duration::from_millis(5));
        let result = queue.enqueue(Coordinates::new(999.0, 999.0)).await;
        assert!(matches!(result, Err(Error::InvalidAddress(_))));
        // The runner rejected it before the provider was contacted.
        assert!(backend.order.lock().unwrap().is_empty());
    }
}
