use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};

/// Delays a changing value until it has been stable for `delay`.
///
/// Each push restarts the wait and replaces the pending value, so a value
/// that is superseded before the wait expires is never emitted. The derived
/// value starts out equal to the initial input. Subscribers only see a
/// change when the emitted value differs from the current one.
///
/// [`Debouncer::settle`] publishes synchronously: once it returns,
/// [`Debouncer::current`] reflects the settled value and anything pushed
/// before it is dropped.
///
/// The background task stops when the `Debouncer` is dropped.
pub struct Debouncer<T> {
    input: mpsc::UnboundedSender<(T, u64)>,
    publisher: Arc<watch::Sender<T>>,
    output: watch::Receiver<T>,
    epoch: Arc<AtomicU64>,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: T, delay: Duration) -> Self {
        let (input, pushes) = mpsc::unbounded_channel();
        let (publisher, output) = watch::channel(initial);
        let publisher = Arc::new(publisher);
        let epoch = Arc::new(AtomicU64::new(0));

        tokio::spawn(run(pushes, Arc::clone(&publisher), Arc::clone(&epoch), delay));

        Self {
            input,
            publisher,
            output,
            epoch,
        }
    }

    pub fn push(&self, value: T) {
        let epoch = self.epoch.load(Ordering::SeqCst);
        if self.input.send((value, epoch)).is_err() {
            tracing::debug!("Debouncer task has stopped, dropping input");
        }
    }

    /// Emits `value` now and cancels any pending wait
    pub fn settle(&self, value: T) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        publish(&self.publisher, value);
    }

    /// Receiver notified each time a new settled value is emitted
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.output.clone()
    }

    pub fn current(&self) -> T {
        self.output.borrow().clone()
    }
}

async fn run<T: PartialEq>(
    mut pushes: mpsc::UnboundedReceiver<(T, u64)>,
    publisher: Arc<watch::Sender<T>>,
    epoch: Arc<AtomicU64>,
    delay: Duration,
) {
    let mut pending: Option<(T, u64, Instant)> = None;

    loop {
        let deadline = pending.as_ref().map(|(_, _, at)| *at);

        tokio::select! {
            push = pushes.recv() => match push {
                Some((value, pushed_in)) => {
                    pending = Some((value, pushed_in, Instant::now() + delay));
                }
                None => break,
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Some((value, pushed_in, _)) = pending.take() {
                    // settled since this value was pushed
                    if pushed_in == epoch.load(Ordering::SeqCst) {
                        publish(&publisher, value);
                    }
                }
            }
        }
    }
}

fn publish<T: PartialEq>(publisher: &watch::Sender<T>, value: T) {
    publisher.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(1000);

    #[tokio::test(start_paused = true)]
    async fn test_initial_value_without_delay() {
        let debouncer = Debouncer::new("dune".to_string(), DELAY);
        assert_eq!(debouncer.current(), "dune");
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_after_quiet_period() {
        let debouncer = Debouncer::new(String::new(), DELAY);
        debouncer.push("bat".to_string());

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(debouncer.current(), "");

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(debouncer.current(), "bat");
    }

    #[tokio::test(start_paused = true)]
    async fn test_intermediate_values_never_emitted() {
        let debouncer = Debouncer::new(String::new(), DELAY);
        let mut rx = debouncer.subscribe();

        for term in ["b", "ba", "bat", "batm", "batman"] {
            debouncer.push(term.to_string());
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        tokio::time::sleep(DELAY).await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), "batman");
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_emitted_value_was_stable_for_the_delay() {
        let debouncer = Debouncer::new(0u32, DELAY);
        let mut rx = debouncer.subscribe();
        // value, how long it stays before the next input
        let script = [(1, 200), (2, 1500), (3, 999), (4, 1001), (5, 10), (6, 3000)];

        let observer = tokio::spawn(async move {
            let mut seen = Vec::new();
            while rx.changed().await.is_ok() {
                seen.push(*rx.borrow_and_update());
            }
            seen
        });

        for (value, hold_ms) in script {
            debouncer.push(value);
            tokio::time::sleep(Duration::from_millis(hold_ms)).await;
        }
        drop(debouncer);

        let seen = observer.await.unwrap();
        assert_eq!(seen, vec![2, 4, 6]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_cancels_pending_value() {
        let debouncer = Debouncer::new(String::new(), DELAY);
        debouncer.push("matrix".to_string());
        tokio::time::sleep(Duration::from_millis(10)).await;
        debouncer.settle(String::new());
        tokio::time::sleep(DELAY * 2).await;
        assert_eq!(debouncer.current(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_emits_immediately() {
        let debouncer = Debouncer::new("matrix".to_string(), DELAY);
        debouncer.settle(String::new());
        assert_eq!(debouncer.current(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_after_settle_still_debounces() {
        let debouncer = Debouncer::new(String::new(), DELAY);
        debouncer.push("matrix".to_string());
        debouncer.settle(String::new());
        debouncer.push("dune".to_string());

        tokio::time::sleep(DELAY + Duration::from_millis(1)).await;
        assert_eq!(debouncer.current(), "dune");
    }
}
