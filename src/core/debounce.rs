//! Debounced value stabilizer.
//!
//! A [`Debouncer`] republishes its input only after the input has stayed the
//! same for a fixed delay. A newer value restarts the wait and the value it
//! replaced is never published. Dropping the debouncer cancels a pending
//! value without publishing it.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// Messages into the timer task
enum Input<T> {
    /// Restart the wait with this value
    Value(T),

    /// Drop anything pending and publish this value now
    Immediate(T),
}

/// Delays propagation of a value until it stops changing
pub struct Debouncer<T> {
    input: mpsc::UnboundedSender<Input<T>>,
    output: watch::Receiver<T>,
    task: JoinHandle<()>,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Start a debouncer whose stable value is initially `initial`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(initial: T, delay: Duration) -> Self {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (output_tx, output_rx) = watch::channel(initial);

        let task = tokio::spawn(run_timer(input_rx, output_tx, delay));

        Self {
            input: input_tx,
            output: output_rx,
            task,
        }
    }

    /// Offer a new input value
    pub fn set(&self, value: T) {
        // The task only stops when this debouncer is dropped
        let _ = self.input.send(Input::Value(value));
    }

    /// Cancel any pending value and publish `value` immediately
    pub fn reset(&self, value: T) {
        let _ = self.input.send(Input::Immediate(value));
    }

    /// The current stable value
    pub fn get(&self) -> T {
        self.output.borrow().clone()
    }

    /// Receiver that wakes whenever the stable value changes
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.output.clone()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Timer loop: holds at most one pending value and its deadline.
async fn run_timer<T>(
    mut input: mpsc::UnboundedReceiver<Input<T>>,
    output: watch::Sender<T>,
    delay: Duration,
) where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    // Latest value offered, published or not
    let mut latest = output.borrow().clone();
    let mut deadline: Option<Instant> = None;

    loop {
        let next = match deadline {
            Some(at) => {
                tokio::select! {
                    next = input.recv() => next,
                    _ = sleep_until(at) => {
                        deadline = None;
                        publish(&output, latest.clone());
                        continue;
                    }
                }
            }
            None => input.recv().await,
        };

        match next {
            // All senders gone: tear down without publishing
            None => return,
            Some(Input::Value(value)) => {
                if value == latest {
                    continue;
                }
                latest = value;
                deadline = Some(Instant::now() + delay);
            }
            Some(Input::Immediate(value)) => {
                deadline = None;
                latest = value.clone();
                publish(&output, value);
            }
        }
    }
}

fn publish<T: PartialEq>(output: &watch::Sender<T>, value: T) {
    output.send_if_modified(|current| {
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
    use tokio::time::sleep;

    const DELAY: Duration = Duration::from_millis(500);

    #[tokio::test(start_paused = true)]
    async fn test_emits_after_quiet_period() {
        let debouncer = Debouncer::new(String::new(), DELAY);
        let mut rx = debouncer.subscribe();

        debouncer.set("dune".to_string());
        sleep(Duration::from_millis(499)).await;
        assert!(!rx.has_changed().unwrap());

        sleep(Duration::from_millis(2)).await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), "dune");
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_emits_only_last_value_once() {
        let debouncer = Debouncer::new(String::new(), DELAY);
        let mut rx = debouncer.subscribe();

        for text in ["d", "du", "dun", "dune"] {
            debouncer.set(text.to_string());
            sleep(Duration::from_millis(200)).await;
            assert!(!rx.has_changed().unwrap(), "{} leaked early", text);
        }

        sleep(Duration::from_millis(301)).await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), "dune");

        // Nothing further is emitted once the value settled
        sleep(Duration::from_secs(5)).await;
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_value_does_not_restart_wait() {
        let debouncer = Debouncer::new(0u32, DELAY);
        let mut rx = debouncer.subscribe();

        debouncer.set(7);
        sleep(Duration::from_millis(300)).await;
        debouncer.set(7);
        sleep(Duration::from_millis(201)).await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_cancels_pending() {
        let debouncer = Debouncer::new(String::from("a"), DELAY);
        let mut rx = debouncer.subscribe();

        debouncer.set("abc".to_string());
        sleep(Duration::from_millis(100)).await;
        debouncer.reset(String::new());
        sleep(Duration::from_millis(10)).await;

        assert_eq!(*rx.borrow_and_update(), "");
        sleep(Duration::from_secs(2)).await;
        assert!(!rx.has_changed().unwrap());
        assert_eq!(debouncer.get(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_without_emission() {
        let debouncer = Debouncer::new(1u8, DELAY);
        let rx = debouncer.subscribe();

        debouncer.set(2);
        sleep(Duration::from_millis(100)).await;
        drop(debouncer);
        sleep(Duration::from_secs(2)).await;

        assert_eq!(*rx.borrow(), 1);
    }
}
