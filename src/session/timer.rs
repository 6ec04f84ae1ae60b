use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::debug;

/// Countdown resolution
const TICK: Duration = Duration::from_secs(1);

/// Signals posted by a running countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSignal {
    /// One second elapsed; `remaining` is always above zero
    Tick { question: usize, remaining: u32 },
    /// The countdown reached zero; sent exactly once per arm
    Expired { question: usize },
}

struct ArmedCountdown {
    question: usize,
    task: JoinHandle<()>,
}

/// One-shot per-question countdown with a single slot
///
/// Arming always cancels whatever countdown was running, so at most one
/// exists at a time. Signals are posted into the owner's event queue.
pub struct QuestionTimer<E> {
    events: mpsc::UnboundedSender<E>,
    armed: Option<ArmedCountdown>,
}

impl<E> QuestionTimer<E>
where
    E: From<TimerSignal> + Send + 'static,
{
    pub fn new(events: mpsc::UnboundedSender<E>) -> Self {
        Self {
            events,
            armed: None,
        }
    }

    /// Start counting down `seconds` for `question`
    pub fn arm(&mut self, question: usize, seconds: u32) {
        self.cancel();

        let seconds = seconds.max(1);
        let events = self.events.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK, TICK);
            let mut remaining = seconds;

            loop {
                ticker.tick().await;
                remaining -= 1;

                if remaining == 0 {
                    let _ = events.send(TimerSignal::Expired { question }.into());
                    break;
                }

                if events
                    .send(TimerSignal::Tick { question, remaining }.into())
                    .is_err()
                {
                    break;
                }
            }
        });

        debug!("Timer armed for question {} ({}s)", question + 1, seconds);
        self.armed = Some(ArmedCountdown { question, task });
    }

    /// Stop the countdown without firing; returns whether one was running
    pub fn cancel(&mut self) -> bool {
        match self.armed.take() {
            Some(armed) => {
                let was_running = !armed.task.is_finished();
                armed.task.abort();
                if was_running {
                    debug!("Timer cancelled for question {}", armed.question + 1);
                }
                was_running
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.armed.as_ref().is_some_and(|a| !a.task.is_finished())
    }

    /// Question of the most recently armed countdown
    pub fn armed_question(&self) -> Option<usize> {
        self.armed.as_ref().map(|a| a.question)
    }
}

impl<E> Drop for QuestionTimer<E> {
    fn drop(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn next_signal(rx: &mut mpsc::UnboundedReceiver<TimerSignal>) -> TimerSignal {
        rx.recv().await.expect("timer channel closed")
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_ticks_then_expires_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = QuestionTimer::new(tx);

        let armed_at = Instant::now();
        timer.arm(0, 3);
        assert!(timer.is_running());

        assert_eq!(
            next_signal(&mut rx).await,
            TimerSignal::Tick {
                question: 0,
                remaining: 2
            }
        );
        assert_eq!(
            next_signal(&mut rx).await,
            TimerSignal::Tick {
                question: 0,
                remaining: 1
            }
        );
        assert_eq!(
            next_signal(&mut rx).await,
            TimerSignal::Expired { question: 0 }
        );
        assert_eq!(armed_at.elapsed(), Duration::from_secs(3));

        // Nothing more arrives after expiry
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
        assert!(!timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_expiry() {
        let (tx, mut rx) = mpsc::unbounded_channel::<TimerSignal>();
        let mut timer = QuestionTimer::new(tx);

        timer.arm(0, 2);
        assert!(timer.cancel());
        assert!(!timer.is_running());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err(), "Cancelled timer must not fire");
        assert!(!timer.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_running_countdown() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = QuestionTimer::new(tx);

        timer.arm(0, 30);
        tokio::time::sleep(Duration::from_millis(5500)).await;
        timer.arm(1, 2);
        assert_eq!(timer.armed_question(), Some(1));

        let mut signals = Vec::new();
        while let Some(signal) = rx.recv().await {
            signals.push(signal);
            if matches!(signal, TimerSignal::Expired { .. }) {
                break;
            }
        }

        // Five ticks from question 0, then a fresh two-second countdown
        assert_eq!(signals.len(), 7);
        assert_eq!(
            &signals[5..],
            &[
                TimerSignal::Tick {
                    question: 1,
                    remaining: 1
                },
                TimerSignal::Expired { question: 1 }
            ]
        );
        assert!(signals[..5]
            .iter()
            .all(|s| matches!(s, TimerSignal::Tick { question: 0, .. })));
    }
}
