use crate::ports;
use crate::reminders::ReminderJob;

use std::time::Duration;
use time::OffsetDateTime;
use tokio::task::JoinHandle;

pub struct ReminderLoopHandle {
    pub started_at: OffsetDateTime,
    handle: JoinHandle<()>,
}

impl ReminderLoopHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl Drop for ReminderLoopHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Runs the reminder job immediately and then once per interval.
#[derive(Debug, Clone)]
pub struct ReminderScheduler<T, S, P> {
    time: T,
    job: ReminderJob<S, P>,
    interval: Duration,
}

impl<T, S, P> ReminderScheduler<T, S, P>
where
    T: ports::TimeProvider,
    S: ports::DocumentStore,
    P: ports::PushSender,
{
    pub fn new(time: T, job: ReminderJob<S, P>, interval: Duration) -> Self {
        Self {
            time,
            job,
            interval,
        }
    }

    pub fn spawn(self) -> ReminderLoopHandle {
        let started_at = self.time.now();
        let handle = tokio::spawn(async move {
            loop {
                self.tick().await;
                self.time.sleep(self.interval).await;
            }
        });
        ReminderLoopHandle { started_at, handle }
    }

    async fn tick(&self) {
        let now = self.time.now();
        match self.job.run(now).await {
            Ok(run) => tracing::info!(
                scanned = run.scanned,
                fired = run.fired.len(),
                pushes = run.pushes,
                "reminder run finished"
            ),
            Err(err) => tracing::error!(error = %err, "reminder run failed"),
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::dispatch::Dispatcher;
    use crate::dispatch::testing::TestSender;
    use crate::types::{Event, User};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};
    use time::macros::datetime;
    use tokio::sync::oneshot;

    #[derive(Clone)]
    struct TestTime {
        now: Arc<Mutex<OffsetDateTime>>,
        sleeps: Arc<Mutex<Vec<oneshot::Sender<()>>>>,
        durations: Arc<Mutex<Vec<Duration>>>,
    }

    impl TestTime {
        fn new(now: OffsetDateTime) -> Self {
            Self {
                now: Arc::new(Mutex::new(now)),
                sleeps: Arc::new(Mutex::new(Vec::new())),
                durations: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn advance(&self, by: time::Duration) {
            let mut now = self.now.lock().expect("now lock");
            *now += by;
        }

        fn sleep_durations(&self) -> Vec<Duration> {
            self.durations.lock().expect("durations lock").clone()
        }

        fn trigger_all(&self) {
            let mut sends = self.sleeps.lock().expect("sleeps lock");
            for sender in sends.drain(..) {
                let _ = sender.send(());
            }
        }
    }

    struct ManualSleep {
        receiver: oneshot::Receiver<()>,
    }

    impl Future for ManualSleep {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            match Pin::new(&mut self.receiver).poll(cx) {
                Poll::Ready(_) => Poll::Ready(()),
                Poll::Pending => Poll::Pending,
            }
        }
    }

    impl ports::TimeProvider for TestTime {
        type Sleep<'a>
            = ManualSleep
        where
            Self: 'a;

        fn now(&self) -> OffsetDateTime {
            *self.now.lock().expect("now lock")
        }

        fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
            let (sender, receiver) = oneshot::channel();
            self.durations
                .lock()
                .expect("durations lock")
                .push(duration);
            self.sleeps.lock().expect("sleeps lock").push(sender);
            ManualSleep { receiver }
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn scheduler__should_run_immediately_then_wait_for_interval() {
        // Given
        let now = datetime!(2026-03-14 12:00 UTC);
        let time = TestTime::new(now);
        let store = MemoryStore::default();
        store.insert_event(
            "E1",
            Event {
                name: Some("Jazz Night".to_string()),
                date: Some(now + time::Duration::minutes(90)),
                ..Default::default()
            },
        );
        store.insert_user(
            "u1",
            User {
                booked_events: vec!["E1".to_string()],
                fcm_token: Some("token-1".to_string()),
            },
        );
        let sender = TestSender::default();
        let job = ReminderJob::new(Dispatcher::new(store.clone(), sender.clone()));
        let scheduler = ReminderScheduler::new(time.clone(), job, Duration::from_secs(3600));

        // When
        let handle = scheduler.spawn();
        settle().await;

        // Then
        assert_eq!(handle.started_at, now);
        assert!(!handle.is_finished());
        assert_eq!(sender.sent().len(), 1);
        assert_eq!(store.reminder_markers(), vec!["E1_24_hour".to_string()]);
        assert_eq!(time.sleep_durations(), vec![Duration::from_secs(3600)]);

        // When
        time.advance(time::Duration::hours(1));
        time.trigger_all();
        settle().await;

        // Then
        assert_eq!(sender.sent().len(), 2);
        assert_eq!(
            store.reminder_markers(),
            vec!["E1_1_hour".to_string(), "E1_24_hour".to_string()]
        );
        assert_eq!(time.sleep_durations().len(), 2);

        handle.abort();
    }

    #[tokio::test]
    async fn scheduler__should_not_resend_on_later_ticks() {
        // Given
        let now = datetime!(2026-03-14 12:00 UTC);
        let time = TestTime::new(now);
        let store = MemoryStore::default();
        store.insert_event(
            "E1",
            Event {
                date: Some(now + time::Duration::hours(10)),
                ..Default::default()
            },
        );
        store.insert_user(
            "u1",
            User {
                booked_events: vec!["E1".to_string()],
                fcm_token: Some("token-1".to_string()),
            },
        );
        let sender = TestSender::default();
        let job = ReminderJob::new(Dispatcher::new(store, sender.clone()));
        let handle = ReminderScheduler::new(time.clone(), job, Duration::from_secs(60)).spawn();
        settle().await;

        // When
        for _ in 0..3 {
            time.advance(time::Duration::minutes(1));
            time.trigger_all();
            settle().await;
        }

        // Then
        assert_eq!(sender.sent().len(), 1);
        assert_eq!(time.sleep_durations().len(), 4);

        handle.abort();
    }
}
