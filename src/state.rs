use crate::dispatch::Dispatcher;
use crate::ports::{DocumentStore, PushSender};
use crate::reminders::ReminderJob;
use crate::triggers::{EventTriggers, UserTriggers};

#[derive(Clone)]
pub struct AppState<S, P> {
    pub events: EventTriggers<S, P>,
    pub users: UserTriggers<S, P>,
    pub reminders: ReminderJob<S, P>,
}

impl<S, P> AppState<S, P>
where
    S: DocumentStore,
    P: PushSender,
{
    pub fn new(store: S, sender: P) -> Self {
        let dispatcher = Dispatcher::new(store, sender);
        Self {
            events: EventTriggers::new(dispatcher.clone()),
            users: UserTriggers::new(dispatcher.clone()),
            reminders: ReminderJob::new(dispatcher),
        }
    }
}
