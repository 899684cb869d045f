use crate::error::PushError;
use crate::types::PushMessage;

pub trait PushSender: Clone + Send + Sync + 'static {
    type Fut<'a>: Future<Output = Result<(), PushError>> + Send + 'a
    where
        Self: 'a;

    fn send<'a>(&'a self, message: &'a PushMessage) -> Self::Fut<'a>;
}
