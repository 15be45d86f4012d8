use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::Stream;

use crate::errors::Result;

use super::event::Transition;
use super::session::Session;

/// Transitions of a key line as a [`Stream`], for use from async tasks.
///
/// The task's waker joins the same wait queue as blocking readers, so each
/// transition is still consumed by exactly one reader across all sessions.
/// The stream ends once the session is closed or the line shuts down.
#[derive(Debug)]
pub struct TransitionStream {
    session: Session,
    done: bool,
}

impl Session {
    pub fn into_stream(self) -> TransitionStream {
        TransitionStream {
            session: self,
            done: false,
        }
    }
}

impl TransitionStream {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }
}

impl Stream for TransitionStream {
    type Item = Result<Transition>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        match this.session.poll_read(cx.waker()) {
            None => Poll::Pending,
            Some(Ok(event)) => Poll::Ready(Some(Ok(event))),
            Some(Err(err)) if err.is_interrupted() && this.session.is_finished() => {
                this.done = true;
                Poll::Ready(None)
            }
            Some(Err(err)) => Poll::Ready(Some(Err(err))),
        }
    }
}
