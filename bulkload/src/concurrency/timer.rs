//! Batch window timer.
//!
//! [`DeferredTimer`] stays pending until armed with [`DeferredTimer::start`], and is `Unpin`
//! so a worker can poll `&mut timer` inside `tokio::select!` across loop iterations.

use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Duration;

use tokio::time::{Sleep, sleep};

#[derive(Debug)]
pub struct DeferredTimer {
    deadline: Option<Pin<Box<Sleep>>>,
    duration: Duration,
}

impl DeferredTimer {
    /// Creates an unarmed timer for `duration`.
    pub fn new(duration: Duration) -> Self {
        Self {
            deadline: None,
            duration,
        }
    }

    /// Arms the timer, replacing any previous deadline.
    pub fn start(&mut self) {
        self.deadline = Some(Box::pin(sleep(self.duration)));
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }
}

impl Future for DeferredTimer {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        let Some(deadline) = this.deadline.as_mut() else {
            return Poll::Pending;
        };

        ready!(deadline.as_mut().poll(cx));

        // Fires once per arming.
        this.deadline = None;

        Poll::Ready(())
    }
}
