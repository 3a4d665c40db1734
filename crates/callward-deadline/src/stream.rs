//! Streams bounded by a call signal.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use callward_core::{CallError, CallSignal, SignalError, SignalGuard};
use futures::Stream;
use pin_project_lite::pin_project;

pin_project! {
    /// A stream that ends when its signal dies.
    ///
    /// Items from the inner stream pass through, with errors wrapped in
    /// [`CallError::Handler`]. Once the signal dies the stream yields one
    /// [`CallError::DeadlineExceeded`] or [`CallError::Cancelled`] and then
    /// ends; the inner stream is never polled again. Dropping the stream
    /// releases the signal.
    pub struct DeadlineStream<S> {
        #[pin]
        inner: S,
        dead: Pin<Box<dyn Future<Output = SignalError> + Send>>,
        guard: SignalGuard,
        timeout: Duration,
        finished: bool,
    }
}

impl<S> DeadlineStream<S> {
    /// Binds `inner` to `signal`, which this stream now owns.
    pub fn new(inner: S, signal: CallSignal, timeout: Duration) -> Self {
        let watched = signal.clone();
        Self {
            inner,
            dead: Box::pin(async move { watched.dead().await }),
            guard: signal.guard(),
            timeout,
            finished: false,
        }
    }

    /// The signal the stream is bound to.
    pub fn signal(&self) -> &CallSignal {
        self.guard.signal()
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S, T, E> Stream for DeadlineStream<S>
where
    S: Stream<Item = Result<T, E>>,
{
    type Item = Result<T, CallError<E>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.finished {
            return Poll::Ready(None);
        }

        if let Poll::Ready(reason) = this.dead.as_mut().poll(cx) {
            *this.finished = true;
            let err = match reason {
                SignalError::DeadlineExceeded => CallError::DeadlineExceeded {
                    timeout: *this.timeout,
                },
                SignalError::Cancelled => CallError::Cancelled(reason),
            };
            return Poll::Ready(Some(Err(err)));
        }

        match this.inner.poll_next(cx) {
            Poll::Ready(Some(item)) => Poll::Ready(Some(item.map_err(CallError::Handler))),
            Poll::Ready(None) => {
                *this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
