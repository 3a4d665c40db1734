//! Carrying a [`CallSignal`] alongside a request.

use crate::call::CallSite;
use crate::signal::CallSignal;

/// A request that can carry a call signal.
///
/// Tower layers read the caller's signal from the request and replace it
/// with the signal they derived before passing the request on.
pub trait HasSignal {
    fn signal(&self) -> Option<&CallSignal>;

    fn set_signal(&mut self, signal: CallSignal);

    /// Identity of the call, when the request knows it.
    fn call_site(&self) -> Option<CallSite> {
        None
    }

    /// The carried signal, or a fresh live root when there is none.
    fn signal_or_root(&self) -> CallSignal {
        self.signal().cloned().unwrap_or_default()
    }
}

/// Pairs an arbitrary request with a signal and a call site.
#[derive(Debug, Clone)]
pub struct Signaled<T> {
    signal: CallSignal,
    site: Option<CallSite>,
    request: T,
}

impl<T> Signaled<T> {
    /// Wraps `request` under a fresh root signal.
    pub fn new(request: T) -> Self {
        Self::with_signal(CallSignal::new(), request)
    }

    pub fn with_signal(signal: CallSignal, request: T) -> Self {
        Self {
            signal,
            site: None,
            request,
        }
    }

    pub fn at(mut self, site: CallSite) -> Self {
        self.site = Some(site);
        self
    }

    pub fn get_signal(&self) -> &CallSignal {
        &self.signal
    }

    pub fn request(&self) -> &T {
        &self.request
    }

    pub fn into_inner(self) -> T {
        self.request
    }

    pub fn into_parts(self) -> (CallSignal, T) {
        (self.signal, self.request)
    }
}

impl<T> HasSignal for Signaled<T> {
    fn signal(&self) -> Option<&CallSignal> {
        Some(&self.signal)
    }

    fn set_signal(&mut self, signal: CallSignal) {
        self.signal = signal;
    }

    fn call_site(&self) -> Option<CallSite> {
        self.site.clone()
    }
}

#[cfg(feature = "http")]
impl<B> HasSignal for http::Request<B> {
    fn signal(&self) -> Option<&CallSignal> {
        self.extensions().get::<CallSignal>()
    }

    fn set_signal(&mut self, signal: CallSignal) {
        self.extensions_mut().insert(signal);
    }

    fn call_site(&self) -> Option<CallSite> {
        Some(CallSite::http(self.method().as_str(), self.uri().path()))
    }
}
