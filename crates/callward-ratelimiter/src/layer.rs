use tower::layer::Layer;

use crate::{Admission, AdmissionLimiter};

/// A tower layer that admits calls against a shared token bucket.
///
/// Layers built from clones of one [`AdmissionLimiter`] share its bucket.
#[derive(Clone)]
pub struct AdmissionLayer {
    limiter: AdmissionLimiter,
}

impl AdmissionLayer {
    pub fn new(limiter: AdmissionLimiter) -> Self {
        Self { limiter }
    }

    pub fn limiter(&self) -> &AdmissionLimiter {
        &self.limiter
    }
}

impl<S> Layer<S> for AdmissionLayer {
    type Service = Admission<S>;

    fn layer(&self, service: S) -> Self::Service {
        Admission::new(service, self.limiter.clone())
    }
}
