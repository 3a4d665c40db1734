use tower::layer::Layer;

use crate::config::CancelConfig;
use crate::{Cancel, CancelGate};

/// A tower layer that short-circuits requests carrying a dead signal.
#[derive(Clone)]
pub struct CancelLayer {
    gate: CancelGate,
}

impl CancelLayer {
    pub fn new(gate: CancelGate) -> Self {
        Self { gate }
    }

    pub fn builder() -> crate::CancelConfigBuilder {
        CancelConfig::builder()
    }
}

impl From<CancelConfig> for CancelLayer {
    fn from(config: CancelConfig) -> Self {
        Self::new(CancelGate::new(config))
    }
}

impl<S> Layer<S> for CancelLayer {
    type Service = Cancel<S>;

    fn layer(&self, service: S) -> Self::Service {
        Cancel::new(service, self.gate.clone())
    }
}
