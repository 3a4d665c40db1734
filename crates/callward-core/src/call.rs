//! Identity of a guarded call.

use std::fmt;

/// Where a call came from: an HTTP route, or an RPC method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallSite {
    /// An HTTP request.
    Http {
        /// Request method, e.g. `GET`.
        method: String,
        /// Request path, e.g. `/users/42`.
        path: String,
    },
    /// A unary RPC.
    Unary {
        /// Fully qualified method, e.g. `/pkg.Service/Method`.
        method: String,
    },
    /// A streaming RPC.
    Stream {
        /// Fully qualified method, e.g. `/pkg.Service/Method`.
        method: String,
    },
}

impl CallSite {
    pub fn http(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Http {
            method: method.into(),
            path: path.into(),
        }
    }

    pub fn unary(method: impl Into<String>) -> Self {
        Self::Unary {
            method: method.into(),
        }
    }

    pub fn stream(method: impl Into<String>) -> Self {
        Self::Stream {
            method: method.into(),
        }
    }

    /// The HTTP method or the RPC method name.
    pub fn method(&self) -> &str {
        match self {
            Self::Http { method, .. } | Self::Unary { method } | Self::Stream { method } => method,
        }
    }

    /// Request path, for HTTP calls only.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Http { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Stream { .. })
    }

    /// Short transport label used in metrics.
    pub fn transport(&self) -> &'static str {
        match self {
            Self::Http { .. } => "http",
            Self::Unary { .. } => "unary",
            Self::Stream { .. } => "stream",
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { method, path } => write!(f, "{} {}", method, path),
            Self::Unary { method } | Self::Stream { method } => f.write_str(method),
        }
    }
}
