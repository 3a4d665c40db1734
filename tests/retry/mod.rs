mod events;

use callward_core::ErrorClass;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    NotFound,
    Unavailable(u32),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "not found"),
            StoreError::Unavailable(n) => write!(f, "unavailable ({})", n),
        }
    }
}

pub fn classify(error: &StoreError) -> ErrorClass {
    match error {
        StoreError::NotFound => ErrorClass::Terminal,
        StoreError::Unavailable(_) => ErrorClass::Retryable,
    }
}
