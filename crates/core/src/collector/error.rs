use std::fmt;

/// Failure while signing or delivering a batch to the log collector.
/// `stage` is one of `signature`, `request`, `status`.
#[derive(Debug, Clone)]
pub struct DeliveryError {
    pub stage: &'static str,
    pub status: Option<u16>,
    pub detail: String,
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "delivery failed (stage={}, status={status}): {}",
                self.stage, self.detail
            ),
            None => write!(f, "delivery failed (stage={}): {}", self.stage, self.detail),
        }
    }
}

impl std::error::Error for DeliveryError {}
