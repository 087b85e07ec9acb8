use std::time::{Duration, Instant};

use crate::error::ConversionError;

/// Per-run deadline, checked at every node and block visit.
///
/// Each conversion owns its own `Deadline`; nothing here is shared between runs.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    limit: Option<(Instant, Duration)>,
}

impl Deadline {
    pub fn none() -> Self {
        Self { limit: None }
    }

    pub fn after(timeout: Option<Duration>) -> Self {
        Self {
            limit: timeout.map(|limit| (Instant::now() + limit, limit)),
        }
    }

    pub fn check(&self, screen: &str) -> Result<(), ConversionError> {
        match self.limit {
            Some((at, limit)) if Instant::now() >= at => Err(ConversionError::Timeout {
                screen: screen.to_string(),
                limit,
            }),
            _ => Ok(()),
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_deadline_never_expires() {
        assert!(Deadline::none().check("Screen1").is_ok());
        assert!(Deadline::after(None).check("Screen1").is_ok());
    }

    #[test]
    fn test_zero_deadline_expires_immediately() {
        let err = Deadline::after(Some(Duration::ZERO))
            .check("Screen1")
            .unwrap_err();
        assert!(matches!(err, ConversionError::Timeout { ref screen, .. } if screen == "Screen1"));
    }
}
