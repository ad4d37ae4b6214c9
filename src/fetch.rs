use std::time::Duration;

use reqwest::blocking::Client;
use thiserror::Error;

pub const USER_AGENT: &str = concat!("deskboard/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server returned {status}")]
    Status { status: u16 },
    #[error("{0}")]
    Api(String),
    #[error("unexpected response: {0}")]
    Parse(String),
}

pub fn build_client(timeout: Duration) -> Result<Client, FetchError> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

/// Hands out increasing sequence numbers so a response that arrives after a
/// newer request was issued can be recognised and dropped.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    latest: u64,
}

impl RequestTracker {
    pub fn issue(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    pub fn is_current(&self, sequence: u64) -> bool {
        sequence == self.latest
    }

    pub fn latest(&self) -> u64 {
        self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::RequestTracker;

    #[test]
    fn only_the_latest_request_is_current() {
        let mut tracker = RequestTracker::default();
        let first = tracker.issue();
        assert!(tracker.is_current(first));

        let second = tracker.issue();
        assert!(second > first);
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
    }
}
