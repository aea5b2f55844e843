//! Scripted backend channel for tests
//!
//! `MockChannel` replays queued responses in order and records every
//! request it sees, so lifecycle tests can run without a cluster.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::backend::{BackendChannel, ChannelError, ChannelRequest, ChannelResponse};

/// Channel that replays scripted responses and records requests.
///
/// A drained script answers with an empty body and code 0, which
/// downstream state parsing reads as `UNKNOWN`.
#[derive(Default)]
pub struct MockChannel {
    responses: Mutex<VecDeque<ChannelResponse>>,
    requests: Mutex<Vec<ChannelRequest>>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next response body and code.
    pub fn push_response(&self, body: &str, code: i32) {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(ChannelResponse {
                body: body.to_string(),
                code,
            });
    }

    /// Every request dispatched so far, in order.
    pub fn requests(&self) -> Vec<ChannelRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl BackendChannel for MockChannel {
    fn dispatch(&self, request: &ChannelRequest) -> Result<ChannelResponse, ChannelError> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());

        let scripted = self
            .responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();

        Ok(scripted.unwrap_or(ChannelResponse {
            body: String::new(),
            code: 0,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_in_order() {
        let channel = MockChannel::new();
        channel.push_response("first", 200);
        channel.push_response("second", 500);

        let request = ChannelRequest::Cli {
            command: "yarn application -status app_1".to_string(),
        };
        assert_eq!(channel.dispatch(&request).unwrap().body, "first");
        assert_eq!(channel.dispatch(&request).unwrap().code, 500);
        // Drained script falls back to an empty success.
        assert_eq!(channel.dispatch(&request).unwrap().code, 0);

        assert_eq!(channel.requests().len(), 3);
    }
}
