// Copyright 2023 The RocketMQ Rust Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::io;

use thiserror::Error;

pub type ProxyResult<T> = std::result::Result<T, ProxyError>;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("{0}")]
    ClientInput(String),

    #[error("topic {0} not exist")]
    TopicNotFound(String),

    #[error("no writeable queue for topic {0}")]
    NoWriteableQueue(String),

    #[error("no readable queue for topic {0}")]
    NoReadableQueue(String),

    /// Broker replied with a retriable code. The broker's code and remark are
    /// surfaced unchanged, retry policy lives above the proxy.
    #[error("broker exception occurred: CODE:{code}, Message:{remark}")]
    BrokerTransient { code: i32, remark: String },

    #[error("connect to {0} failed")]
    BrokerUnavailable(String),

    #[error("wait response on the channel < {0} >, timeout: {1}(ms)")]
    BrokerTimeout(String, u64),

    #[error("polling full: {0}")]
    Throttled(String),

    #[error("{0} has been shutdown")]
    Shutdown(&'static str),

    #[error("{0}")]
    Internal(String),

    #[error("config parse error: {0}")]
    ConfigError(String),

    #[error("{0:?}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Serde(#[from] serde_json::Error),
}

impl ProxyError {
    /// Whether the broker confirmed the topic is unknown, as opposed to a
    /// transport failure that may heal on retry.
    pub fn is_topic_not_found(&self) -> bool {
        matches!(self, ProxyError::TopicNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_transient_display_carries_code_and_remark() {
        let err = ProxyError::BrokerTransient {
            code: 10,
            remark: "FLUSH_DISK_TIMEOUT".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "broker exception occurred: CODE:10, Message:FLUSH_DISK_TIMEOUT"
        );
    }

    #[test]
    fn topic_not_found_is_detectable() {
        assert!(ProxyError::TopicNotFound("t".to_string()).is_topic_not_found());
        assert!(!ProxyError::Internal("t".to_string()).is_topic_not_found());
    }
}
