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

use std::collections::HashSet;

use cheetah_string::CheetahString;
use lazy_static::lazy_static;

use crate::common::message::message_ext::MessageExt;
use crate::common::message::MessageConst;
use crate::error::ProxyError;

/// gRPC status codes shared by both protocol revisions. FORBIDDEN extends
/// the standard set for no-writeable-queue / no-readable-queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum StatusCode {
    Ok = 0,
    InvalidArgument = 3,
    NotFound = 5,
    Forbidden = 7,
    TooManyRequests = 8,
    Unimplemented = 12,
    InternalServerError = 13,
    Unavailable = 14,
}

impl StatusCode {
    pub const fn to_i32(self) -> i32 {
        self as i32
    }

    pub fn name(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::InvalidArgument => "INVALID_ARGUMENT",
            StatusCode::NotFound => "NOT_FOUND",
            StatusCode::Forbidden => "FORBIDDEN",
            StatusCode::TooManyRequests => "TOO_MANY_REQUESTS",
            StatusCode::Unimplemented => "UNIMPLEMENTED",
            StatusCode::InternalServerError => "INTERNAL_SERVER_ERROR",
            StatusCode::Unavailable => "UNAVAILABLE",
        }
    }
}

/// Collapse the engine error taxonomy onto the outward status surface.
pub fn status_of_error(error: &ProxyError) -> (StatusCode, String) {
    match error {
        ProxyError::ClientInput(message) => (StatusCode::InvalidArgument, message.clone()),
        ProxyError::TopicNotFound(remark) => (StatusCode::NotFound, remark.clone()),
        ProxyError::NoWriteableQueue(topic) => (
            StatusCode::Forbidden,
            format!("no writeable queue for topic {topic}"),
        ),
        ProxyError::NoReadableQueue(topic) => (
            StatusCode::Forbidden,
            format!("no readable topic route for topic {topic}"),
        ),
        ProxyError::Throttled(message) => (StatusCode::TooManyRequests, message.clone()),
        ProxyError::BrokerUnavailable(addr) => {
            (StatusCode::Unavailable, format!("connect to {addr} failed"))
        }
        ProxyError::BrokerTimeout(addr, timeout) => (
            StatusCode::Unavailable,
            format!("wait response from {addr} timeout {timeout}ms"),
        ),
        other => (StatusCode::InternalServerError, other.to_string()),
    }
}

/// Observability seam fired exactly once per call, with either the response
/// or the error.
pub trait ResponseHook<Req, Resp>: Send + Sync {
    fn before_response(&self, request: &Req, response: Option<&Resp>, error: Option<&ProxyError>);
}

/// Rewrites the endpoints a cluster-mode proxy advertises on route replies
/// (DNS names instead of raw IPs, for example). The default keeps them
/// untouched.
pub trait EndpointConverter<E>: Send + Sync {
    fn convert(&self, endpoints: Option<E>) -> Option<E>;
}

pub struct IdentityEndpointConverter;

impl<E> EndpointConverter<E> for IdentityEndpointConverter {
    fn convert(&self, endpoints: Option<E>) -> Option<E> {
        endpoints
    }
}

lazy_static! {
    static ref SYSTEM_PROPERTY_KEYS: HashSet<&'static str> = HashSet::from([
        MessageConst::PROPERTY_KEYS,
        MessageConst::PROPERTY_TAGS,
        MessageConst::PROPERTY_DELAY_TIME_LEVEL,
        MessageConst::PROPERTY_TRANSACTION_PREPARED,
        MessageConst::PROPERTY_PRODUCER_GROUP,
        MessageConst::PROPERTY_UNIQ_CLIENT_MESSAGE_ID_KEYIDX,
        MessageConst::PROPERTY_POP_CK,
        MessageConst::PROPERTY_FIRST_POP_TIME,
        MessageConst::PROPERTY_SHARDING_KEY,
    ]);
}

/// Properties that are not claimed by a typed system attribute.
pub fn user_properties(
    message: &MessageExt,
) -> impl Iterator<Item = (&CheetahString, &CheetahString)> {
    message
        .message
        .properties
        .iter()
        .filter(|(key, _)| !SYSTEM_PROPERTY_KEYS.contains(key.as_str()))
}

pub fn millis_to_timestamp(millis: i64) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: millis / 1000,
        nanos: ((millis % 1000) * 1_000_000) as i32,
    }
}

pub fn timestamp_to_millis(timestamp: &prost_types::Timestamp) -> i64 {
    timestamp.seconds * 1000 + (timestamp.nanos / 1_000_000) as i64
}

pub fn duration_to_millis(duration: &prost_types::Duration) -> u64 {
    let millis = duration.seconds * 1000 + (duration.nanos / 1_000_000) as i64;
    millis.max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_taxonomy_maps_to_status_codes() {
        let cases = [
            (
                ProxyError::ClientInput("bad".to_string()),
                StatusCode::InvalidArgument,
            ),
            (
                ProxyError::TopicNotFound("t".to_string()),
                StatusCode::NotFound,
            ),
            (
                ProxyError::NoWriteableQueue("t".to_string()),
                StatusCode::Forbidden,
            ),
            (
                ProxyError::NoReadableQueue("t".to_string()),
                StatusCode::Forbidden,
            ),
            (
                ProxyError::Throttled("polling full".to_string()),
                StatusCode::TooManyRequests,
            ),
            (
                ProxyError::BrokerUnavailable("addr".to_string()),
                StatusCode::Unavailable,
            ),
            (
                ProxyError::Internal("boom".to_string()),
                StatusCode::InternalServerError,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(status_of_error(&error).0, expected, "{error:?}");
        }
    }

    #[test]
    fn broker_transient_keeps_code_in_message() {
        let (code, message) = status_of_error(&ProxyError::BrokerTransient {
            code: 10,
            remark: "flush disk timeout".to_string(),
        });
        assert_eq!(code, StatusCode::InternalServerError);
        assert!(message.contains("CODE:10"));
        assert!(message.contains("flush disk timeout"));
    }

    #[test]
    fn timestamp_round_trip() {
        let timestamp = millis_to_timestamp(1_700_000_000_123);
        assert_eq!(timestamp_to_millis(&timestamp), 1_700_000_000_123);
    }

    #[test]
    fn duration_conversion_clamps_negative() {
        assert_eq!(
            duration_to_millis(&prost_types::Duration {
                seconds: 2,
                nanos: 500_000_000
            }),
            2500
        );
        assert_eq!(
            duration_to_millis(&prost_types::Duration {
                seconds: -1,
                nanos: 0
            }),
            0
        );
    }

    #[test]
    fn user_properties_exclude_system_keys() {
        let mut message = MessageExt::default();
        message.put_property(MessageConst::PROPERTY_TAGS, "tagA");
        message.put_property("color", "blue");
        let collected: Vec<_> = user_properties(&message)
            .map(|(key, _)| key.to_string())
            .collect();
        assert_eq!(collected, vec!["color".to_string()]);
    }
}
