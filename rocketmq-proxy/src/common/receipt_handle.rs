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

use std::fmt;

use cheetah_string::CheetahString;

use crate::common::key_builder::KeyBuilder;
use crate::common::message::message_ext::MessageExt;
use crate::common::message::MessageConst;
use crate::common::time_utils;
use crate::error::ProxyError;
use crate::error::ProxyResult;

pub const NORMAL_TOPIC: &str = "0";
pub const RETRY_TOPIC: &str = "1";
pub const RETRY_TOPIC_V2: &str = "2";

/// The opaque token a client echoes back on ack/nack/change-invisibility.
///
/// Inside the proxy it is the parsed record of the pop check point, the
/// broker name and queue id in here are what route a terminal operation to
/// the broker that owns the message, without any server-side session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptHandle {
    start_offset: i64,
    retrieve_time: i64,
    invisible_time: i64,
    next_visible_time: i64,
    revive_queue_id: i32,
    topic_type: CheetahString,
    broker_name: CheetahString,
    queue_id: i32,
    offset: i64,
    receipt_handle: CheetahString,
}

impl ReceiptHandle {
    pub fn builder() -> ReceiptHandleBuilder {
        ReceiptHandleBuilder::default()
    }

    /// Extract the handle from the `POP_CK` property stamped onto each popped
    /// message.
    pub fn from_message_ext(message_ext: &MessageExt) -> ProxyResult<ReceiptHandle> {
        let pop_ck = message_ext
            .get_property(MessageConst::PROPERTY_POP_CK)
            .ok_or_else(|| {
                ProxyError::ClientInput(format!(
                    "message {} carries no receipt handle",
                    message_ext.msg_id
                ))
            })?;
        Self::decode(pop_ck.as_str())
    }

    pub fn encode(&self) -> String {
        format!(
            "{}{}{}{}{}{}{}{}{}{}{}{}{}{}{}",
            self.start_offset,
            MessageConst::KEY_SEPARATOR,
            self.retrieve_time,
            MessageConst::KEY_SEPARATOR,
            self.invisible_time,
            MessageConst::KEY_SEPARATOR,
            self.revive_queue_id,
            MessageConst::KEY_SEPARATOR,
            self.topic_type,
            MessageConst::KEY_SEPARATOR,
            self.broker_name,
            MessageConst::KEY_SEPARATOR,
            self.queue_id,
            MessageConst::KEY_SEPARATOR,
            self.offset
        )
    }

    pub fn decode(receipt_handle: &str) -> ProxyResult<ReceiptHandle> {
        let data_list: Vec<&str> = receipt_handle.split(MessageConst::KEY_SEPARATOR).collect();
        if data_list.len() < 8 {
            return Err(ProxyError::ClientInput(format!(
                "parse receipt handle failed, dataList size {}",
                data_list.len()
            )));
        }

        let parse_i64 = |value: &str, field: &str| {
            value.parse::<i64>().map_err(|_| {
                ProxyError::ClientInput(format!("parse receipt handle {field} failed"))
            })
        };
        let parse_i32 = |value: &str, field: &str| {
            value.parse::<i32>().map_err(|_| {
                ProxyError::ClientInput(format!("parse receipt handle {field} failed"))
            })
        };

        let start_offset = parse_i64(data_list[0], "start_offset")?;
        let retrieve_time = parse_i64(data_list[1], "retrieve_time")?;
        let invisible_time = parse_i64(data_list[2], "invisible_time")?;
        let revive_queue_id = parse_i32(data_list[3], "revive_queue_id")?;
        let topic_type = CheetahString::from_slice(data_list[4]);
        let broker_name = CheetahString::from_slice(data_list[5]);
        let queue_id = parse_i32(data_list[6], "queue_id")?;
        let offset = parse_i64(data_list[7], "offset")?;

        Ok(ReceiptHandle {
            start_offset,
            retrieve_time,
            invisible_time,
            next_visible_time: retrieve_time + invisible_time,
            revive_queue_id,
            topic_type,
            broker_name,
            queue_id,
            offset,
            receipt_handle: CheetahString::from_slice(receipt_handle),
        })
    }

    pub fn is_expired(&self) -> bool {
        self.next_visible_time <= time_utils::get_current_millis() as i64
    }

    pub fn start_offset(&self) -> i64 {
        self.start_offset
    }

    pub fn retrieve_time(&self) -> i64 {
        self.retrieve_time
    }

    pub fn invisible_time(&self) -> i64 {
        self.invisible_time
    }

    pub fn next_visible_time(&self) -> i64 {
        self.next_visible_time
    }

    pub fn revive_queue_id(&self) -> i32 {
        self.revive_queue_id
    }

    pub fn topic_type(&self) -> &str {
        self.topic_type.as_str()
    }

    pub fn broker_name(&self) -> &CheetahString {
        &self.broker_name
    }

    pub fn queue_id(&self) -> i32 {
        self.queue_id
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// The exact string the client echoed, forwarded to the broker as
    /// `extraInfo`.
    pub fn raw(&self) -> &CheetahString {
        &self.receipt_handle
    }

    pub fn is_retry_topic(&self) -> bool {
        self.topic_type == RETRY_TOPIC || self.topic_type == RETRY_TOPIC_V2
    }

    pub fn real_topic(&self, topic: &str, group_name: &str) -> String {
        if self.topic_type == RETRY_TOPIC {
            return KeyBuilder::build_pop_retry_topic_v1(topic, group_name);
        }
        if self.topic_type == RETRY_TOPIC_V2 {
            return KeyBuilder::build_pop_retry_topic_v2(topic, group_name);
        }
        topic.to_string()
    }
}

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ReceiptHandle{{startOffset={}, retrieveTime={}, invisibleTime={}, reviveQueueId={}, \
             topicType={}, brokerName={}, queueId={}, offset={}}}",
            self.start_offset,
            self.retrieve_time,
            self.invisible_time,
            self.revive_queue_id,
            self.topic_type,
            self.broker_name,
            self.queue_id,
            self.offset
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReceiptHandleBuilder {
    start_offset: i64,
    retrieve_time: i64,
    invisible_time: i64,
    revive_queue_id: i32,
    topic_type: CheetahString,
    broker_name: CheetahString,
    queue_id: i32,
    offset: i64,
}

impl ReceiptHandleBuilder {
    pub fn start_offset(mut self, start_offset: i64) -> Self {
        self.start_offset = start_offset;
        self
    }

    pub fn retrieve_time(mut self, retrieve_time: i64) -> Self {
        self.retrieve_time = retrieve_time;
        self
    }

    pub fn invisible_time(mut self, invisible_time: i64) -> Self {
        self.invisible_time = invisible_time;
        self
    }

    pub fn revive_queue_id(mut self, revive_queue_id: i32) -> Self {
        self.revive_queue_id = revive_queue_id;
        self
    }

    pub fn topic_type(mut self, topic_type: &str) -> Self {
        self.topic_type = CheetahString::from_slice(topic_type);
        self
    }

    pub fn broker_name(mut self, broker_name: &str) -> Self {
        self.broker_name = CheetahString::from_slice(broker_name);
        self
    }

    pub fn queue_id(mut self, queue_id: i32) -> Self {
        self.queue_id = queue_id;
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    pub fn build(self) -> ReceiptHandle {
        let encoded = format!(
            "{}{sep}{}{sep}{}{sep}{}{sep}{}{sep}{}{sep}{}{sep}{}",
            self.start_offset,
            self.retrieve_time,
            self.invisible_time,
            self.revive_queue_id,
            self.topic_type,
            self.broker_name,
            self.queue_id,
            self.offset,
            sep = MessageConst::KEY_SEPARATOR
        );
        ReceiptHandle {
            start_offset: self.start_offset,
            retrieve_time: self.retrieve_time,
            invisible_time: self.invisible_time,
            next_visible_time: self.retrieve_time + self.invisible_time,
            revive_queue_id: self.revive_queue_id,
            topic_type: self.topic_type,
            broker_name: self.broker_name,
            queue_id: self.queue_id,
            offset: self.offset,
            receipt_handle: CheetahString::from_string(encoded),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::common::message::Message;

    fn sample_handle() -> ReceiptHandle {
        ReceiptHandle::builder()
            .start_offset(100)
            .retrieve_time(1000000)
            .invisible_time(30000)
            .revive_queue_id(0)
            .topic_type(NORMAL_TOPIC)
            .broker_name("broker-a")
            .queue_id(1)
            .offset(200)
            .build()
    }

    #[test]
    fn encode_produces_separator_delimited_fields() {
        assert_eq!(sample_handle().encode(), "100 1000000 30000 0 0 broker-a 1 200");
    }

    #[test]
    fn decode_encode_round_trip() {
        let original = sample_handle();
        let decoded = ReceiptHandle::decode(&original.encode()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn decode_rejects_short_handles() {
        assert!(ReceiptHandle::decode("100 1000000 30000").is_err());
    }

    #[test]
    fn decode_rejects_non_numeric_fields() {
        assert!(ReceiptHandle::decode("x 1000000 30000 0 0 broker-a 1 200").is_err());
    }

    #[test]
    fn from_message_ext_reads_pop_ck() {
        let mut message = Message::new("topic", Bytes::new());
        message.put_property(
            MessageConst::PROPERTY_POP_CK,
            "100 1000000 30000 0 0 broker-a 3 42",
        );
        let message_ext = MessageExt {
            message,
            ..Default::default()
        };
        let handle = ReceiptHandle::from_message_ext(&message_ext).unwrap();
        assert_eq!(handle.broker_name().as_str(), "broker-a");
        assert_eq!(handle.queue_id(), 3);
        assert_eq!(handle.offset(), 42);
    }

    #[test]
    fn from_message_ext_without_pop_ck_is_client_error() {
        let message_ext = MessageExt::default();
        assert!(ReceiptHandle::from_message_ext(&message_ext).is_err());
    }

    #[test]
    fn retry_topic_types_resolve_real_topic() {
        let handle = ReceiptHandle::builder()
            .topic_type(RETRY_TOPIC)
            .broker_name("broker-a")
            .build();
        assert!(handle.is_retry_topic());
        assert_eq!(handle.real_topic("topic", "group"), "%RETRY%group_topic");

        let normal = sample_handle();
        assert_eq!(normal.real_topic("topic", "group"), "topic");
    }
}
