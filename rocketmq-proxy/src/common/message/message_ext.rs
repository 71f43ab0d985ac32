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

use cheetah_string::CheetahString;

use crate::common::message::Message;
use crate::common::message::MessageConst;

/// A message as stored on a broker, the inner [`Message`] plus the storage
/// coordinates the proxy needs for receipt handles and send-back.
#[derive(Debug, Clone, Default)]
pub struct MessageExt {
    pub message: Message,
    pub broker_name: CheetahString,
    pub queue_id: i32,
    pub store_size: i32,
    pub queue_offset: i64,
    pub sys_flag: i32,
    pub born_timestamp: i64,
    pub born_host: CheetahString,
    pub store_timestamp: i64,
    pub store_host: CheetahString,
    pub msg_id: CheetahString,
    pub commit_log_offset: i64,
    pub body_crc: i32,
    pub reconsume_times: i32,
    pub prepared_transaction_offset: i64,
}

impl MessageExt {
    pub fn topic(&self) -> &CheetahString {
        &self.message.topic
    }

    pub fn get_property(&self, key: &str) -> Option<&CheetahString> {
        self.message.get_property(key)
    }

    pub fn put_property(
        &mut self,
        key: impl Into<CheetahString>,
        value: impl Into<CheetahString>,
    ) {
        self.message.put_property(key, value);
    }

    pub fn get_tags(&self) -> Option<&CheetahString> {
        self.message.get_tags()
    }

    /// The client-visible message id, the producer-set unique key when
    /// present, the store-generated id otherwise.
    pub fn uniq_or_msg_id(&self) -> CheetahString {
        self.get_property(MessageConst::PROPERTY_UNIQ_CLIENT_MESSAGE_ID_KEYIDX)
            .cloned()
            .unwrap_or_else(|| self.msg_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn uniq_key_takes_precedence_over_msg_id() {
        let mut message_ext = MessageExt {
            message: Message::new("topic", Bytes::new()),
            msg_id: CheetahString::from("7F000001000078BF000000000000002A"),
            ..Default::default()
        };
        assert_eq!(
            message_ext.uniq_or_msg_id().as_str(),
            "7F000001000078BF000000000000002A"
        );

        message_ext.put_property(
            MessageConst::PROPERTY_UNIQ_CLIENT_MESSAGE_ID_KEYIDX,
            "AC1100010000000000000001",
        );
        assert_eq!(message_ext.uniq_or_msg_id().as_str(), "AC1100010000000000000001");
    }
}
