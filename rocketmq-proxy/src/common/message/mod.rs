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

use std::collections::HashMap;

use bytes::Bytes;
use cheetah_string::CheetahString;

pub mod message_client_id_setter;
pub mod message_decoder;
pub mod message_ext;

pub struct MessageConst;

impl MessageConst {
    pub const PROPERTY_KEYS: &'static str = "KEYS";
    pub const PROPERTY_TAGS: &'static str = "TAGS";
    pub const PROPERTY_DELAY_TIME_LEVEL: &'static str = "DELAY";
    pub const PROPERTY_TRANSACTION_PREPARED: &'static str = "TRAN_MSG";
    pub const PROPERTY_PRODUCER_GROUP: &'static str = "PGROUP";
    pub const PROPERTY_UNIQ_CLIENT_MESSAGE_ID_KEYIDX: &'static str = "UNIQ_KEY";
    pub const PROPERTY_POP_CK: &'static str = "POP_CK";
    pub const PROPERTY_FIRST_POP_TIME: &'static str = "1ST_POP_TIME";
    pub const PROPERTY_SHARDING_KEY: &'static str = "__SHARDINGKEY";

    pub const KEY_SEPARATOR: &'static str = " ";
}

pub mod message_sys_flag {
    pub const COMPRESSED_FLAG: i32 = 0x1;
    pub const MULTI_TAGS_FLAG: i32 = 0x1 << 1;
    pub const TRANSACTION_NOT_TYPE: i32 = 0;
    pub const TRANSACTION_PREPARED_TYPE: i32 = 0x1 << 2;
    pub const TRANSACTION_COMMIT_TYPE: i32 = 0x2 << 2;
    pub const TRANSACTION_ROLLBACK_TYPE: i32 = 0x3 << 2;
}

/// Separators of the flattened `k\u{1}v\u{2}k\u{1}v` properties string
/// carried inside message bodies and send headers.
pub const NAME_VALUE_SEPARATOR: char = '\u{1}';
pub const PROPERTY_SEPARATOR: char = '\u{2}';

#[derive(Debug, Clone, Default)]
pub struct Message {
    pub topic: CheetahString,
    pub flag: i32,
    pub properties: HashMap<CheetahString, CheetahString>,
    pub body: Bytes,
    pub transaction_id: Option<CheetahString>,
}

impl Message {
    pub fn new(topic: impl Into<CheetahString>, body: impl Into<Bytes>) -> Self {
        Message {
            topic: topic.into(),
            flag: 0,
            properties: HashMap::new(),
            body: body.into(),
            transaction_id: None,
        }
    }

    pub fn put_property(&mut self, key: impl Into<CheetahString>, value: impl Into<CheetahString>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn get_property(&self, key: &str) -> Option<&CheetahString> {
        self.properties.get(key)
    }

    pub fn get_tags(&self) -> Option<&CheetahString> {
        self.get_property(MessageConst::PROPERTY_TAGS)
    }
}

pub fn message_properties_to_string(
    properties: &HashMap<CheetahString, CheetahString>,
) -> String {
    let mut out = String::new();
    for (key, value) in properties {
        out.push_str(key.as_str());
        out.push(NAME_VALUE_SEPARATOR);
        out.push_str(value.as_str());
        out.push(PROPERTY_SEPARATOR);
    }
    out
}

pub fn string_to_message_properties(
    properties: &str,
) -> HashMap<CheetahString, CheetahString> {
    let mut map = HashMap::new();
    for entry in properties.split(PROPERTY_SEPARATOR) {
        if entry.is_empty() {
            continue;
        }
        if let Some((key, value)) = entry.split_once(NAME_VALUE_SEPARATOR) {
            map.insert(
                CheetahString::from_slice(key),
                CheetahString::from_slice(value),
            );
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_string_round_trip() {
        let mut properties = HashMap::new();
        properties.insert(CheetahString::from("TAGS"), CheetahString::from("tagA"));
        properties.insert(CheetahString::from("KEYS"), CheetahString::from("k1 k2"));

        let encoded = message_properties_to_string(&properties);
        let decoded = string_to_message_properties(&encoded);
        assert_eq!(decoded, properties);
    }

    #[test]
    fn empty_properties_string_decodes_to_empty_map() {
        assert!(string_to_message_properties("").is_empty());
    }

    #[test]
    fn message_tags_come_from_properties() {
        let mut message = Message::new("topic", Bytes::from_static(b"body"));
        assert!(message.get_tags().is_none());
        message.put_property(MessageConst::PROPERTY_TAGS, "tagA");
        assert_eq!(message.get_tags().unwrap().as_str(), "tagA");
    }
}
