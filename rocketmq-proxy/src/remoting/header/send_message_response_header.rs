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

use cheetah_string::CheetahString;

use crate::error::ProxyResult;
use crate::remoting::command_custom_header::parse_field;
use crate::remoting::command_custom_header::require;
use crate::remoting::command_custom_header::CommandCustomHeader;
use crate::remoting::command_custom_header::FromMap;

#[derive(Debug, Clone, Default)]
pub struct SendMessageResponseHeader {
    pub msg_id: CheetahString,
    pub queue_id: i32,
    pub queue_offset: i64,
    pub transaction_id: Option<CheetahString>,
}

impl FromMap for SendMessageResponseHeader {
    fn from_map(map: &HashMap<CheetahString, CheetahString>) -> ProxyResult<Self> {
        Ok(SendMessageResponseHeader {
            msg_id: require(map, "msgId")?.clone(),
            queue_id: parse_field(map, "queueId")?,
            queue_offset: parse_field(map, "queueOffset")?,
            transaction_id: map.get("transactionId").cloned(),
        })
    }
}

impl CommandCustomHeader for SendMessageResponseHeader {
    fn to_map(&self) -> HashMap<CheetahString, CheetahString> {
        let mut map = HashMap::from([
            (CheetahString::from_static_str("msgId"), self.msg_id.clone()),
            (
                CheetahString::from_static_str("queueId"),
                CheetahString::from_string(self.queue_id.to_string()),
            ),
            (
                CheetahString::from_static_str("queueOffset"),
                CheetahString::from_string(self.queue_offset.to_string()),
            ),
        ]);
        if let Some(transaction_id) = &self.transaction_id {
            map.insert(
                CheetahString::from_static_str("transactionId"),
                transaction_id.clone(),
            );
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_map() {
        let header = SendMessageResponseHeader {
            msg_id: CheetahString::from("7F000001ABCD"),
            queue_id: 3,
            queue_offset: 42,
            transaction_id: Some(CheetahString::from("tx-1")),
        };
        let decoded = SendMessageResponseHeader::from_map(&header.to_map()).unwrap();
        assert_eq!(decoded.msg_id, header.msg_id);
        assert_eq!(decoded.queue_id, 3);
        assert_eq!(decoded.queue_offset, 42);
        assert_eq!(decoded.transaction_id.unwrap().as_str(), "tx-1");
    }

    #[test]
    fn from_map_requires_msg_id() {
        assert!(SendMessageResponseHeader::from_map(&HashMap::new()).is_err());
    }
}
