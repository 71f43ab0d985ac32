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
pub struct AckMessageRequestHeader {
    pub consumer_group: CheetahString,
    pub topic: CheetahString,
    pub queue_id: i32,
    /// The raw receipt handle, echoed to the broker unchanged.
    pub extra_info: CheetahString,
    pub offset: i64,
}

impl CommandCustomHeader for AckMessageRequestHeader {
    fn to_map(&self) -> HashMap<CheetahString, CheetahString> {
        HashMap::from([
            (
                CheetahString::from_static_str("consumerGroup"),
                self.consumer_group.clone(),
            ),
            (CheetahString::from_static_str("topic"), self.topic.clone()),
            (
                CheetahString::from_static_str("queueId"),
                CheetahString::from_string(self.queue_id.to_string()),
            ),
            (
                CheetahString::from_static_str("extraInfo"),
                self.extra_info.clone(),
            ),
            (
                CheetahString::from_static_str("offset"),
                CheetahString::from_string(self.offset.to_string()),
            ),
        ])
    }
}

impl FromMap for AckMessageRequestHeader {
    fn from_map(map: &HashMap<CheetahString, CheetahString>) -> ProxyResult<Self> {
        Ok(AckMessageRequestHeader {
            consumer_group: require(map, "consumerGroup")?.clone(),
            topic: require(map, "topic")?.clone(),
            queue_id: parse_field(map, "queueId")?,
            extra_info: require(map, "extraInfo")?.clone(),
            offset: parse_field(map, "offset")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_map() {
        let header = AckMessageRequestHeader {
            consumer_group: CheetahString::from("group"),
            topic: CheetahString::from("topic"),
            queue_id: 3,
            extra_info: CheetahString::from("100 1000000 30000 0 0 broker-a 3 42"),
            offset: 42,
        };
        let decoded = AckMessageRequestHeader::from_map(&header.to_map()).unwrap();
        assert_eq!(decoded.queue_id, 3);
        assert_eq!(decoded.offset, 42);
        assert_eq!(decoded.extra_info, header.extra_info);
    }
}
