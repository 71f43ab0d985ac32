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

use crate::remoting::command_custom_header::CommandCustomHeader;

pub const DEFAULT_TOPIC: &str = "TBW102";
pub const DEFAULT_TOPIC_QUEUE_NUMS: i32 = 8;

#[derive(Debug, Clone, Default)]
pub struct SendMessageRequestHeader {
    pub producer_group: CheetahString,
    pub topic: CheetahString,
    pub default_topic: CheetahString,
    pub default_topic_queue_nums: i32,
    pub queue_id: i32,
    pub sys_flag: i32,
    pub born_timestamp: i64,
    pub flag: i32,
    pub properties: Option<CheetahString>,
    pub reconsume_times: Option<i32>,
    pub unit_mode: Option<bool>,
    pub batch: Option<bool>,
    pub max_reconsume_times: Option<i32>,
}

impl CommandCustomHeader for SendMessageRequestHeader {
    fn to_map(&self) -> HashMap<CheetahString, CheetahString> {
        let mut map = HashMap::from([
            (
                CheetahString::from_static_str("producerGroup"),
                self.producer_group.clone(),
            ),
            (CheetahString::from_static_str("topic"), self.topic.clone()),
            (
                CheetahString::from_static_str("defaultTopic"),
                self.default_topic.clone(),
            ),
            (
                CheetahString::from_static_str("defaultTopicQueueNums"),
                CheetahString::from_string(self.default_topic_queue_nums.to_string()),
            ),
            (
                CheetahString::from_static_str("queueId"),
                CheetahString::from_string(self.queue_id.to_string()),
            ),
            (
                CheetahString::from_static_str("sysFlag"),
                CheetahString::from_string(self.sys_flag.to_string()),
            ),
            (
                CheetahString::from_static_str("bornTimestamp"),
                CheetahString::from_string(self.born_timestamp.to_string()),
            ),
            (
                CheetahString::from_static_str("flag"),
                CheetahString::from_string(self.flag.to_string()),
            ),
        ]);
        if let Some(properties) = &self.properties {
            map.insert(
                CheetahString::from_static_str("properties"),
                properties.clone(),
            );
        }
        if let Some(reconsume_times) = self.reconsume_times {
            map.insert(
                CheetahString::from_static_str("reconsumeTimes"),
                CheetahString::from_string(reconsume_times.to_string()),
            );
        }
        if let Some(unit_mode) = self.unit_mode {
            map.insert(
                CheetahString::from_static_str("unitMode"),
                CheetahString::from_string(unit_mode.to_string()),
            );
        }
        if let Some(batch) = self.batch {
            map.insert(
                CheetahString::from_static_str("batch"),
                CheetahString::from_string(batch.to_string()),
            );
        }
        if let Some(max_reconsume_times) = self.max_reconsume_times {
            map.insert(
                CheetahString::from_static_str("maxReconsumeTimes"),
                CheetahString::from_string(max_reconsume_times.to_string()),
            );
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_map_carries_required_and_optional_fields() {
        let header = SendMessageRequestHeader {
            producer_group: CheetahString::from("group"),
            topic: CheetahString::from("topic"),
            default_topic: CheetahString::from(DEFAULT_TOPIC),
            default_topic_queue_nums: DEFAULT_TOPIC_QUEUE_NUMS,
            queue_id: 2,
            sys_flag: 0,
            born_timestamp: 123,
            flag: 0,
            properties: Some(CheetahString::from("TAGS\u{1}tagA\u{2}")),
            batch: Some(true),
            ..Default::default()
        };
        let map = header.to_map();
        assert_eq!(map.get("topic").unwrap().as_str(), "topic");
        assert_eq!(map.get("queueId").unwrap().as_str(), "2");
        assert_eq!(map.get("batch").unwrap().as_str(), "true");
        assert!(!map.contains_key("maxReconsumeTimes"));
    }
}
