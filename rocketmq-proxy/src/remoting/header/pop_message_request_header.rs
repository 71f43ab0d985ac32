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
use std::fmt::Display;

use cheetah_string::CheetahString;

use crate::remoting::command_custom_header::CommandCustomHeader;

/// Consume-from-where of the first pop for a new consumer group.
pub const INIT_MODE_MIN: i32 = 0;
pub const INIT_MODE_MAX: i32 = 1;

#[derive(Debug, Clone, Default)]
pub struct PopMessageRequestHeader {
    pub consumer_group: CheetahString,
    pub topic: CheetahString,
    pub queue_id: i32,
    pub max_msg_nums: u32,
    pub invisible_time: u64,
    pub poll_time: u64,
    pub born_time: u64,
    pub init_mode: i32,
    pub exp_type: Option<CheetahString>,
    pub exp: Option<CheetahString>,
    pub order: Option<bool>,
}

impl CommandCustomHeader for PopMessageRequestHeader {
    fn to_map(&self) -> HashMap<CheetahString, CheetahString> {
        let mut map = HashMap::from([
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
                CheetahString::from_static_str("maxMsgNums"),
                CheetahString::from_string(self.max_msg_nums.to_string()),
            ),
            (
                CheetahString::from_static_str("invisibleTime"),
                CheetahString::from_string(self.invisible_time.to_string()),
            ),
            (
                CheetahString::from_static_str("pollTime"),
                CheetahString::from_string(self.poll_time.to_string()),
            ),
            (
                CheetahString::from_static_str("bornTime"),
                CheetahString::from_string(self.born_time.to_string()),
            ),
            (
                CheetahString::from_static_str("initMode"),
                CheetahString::from_string(self.init_mode.to_string()),
            ),
        ]);
        if let Some(exp_type) = &self.exp_type {
            map.insert(CheetahString::from_static_str("expType"), exp_type.clone());
        }
        if let Some(exp) = &self.exp {
            map.insert(CheetahString::from_static_str("exp"), exp.clone());
        }
        if let Some(order) = self.order {
            map.insert(
                CheetahString::from_static_str("order"),
                CheetahString::from_string(order.to_string()),
            );
        }
        map
    }
}

impl Display for PopMessageRequestHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PopMessageRequestHeader [consumer_group={}, topic={}, queue_id={}, max_msg_nums={}, \
             invisible_time={}, poll_time={}, born_time={}, init_mode={}]",
            self.consumer_group,
            self.topic,
            self.queue_id,
            self.max_msg_nums,
            self.invisible_time,
            self.poll_time,
            self.born_time,
            self.init_mode
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_map_includes_filter_only_when_present() {
        let mut header = PopMessageRequestHeader {
            consumer_group: CheetahString::from("group"),
            topic: CheetahString::from("topic"),
            queue_id: -1,
            max_msg_nums: 16,
            invisible_time: 60_000,
            poll_time: 20_000,
            born_time: 1,
            init_mode: INIT_MODE_MAX,
            ..Default::default()
        };
        let map = header.to_map();
        assert_eq!(map.get("queueId").unwrap().as_str(), "-1");
        assert!(!map.contains_key("exp"));

        header.exp = Some(CheetahString::from("tagA||tagB"));
        header.exp_type = Some(CheetahString::from("TAG"));
        let map = header.to_map();
        assert_eq!(map.get("exp").unwrap().as_str(), "tagA||tagB");
        assert_eq!(map.get("expType").unwrap().as_str(), "TAG");
    }
}
