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
use crate::remoting::command_custom_header::parse_field_or;
use crate::remoting::command_custom_header::require;
use crate::remoting::command_custom_header::CommandCustomHeader;
use crate::remoting::command_custom_header::FromMap;

#[derive(Debug, Clone, Default)]
pub struct ConsumerSendMsgBackRequestHeader {
    pub group: CheetahString,
    pub origin_topic: CheetahString,
    pub offset: i64,
    /// Negative delay level routes the message straight to the group DLQ.
    pub delay_level: i32,
    pub origin_msg_id: CheetahString,
    pub unit_mode: bool,
    pub max_reconsume_times: Option<i32>,
}

impl CommandCustomHeader for ConsumerSendMsgBackRequestHeader {
    fn to_map(&self) -> HashMap<CheetahString, CheetahString> {
        let mut map = HashMap::from([
            (CheetahString::from_static_str("group"), self.group.clone()),
            (
                CheetahString::from_static_str("originTopic"),
                self.origin_topic.clone(),
            ),
            (
                CheetahString::from_static_str("offset"),
                CheetahString::from_string(self.offset.to_string()),
            ),
            (
                CheetahString::from_static_str("delayLevel"),
                CheetahString::from_string(self.delay_level.to_string()),
            ),
            (
                CheetahString::from_static_str("originMsgId"),
                self.origin_msg_id.clone(),
            ),
            (
                CheetahString::from_static_str("unitMode"),
                CheetahString::from_string(self.unit_mode.to_string()),
            ),
        ]);
        if let Some(max_reconsume_times) = self.max_reconsume_times {
            map.insert(
                CheetahString::from_static_str("maxReconsumeTimes"),
                CheetahString::from_string(max_reconsume_times.to_string()),
            );
        }
        map
    }
}

impl FromMap for ConsumerSendMsgBackRequestHeader {
    fn from_map(map: &HashMap<CheetahString, CheetahString>) -> ProxyResult<Self> {
        Ok(ConsumerSendMsgBackRequestHeader {
            group: require(map, "group")?.clone(),
            origin_topic: require(map, "originTopic")?.clone(),
            offset: parse_field(map, "offset")?,
            delay_level: parse_field(map, "delayLevel")?,
            origin_msg_id: require(map, "originMsgId")?.clone(),
            unit_mode: parse_field_or(map, "unitMode", false),
            max_reconsume_times: map
                .get("maxReconsumeTimes")
                .and_then(|value| value.as_str().parse::<i32>().ok()),
        })
    }
}
