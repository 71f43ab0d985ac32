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
pub struct ChangeInvisibleTimeRequestHeader {
    pub consumer_group: CheetahString,
    pub topic: CheetahString,
    pub queue_id: i32,
    pub extra_info: CheetahString,
    pub offset: i64,
    pub invisible_time: u64,
}

impl CommandCustomHeader for ChangeInvisibleTimeRequestHeader {
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
            (
                CheetahString::from_static_str("invisibleTime"),
                CheetahString::from_string(self.invisible_time.to_string()),
            ),
        ])
    }
}

impl FromMap for ChangeInvisibleTimeRequestHeader {
    fn from_map(map: &HashMap<CheetahString, CheetahString>) -> ProxyResult<Self> {
        Ok(ChangeInvisibleTimeRequestHeader {
            consumer_group: require(map, "consumerGroup")?.clone(),
            topic: require(map, "topic")?.clone(),
            queue_id: parse_field(map, "queueId")?,
            extra_info: require(map, "extraInfo")?.clone(),
            offset: parse_field(map, "offset")?,
            invisible_time: parse_field(map, "invisibleTime")?,
        })
    }
}
