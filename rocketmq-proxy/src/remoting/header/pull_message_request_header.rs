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

#[derive(Debug, Clone, Default)]
pub struct PullMessageRequestHeader {
    pub consumer_group: CheetahString,
    pub topic: CheetahString,
    pub queue_id: i32,
    pub queue_offset: i64,
    pub max_msg_nums: i32,
    pub sys_flag: i32,
    pub commit_offset: i64,
    pub suspend_timeout_millis: u64,
    pub subscription: Option<CheetahString>,
    pub sub_version: i64,
    pub expression_type: Option<CheetahString>,
}

impl CommandCustomHeader for PullMessageRequestHeader {
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
                CheetahString::from_static_str("queueOffset"),
                CheetahString::from_string(self.queue_offset.to_string()),
            ),
            (
                CheetahString::from_static_str("maxMsgNums"),
                CheetahString::from_string(self.max_msg_nums.to_string()),
            ),
            (
                CheetahString::from_static_str("sysFlag"),
                CheetahString::from_string(self.sys_flag.to_string()),
            ),
            (
                CheetahString::from_static_str("commitOffset"),
                CheetahString::from_string(self.commit_offset.to_string()),
            ),
            (
                CheetahString::from_static_str("suspendTimeoutMillis"),
                CheetahString::from_string(self.suspend_timeout_millis.to_string()),
            ),
            (
                CheetahString::from_static_str("subVersion"),
                CheetahString::from_string(self.sub_version.to_string()),
            ),
        ]);
        if let Some(subscription) = &self.subscription {
            map.insert(
                CheetahString::from_static_str("subscription"),
                subscription.clone(),
            );
        }
        if let Some(expression_type) = &self.expression_type {
            map.insert(
                CheetahString::from_static_str("expressionType"),
                expression_type.clone(),
            );
        }
        map
    }
}
