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
pub struct SearchOffsetRequestHeader {
    pub topic: CheetahString,
    pub queue_id: i32,
    pub timestamp: i64,
}

impl CommandCustomHeader for SearchOffsetRequestHeader {
    fn to_map(&self) -> HashMap<CheetahString, CheetahString> {
        HashMap::from([
            (CheetahString::from_static_str("topic"), self.topic.clone()),
            (
                CheetahString::from_static_str("queueId"),
                CheetahString::from_string(self.queue_id.to_string()),
            ),
            (
                CheetahString::from_static_str("timestamp"),
                CheetahString::from_string(self.timestamp.to_string()),
            ),
        ])
    }
}
