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
use crate::remoting::command_custom_header::CommandCustomHeader;
use crate::remoting::command_custom_header::FromMap;

#[derive(Debug, Clone, Default)]
pub struct PullMessageResponseHeader {
    pub suggest_which_broker_id: i64,
    pub next_begin_offset: i64,
    pub min_offset: i64,
    pub max_offset: i64,
}

impl FromMap for PullMessageResponseHeader {
    fn from_map(map: &HashMap<CheetahString, CheetahString>) -> ProxyResult<Self> {
        Ok(PullMessageResponseHeader {
            suggest_which_broker_id: parse_field_or(map, "suggestWhichBrokerId", 0),
            next_begin_offset: parse_field(map, "nextBeginOffset")?,
            min_offset: parse_field(map, "minOffset")?,
            max_offset: parse_field(map, "maxOffset")?,
        })
    }
}

impl CommandCustomHeader for PullMessageResponseHeader {
    fn to_map(&self) -> HashMap<CheetahString, CheetahString> {
        HashMap::from([
            (
                CheetahString::from_static_str("suggestWhichBrokerId"),
                CheetahString::from_string(self.suggest_which_broker_id.to_string()),
            ),
            (
                CheetahString::from_static_str("nextBeginOffset"),
                CheetahString::from_string(self.next_begin_offset.to_string()),
            ),
            (
                CheetahString::from_static_str("minOffset"),
                CheetahString::from_string(self.min_offset.to_string()),
            ),
            (
                CheetahString::from_static_str("maxOffset"),
                CheetahString::from_string(self.max_offset.to_string()),
            ),
        ])
    }
}
