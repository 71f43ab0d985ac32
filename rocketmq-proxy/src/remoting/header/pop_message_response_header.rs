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
pub struct PopMessageResponseHeader {
    pub pop_time: u64,
    pub invisible_time: u64,
    pub revive_qid: i32,
    pub rest_num: u64,
    pub start_offset_info: Option<CheetahString>,
    pub msg_offset_info: Option<CheetahString>,
    pub order_count_info: Option<CheetahString>,
}

impl FromMap for PopMessageResponseHeader {
    fn from_map(map: &HashMap<CheetahString, CheetahString>) -> ProxyResult<Self> {
        Ok(PopMessageResponseHeader {
            pop_time: parse_field(map, "popTime")?,
            invisible_time: parse_field(map, "invisibleTime")?,
            revive_qid: parse_field(map, "reviveQid")?,
            rest_num: parse_field_or(map, "restNum", 0),
            start_offset_info: map.get("startOffsetInfo").cloned(),
            msg_offset_info: map.get("msgOffsetInfo").cloned(),
            order_count_info: map.get("orderCountInfo").cloned(),
        })
    }
}

impl CommandCustomHeader for PopMessageResponseHeader {
    fn to_map(&self) -> HashMap<CheetahString, CheetahString> {
        let mut map = HashMap::from([
            (
                CheetahString::from_static_str("popTime"),
                CheetahString::from_string(self.pop_time.to_string()),
            ),
            (
                CheetahString::from_static_str("invisibleTime"),
                CheetahString::from_string(self.invisible_time.to_string()),
            ),
            (
                CheetahString::from_static_str("reviveQid"),
                CheetahString::from_string(self.revive_qid.to_string()),
            ),
            (
                CheetahString::from_static_str("restNum"),
                CheetahString::from_string(self.rest_num.to_string()),
            ),
        ]);
        if let Some(start_offset_info) = &self.start_offset_info {
            map.insert(
                CheetahString::from_static_str("startOffsetInfo"),
                start_offset_info.clone(),
            );
        }
        if let Some(msg_offset_info) = &self.msg_offset_info {
            map.insert(
                CheetahString::from_static_str("msgOffsetInfo"),
                msg_offset_info.clone(),
            );
        }
        if let Some(order_count_info) = &self.order_count_info {
            map.insert(
                CheetahString::from_static_str("orderCountInfo"),
                order_count_info.clone(),
            );
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_with_offset_infos() {
        let header = PopMessageResponseHeader {
            pop_time: 1700000000000,
            invisible_time: 60000,
            revive_qid: 2,
            rest_num: 5,
            start_offset_info: Some(CheetahString::from("0 3 42")),
            msg_offset_info: Some(CheetahString::from("0 3 42")),
            order_count_info: None,
        };
        let decoded = PopMessageResponseHeader::from_map(&header.to_map()).unwrap();
        assert_eq!(decoded.pop_time, header.pop_time);
        assert_eq!(decoded.revive_qid, 2);
        assert_eq!(decoded.rest_num, 5);
        assert_eq!(decoded.start_offset_info.unwrap().as_str(), "0 3 42");
        assert!(decoded.order_count_info.is_none());
    }
}
