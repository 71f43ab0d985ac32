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
use crate::remoting::command_custom_header::CommandCustomHeader;
use crate::remoting::command_custom_header::FromMap;

#[derive(Debug, Clone, Default)]
pub struct ChangeInvisibleTimeResponseHeader {
    pub pop_time: u64,
    pub invisible_time: u64,
    pub revive_qid: i32,
}

impl FromMap for ChangeInvisibleTimeResponseHeader {
    fn from_map(map: &HashMap<CheetahString, CheetahString>) -> ProxyResult<Self> {
        Ok(ChangeInvisibleTimeResponseHeader {
            pop_time: parse_field(map, "popTime")?,
            invisible_time: parse_field(map, "invisibleTime")?,
            revive_qid: parse_field(map, "reviveQid")?,
        })
    }
}

impl CommandCustomHeader for ChangeInvisibleTimeResponseHeader {
    fn to_map(&self) -> HashMap<CheetahString, CheetahString> {
        HashMap::from([
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
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_map() {
        let header = ChangeInvisibleTimeResponseHeader {
            pop_time: 1700000000000,
            invisible_time: 15_000,
            revive_qid: 1,
        };
        let decoded = ChangeInvisibleTimeResponseHeader::from_map(&header.to_map()).unwrap();
        assert_eq!(decoded.pop_time, header.pop_time);
        assert_eq!(decoded.invisible_time, 15_000);
        assert_eq!(decoded.revive_qid, 1);
    }
}
