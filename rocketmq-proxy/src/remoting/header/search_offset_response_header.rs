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
pub struct SearchOffsetResponseHeader {
    pub offset: i64,
}

impl FromMap for SearchOffsetResponseHeader {
    fn from_map(map: &HashMap<CheetahString, CheetahString>) -> ProxyResult<Self> {
        Ok(SearchOffsetResponseHeader {
            offset: parse_field(map, "offset")?,
        })
    }
}

impl CommandCustomHeader for SearchOffsetResponseHeader {
    fn to_map(&self) -> HashMap<CheetahString, CheetahString> {
        HashMap::from([(
            CheetahString::from_static_str("offset"),
            CheetahString::from_string(self.offset.to_string()),
        )])
    }
}
