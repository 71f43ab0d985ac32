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

use cheetah_string::CheetahString;
use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeMessageDirectlyResult {
    pub order: bool,
    pub auto_commit: bool,
    pub consume_result: CheetahString,
    pub remark: Option<CheetahString>,
    pub spent_time_mills: u64,
}

impl ConsumeMessageDirectlyResult {
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_round_trips_through_json() {
        let result = ConsumeMessageDirectlyResult {
            order: false,
            auto_commit: true,
            consume_result: CheetahString::from("CR_SUCCESS"),
            remark: None,
            spent_time_mills: 12,
        };
        let decoded: ConsumeMessageDirectlyResult =
            serde_json::from_slice(&result.encode()).unwrap();
        assert_eq!(decoded, result);
    }
}
