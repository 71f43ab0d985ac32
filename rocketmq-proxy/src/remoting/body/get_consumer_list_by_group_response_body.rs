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
pub struct GetConsumerListByGroupResponseBody {
    pub consumer_id_list: Vec<CheetahString>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_round_trips_through_json() {
        let body = GetConsumerListByGroupResponseBody {
            consumer_id_list: vec![CheetahString::from("client-1"), CheetahString::from("client-2")],
        };
        let json = serde_json::to_vec(&body).unwrap();
        assert!(String::from_utf8_lossy(&json).contains("consumerIdList"));
        let decoded: GetConsumerListByGroupResponseBody = serde_json::from_slice(&json).unwrap();
        assert_eq!(decoded, body);
    }
}
