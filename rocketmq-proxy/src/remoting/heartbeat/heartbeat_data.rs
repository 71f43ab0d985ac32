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

use std::collections::HashSet;

use cheetah_string::CheetahString;
use serde::Deserialize;
use serde::Serialize;

use crate::remoting::heartbeat::subscription_data::SubscriptionData;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatData {
    #[serde(rename = "clientID")]
    pub client_id: CheetahString,
    #[serde(default)]
    pub producer_data_set: HashSet<ProducerData>,
    #[serde(default)]
    pub consumer_data_set: HashSet<ConsumerData>,
}

impl HeartbeatData {
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProducerData {
    pub group_name: CheetahString,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerData {
    pub group_name: CheetahString,
    #[serde(default)]
    pub subscription_data_set: Vec<SubscriptionData>,
}

impl std::hash::Hash for ConsumerData {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.group_name.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_data_serializes_client_id_field_name() {
        let heartbeat = HeartbeatData {
            client_id: CheetahString::from("rmq-proxy-producer-client"),
            ..Default::default()
        };
        let json = String::from_utf8(heartbeat.encode()).unwrap();
        assert!(json.contains("\"clientID\":\"rmq-proxy-producer-client\""));
        assert!(json.contains("producerDataSet"));
    }

    #[test]
    fn heartbeat_data_round_trip() {
        let mut producer_data_set = HashSet::new();
        producer_data_set.insert(ProducerData {
            group_name: CheetahString::from("g1"),
        });
        let original = HeartbeatData {
            client_id: CheetahString::from("client1"),
            producer_data_set,
            consumer_data_set: HashSet::new(),
        };
        let decoded: HeartbeatData = serde_json::from_slice(&original.encode()).unwrap();
        assert_eq!(decoded, original);
    }
}
