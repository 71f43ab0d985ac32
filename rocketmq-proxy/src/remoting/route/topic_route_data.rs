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
use rand::seq::IteratorRandom;
use serde::Deserialize;
use serde::Serialize;

use crate::common::mix_all::MASTER_ID;

pub mod perm {
    pub const PERM_READ: u32 = 0x1 << 2;
    pub const PERM_WRITE: u32 = 0x1 << 1;

    pub const fn is_readable(perm: u32) -> bool {
        perm & PERM_READ == PERM_READ
    }

    pub const fn is_writeable(perm: u32) -> bool {
        perm & PERM_WRITE == PERM_WRITE
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, Eq, PartialEq)]
pub struct TopicRouteData {
    #[serde(rename = "orderTopicConf")]
    pub order_topic_conf: Option<CheetahString>,
    #[serde(rename = "queueDatas")]
    pub queue_datas: Vec<QueueData>,
    #[serde(rename = "brokerDatas")]
    pub broker_datas: Vec<BrokerData>,
}

impl TopicRouteData {
    /// Every QueueData.broker_name must appear in some BrokerData.
    pub fn is_consistent(&self) -> bool {
        self.queue_datas.iter().all(|queue_data| {
            self.broker_datas
                .iter()
                .any(|broker_data| broker_data.broker_name == queue_data.broker_name)
        })
    }

    pub fn find_broker_data(&self, broker_name: &str) -> Option<&BrokerData> {
        self.broker_datas
            .iter()
            .find(|broker_data| broker_data.broker_name.as_str() == broker_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd)]
pub struct QueueData {
    #[serde(rename = "brokerName")]
    pub broker_name: CheetahString,
    #[serde(rename = "readQueueNums")]
    pub read_queue_nums: u32,
    #[serde(rename = "writeQueueNums")]
    pub write_queue_nums: u32,
    pub perm: u32,
    #[serde(rename = "topicSysFlag", default)]
    pub topic_sys_flag: u32,
}

impl QueueData {
    pub fn is_readable(&self) -> bool {
        perm::is_readable(self.perm)
    }

    pub fn is_writeable(&self) -> bool {
        perm::is_writeable(self.perm)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct BrokerData {
    pub cluster: CheetahString,
    #[serde(rename = "brokerName")]
    pub broker_name: CheetahString,
    #[serde(rename = "brokerAddrs")]
    pub broker_addrs: HashMap<i64, CheetahString>,
}

impl BrokerData {
    pub fn new(
        cluster: impl Into<CheetahString>,
        broker_name: impl Into<CheetahString>,
        broker_addrs: HashMap<i64, CheetahString>,
    ) -> BrokerData {
        BrokerData {
            cluster: cluster.into(),
            broker_name: broker_name.into(),
            broker_addrs,
        }
    }

    /// Master address when registered, any slave otherwise.
    pub fn select_broker_addr(&self) -> Option<CheetahString> {
        match self.broker_addrs.get(&MASTER_ID) {
            Some(master_addr) => Some(master_addr.clone()),
            None => self
                .broker_addrs
                .values()
                .choose(&mut rand::thread_rng())
                .cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broker_data(name: &str, addrs: &[(i64, &str)]) -> BrokerData {
        BrokerData::new(
            "DefaultCluster",
            name,
            addrs
                .iter()
                .map(|(id, addr)| (*id, CheetahString::from(*addr)))
                .collect(),
        )
    }

    #[test]
    fn perm_bits() {
        assert!(perm::is_readable(perm::PERM_READ));
        assert!(!perm::is_writeable(perm::PERM_READ));
        assert!(perm::is_writeable(perm::PERM_READ | perm::PERM_WRITE));
    }

    #[test]
    fn select_broker_addr_prefers_master() {
        let data = broker_data(
            "broker-a",
            &[(0, "127.0.0.1:10911"), (1, "127.0.0.1:10912")],
        );
        assert_eq!(data.select_broker_addr().unwrap().as_str(), "127.0.0.1:10911");
    }

    #[test]
    fn select_broker_addr_falls_back_to_slave() {
        let data = broker_data("broker-a", &[(1, "127.0.0.1:10912")]);
        assert_eq!(data.select_broker_addr().unwrap().as_str(), "127.0.0.1:10912");
    }

    #[test]
    fn route_consistency_check() {
        let route = TopicRouteData {
            order_topic_conf: None,
            queue_datas: vec![QueueData {
                broker_name: CheetahString::from("broker-a"),
                read_queue_nums: 4,
                write_queue_nums: 4,
                perm: perm::PERM_READ | perm::PERM_WRITE,
                topic_sys_flag: 0,
            }],
            broker_datas: vec![broker_data("broker-a", &[(0, "127.0.0.1:10911")])],
        };
        assert!(route.is_consistent());
        assert!(route.find_broker_data("broker-a").is_some());
        assert!(route.find_broker_data("broker-b").is_none());
    }

    #[test]
    fn route_json_uses_camel_case_names() {
        let route = TopicRouteData {
            order_topic_conf: None,
            queue_datas: vec![QueueData {
                broker_name: CheetahString::from("broker-a"),
                read_queue_nums: 4,
                write_queue_nums: 8,
                perm: 6,
                topic_sys_flag: 0,
            }],
            broker_datas: vec![],
        };
        let json = serde_json::to_string(&route).unwrap();
        assert!(json.contains("queueDatas"));
        assert!(json.contains("readQueueNums"));
        let decoded: TopicRouteData = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, route);
    }
}
