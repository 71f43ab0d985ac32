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

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use cheetah_string::CheetahString;
use dashmap::DashMap;
use rand::Rng;

use crate::connector::route::message_queue_wrapper::MessageQueueWrapper;
use crate::connector::route::message_queue_wrapper::SelectableMessageQueue;

/// Picks the queue a publish lands on.
pub trait WriteQueueSelector: Send + Sync {
    fn select_write_queue(
        &self,
        producer_group: &CheetahString,
        wrapper: &MessageQueueWrapper,
    ) -> Option<SelectableMessageQueue>;
}

/// Picks the broker a pop is issued against.
pub trait ReadQueueSelector: Send + Sync {
    fn select_read_queue(
        &self,
        consumer_group: &CheetahString,
        wrapper: &MessageQueueWrapper,
    ) -> Option<SelectableMessageQueue>;
}

/// The full readable set for assignment queries; the broker itself balances
/// queues at pop time, so entries carry the placeholder queue id -1.
pub trait AssignmentQueueSelector: Send + Sync {
    fn get_assignment(&self, wrapper: &MessageQueueWrapper) -> Vec<SelectableMessageQueue>;
}

fn cursor_key(group: &CheetahString, topic: &CheetahString) -> String {
    format!("{group}@{topic}")
}

/// Rotates over writable queues with one monotonic counter per
/// `(topic, producerGroup)`. The first publish starts at a random position
/// so restarted producer fleets do not stampede the same queue.
#[derive(Default)]
pub struct DefaultWriteQueueSelector {
    cursors: DashMap<String, Arc<AtomicU64>>,
}

impl DefaultWriteQueueSelector {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_index(&self, key: String) -> u64 {
        let cursor = self
            .cursors
            .entry(key)
            .or_insert_with(|| Arc::new(AtomicU64::new(rand::thread_rng().gen::<u32>() as u64)))
            .clone();
        cursor.fetch_add(1, Ordering::Relaxed)
    }
}

impl WriteQueueSelector for DefaultWriteQueueSelector {
    fn select_write_queue(
        &self,
        producer_group: &CheetahString,
        wrapper: &MessageQueueWrapper,
    ) -> Option<SelectableMessageQueue> {
        let write_queues = wrapper.write_queues();
        if write_queues.is_empty() {
            return None;
        }
        let index = self.next_index(cursor_key(producer_group, wrapper.topic()));
        Some(write_queues[(index % write_queues.len() as u64) as usize].clone())
    }
}

#[derive(Default)]
pub struct DefaultReadQueueSelector {
    cursors: DashMap<String, Arc<AtomicU64>>,
}

impl DefaultReadQueueSelector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReadQueueSelector for DefaultReadQueueSelector {
    fn select_read_queue(
        &self,
        consumer_group: &CheetahString,
        wrapper: &MessageQueueWrapper,
    ) -> Option<SelectableMessageQueue> {
        let read_brokers = wrapper.read_brokers();
        if read_brokers.is_empty() {
            return None;
        }
        let cursor = self
            .cursors
            .entry(cursor_key(consumer_group, wrapper.topic()))
            .or_insert_with(|| Arc::new(AtomicU64::new(rand::thread_rng().gen::<u32>() as u64)))
            .clone();
        let index = cursor.fetch_add(1, Ordering::Relaxed);
        Some(read_brokers[(index % read_brokers.len() as u64) as usize].clone())
    }
}

#[derive(Default)]
pub struct DefaultAssignmentQueueSelector;

impl DefaultAssignmentQueueSelector {
    pub fn new() -> Self {
        Self
    }
}

impl AssignmentQueueSelector for DefaultAssignmentQueueSelector {
    fn get_assignment(&self, wrapper: &MessageQueueWrapper) -> Vec<SelectableMessageQueue> {
        wrapper.read_brokers().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::collections::HashSet;

    use super::*;
    use crate::remoting::route::topic_route_data::perm::PERM_READ;
    use crate::remoting::route::topic_route_data::perm::PERM_WRITE;
    use crate::remoting::route::BrokerData;
    use crate::remoting::route::QueueData;
    use crate::remoting::route::TopicRouteData;

    fn wrapper(write_queue_nums: u32, broker_names: &[&str]) -> MessageQueueWrapper {
        let queue_datas = broker_names
            .iter()
            .map(|name| QueueData {
                broker_name: CheetahString::from(*name),
                read_queue_nums: write_queue_nums,
                write_queue_nums,
                perm: PERM_READ | PERM_WRITE,
                topic_sys_flag: 0,
            })
            .collect();
        let broker_datas = broker_names
            .iter()
            .map(|name| {
                BrokerData::new(
                    "DefaultCluster",
                    *name,
                    HashMap::from([(0, CheetahString::from(format!("{name}:10911")))]),
                )
            })
            .collect();
        MessageQueueWrapper::build(
            "topic",
            TopicRouteData {
                order_topic_conf: None,
                queue_datas,
                broker_datas,
            },
        )
    }

    #[test]
    fn write_selector_rotates_over_all_queues() {
        let selector = DefaultWriteQueueSelector::new();
        let wrapper = wrapper(4, &["broker-a"]);
        let group = CheetahString::from("pg");

        let mut seen = HashSet::new();
        for _ in 0..4 {
            let queue = selector.select_write_queue(&group, &wrapper).unwrap();
            seen.insert(queue.queue_id);
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn write_selector_skips_queues_without_write_permission() {
        let selector = DefaultWriteQueueSelector::new();
        let read_only = MessageQueueWrapper::build(
            "topic",
            TopicRouteData {
                order_topic_conf: None,
                queue_datas: vec![QueueData {
                    broker_name: CheetahString::from("broker-a"),
                    read_queue_nums: 4,
                    write_queue_nums: 4,
                    perm: PERM_READ,
                    topic_sys_flag: 0,
                }],
                broker_datas: vec![BrokerData::new(
                    "DefaultCluster",
                    "broker-a",
                    HashMap::from([(0, CheetahString::from("127.0.0.1:10911"))]),
                )],
            },
        );
        assert!(selector
            .select_write_queue(&CheetahString::from("pg"), &read_only)
            .is_none());
    }

    #[test]
    fn cursors_are_scoped_per_group_and_topic() {
        let selector = DefaultWriteQueueSelector::new();
        let wrapper = wrapper(1024, &["broker-a"]);
        let first = selector
            .select_write_queue(&CheetahString::from("pg-1"), &wrapper)
            .unwrap();
        // a second group gets an independent randomized start
        let _ = selector
            .select_write_queue(&CheetahString::from("pg-2"), &wrapper)
            .unwrap();
        let second = selector
            .select_write_queue(&CheetahString::from("pg-1"), &wrapper)
            .unwrap();
        assert_eq!(
            (first.queue_id + 1) % 1024,
            second.queue_id % 1024,
            "same group advances by one"
        );
    }

    #[test]
    fn read_selector_advances_over_brokers() {
        let selector = DefaultReadQueueSelector::new();
        let wrapper = wrapper(4, &["broker-a", "broker-b"]);
        let group = CheetahString::from("cg");

        let first = selector.select_read_queue(&group, &wrapper).unwrap();
        let second = selector.select_read_queue(&group, &wrapper).unwrap();
        assert_ne!(first.broker_name, second.broker_name);
        assert_eq!(first.queue_id, -1);
    }

    #[test]
    fn assignment_returns_full_readable_set() {
        let selector = DefaultAssignmentQueueSelector::new();
        let wrapper = wrapper(4, &["broker-a", "broker-b"]);
        let assignment = selector.get_assignment(&wrapper);
        assert_eq!(assignment.len(), 2);
        assert!(assignment.iter().all(|queue| queue.queue_id == -1));
    }
}
