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

use crate::remoting::route::QueueData;
use crate::remoting::route::TopicRouteData;

/// A concrete `(brokerName, brokerAddr, queueId)` pick. Derived from a route
/// on demand, never stored across refreshes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectableMessageQueue {
    pub broker_name: CheetahString,
    pub broker_addr: CheetahString,
    pub queue_id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePermission {
    Read,
    Write,
    ReadWrite,
}

/// Queue ids are laid out contiguously, read-only first, then write-only,
/// then read-write, so clients see stable ids across refreshes.
pub fn gen_queue_permissions(queue_data: &QueueData) -> Vec<(i32, QueuePermission)> {
    let mut read_only = 0;
    let mut write_only = 0;
    let mut read_write = 0;
    if queue_data.is_writeable() && queue_data.is_readable() {
        read_write = queue_data.write_queue_nums.min(queue_data.read_queue_nums);
        read_only = queue_data.read_queue_nums - read_write;
        write_only = queue_data.write_queue_nums - read_write;
    } else if queue_data.is_writeable() {
        write_only = queue_data.write_queue_nums;
    } else if queue_data.is_readable() {
        read_only = queue_data.read_queue_nums;
    }

    let mut partitions = Vec::with_capacity((read_only + write_only + read_write) as usize);
    let mut queue_id = 0;
    for _ in 0..read_only {
        partitions.push((queue_id, QueuePermission::Read));
        queue_id += 1;
    }
    for _ in 0..write_only {
        partitions.push((queue_id, QueuePermission::Write));
        queue_id += 1;
    }
    for _ in 0..read_write {
        partitions.push((queue_id, QueuePermission::ReadWrite));
        queue_id += 1;
    }
    partitions
}

/// A cached route plus the selectable views derived from it. Replaced
/// atomically as a whole on refresh.
#[derive(Debug, Clone)]
pub struct MessageQueueWrapper {
    topic: CheetahString,
    topic_route_data: TopicRouteData,
    write_queues: Vec<SelectableMessageQueue>,
    read_brokers: Vec<SelectableMessageQueue>,
}

impl MessageQueueWrapper {
    pub fn build(topic: impl Into<CheetahString>, topic_route_data: TopicRouteData) -> Self {
        let mut write_queues = Vec::new();
        let mut read_brokers = Vec::new();

        for queue_data in &topic_route_data.queue_datas {
            let broker_addr = topic_route_data
                .find_broker_data(queue_data.broker_name.as_str())
                .and_then(|broker_data| broker_data.select_broker_addr());
            let Some(broker_addr) = broker_addr else {
                continue;
            };
            if queue_data.is_writeable() {
                for queue_id in 0..queue_data.write_queue_nums as i32 {
                    write_queues.push(SelectableMessageQueue {
                        broker_name: queue_data.broker_name.clone(),
                        broker_addr: broker_addr.clone(),
                        queue_id,
                    });
                }
            }
            if queue_data.is_readable() {
                // the broker itself balances over queues at pop time
                read_brokers.push(SelectableMessageQueue {
                    broker_name: queue_data.broker_name.clone(),
                    broker_addr: broker_addr.clone(),
                    queue_id: -1,
                });
            }
        }

        MessageQueueWrapper {
            topic: topic.into(),
            topic_route_data,
            write_queues,
            read_brokers,
        }
    }

    pub fn topic(&self) -> &CheetahString {
        &self.topic
    }

    pub fn topic_route_data(&self) -> &TopicRouteData {
        &self.topic_route_data
    }

    pub fn write_queues(&self) -> &[SelectableMessageQueue] {
        &self.write_queues
    }

    pub fn read_brokers(&self) -> &[SelectableMessageQueue] {
        &self.read_brokers
    }

    pub fn broker_addr(&self, broker_name: &str) -> Option<CheetahString> {
        self.topic_route_data
            .find_broker_data(broker_name)
            .and_then(|broker_data| broker_data.select_broker_addr())
    }
}
