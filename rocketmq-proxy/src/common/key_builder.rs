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

use crate::common::mix_all::RETRY_GROUP_TOPIC_PREFIX;

pub const POP_ORDER_REVIVE_QUEUE: i32 = 999;
pub const POP_RETRY_SEPARATOR_V1: char = '_';
pub const POP_RETRY_SEPARATOR_V2: char = '+';

pub struct KeyBuilder;

impl KeyBuilder {
    pub fn build_pop_retry_topic_v1(topic: &str, cid: &str) -> String {
        format!("{RETRY_GROUP_TOPIC_PREFIX}{cid}{POP_RETRY_SEPARATOR_V1}{topic}")
    }

    pub fn build_pop_retry_topic_v2(topic: &str, cid: &str) -> String {
        format!("{RETRY_GROUP_TOPIC_PREFIX}{cid}{POP_RETRY_SEPARATOR_V2}{topic}")
    }

    pub fn is_pop_retry_topic_v2(topic: &str) -> bool {
        topic.starts_with(RETRY_GROUP_TOPIC_PREFIX) && topic.contains(POP_RETRY_SEPARATOR_V2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_pop_retry_topics() {
        assert_eq!(
            KeyBuilder::build_pop_retry_topic_v1("topic", "group"),
            "%RETRY%group_topic"
        );
        assert_eq!(
            KeyBuilder::build_pop_retry_topic_v2("topic", "group"),
            "%RETRY%group+topic"
        );
    }

    #[test]
    fn recognize_v2_retry_topic() {
        assert!(KeyBuilder::is_pop_retry_topic_v2("%RETRY%group+topic"));
        assert!(!KeyBuilder::is_pop_retry_topic_v2("%RETRY%group_topic"));
        assert!(!KeyBuilder::is_pop_retry_topic_v2("topic+x"));
    }
}
