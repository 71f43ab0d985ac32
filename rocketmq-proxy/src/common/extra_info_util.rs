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

use crate::common::key_builder::KeyBuilder;
use crate::common::message::MessageConst;
use crate::common::mix_all;
use crate::common::receipt_handle::NORMAL_TOPIC;
use crate::common::receipt_handle::RETRY_TOPIC;
use crate::common::receipt_handle::RETRY_TOPIC_V2;
use crate::error::ProxyError;
use crate::error::ProxyResult;

const QUEUE_OFFSET: &str = "qo";

/// Parsing and building of the pop reply header strings,
/// `startOffsetInfo` / `msgOffsetInfo` / `orderCountInfo`, and the per
/// message `extraInfo` check point.
pub struct ExtraInfoUtil;

impl ExtraInfoUtil {
    pub fn build_extra_info(
        ck_queue_offset: i64,
        pop_time: i64,
        invisible_time: i64,
        revive_qid: i32,
        topic: &str,
        broker_name: &str,
        queue_id: i32,
    ) -> String {
        format!(
            "{}{sep}{}{sep}{}{sep}{}{sep}{}{sep}{}{sep}{}",
            ck_queue_offset,
            pop_time,
            invisible_time,
            revive_qid,
            Self::get_retry(topic),
            broker_name,
            queue_id,
            sep = MessageConst::KEY_SEPARATOR
        )
    }

    pub fn build_extra_info_with_msg_queue_offset(
        ck_queue_offset: i64,
        pop_time: i64,
        invisible_time: i64,
        revive_qid: i32,
        topic: &str,
        broker_name: &str,
        queue_id: i32,
        msg_queue_offset: i64,
    ) -> String {
        format!(
            "{}{}{}",
            Self::build_extra_info(
                ck_queue_offset,
                pop_time,
                invisible_time,
                revive_qid,
                topic,
                broker_name,
                queue_id
            ),
            MessageConst::KEY_SEPARATOR,
            msg_queue_offset
        )
    }

    /// `startOffsetInfo` is `retry KEY_SEP queueId KEY_SEP startOffset`
    /// entries joined by `;`.
    pub fn parse_start_offset_info(start_offset_info: &str) -> ProxyResult<HashMap<String, i64>> {
        let mut start_offset_map = HashMap::new();
        if start_offset_info.is_empty() {
            return Ok(start_offset_map);
        }
        for entry in start_offset_info.split(';') {
            let parts: Vec<&str> = entry.split(MessageConst::KEY_SEPARATOR).collect();
            if parts.len() != 3 {
                return Err(ProxyError::Internal(format!(
                    "parse startOffsetInfo error: {start_offset_info}"
                )));
            }
            let key = format!("{}@{}", parts[0], parts[1]);
            let offset = parts[2].parse::<i64>().map_err(|_| {
                ProxyError::Internal(format!("invalid start offset value: {}", parts[2]))
            })?;
            start_offset_map.insert(key, offset);
        }
        Ok(start_offset_map)
    }

    /// `msgOffsetInfo` is `retry KEY_SEP queueId KEY_SEP o1,o2,...` entries
    /// joined by `;`.
    pub fn parse_msg_offset_info(msg_offset_info: &str) -> ProxyResult<HashMap<String, Vec<i64>>> {
        let mut msg_offset_map = HashMap::new();
        if msg_offset_info.is_empty() {
            return Ok(msg_offset_map);
        }
        for entry in msg_offset_info.split(';') {
            let parts: Vec<&str> = entry.split(MessageConst::KEY_SEPARATOR).collect();
            if parts.len() != 3 {
                return Err(ProxyError::Internal(format!(
                    "parse msgOffsetInfo error: {msg_offset_info}"
                )));
            }
            let key = format!("{}@{}", parts[0], parts[1]);
            let mut offsets = Vec::new();
            for offset in parts[2].split(',') {
                offsets.push(offset.parse::<i64>().map_err(|_| {
                    ProxyError::Internal(format!("invalid msg offset value: {offset}"))
                })?);
            }
            msg_offset_map.insert(key, offsets);
        }
        Ok(msg_offset_map)
    }

    pub fn parse_order_count_info(order_count_info: &str) -> ProxyResult<HashMap<String, i32>> {
        let mut order_count_map = HashMap::new();
        if order_count_info.is_empty() {
            return Ok(order_count_map);
        }
        for entry in order_count_info.split(';') {
            let parts: Vec<&str> = entry.split(MessageConst::KEY_SEPARATOR).collect();
            if parts.len() != 3 {
                return Err(ProxyError::Internal(format!(
                    "parse orderCountInfo error: {order_count_info}"
                )));
            }
            let key = format!("{}@{}", parts[0], parts[1]);
            if order_count_map.contains_key(&key) {
                return Err(ProxyError::Internal(format!(
                    "parse orderCountInfo error, duplicate key: {order_count_info}"
                )));
            }
            let count = parts[2].parse::<i32>().map_err(|_| {
                ProxyError::Internal(format!("invalid order count value: {}", parts[2]))
            })?;
            order_count_map.insert(key, count);
        }
        Ok(order_count_map)
    }

    pub fn get_start_offset_info_map_key(topic: &str, queue_id: i64) -> String {
        format!("{}@{}", Self::get_retry(topic), queue_id)
    }

    pub fn get_queue_offset_key_value_key(queue_id: i64, queue_offset: i64) -> String {
        format!("{QUEUE_OFFSET}{queue_id}%{queue_offset}")
    }

    pub fn get_queue_offset_map_key(topic: &str, queue_id: i64, queue_offset: i64) -> String {
        format!(
            "{}@{}",
            Self::get_retry(topic),
            Self::get_queue_offset_key_value_key(queue_id, queue_offset)
        )
    }

    pub fn is_order(revive_qid: i32) -> bool {
        revive_qid == crate::common::key_builder::POP_ORDER_REVIVE_QUEUE
    }

    fn get_retry(topic: &str) -> &'static str {
        if KeyBuilder::is_pop_retry_topic_v2(topic) {
            RETRY_TOPIC_V2
        } else if topic.starts_with(mix_all::RETRY_GROUP_TOPIC_PREFIX) {
            RETRY_TOPIC
        } else {
            NORMAL_TOPIC
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_extra_info_creates_expected_string() {
        let extra_info = ExtraInfoUtil::build_extra_info(123, 456, 789, 10, "topic", "broker", 7);
        assert_eq!(extra_info, "123 456 789 10 0 broker 7");
    }

    #[test]
    fn build_extra_info_with_msg_queue_offset_appends_offset() {
        let extra_info = ExtraInfoUtil::build_extra_info_with_msg_queue_offset(
            123, 456, 789, 10, "topic", "broker", 7, 100,
        );
        assert_eq!(extra_info, "123 456 789 10 0 broker 7 100");
    }

    #[test]
    fn retry_topic_is_marked_in_extra_info() {
        let extra_info =
            ExtraInfoUtil::build_extra_info(0, 0, 0, 0, "%RETRY%group_topic", "broker", 0);
        assert_eq!(extra_info.split(' ').nth(4), Some("1"));

        let extra_info_v2 =
            ExtraInfoUtil::build_extra_info(0, 0, 0, 0, "%RETRY%group+topic", "broker", 0);
        assert_eq!(extra_info_v2.split(' ').nth(4), Some("2"));
    }

    #[test]
    fn parse_start_offset_info_with_valid_string() {
        let parsed = ExtraInfoUtil::parse_start_offset_info("0 7 100").unwrap();
        assert_eq!(parsed.get("0@7"), Some(&100));
    }

    #[test]
    fn parse_msg_offset_info_with_multiple_queues() {
        let parsed = ExtraInfoUtil::parse_msg_offset_info("0 7 100,200;0 8 300").unwrap();
        assert_eq!(parsed.get("0@7"), Some(&vec![100, 200]));
        assert_eq!(parsed.get("0@8"), Some(&vec![300]));
    }

    #[test]
    fn parse_order_count_info_rejects_duplicates() {
        assert!(ExtraInfoUtil::parse_order_count_info("0 7 1;0 7 2").is_err());
    }

    #[test]
    fn parse_empty_infos_yield_empty_maps() {
        assert!(ExtraInfoUtil::parse_start_offset_info("").unwrap().is_empty());
        assert!(ExtraInfoUtil::parse_msg_offset_info("").unwrap().is_empty());
        assert!(ExtraInfoUtil::parse_order_count_info("").unwrap().is_empty());
    }

    #[test]
    fn queue_offset_map_keys() {
        assert_eq!(ExtraInfoUtil::get_start_offset_info_map_key("topic", 7), "0@7");
        assert_eq!(
            ExtraInfoUtil::get_queue_offset_map_key("topic", 7, 100),
            "0@qo7%100"
        );
    }
}
