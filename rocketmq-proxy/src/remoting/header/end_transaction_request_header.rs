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
use crate::remoting::command_custom_header::parse_field_or;
use crate::remoting::command_custom_header::require;
use crate::remoting::command_custom_header::CommandCustomHeader;
use crate::remoting::command_custom_header::FromMap;

#[derive(Debug, Clone, Default)]
pub struct EndTransactionRequestHeader {
    pub producer_group: CheetahString,
    pub tran_state_table_offset: i64,
    pub commit_log_offset: i64,
    /// One of the `TRANSACTION_*_TYPE` sys-flag values.
    pub commit_or_rollback: i32,
    pub from_transaction_check: bool,
    pub msg_id: CheetahString,
    pub transaction_id: CheetahString,
}

impl CommandCustomHeader for EndTransactionRequestHeader {
    fn to_map(&self) -> HashMap<CheetahString, CheetahString> {
        HashMap::from([
            (
                CheetahString::from_static_str("producerGroup"),
                self.producer_group.clone(),
            ),
            (
                CheetahString::from_static_str("tranStateTableOffset"),
                CheetahString::from_string(self.tran_state_table_offset.to_string()),
            ),
            (
                CheetahString::from_static_str("commitLogOffset"),
                CheetahString::from_string(self.commit_log_offset.to_string()),
            ),
            (
                CheetahString::from_static_str("commitOrRollback"),
                CheetahString::from_string(self.commit_or_rollback.to_string()),
            ),
            (
                CheetahString::from_static_str("fromTransactionCheck"),
                CheetahString::from_string(self.from_transaction_check.to_string()),
            ),
            (CheetahString::from_static_str("msgId"), self.msg_id.clone()),
            (
                CheetahString::from_static_str("transactionId"),
                self.transaction_id.clone(),
            ),
        ])
    }
}

impl FromMap for EndTransactionRequestHeader {
    fn from_map(map: &HashMap<CheetahString, CheetahString>) -> ProxyResult<Self> {
        Ok(EndTransactionRequestHeader {
            producer_group: require(map, "producerGroup")?.clone(),
            tran_state_table_offset: parse_field(map, "tranStateTableOffset")?,
            commit_log_offset: parse_field(map, "commitLogOffset")?,
            commit_or_rollback: parse_field(map, "commitOrRollback")?,
            from_transaction_check: parse_field_or(map, "fromTransactionCheck", false),
            msg_id: require(map, "msgId")?.clone(),
            transaction_id: map.get("transactionId").cloned().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::message::message_sys_flag::TRANSACTION_COMMIT_TYPE;

    #[test]
    fn round_trip_through_map() {
        let header = EndTransactionRequestHeader {
            producer_group: CheetahString::from("group"),
            tran_state_table_offset: 9,
            commit_log_offset: 1024,
            commit_or_rollback: TRANSACTION_COMMIT_TYPE,
            from_transaction_check: true,
            msg_id: CheetahString::from("id"),
            transaction_id: CheetahString::from("tx"),
        };
        let decoded = EndTransactionRequestHeader::from_map(&header.to_map()).unwrap();
        assert_eq!(decoded.commit_or_rollback, TRANSACTION_COMMIT_TYPE);
        assert!(decoded.from_transaction_check);
        assert_eq!(decoded.commit_log_offset, 1024);
    }
}
