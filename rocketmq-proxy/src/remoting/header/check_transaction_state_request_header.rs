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

/// Broker-originated orphan transaction check, arrives as a back-request on
/// the forward connection.
#[derive(Debug, Clone, Default)]
pub struct CheckTransactionStateRequestHeader {
    pub tran_state_table_offset: i64,
    pub commit_log_offset: i64,
    pub msg_id: Option<CheetahString>,
    pub transaction_id: Option<CheetahString>,
    pub offset_msg_id: Option<CheetahString>,
    pub broker_name: Option<CheetahString>,
}

impl FromMap for CheckTransactionStateRequestHeader {
    fn from_map(map: &HashMap<CheetahString, CheetahString>) -> ProxyResult<Self> {
        Ok(CheckTransactionStateRequestHeader {
            tran_state_table_offset: parse_field(map, "tranStateTableOffset")?,
            commit_log_offset: parse_field(map, "commitLogOffset")?,
            msg_id: map.get("msgId").cloned(),
            transaction_id: map.get("transactionId").cloned(),
            offset_msg_id: map.get("offsetMsgId").cloned(),
            broker_name: map.get("brokerName").cloned(),
        })
    }
}

impl CommandCustomHeader for CheckTransactionStateRequestHeader {
    fn to_map(&self) -> HashMap<CheetahString, CheetahString> {
        let mut map = HashMap::from([
            (
                CheetahString::from_static_str("tranStateTableOffset"),
                CheetahString::from_string(self.tran_state_table_offset.to_string()),
            ),
            (
                CheetahString::from_static_str("commitLogOffset"),
                CheetahString::from_string(self.commit_log_offset.to_string()),
            ),
        ]);
        if let Some(msg_id) = &self.msg_id {
            map.insert(CheetahString::from_static_str("msgId"), msg_id.clone());
        }
        if let Some(transaction_id) = &self.transaction_id {
            map.insert(
                CheetahString::from_static_str("transactionId"),
                transaction_id.clone(),
            );
        }
        if let Some(offset_msg_id) = &self.offset_msg_id {
            map.insert(
                CheetahString::from_static_str("offsetMsgId"),
                offset_msg_id.clone(),
            );
        }
        if let Some(broker_name) = &self.broker_name {
            map.insert(
                CheetahString::from_static_str("brokerName"),
                broker_name.clone(),
            );
        }
        map
    }
}
