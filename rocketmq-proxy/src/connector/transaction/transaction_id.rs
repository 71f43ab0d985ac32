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

use std::fmt;

use cheetah_string::CheetahString;

use crate::error::ProxyError;
use crate::error::ProxyResult;

const SEPARATOR: char = ' ';

/// The client-visible transaction token. It pins the broker that stored the
/// half message plus its coordinates, so end-transaction reaches the right
/// place without proxy-side state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionId {
    broker_name: CheetahString,
    broker_transaction_id: CheetahString,
    tran_state_table_offset: i64,
    commit_log_offset: i64,
}

impl TransactionId {
    pub fn gen(
        broker_name: impl Into<CheetahString>,
        broker_transaction_id: impl Into<CheetahString>,
        tran_state_table_offset: i64,
        commit_log_offset: i64,
    ) -> Self {
        TransactionId {
            broker_name: broker_name.into(),
            broker_transaction_id: broker_transaction_id.into(),
            tran_state_table_offset,
            commit_log_offset,
        }
    }

    pub fn broker_name(&self) -> &CheetahString {
        &self.broker_name
    }

    pub fn broker_transaction_id(&self) -> &CheetahString {
        &self.broker_transaction_id
    }

    pub fn tran_state_table_offset(&self) -> i64 {
        self.tran_state_table_offset
    }

    pub fn commit_log_offset(&self) -> i64 {
        self.commit_log_offset
    }

    /// The proxy-scoped transaction id handed to clients.
    pub fn proxy_transaction_id(&self) -> String {
        format!(
            "{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}",
            self.broker_name,
            self.broker_transaction_id,
            self.tran_state_table_offset,
            self.commit_log_offset
        )
    }

    pub fn decode(proxy_transaction_id: &str) -> ProxyResult<TransactionId> {
        let parts: Vec<&str> = proxy_transaction_id.split(SEPARATOR).collect();
        if parts.len() != 4 {
            return Err(ProxyError::ClientInput(format!(
                "parse transaction id failed: {proxy_transaction_id}"
            )));
        }
        let tran_state_table_offset = parts[2].parse::<i64>().map_err(|_| {
            ProxyError::ClientInput("parse transaction tranStateTableOffset failed".to_string())
        })?;
        let commit_log_offset = parts[3].parse::<i64>().map_err(|_| {
            ProxyError::ClientInput("parse transaction commitLogOffset failed".to_string())
        })?;
        Ok(TransactionId {
            broker_name: CheetahString::from_slice(parts[0]),
            broker_transaction_id: CheetahString::from_slice(parts[1]),
            tran_state_table_offset,
            commit_log_offset,
        })
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TransactionId{{brokerName={}, brokerTransactionId={}, tranStateTableOffset={}, \
             commitLogOffset={}}}",
            self.broker_name,
            self.broker_transaction_id,
            self.tran_state_table_offset,
            self.commit_log_offset
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_transaction_id_round_trips() {
        let transaction_id = TransactionId::gen("broker-a", "7F000001ABCD", 9, 1024);
        let decoded = TransactionId::decode(&transaction_id.proxy_transaction_id()).unwrap();
        assert_eq!(decoded, transaction_id);
        assert_eq!(decoded.broker_name().as_str(), "broker-a");
        assert_eq!(decoded.tran_state_table_offset(), 9);
        assert_eq!(decoded.commit_log_offset(), 1024);
    }

    #[test]
    fn decode_rejects_malformed_ids() {
        assert!(TransactionId::decode("").is_err());
        assert!(TransactionId::decode("broker-a tx").is_err());
        assert!(TransactionId::decode("broker-a tx x 1").is_err());
    }
}
