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

use crate::common::message::message_ext::MessageExt;
use crate::connector::transaction::transaction_id::TransactionId;

/// An orphan half message the broker wants resolved.
#[derive(Debug, Clone)]
pub struct TransactionStateCheckRequest {
    pub group_id: CheetahString,
    pub transaction_id: TransactionId,
    pub message: MessageExt,
}

/// Dispatch seam between the connector layer and whatever answers
/// transaction checks (the relay channel toward a producer client).
pub trait TransactionStateChecker: Send + Sync + 'static {
    fn check_transaction_state(&self, request: TransactionStateCheckRequest);
}
