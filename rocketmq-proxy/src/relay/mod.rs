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

pub mod channel_manager;
pub mod request_processor;

use cheetah_string::CheetahString;

use crate::common::message::message_ext::MessageExt;
use crate::remoting::body::ConsumeMessageDirectlyResult;
use crate::remoting::body::ConsumerRunningInfo;

/// A broker-originated command translated for delivery to one specific
/// client over its poll stream.
#[derive(Debug, Clone)]
pub enum RelayCommand {
    PrintThreadStackTrace {
        nonce: CheetahString,
    },
    RecoverOrphanedTransaction {
        message: MessageExt,
        transaction_id: CheetahString,
    },
    VerifyMessageConsumption {
        nonce: CheetahString,
        message: MessageExt,
    },
}

/// A client's answer to a relayed back-request, keyed by nonce.
#[derive(Debug, Clone)]
pub enum RelayReply {
    ConsumerRunningInfo(ConsumerRunningInfo),
    ConsumeMessageDirectlyResult(ConsumeMessageDirectlyResult),
}

#[derive(Debug, Clone)]
pub struct ProxyRelayResult {
    pub code: i32,
    pub remark: String,
    pub result: Option<RelayReply>,
}

impl ProxyRelayResult {
    pub fn ok(result: RelayReply) -> Self {
        ProxyRelayResult {
            code: crate::remoting::code::ResponseCode::Success.to_i32(),
            remark: String::new(),
            result: Some(result),
        }
    }

    pub fn system_busy(remark: impl Into<String>) -> Self {
        ProxyRelayResult {
            code: crate::remoting::code::ResponseCode::SystemBusy.to_i32(),
            remark: remark.into(),
            result: None,
        }
    }
}
