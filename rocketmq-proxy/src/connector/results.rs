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

use std::fmt::Display;

use cheetah_string::CheetahString;

use crate::common::message::message_ext::MessageExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendStatus {
    #[default]
    SendOk,
    FlushDiskTimeout,
    FlushSlaveTimeout,
    SlaveNotAvailable,
}

#[derive(Debug, Clone, Default)]
pub struct SendResult {
    pub send_status: SendStatus,
    pub msg_id: CheetahString,
    pub queue_id: i32,
    pub queue_offset: i64,
    /// Where the store placed the message, decoded out of the
    /// store-generated message id. End-transaction must echo it back.
    pub commit_log_offset: i64,
    pub broker_name: CheetahString,
    pub transaction_id: Option<CheetahString>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopStatus {
    Found,
    #[default]
    NoNewMsg,
    PollingFull,
    PollingNotFound,
}

impl Display for PopStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PopStatus::Found => write!(f, "FOUND"),
            PopStatus::NoNewMsg => write!(f, "NO_NEW_MSG"),
            PopStatus::PollingFull => write!(f, "POLLING_FULL"),
            PopStatus::PollingNotFound => write!(f, "POLLING_NOT_FOUND"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PopResult {
    pub pop_status: PopStatus,
    pub msg_found_list: Vec<MessageExt>,
    pub pop_time: u64,
    pub invisible_time: u64,
    pub rest_num: u64,
}

impl Display for PopResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PopResult [msg_found_list={}, pop_status={}, pop_time={}, invisible_time={}, rest_num={}]",
            self.msg_found_list.len(),
            self.pop_status,
            self.pop_time,
            self.invisible_time,
            self.rest_num
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AckStatus {
    #[default]
    Ok,
    NoExist,
}

#[derive(Debug, Clone, Default)]
pub struct AckResult {
    pub status: AckStatus,
    /// On change-invisibility this carries the renewed receipt handle.
    pub extra_info: CheetahString,
    pub pop_time: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PullStatus {
    Found,
    #[default]
    NoNewMsg,
    NoMatchedMsg,
    OffsetIllegal,
}

#[derive(Debug, Clone, Default)]
pub struct PullResult {
    pub pull_status: PullStatus,
    pub next_begin_offset: i64,
    pub min_offset: i64,
    pub max_offset: i64,
    pub msg_found_list: Vec<MessageExt>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_result_display_counts_messages() {
        let result = PopResult {
            pop_status: PopStatus::Found,
            msg_found_list: vec![MessageExt::default(), MessageExt::default()],
            pop_time: 1,
            invisible_time: 2,
            rest_num: 3,
        };
        assert_eq!(
            result.to_string(),
            "PopResult [msg_found_list=2, pop_status=FOUND, pop_time=1, invisible_time=2, rest_num=3]"
        );
    }
}
