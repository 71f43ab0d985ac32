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

pub mod ack_message_request_header;
pub mod change_invisible_time_request_header;
pub mod change_invisible_time_response_header;
pub mod check_transaction_state_request_header;
pub mod consume_message_directly_result_request_header;
pub mod consumer_send_msg_back_request_header;
pub mod end_transaction_request_header;
pub mod get_consumer_list_by_group_request_header;
pub mod get_consumer_running_info_request_header;
pub mod get_max_offset_request_header;
pub mod get_max_offset_response_header;
pub mod get_route_info_request_header;
pub mod pop_message_request_header;
pub mod pop_message_response_header;
pub mod pull_message_request_header;
pub mod pull_message_response_header;
pub mod search_offset_request_header;
pub mod search_offset_response_header;
pub mod send_message_request_header;
pub mod send_message_response_header;
pub mod update_consumer_offset_request_header;
