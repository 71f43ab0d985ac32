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

pub mod consume_message_directly_result;
pub mod consumer_running_info;
pub mod get_consumer_list_by_group_response_body;

pub use consume_message_directly_result::ConsumeMessageDirectlyResult;
pub use consumer_running_info::ConsumerRunningInfo;
pub use get_consumer_list_by_group_response_body::GetConsumerListByGroupResponseBody;
