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

pub mod message_queue_wrapper;
pub mod queue_selector;
pub mod topic_route_cache;

pub use message_queue_wrapper::gen_queue_permissions;
pub use message_queue_wrapper::MessageQueueWrapper;
pub use message_queue_wrapper::QueuePermission;
pub use message_queue_wrapper::SelectableMessageQueue;
pub use queue_selector::AssignmentQueueSelector;
pub use queue_selector::DefaultAssignmentQueueSelector;
pub use queue_selector::DefaultReadQueueSelector;
pub use queue_selector::DefaultWriteQueueSelector;
pub use queue_selector::ReadQueueSelector;
pub use queue_selector::WriteQueueSelector;
pub use topic_route_cache::TopicRouteCache;
