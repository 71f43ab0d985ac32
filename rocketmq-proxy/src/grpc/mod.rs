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

pub mod client_settings_manager;
pub mod common;
pub mod context;
pub mod server;
pub mod v1;
pub mod v2;

/// The two protobuf revisions of the client-facing surface.
pub mod proto {
    pub mod v1 {
        tonic::include_proto!("apache.rocketmq.v1");
    }

    pub mod v2 {
        tonic::include_proto!("apache.rocketmq.v2");
    }
}
