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
use uuid::Uuid;

use crate::common::message::Message;
use crate::common::message::MessageConst;

pub struct MessageClientIDSetter;

impl MessageClientIDSetter {
    /// Stamp a unique client-side id onto the message unless one is present.
    pub fn set_uniq_id(message: &mut Message) -> CheetahString {
        if let Some(existing) =
            message.get_property(MessageConst::PROPERTY_UNIQ_CLIENT_MESSAGE_ID_KEYIDX)
        {
            return existing.clone();
        }
        let uniq_id = CheetahString::from_string(
            Uuid::new_v4().simple().to_string().to_ascii_uppercase(),
        );
        message.put_property(
            MessageConst::PROPERTY_UNIQ_CLIENT_MESSAGE_ID_KEYIDX,
            uniq_id.clone(),
        );
        uniq_id
    }

    pub fn get_uniq_id(message: &Message) -> Option<&CheetahString> {
        message.get_property(MessageConst::PROPERTY_UNIQ_CLIENT_MESSAGE_ID_KEYIDX)
    }
}
