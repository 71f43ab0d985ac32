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

use std::collections::HashSet;

use cheetah_string::CheetahString;

pub struct FilterUtils;

impl FilterUtils {
    /// Tag filtering after pop. An empty tag set means subscribe-all.
    pub fn is_tag_matched(tags_set: &HashSet<CheetahString>, tag: Option<&CheetahString>) -> bool {
        if tags_set.is_empty() {
            return true;
        }
        match tag {
            Some(tag) => tags_set.contains(tag),
            None => false,
        }
    }
}
