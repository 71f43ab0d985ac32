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

use std::collections::HashMap;

use cheetah_string::CheetahString;
use serde::Deserialize;
use serde::Serialize;

/// Snapshot of a consumer instance, relayed back to the broker when it asks
/// for runtime inspection. The proxy itself only fills the stack-trace field
/// from the client's report, everything else is pass-through.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerRunningInfo {
    #[serde(default)]
    pub properties: HashMap<CheetahString, CheetahString>,
    #[serde(default)]
    pub jstack: CheetahString,
}

impl ConsumerRunningInfo {
    pub fn with_jstack(jstack: impl Into<CheetahString>) -> Self {
        ConsumerRunningInfo {
            properties: HashMap::new(),
            jstack: jstack.into(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_includes_jstack() {
        let info = ConsumerRunningInfo::with_jstack("main: RUNNABLE");
        let json = String::from_utf8(info.encode()).unwrap();
        assert!(json.contains("main: RUNNABLE"));
    }
}
