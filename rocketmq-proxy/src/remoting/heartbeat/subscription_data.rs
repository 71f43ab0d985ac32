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
use serde::Deserialize;
use serde::Serialize;

use crate::error::ProxyError;
use crate::error::ProxyResult;

pub const SUB_ALL: &str = "*";
pub const EXPRESSION_TYPE_TAG: &str = "TAG";
pub const EXPRESSION_TYPE_SQL92: &str = "SQL92";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionData {
    pub topic: CheetahString,
    pub sub_string: CheetahString,
    #[serde(default)]
    pub expression_type: CheetahString,
    #[serde(default)]
    pub tags_set: HashSet<CheetahString>,
    #[serde(default)]
    pub sub_version: i64,
}

impl SubscriptionData {
    /// Build a TAG subscription, rejecting empty sub-expressions. `*` and an
    /// empty string both mean subscribe-all.
    pub fn build(
        topic: impl Into<CheetahString>,
        sub_string: &str,
    ) -> ProxyResult<SubscriptionData> {
        let topic = topic.into();
        let mut subscription_data = SubscriptionData {
            topic,
            sub_string: CheetahString::from_slice(sub_string),
            expression_type: CheetahString::from_static_str(EXPRESSION_TYPE_TAG),
            tags_set: HashSet::new(),
            sub_version: 0,
        };
        if sub_string.is_empty() || sub_string == SUB_ALL {
            subscription_data.sub_string = CheetahString::from_static_str(SUB_ALL);
            return Ok(subscription_data);
        }
        for tag in sub_string.split("||") {
            let tag = tag.trim();
            if tag.is_empty() {
                return Err(ProxyError::ClientInput(format!(
                    "subscription split error: {sub_string}"
                )));
            }
            subscription_data
                .tags_set
                .insert(CheetahString::from_slice(tag));
        }
        Ok(subscription_data)
    }

    /// A SQL92 subscription is opaque to the proxy, syntax is enforced by
    /// the broker.
    pub fn build_sql(
        topic: impl Into<CheetahString>,
        expression: &str,
    ) -> ProxyResult<SubscriptionData> {
        if expression.trim().is_empty() {
            return Err(ProxyError::ClientInput(
                "empty SQL92 filter expression".to_string(),
            ));
        }
        Ok(SubscriptionData {
            topic: topic.into(),
            sub_string: CheetahString::from_slice(expression),
            expression_type: CheetahString::from_static_str(EXPRESSION_TYPE_SQL92),
            tags_set: HashSet::new(),
            sub_version: 0,
        })
    }

    pub fn is_tag_type(&self) -> bool {
        self.expression_type.as_str() == EXPRESSION_TYPE_TAG
    }
}
