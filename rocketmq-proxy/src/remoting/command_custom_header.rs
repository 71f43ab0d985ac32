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

use crate::error::ProxyError;
use crate::error::ProxyResult;

/// A typed request/response header flattened into the command's string
/// `extFields`.
pub trait CommandCustomHeader {
    fn to_map(&self) -> HashMap<CheetahString, CheetahString>;
}

/// The reverse direction, rebuilding a typed header from `extFields`.
pub trait FromMap: Sized {
    fn from_map(map: &HashMap<CheetahString, CheetahString>) -> ProxyResult<Self>;
}

pub(crate) fn require<'a>(
    map: &'a HashMap<CheetahString, CheetahString>,
    field: &str,
) -> ProxyResult<&'a CheetahString> {
    map.get(field)
        .ok_or_else(|| ProxyError::Internal(format!("the field {field} is required")))
}

pub(crate) fn parse_field<T: std::str::FromStr>(
    map: &HashMap<CheetahString, CheetahString>,
    field: &str,
) -> ProxyResult<T> {
    require(map, field)?
        .as_str()
        .parse::<T>()
        .map_err(|_| ProxyError::Internal(format!("parse header field {field} failed")))
}

pub(crate) fn parse_field_or<T: std::str::FromStr>(
    map: &HashMap<CheetahString, CheetahString>,
    field: &str,
    default: T,
) -> T {
    map.get(field)
        .and_then(|value| value.as_str().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_of(entries: &[(&str, &str)]) -> HashMap<CheetahString, CheetahString> {
        entries
            .iter()
            .map(|(k, v)| (CheetahString::from(*k), CheetahString::from(*v)))
            .collect()
    }

    #[test]
    fn parse_field_reads_typed_values() {
        let map = map_of(&[("offset", "42")]);
        let offset: i64 = parse_field(&map, "offset").unwrap();
        assert_eq!(offset, 42);
    }

    #[test]
    fn parse_field_fails_on_missing_or_malformed() {
        let map = map_of(&[("offset", "x")]);
        assert!(parse_field::<i64>(&map, "offset").is_err());
        assert!(parse_field::<i64>(&map, "missing").is_err());
    }

    #[test]
    fn parse_field_or_falls_back() {
        let map = map_of(&[]);
        assert_eq!(parse_field_or(&map, "restNum", 7u64), 7);
    }
}
