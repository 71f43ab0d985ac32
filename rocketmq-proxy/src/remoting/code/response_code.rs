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

macro_rules! define_response_code {
    (
        $(#[$enum_meta:meta])*
        pub enum $enum_name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $value:expr
            ),* $(,)?
        },
        default = $default:ident
    ) => {
        $(#[$enum_meta])*
        #[repr(i32)]
        pub enum $enum_name {
            $(
                $(#[$variant_meta])*
                $variant = $value,
            )*
        }

        impl From<$enum_name> for i32 {
            #[inline]
            fn from(value: $enum_name) -> Self {
                value as i32
            }
        }

        impl From<i32> for $enum_name {
            #[inline]
            fn from(value: i32) -> Self {
                match value {
                    $($value => $enum_name::$variant,)*
                    _ => $enum_name::$default,
                }
            }
        }

        impl $enum_name {
            #[inline]
            pub const fn to_i32(self) -> i32 {
                self as i32
            }

            #[inline]
            pub const fn is_success(&self) -> bool {
                matches!(self, Self::Success)
            }
        }
    };
}

define_response_code! {
    #[derive(Debug, Eq, PartialEq, Clone, Copy, Hash)]
    pub enum ResponseCode {
        Success = 0,
        SystemError = 1,
        SystemBusy = 2,
        RequestCodeNotSupported = 3,
        FlushDiskTimeout = 10,
        SlaveNotAvailable = 11,
        FlushSlaveTimeout = 12,
        MessageIllegal = 13,
        ServiceNotAvailable = 14,
        NoPermission = 16,
        TopicNotExist = 17,
        PullNotFound = 19,
        PullRetryImmediately = 20,
        PullOffsetMoved = 21,
        SubscriptionNotExist = 25,
        TransactionShouldCommit = 200,
        TransactionShouldRollback = 201,
        PollingFull = 209,
        PollingTimeout = 210,
    },
    default = SystemError
}

impl ResponseCode {
    /// Retriable storage conditions the proxy surfaces to the caller
    /// unchanged.
    pub const fn is_broker_transient(&self) -> bool {
        matches!(
            self,
            ResponseCode::FlushDiskTimeout
                | ResponseCode::FlushSlaveTimeout
                | ResponseCode::SlaveNotAvailable
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_code_round_trips_through_i32() {
        assert_eq!(ResponseCode::Success.to_i32(), 0);
        assert_eq!(ResponseCode::from(209), ResponseCode::PollingFull);
        assert_eq!(ResponseCode::from(9999), ResponseCode::SystemError);
    }

    #[test]
    fn transient_codes_are_flagged() {
        assert!(ResponseCode::FlushDiskTimeout.is_broker_transient());
        assert!(ResponseCode::SlaveNotAvailable.is_broker_transient());
        assert!(ResponseCode::FlushSlaveTimeout.is_broker_transient());
        assert!(!ResponseCode::SystemError.is_broker_transient());
    }

    #[test]
    fn success_detection() {
        assert!(ResponseCode::Success.is_success());
        assert!(!ResponseCode::TopicNotExist.is_success());
    }
}
