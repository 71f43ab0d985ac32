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

//! Stateless proxy that terminates the gRPC messaging surface (protocol
//! revisions v1 and v2) and relays every call onto RocketMQ brokers over the
//! remoting protocol. Nothing is persisted: receive state travels in receipt
//! handles, transaction state in transaction ids, and a restart only costs
//! clients a retransmit.

pub mod command;
pub mod common;
pub mod config;
pub mod connector;
pub mod error;
pub mod grpc;
pub mod processor;
pub mod relay;
pub mod remoting;

pub use config::ProxyConfig;
pub use config::ProxyMode;
pub use error::ProxyError;
pub use error::ProxyResult;
pub use grpc::server::ProxyServer;

/// Resolves when SIGTERM or SIGINT arrives.
#[cfg(unix)]
pub async fn wait_for_signal() {
    use tokio::signal::unix::signal;
    use tokio::signal::unix::SignalKind;
    use tracing::info;
    let mut term = signal(SignalKind::terminate()).expect("failed to register signal handler");
    let mut int = signal(SignalKind::interrupt()).expect("failed to register signal handler");

    tokio::select! {
        _ = term.recv() => info!("Received SIGTERM"),
        _ = int.recv() => info!("Received SIGINT"),
    }
}

#[cfg(windows)]
pub async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
