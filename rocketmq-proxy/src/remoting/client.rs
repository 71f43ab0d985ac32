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

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use cheetah_string::CheetahString;
use dashmap::DashMap;
use futures::SinkExt;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio_util::codec::FramedRead;
use tokio_util::codec::FramedWrite;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::error::ProxyError;
use crate::error::ProxyResult;
use crate::remoting::codec::RemotingCommandCodec;
use crate::remoting::RemotingCommand;

/// Back-requests (transaction check, runtime inspection) arrive on forward
/// connections; an installed processor answers or relays them.
#[tonic::async_trait]
pub trait RemotingRequestProcessor: Send + Sync + 'static {
    async fn process_request(
        &self,
        broker_addr: &CheetahString,
        request: RemotingCommand,
    ) -> Option<RemotingCommand>;
}

/// The broker wire seam. Engines call typed wrappers that reduce to this
/// trait, tests substitute in-memory implementations for it.
#[tonic::async_trait]
pub trait RemotingClient: Send + Sync + 'static {
    async fn invoke(
        &self,
        addr: &CheetahString,
        request: RemotingCommand,
        timeout_millis: u64,
    ) -> ProxyResult<RemotingCommand>;

    async fn invoke_oneway(
        &self,
        addr: &CheetahString,
        request: RemotingCommand,
        timeout_millis: u64,
    ) -> ProxyResult<()>;

    async fn shutdown(&self);
}

type PendingMap = Arc<DashMap<i32, oneshot::Sender<ProxyResult<RemotingCommand>>>>;

struct Connection {
    outbound_tx: mpsc::Sender<RemotingCommand>,
    pending: PendingMap,
}

/// One long-lived connection per broker address, multiplexing requests by
/// opaque id.
pub struct RemotingTokioClient {
    connections: DashMap<CheetahString, Arc<Connection>>,
    connect_lock: tokio::sync::Mutex<()>,
    request_processor: Option<Arc<dyn RemotingRequestProcessor>>,
    closed: AtomicBool,
}

impl RemotingTokioClient {
    pub fn new(request_processor: Option<Arc<dyn RemotingRequestProcessor>>) -> Self {
        RemotingTokioClient {
            connections: DashMap::new(),
            connect_lock: tokio::sync::Mutex::new(()),
            request_processor,
            closed: AtomicBool::new(false),
        }
    }

    async fn get_or_create_connection(
        &self,
        addr: &CheetahString,
    ) -> ProxyResult<Arc<Connection>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ProxyError::Shutdown("remoting client"));
        }
        if let Some(connection) = self.connections.get(addr) {
            return Ok(connection.clone());
        }
        // Held only across connection setup, never across request I/O.
        let _guard = self.connect_lock.lock().await;
        if let Some(connection) = self.connections.get(addr) {
            return Ok(connection.clone());
        }
        let connection = Arc::new(self.connect(addr).await?);
        self.connections.insert(addr.clone(), connection.clone());
        Ok(connection)
    }

    async fn connect(&self, addr: &CheetahString) -> ProxyResult<Connection> {
        let stream = TcpStream::connect(addr.as_str())
            .await
            .map_err(|_| ProxyError::BrokerUnavailable(addr.to_string()))?;
        stream.set_nodelay(true).ok();
        info!("connected to broker {}", addr);

        let (read_half, write_half) = stream.into_split();
        let mut framed_write = FramedWrite::new(write_half, RemotingCommandCodec);
        let mut framed_read = FramedRead::new(read_half, RemotingCommandCodec);

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<RemotingCommand>(256);
        let pending: PendingMap = Arc::new(DashMap::new());

        tokio::spawn(async move {
            while let Some(command) = outbound_rx.recv().await {
                if let Err(e) = framed_write.send(command).await {
                    error!("write to broker failed: {}", e);
                    break;
                }
            }
        });

        let reader_pending = pending.clone();
        let reader_addr = addr.clone();
        let reader_outbound = outbound_tx.clone();
        let request_processor = self.request_processor.clone();
        tokio::spawn(async move {
            loop {
                match framed_read.next().await {
                    Some(Ok(command)) => {
                        if command.is_response_type() {
                            if let Some((_, sender)) =
                                reader_pending.remove(&command.opaque())
                            {
                                let _ = sender.send(Ok(command));
                            }
                            continue;
                        }
                        // broker-initiated request; handled off the read loop
                        // so a slow relay reply cannot stall responses
                        if let Some(processor) = request_processor.as_ref() {
                            let processor = processor.clone();
                            let outbound = reader_outbound.clone();
                            let broker_addr = reader_addr.clone();
                            tokio::spawn(async move {
                                if let Some(response) =
                                    processor.process_request(&broker_addr, command).await
                                {
                                    let _ = outbound.send(response).await;
                                }
                            });
                        } else {
                            warn!(
                                "dropped broker-initiated request from {} without processor",
                                reader_addr
                            );
                        }
                    }
                    Some(Err(e)) => {
                        error!("read from broker {} failed: {}", reader_addr, e);
                        break;
                    }
                    None => {
                        info!("broker {} closed the connection", reader_addr);
                        break;
                    }
                }
            }
            for entry in reader_pending.iter().map(|entry| *entry.key()).collect::<Vec<_>>() {
                if let Some((_, sender)) = reader_pending.remove(&entry) {
                    let _ = sender
                        .send(Err(ProxyError::BrokerUnavailable(reader_addr.to_string())));
                }
            }
        });

        Ok(Connection {
            outbound_tx,
            pending,
        })
    }

    fn drop_connection(&self, addr: &CheetahString) {
        self.connections.remove(addr);
    }
}

#[tonic::async_trait]
impl RemotingClient for RemotingTokioClient {
    async fn invoke(
        &self,
        addr: &CheetahString,
        request: RemotingCommand,
        timeout_millis: u64,
    ) -> ProxyResult<RemotingCommand> {
        let connection = self.get_or_create_connection(addr).await?;
        let opaque = request.opaque();
        let (response_tx, response_rx) = oneshot::channel();
        connection.pending.insert(opaque, response_tx);

        if connection.outbound_tx.send(request).await.is_err() {
            connection.pending.remove(&opaque);
            self.drop_connection(addr);
            return Err(ProxyError::BrokerUnavailable(addr.to_string()));
        }

        match tokio::time::timeout(
            std::time::Duration::from_millis(timeout_millis),
            response_rx,
        )
        .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ProxyError::BrokerUnavailable(addr.to_string())),
            Err(_) => {
                connection.pending.remove(&opaque);
                Err(ProxyError::BrokerTimeout(addr.to_string(), timeout_millis))
            }
        }
    }

    async fn invoke_oneway(
        &self,
        addr: &CheetahString,
        request: RemotingCommand,
        _timeout_millis: u64,
    ) -> ProxyResult<()> {
        let connection = self.get_or_create_connection(addr).await?;
        let request = request.mark_oneway_rpc();
        if connection.outbound_tx.send(request).await.is_err() {
            self.drop_connection(addr);
            return Err(ProxyError::BrokerUnavailable(addr.to_string()));
        }
        Ok(())
    }

    async fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        self.connections.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invoke_after_shutdown_fails() {
        let client = RemotingTokioClient::new(None);
        client.shutdown().await;
        let result = client
            .invoke(
                &CheetahString::from("127.0.0.1:1"),
                RemotingCommand::create_remoting_command(10),
                10,
            )
            .await;
        assert!(matches!(result, Err(ProxyError::Shutdown(_))));
    }

    #[tokio::test]
    async fn invoke_against_unreachable_broker_is_unavailable() {
        let client = RemotingTokioClient::new(None);
        // reserved port with nothing listening
        let result = client
            .invoke(
                &CheetahString::from("127.0.0.1:1"),
                RemotingCommand::create_remoting_command(10),
                100,
            )
            .await;
        assert!(matches!(result, Err(ProxyError::BrokerUnavailable(_))));
    }
}
