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

use std::process;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use rocketmq_proxy::command::Args;
use rocketmq_proxy::wait_for_signal;
use rocketmq_proxy::ProxyConfig;
use rocketmq_proxy::ProxyServer;
use tracing::error;
use tracing::info;

const LOGO: &str = r#"
  _____            _        _   __  __  ____        _____
 |  __ \          | |      | | |  \/  |/ __ \      |  __ \
 | |__) |___   ___| | _____| |_| \  / | |  | |_____| |__) | __ _____  ___   _
 |  _  // _ \ / __| |/ / _ \ __| |\/| | |  | |_____|  ___/ '__/ _ \ \/ / | | |
 | | \ \ (_) | (__|   <  __/ |_| |  | | |__| |     | |   | | | (_) >  <| |_| |
 |_|  \_\___/ \___|_|\_\___|\__|_|  |_|\___\_\     |_|   |_|  \___/_/\_\\__, |
                                                                         __/ |
                                                                        |___/
"#;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("{}", LOGO);

    let args = Args::parse();
    let mut config = match ProxyConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("load proxy config failed: {}", e);
            process::exit(-1);
        }
    };
    if let Some(mode) = &args.mode {
        config.proxy_mode = match mode.parse() {
            Ok(mode) => mode,
            Err(e) => {
                error!("{}", e);
                process::exit(-1);
            }
        };
    }
    if let Some(namesrv_addr) = args.namesrv_addr {
        config.namesrv_addr = namesrv_addr;
    }
    if let Some(grpc_port) = args.grpc_port {
        config.grpc_server_port = grpc_port;
    }

    let config = Arc::new(config);
    let server = if config.proxy_mode.is_cluster() {
        match ProxyServer::cluster(config.clone()) {
            Ok(server) => server,
            Err(e) => {
                error!("init proxy failed: {}", e);
                process::exit(-2);
            }
        }
    } else {
        // the embedded broker is linked by the hosting process, the
        // standalone launcher cannot supply one
        error!("LOCAL mode needs an in-process broker; embed ProxyServer::local in the broker process");
        process::exit(-2);
    };

    info!(
        "starting rocketmq proxy, mode={}, namesrv={}",
        config.proxy_mode, config.namesrv_addr
    );
    if let Err(e) = server.run(wait_for_signal()).await {
        error!("proxy server exited with error: {}", e);
        process::exit(-3);
    }
    info!("rocketmq proxy stopped");
    Ok(())
}
