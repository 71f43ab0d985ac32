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

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    author = "mxsm",
    version = "0.2.0",
    about = "RocketMQ Proxy Server(Rust)"
)]
pub struct Args {
    /// Deployment topology, LOCAL (co-located broker) or CLUSTER (remote brokers)
    #[arg(long, value_name = "MODE")]
    pub mode: Option<String>,

    /// Name server address list, eg: '192.168.0.1:9876;192.168.0.2:9876'
    #[arg(short, long, value_name = "IP", required = false)]
    pub namesrv_addr: Option<String>,

    /// Port the gRPC surface listens on
    #[arg(short, long, value_name = "PORT", required = false)]
    pub grpc_port: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mode_flag() {
        let args = Args::parse_from(["proxy-server", "--mode=CLUSTER"]);
        assert_eq!(args.mode.as_deref(), Some("CLUSTER"));
        assert!(args.namesrv_addr.is_none());
    }

    #[test]
    fn parse_overrides() {
        let args = Args::parse_from([
            "proxy-server",
            "--mode=LOCAL",
            "-n",
            "10.0.0.1:9876",
            "-g",
            "18081",
        ]);
        assert_eq!(args.mode.as_deref(), Some("LOCAL"));
        assert_eq!(args.namesrv_addr.as_deref(), Some("10.0.0.1:9876"));
        assert_eq!(args.grpc_port, Some(18081));
    }
}
