/*
   Copyright The containerd Authors.

   Licensed under the Apache License, Version 2.0 (the "License");
   you may not use this file except in compliance with the License.
   You may obtain a copy of the License at

       http://www.apache.org/licenses/LICENSE-2.0

   Unless required by applicable law or agreed to in writing, software
   distributed under the License is distributed on an "AS IS" BASIS,
   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
   See the License for the specific language governing permissions and
   limitations under the License.
*/

use std::ffi::OsString;

use clap::Parser;

use crate::error::{Error, Result};

pub const DEFAULT_ADDRESS: &str = "/run/containerd-nydus-grpc/containerd-nydus-grpc.sock";
pub const DEFAULT_ROOT: &str = "/var/lib/containerd-nydus-grpc";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Flags accepted by the snapshotter daemon.
///
/// Values are kept raw here, [`crate::config::Config::validate`] turns them into
/// something the service can trust.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "containerd-nydus-grpc",
    about = "nydus containerd proxy snapshotter plugin",
    version
)]
pub struct Args {
    /// Unix socket address containerd connects to.
    #[arg(long, default_value = DEFAULT_ADDRESS)]
    pub address: String,

    /// Directory holding snapshot metadata and layer contents.
    #[arg(long, default_value = DEFAULT_ROOT)]
    pub root: String,

    /// Logging level: trace, debug, info, warn or error.
    #[arg(long, default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// Print logs to stdout instead of stderr.
    #[arg(long)]
    pub log_to_stdout: bool,
}

impl Default for Args {
    fn default() -> Self {
        Args {
            address: DEFAULT_ADDRESS.to_string(),
            root: DEFAULT_ROOT.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_to_stdout: false,
        }
    }
}

/// Parses command line arguments, the first item being the binary name.
///
/// `--help` and `--version` surface as errors from clap; callers are expected
/// to let clap print them via [`parse_or_exit`].
pub fn parse<I, T>(args: I) -> Result<Args>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Args::try_parse_from(args).map_err(|e| Error::InvalidArgument(e.to_string()))
}

/// Parses the process arguments, printing usage and exiting on failure.
pub fn parse_or_exit() -> Args {
    Args::parse()
}
