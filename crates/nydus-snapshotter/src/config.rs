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

//! Validated daemon configuration.

use std::path::{Path, PathBuf};

use log::LevelFilter;

use crate::args::Args;
use crate::error::{Error, Result};

/// `sun_path` is 108 bytes on Linux, one of which is the terminating NUL.
pub const MAX_SOCKET_PATH_LEN: usize = 107;

/// Configuration the snapshotter service runs with.
///
/// Only [`Config::validate`] constructs it, so holders never need to check it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Unix socket to serve the snapshots API on.
    pub address: PathBuf,
    /// Directory for snapshot metadata and contents.
    pub root: PathBuf,
    pub log_level: LevelFilter,
    pub log_to_stdout: bool,
}

impl Config {
    /// Checks raw arguments and builds the configuration from them.
    ///
    /// Syntactic checks only; whether `root` is writable or `address` can be
    /// bound is found out when the service starts.
    pub fn validate(args: &Args) -> Result<Config> {
        let address = absolute_path("address", &args.address)?;
        let root = absolute_path("root", &args.root)?;

        if address.as_os_str().len() > MAX_SOCKET_PATH_LEN {
            return Err(Error::InvalidArgument(format!(
                "address {} is longer than {} bytes",
                args.address, MAX_SOCKET_PATH_LEN
            )));
        }

        if normalize(&address) == normalize(&root) {
            return Err(Error::InvalidArgument(format!(
                "address and root cannot both be {}",
                args.root
            )));
        }

        Ok(Config {
            address,
            root,
            log_level: parse_log_level(&args.log_level)?,
            log_to_stdout: args.log_to_stdout,
        })
    }

    /// Directory holding one sub directory per snapshot.
    pub fn snapshots_dir(&self) -> PathBuf {
        self.root.join("snapshots")
    }

    pub fn metadata_file(&self) -> PathBuf {
        self.root.join("metadata.json")
    }
}

/// Maps a level name to a filter, accepting any case and `warning` for `warn`.
pub fn parse_log_level(level: &str) -> Result<LevelFilter> {
    let filter = match level.to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" | "warning" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "" => {
            return Err(Error::InvalidArgument(String::from(
                "log level cannot be empty",
            )))
        }
        _ => {
            return Err(Error::InvalidArgument(format!(
                "unknown log level {}",
                level
            )))
        }
    };
    Ok(filter)
}

fn absolute_path(name: &str, value: &str) -> Result<PathBuf> {
    if value.is_empty() {
        return Err(Error::InvalidArgument(format!("{} cannot be empty", name)));
    }
    if value.contains('\0') {
        return Err(Error::InvalidArgument(format!(
            "{} contains a NUL byte",
            name
        )));
    }
    let path = PathBuf::from(value);
    if !path.is_absolute() {
        return Err(Error::InvalidArgument(format!(
            "{} must be an absolute path, got {}",
            name, value
        )));
    }
    Ok(path)
}

// Lexical only, symlinks are not resolved.
fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}
