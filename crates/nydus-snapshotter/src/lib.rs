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

//! containerd proxy snapshotter daemon for nydus images.
//!
//! The daemon is started by the operator (or systemd), containerd talks to it
//! over the unix socket given by `--address`. [`run`] drives one process
//! lifetime: logger setup, argument validation, serving and turning the way
//! the service ended into an exit code.

use log::debug;

pub mod args;
pub mod config;
pub mod context;
pub mod error;
pub mod exit;
pub mod logger;
pub mod service;
pub mod signals;
pub mod snapshot;

pub use args::Args;
pub use config::Config;
pub use context::Context;
pub use error::{Error, Result};
pub use exit::{classify, ExitAction};

/// Runs the snapshotter with parsed arguments and returns the process exit code.
pub async fn run(args: Args) -> i32 {
    let ctx = Context::new();

    let logger = config::parse_log_level(&args.log_level)
        .and_then(|level| logger::init(level, args.log_to_stdout));
    if let Err(e) = logger {
        // Nothing is listening on the log facade yet.
        eprintln!("failed to prepare logger: {}", e);
        return ExitAction::LogFatalAndExitNonZero.code();
    }

    let result = launch(&ctx, &args).await;
    let action = classify(&result, log::logger());
    log::logger().flush();
    action.code()
}

async fn launch(ctx: &Context, args: &Args) -> Result<()> {
    let config = Config::validate(args)?;
    debug!("[{}] starting with {:?}", ctx.id(), config);

    let signals = signals::setup_signals()?;
    tokio::spawn(signals::handle_signals(signals, ctx.clone()));

    service::start(ctx, config).await
}
