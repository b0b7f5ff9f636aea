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

use futures::{Stream, StreamExt};
use libc::{c_int, SIGINT, SIGPIPE, SIGTERM};
use log::{debug, info};
use signal_hook_tokio::Signals;

use crate::context::Context;
use crate::error::Result;
use crate::io_error;

/// Registers the signals the daemon reacts to.
///
/// SIGPIPE is caught so a vanished peer surfaces as a write error instead of
/// killing the process.
pub fn setup_signals() -> Result<Signals> {
    Signals::new([SIGTERM, SIGINT, SIGPIPE]).map_err(io_error!(e, "register signal handlers"))
}

/// Cancels `ctx` on the first termination request.
pub async fn handle_signals<S>(signals: S, ctx: Context)
where
    S: Stream<Item = c_int> + Unpin,
{
    let mut signals = signals.fuse();
    while let Some(sig) = signals.next().await {
        match sig {
            SIGTERM | SIGINT => {
                info!("received signal {}, shutting down snapshotter", sig);
                ctx.cancel();
                return;
            }
            _ => debug!("ignoring signal {}", sig),
        }
    }
}
