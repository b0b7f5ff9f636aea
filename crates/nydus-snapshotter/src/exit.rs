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

//! Turns the way the service ended into a process exit.

use log::{Level, Log, Record};

use crate::error::{Error, Result};

/// What the process does once the snapshotter service has returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitAction {
    /// The service was asked to stop and did.
    ExitClean,
    /// containerd closed the connection, expected during its own shutdown.
    LogInfoAndExitClean,
    /// Anything else went wrong.
    LogFatalAndExitNonZero,
}

impl ExitAction {
    pub fn code(&self) -> i32 {
        match self {
            ExitAction::ExitClean | ExitAction::LogInfoAndExitClean => 0,
            ExitAction::LogFatalAndExitNonZero => 1,
        }
    }
}

/// Classifies the service result, writing the matching line to `logger`.
///
/// At most one record is emitted.
pub fn classify(result: &Result<()>, logger: &dyn Log) -> ExitAction {
    match result {
        Ok(()) => ExitAction::ExitClean,
        Err(Error::ConnectionClosed(_)) => {
            logger.log(
                &Record::builder()
                    .level(Level::Info)
                    .target(module_path!())
                    .args(format_args!("snapshotter exited"))
                    .build(),
            );
            ExitAction::LogInfoAndExitClean
        }
        Err(err) => {
            logger.log(
                &Record::builder()
                    .level(Level::Error)
                    .target(module_path!())
                    .args(format_args!("failed to start nydus snapshotter: {}", err))
                    .build(),
            );
            ExitAction::LogFatalAndExitNonZero
        }
    }
}
