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

use containerd_snapshots::tonic::{self, Status};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Invalid command line arguments.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to set logger: {0}")]
    Setup(#[from] log::SetLoggerError),

    /// containerd hung up on the snapshots service.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    #[error("failed to serve snapshots api: {0}")]
    Serve(#[from] tonic::transport::Error),

    #[error("{context} error: {err}")]
    IoError {
        context: String,
        #[source]
        err: std::io::Error,
    },

    #[error("failed to convert json object: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("failed pre condition: {0}")]
    FailedPrecondition(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn is_connection_closed(&self) -> bool {
        matches!(self, Error::ConnectionClosed(_))
    }
}

impl From<Error> for Status {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidArgument(ref s) => Status::invalid_argument(s),
            Error::NotFound(ref s) => Status::not_found(s),
            Error::AlreadyExists(ref s) => Status::already_exists(s),
            Error::FailedPrecondition(ref s) => Status::failed_precondition(s),
            _ => Status::internal(e.to_string()),
        }
    }
}

#[macro_export]
macro_rules! io_error {
    ($e:ident, $($args:tt)+) => {
        |$e| $crate::error::Error::IoError {
            context: format_args!($($args)+).to_string(),
            err: $e,
        }
    };
}

#[macro_export]
macro_rules! other {
    ($($args:tt)*) => {
        $crate::error::Error::Other(format_args!($($args)*).to_string())
    };
}
