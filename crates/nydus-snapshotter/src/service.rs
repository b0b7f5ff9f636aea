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

//! Runs the snapshots api until containerd or the operator stops it.

use std::error::Error as StdError;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;
use std::sync::Arc;

use containerd_snapshots::tonic::transport::Server;
use log::{info, warn};
use tokio::net::UnixListener;
use tokio_stream::wrappers::UnixListenerStream;

use crate::config::Config;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::snapshot::SnapshotStore;
use crate::{io_error, other};

/// Starts the snapshotter and blocks until it terminates.
///
/// Cancelling `ctx` shuts the server down gracefully and yields `Ok(())`.
/// A transport failure caused by the peer going away is reported as
/// [`Error::ConnectionClosed`].
pub async fn start(ctx: &Context, config: Config) -> Result<()> {
    prepare(&config).await?;

    let store = SnapshotStore::open(&config).await?;
    let listener = UnixListener::bind(&config.address).map_err(io_error!(
        e,
        "failed to listen on {}",
        config.address.display()
    ))?;
    info!(
        "[{}] snapshotter serving on {}, root {}",
        ctx.id(),
        config.address.display(),
        config.root.display()
    );

    let incoming = UnixListenerStream::new(listener);
    let result = Server::builder()
        .add_service(containerd_snapshots::server(Arc::new(store)))
        .serve_with_incoming_shutdown(incoming, ctx.cancelled())
        .await;

    remove_socket_silently(&config.address).await;

    match result {
        Ok(()) => {
            info!("[{}] snapshotter stopped", ctx.id());
            Ok(())
        }
        Err(e) if is_connection_closed(&e) => Err(Error::ConnectionClosed(e.to_string())),
        Err(e) => Err(Error::Serve(e)),
    }
}

/// Startup checks the argument validation leaves to the service.
async fn prepare(config: &Config) -> Result<()> {
    let snapshots = config.snapshots_dir();
    tokio::fs::create_dir_all(&snapshots)
        .await
        .map_err(io_error!(e, "failed to create {}", snapshots.display()))?;

    if let Some(parent) = config.address.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(io_error!(e, "failed to create {}", parent.display()))?;
    }

    remove_socket(&config.address).await
}

async fn remove_socket_silently(address: &Path) {
    remove_socket(address)
        .await
        .unwrap_or_else(|e| warn!("failed to remove socket: {}", e))
}

/// Removes a socket left at `address`, refusing to touch any other file type.
async fn remove_socket(address: &Path) -> Result<()> {
    match tokio::fs::symlink_metadata(address).await {
        Ok(md) if md.file_type().is_socket() => {
            tokio::fs::remove_file(address).await.map_err(io_error!(
                e,
                "failed to remove socket {}",
                address.display()
            ))
        }
        Ok(_) => Err(other!(
            "{} exists and is not a socket",
            address.display()
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::IoError {
            context: format!("failed to stat {}", address.display()),
            err: e,
        }),
    }
}

/// Reports whether an io error somewhere in the chain means the peer hung up.
pub fn is_connection_closed(err: &(dyn StdError + 'static)) -> bool {
    let mut source = Some(err);
    while let Some(e) = source {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::NotConnected
                    | io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        source = e.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::args::Args;

    fn config(root: &Path) -> Config {
        Config::validate(&Args {
            address: root.join("run/nydus.sock").display().to_string(),
            root: root.join("root").display().to_string(),
            ..Args::default()
        })
        .unwrap()
    }

    async fn wait_for(path: &PathBuf) {
        for _ in 0..500 {
            if path.exists() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{} never appeared", path.display());
    }

    #[tokio::test]
    async fn test_start_and_cancel() {
        let tmpdir = tempfile::tempdir().unwrap();
        let config = config(tmpdir.path());
        let address = config.address.clone();

        let ctx = Context::new();
        let cloned = ctx.clone();
        let handle = tokio::spawn(async move { start(&cloned, config).await });

        wait_for(&address).await;
        drop(tokio::net::UnixStream::connect(&address).await.unwrap());
        assert!(tmpdir.path().join("root/snapshots").is_dir());

        ctx.cancel();
        let result = tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .expect("service should stop once cancelled")
            .unwrap();
        assert!(result.is_ok(), "{:?}", result);
        assert!(!address.exists());
    }

    #[tokio::test]
    async fn test_stale_socket_removed() {
        let tmpdir = tempfile::tempdir().unwrap();
        let config = config(tmpdir.path());
        std::fs::create_dir_all(config.address.parent().unwrap()).unwrap();
        let _stale = std::os::unix::net::UnixListener::bind(&config.address).unwrap();

        prepare(&config).await.unwrap();
        assert!(!config.address.exists());
    }

    #[tokio::test]
    async fn test_address_not_a_socket() {
        let tmpdir = tempfile::tempdir().unwrap();
        let config = config(tmpdir.path());
        std::fs::create_dir_all(config.address.parent().unwrap()).unwrap();
        std::fs::write(&config.address, "test").unwrap();

        let ctx = Context::new();
        let err = start(&ctx, config.clone()).await.unwrap_err();
        assert!(!err.is_connection_closed());
        assert_eq!(std::fs::read_to_string(&config.address).unwrap(), "test");
    }

    #[test]
    fn test_connection_closed_chain() {
        let err = io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe");
        assert!(is_connection_closed(&err));

        let err = Error::IoError {
            context: "accept".into(),
            err: io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"),
        };
        assert!(is_connection_closed(&err));

        let err = Error::IoError {
            context: "accept".into(),
            err: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(!is_connection_closed(&err));
        assert!(!is_connection_closed(&other!("boom")));
    }
}
