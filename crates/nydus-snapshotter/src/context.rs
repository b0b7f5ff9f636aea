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

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Cancellation {
    notify: Notify,
    done: AtomicBool,
}

/// Execution context for one run of the snapshotter service.
///
/// Carries the cancellation capability and an id stamped on the service's
/// log lines. Clones share the same cancellation state.
#[derive(Debug, Clone)]
pub struct Context {
    id: Uuid,
    cancellation: Arc<Cancellation>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Creates an independent context; cancelling it affects no other context.
    pub fn new() -> Context {
        Context {
            id: Uuid::new_v4(),
            cancellation: Arc::default(),
        }
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    /// Marks the context cancelled and wakes everything in [`Context::cancelled`].
    pub fn cancel(&self) {
        self.cancellation.done.store(true, Ordering::SeqCst);
        self.cancellation.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.done.load(Ordering::SeqCst)
    }

    /// Resolves once [`Context::cancel`] is called, right away if it already was.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent cancel is not missed.
            let notified = self.cancellation.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
