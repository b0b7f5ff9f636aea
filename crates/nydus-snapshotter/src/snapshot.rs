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

//! Directory backed snapshot store served to containerd.
//!
//! Every snapshot owns `<root>/snapshots/<id>/fs`, active ones also a `work`
//! directory for overlayfs. Metadata lives in a single json file rewritten
//! after each change.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::SystemTime;

use containerd_snapshots::api::types::Mount;
use containerd_snapshots::{Info, Kind, Snapshotter, Usage};
use futures::Stream;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::{io_error, other};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum State {
    View,
    Active,
    Committed,
}

impl From<State> for Kind {
    fn from(state: State) -> Kind {
        match state {
            State::View => Kind::View,
            State::Active => Kind::Active,
            State::Committed => Kind::Committed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Record {
    id: u64,
    state: State,
    parent: String,
    #[serde(default)]
    labels: HashMap<String, String>,
    created_at: SystemTime,
    updated_at: SystemTime,
}

impl Record {
    fn info(&self, name: &str) -> Info {
        Info {
            kind: self.state.into(),
            name: name.to_string(),
            parent: self.parent.clone(),
            labels: self.labels.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Metadata {
    next_id: u64,
    snapshots: BTreeMap<String, Record>,
}

impl Metadata {
    fn get(&self, key: &str) -> Result<&Record> {
        self.snapshots
            .get(key)
            .ok_or_else(|| Error::NotFound(format!("snapshot {}", key)))
    }

    fn has_children(&self, key: &str) -> bool {
        self.snapshots.values().any(|r| r.parent == key)
    }

    /// Ids of the committed ancestors of `parent`, nearest first.
    fn lineage(&self, parent: &str) -> Result<Vec<u64>> {
        let mut ids = Vec::new();
        let mut current = parent;
        while !current.is_empty() {
            let record = self.get(current)?;
            ids.push(record.id);
            current = &record.parent;
            if ids.len() > self.snapshots.len() {
                return Err(other!("parent chain of {} has a cycle", parent));
            }
        }
        Ok(ids)
    }
}

pub type SnapshotStream = Pin<Box<dyn Stream<Item = Result<Info>> + Send + 'static>>;

/// Snapshot store rooted at [`Config::root`].
pub struct SnapshotStore {
    dir: PathBuf,
    metadata_file: PathBuf,
    metadata: Mutex<Metadata>,
}

impl SnapshotStore {
    /// Opens the store, loading metadata left by a previous run.
    ///
    /// `root` and its `snapshots` directory must already exist.
    pub async fn open(config: &Config) -> Result<SnapshotStore> {
        let metadata_file = config.metadata_file();
        let metadata = match tokio::fs::read(&metadata_file).await {
            Ok(data) => serde_json::from_slice(&data)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Metadata::default(),
            Err(e) => {
                return Err(Error::IoError {
                    context: format!("read {}", metadata_file.display()),
                    err: e,
                })
            }
        };
        info!(
            "loaded {} snapshots from {}",
            metadata.snapshots.len(),
            metadata_file.display()
        );

        Ok(SnapshotStore {
            dir: config.snapshots_dir(),
            metadata_file,
            metadata: Mutex::new(metadata),
        })
    }

    fn fs_dir(&self, id: u64) -> PathBuf {
        self.dir.join(id.to_string()).join("fs")
    }

    fn work_dir(&self, id: u64) -> PathBuf {
        self.dir.join(id.to_string()).join("work")
    }

    /// Writes `next` to disk, then makes it the live metadata.
    ///
    /// `current` is left untouched when the write fails.
    async fn publish(&self, current: &mut Metadata, next: Metadata) -> Result<()> {
        self.save(&next).await?;
        *current = next;
        Ok(())
    }

    async fn save(&self, metadata: &Metadata) -> Result<()> {
        let data = serde_json::to_vec_pretty(metadata)?;
        let tmp = self.metadata_file.with_extension("json.tmp");
        tokio::fs::write(&tmp, data)
            .await
            .map_err(io_error!(e, "write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.metadata_file)
            .await
            .map_err(io_error!(e, "rename {}", tmp.display()))?;
        Ok(())
    }

    fn mounts_for(&self, metadata: &Metadata, key: &str) -> Result<Vec<Mount>> {
        let record = metadata.get(key)?;
        let lower: Vec<PathBuf> = metadata
            .lineage(&record.parent)?
            .into_iter()
            .map(|id| self.fs_dir(id))
            .collect();

        let mount = match (record.state, lower.len()) {
            (State::Committed, _) => {
                return Err(Error::FailedPrecondition(format!(
                    "snapshot {} is committed and cannot be mounted",
                    key
                )))
            }
            (State::View, 0) => bind(&self.fs_dir(record.id), true),
            (State::View, 1) => bind(&lower[0], true),
            (State::View, _) => Mount {
                r#type: "overlay".to_string(),
                source: "overlay".to_string(),
                options: vec![format!("lowerdir={}", join_paths(&lower))],
                ..Default::default()
            },
            (State::Active, 0) => bind(&self.fs_dir(record.id), false),
            (State::Active, _) => Mount {
                r#type: "overlay".to_string(),
                source: "overlay".to_string(),
                options: vec![
                    format!("workdir={}", self.work_dir(record.id).display()),
                    format!("upperdir={}", self.fs_dir(record.id).display()),
                    format!("lowerdir={}", join_paths(&lower)),
                ],
                ..Default::default()
            },
        };
        Ok(vec![mount])
    }

    async fn create(
        &self,
        state: State,
        key: String,
        parent: String,
        labels: HashMap<String, String>,
    ) -> Result<Vec<Mount>> {
        if key.is_empty() {
            return Err(Error::InvalidArgument(String::from(
                "snapshot key cannot be empty",
            )));
        }

        let mut metadata = self.metadata.lock().await;
        if metadata.snapshots.contains_key(&key) {
            return Err(Error::AlreadyExists(format!("snapshot {}", key)));
        }
        if !parent.is_empty() && metadata.get(&parent)?.state != State::Committed {
            return Err(Error::FailedPrecondition(format!(
                "parent {} is not committed",
                parent
            )));
        }

        let id = metadata.next_id + 1;
        let fs_dir = self.fs_dir(id);
        tokio::fs::create_dir_all(&fs_dir)
            .await
            .map_err(io_error!(e, "create {}", fs_dir.display()))?;
        if state == State::Active {
            let work_dir = self.work_dir(id);
            tokio::fs::create_dir_all(&work_dir)
                .await
                .map_err(io_error!(e, "create {}", work_dir.display()))?;
        }

        let now = SystemTime::now();
        let mut next = metadata.clone();
        next.next_id = id;
        next.snapshots.insert(
            key.clone(),
            Record {
                id,
                state,
                parent,
                labels,
                created_at: now,
                updated_at: now,
            },
        );
        if let Err(e) = self.publish(&mut metadata, next).await {
            let dir = self.dir.join(id.to_string());
            if let Err(err) = tokio::fs::remove_dir_all(&dir).await {
                warn!("failed to remove {}: {}", dir.display(), err);
            }
            return Err(e);
        }

        self.mounts_for(&metadata, &key)
    }
}

#[containerd_snapshots::tonic::async_trait]
impl Snapshotter for SnapshotStore {
    type Error = Error;

    async fn stat(&self, key: String) -> Result<Info> {
        debug!("stat {}", key);
        let metadata = self.metadata.lock().await;
        Ok(metadata.get(&key)?.info(&key))
    }

    async fn update(&self, info: Info, fieldpaths: Option<Vec<String>>) -> Result<Info> {
        debug!("update {}, fieldpaths={:?}", info.name, fieldpaths);
        let mut metadata = self.metadata.lock().await;
        let mut next = metadata.clone();
        let record = next
            .snapshots
            .get_mut(&info.name)
            .ok_or_else(|| Error::NotFound(format!("snapshot {}", info.name)))?;

        apply_labels(&mut record.labels, info.labels, fieldpaths.unwrap_or_default())?;
        record.updated_at = SystemTime::now();
        let updated = record.info(&info.name);

        self.publish(&mut metadata, next).await?;
        Ok(updated)
    }

    async fn usage(&self, key: String) -> Result<Usage> {
        let dir = {
            let metadata = self.metadata.lock().await;
            self.fs_dir(metadata.get(&key)?.id)
        };

        let (size, inodes) = tokio::task::spawn_blocking(move || disk_usage(&dir))
            .await
            .map_err(|e| other!("usage task failed: {}", e))?
            .map_err(io_error!(e, "walk snapshot {}", key))?;

        Ok(Usage { size, inodes })
    }

    async fn mounts(&self, key: String) -> Result<Vec<Mount>> {
        debug!("mounts {}", key);
        let metadata = self.metadata.lock().await;
        self.mounts_for(&metadata, &key)
    }

    async fn prepare(
        &self,
        key: String,
        parent: String,
        labels: HashMap<String, String>,
    ) -> Result<Vec<Mount>> {
        info!("prepare {}, parent {:?}", key, parent);
        self.create(State::Active, key, parent, labels).await
    }

    async fn view(
        &self,
        key: String,
        parent: String,
        labels: HashMap<String, String>,
    ) -> Result<Vec<Mount>> {
        info!("view {}, parent {:?}", key, parent);
        self.create(State::View, key, parent, labels).await
    }

    async fn commit(
        &self,
        name: String,
        key: String,
        labels: HashMap<String, String>,
    ) -> Result<()> {
        info!("commit {} as {}", key, name);
        let mut metadata = self.metadata.lock().await;
        if metadata.snapshots.contains_key(&name) {
            return Err(Error::AlreadyExists(format!("snapshot {}", name)));
        }
        if metadata.get(&key)?.state != State::Active {
            return Err(Error::FailedPrecondition(format!(
                "snapshot {} is not active",
                key
            )));
        }

        let mut next = metadata.clone();
        let mut record = next
            .snapshots
            .remove(&key)
            .ok_or_else(|| Error::NotFound(format!("snapshot {}", key)))?;
        record.state = State::Committed;
        record.labels = labels;
        record.updated_at = SystemTime::now();
        let work_dir = self.work_dir(record.id);
        next.snapshots.insert(name, record);
        self.publish(&mut metadata, next).await?;

        if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
            warn!("failed to remove {}: {}", work_dir.display(), e);
        }
        Ok(())
    }

    async fn remove(&self, key: String) -> Result<()> {
        info!("remove {}", key);
        let mut metadata = self.metadata.lock().await;
        let id = metadata.get(&key)?.id;
        if metadata.has_children(&key) {
            return Err(Error::FailedPrecondition(format!(
                "snapshot {} has children",
                key
            )));
        }

        let mut next = metadata.clone();
        next.snapshots.remove(&key);
        self.publish(&mut metadata, next).await?;

        let dir = self.dir.join(id.to_string());
        tokio::fs::remove_dir_all(&dir)
            .await
            .or_else(|e| match e.kind() {
                io::ErrorKind::NotFound => Ok(()),
                _ => Err(e),
            })
            .map_err(io_error!(e, "remove {}", dir.display()))?;
        Ok(())
    }

    type InfoStream = SnapshotStream;

    async fn list(&self, snapshotter: String, filters: Vec<String>) -> Result<Self::InfoStream> {
        debug!("list {}, filters={:?}", snapshotter, filters);
        let filters = filters
            .iter()
            .map(|f| Filter::parse(f))
            .collect::<Result<Vec<_>>>()?;

        let metadata = self.metadata.lock().await;
        let infos: Vec<Result<Info>> = metadata
            .snapshots
            .iter()
            .map(|(name, record)| record.info(name))
            .filter(|info| filters.is_empty() || filters.iter().any(|f| f.matches(info)))
            .map(Ok)
            .collect();

        Ok(Box::pin(futures::stream::iter(infos)))
    }

    async fn clear(&self) -> Result<()> {
        let metadata = self.metadata.lock().await;
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(io_error!(e, "read {}", self.dir.display()))?;

        let known: Vec<String> = metadata
            .snapshots
            .values()
            .map(|r| r.id.to_string())
            .collect();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(io_error!(e, "read {}", self.dir.display()))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if known.contains(&name) {
                continue;
            }
            info!("cleanup orphan snapshot directory {}", name);
            tokio::fs::remove_dir_all(entry.path())
                .await
                .map_err(io_error!(e, "remove {}", entry.path().display()))?;
        }
        Ok(())
    }
}

/// Applies containerd's update semantics to snapshot labels.
///
/// No field paths replaces all labels, `labels` does too and `labels.<key>`
/// touches a single label. Other fields are immutable.
fn apply_labels(
    current: &mut HashMap<String, String>,
    mut requested: HashMap<String, String>,
    fieldpaths: Vec<String>,
) -> Result<()> {
    if fieldpaths.is_empty() {
        *current = requested;
        return Ok(());
    }

    for path in fieldpaths {
        if path == "labels" {
            *current = std::mem::take(&mut requested);
        } else if let Some(key) = path.strip_prefix("labels.") {
            match requested.remove(key) {
                Some(value) => current.insert(key.to_string(), value),
                None => current.remove(key),
            };
        } else {
            return Err(Error::InvalidArgument(format!(
                "cannot update {} field on snapshot",
                path
            )));
        }
    }
    Ok(())
}

/// Equality filter as sent by `ctr snapshots ls`, e.g. `kind==committed`.
#[derive(Debug, PartialEq)]
enum Filter {
    Name(String),
    Parent(String),
    Kind(Kind),
    Label(String, String),
}

impl Filter {
    fn parse(filter: &str) -> Result<Filter> {
        let (field, value) = filter
            .split_once("==")
            .ok_or_else(|| Error::InvalidArgument(format!("unsupported filter {}", filter)))?;
        let value = value.trim().trim_matches('"').to_string();

        let parsed = match field.trim() {
            "name" => Filter::Name(value),
            "parent" => Filter::Parent(value),
            "kind" => Filter::Kind(match value.as_str() {
                "view" => Kind::View,
                "active" => Kind::Active,
                "committed" => Kind::Committed,
                _ => {
                    return Err(Error::InvalidArgument(format!(
                        "unknown snapshot kind {}",
                        value
                    )))
                }
            }),
            field => match field.strip_prefix("labels.") {
                Some(key) => Filter::Label(key.trim_matches('"').to_string(), value),
                None => {
                    return Err(Error::InvalidArgument(format!(
                        "unsupported filter field {}",
                        field
                    )))
                }
            },
        };
        Ok(parsed)
    }

    fn matches(&self, info: &Info) -> bool {
        match self {
            Filter::Name(name) => &info.name == name,
            Filter::Parent(parent) => &info.parent == parent,
            Filter::Kind(kind) => &info.kind == kind,
            Filter::Label(key, value) => info.labels.get(key) == Some(value),
        }
    }
}

fn bind(source: &Path, readonly: bool) -> Mount {
    let mode = if readonly { "ro" } else { "rw" };
    Mount {
        r#type: "bind".to_string(),
        source: source.display().to_string(),
        options: vec![mode.to_string(), "rbind".to_string()],
        ..Default::default()
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(":")
}

/// Returns bytes and inodes used below `dir`, not following symlinks.
fn disk_usage(dir: &Path) -> io::Result<(i64, i64)> {
    let mut size = 0;
    let mut inodes = 1;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let md = entry.path().symlink_metadata()?;
        if md.is_dir() {
            let (s, i) = disk_usage(&entry.path())?;
            size += s;
            inodes += i;
        } else {
            size += md.len() as i64;
            inodes += 1;
        }
    }
    Ok((size, inodes))
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::args::Args;

    async fn store(root: &Path) -> SnapshotStore {
        let config = Config::validate(&Args {
            root: root.display().to_string(),
            ..Args::default()
        })
        .unwrap();
        tokio::fs::create_dir_all(config.snapshots_dir())
            .await
            .unwrap();
        SnapshotStore::open(&config).await.unwrap()
    }

    async fn stat_with_labels(store: &SnapshotStore, labels: &[(&str, &str)]) -> Info {
        stat_named(store, "key", labels).await
    }

    async fn stat_named(store: &SnapshotStore, key: &str, labels: &[(&str, &str)]) -> Info {
        let mut info = store.stat(key.into()).await.unwrap();
        info.labels = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        info
    }

    async fn names(store: &SnapshotStore, filters: Vec<String>) -> Vec<String> {
        let stream = store.list("nydus".into(), filters).await.unwrap();
        stream
            .map(|info| info.unwrap().name)
            .collect::<Vec<_>>()
            .await
    }

    #[tokio::test]
    async fn test_prepare_commit_view() {
        let tmpdir = tempfile::tempdir().unwrap();
        let store = store(tmpdir.path()).await;

        let mounts = store
            .prepare("layer-1".into(), String::new(), HashMap::new())
            .await
            .unwrap();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].r#type, "bind");
        assert!(mounts[0].options.contains(&"rw".to_string()));

        store
            .commit("sha256:1".into(), "layer-1".into(), HashMap::new())
            .await
            .unwrap();
        assert!(matches!(
            store.stat("layer-1".into()).await,
            Err(Error::NotFound(_))
        ));
        let info = store.stat("sha256:1".into()).await.unwrap();
        assert_eq!(info.kind, Kind::Committed);
        assert!(matches!(
            store.mounts("sha256:1".into()).await,
            Err(Error::FailedPrecondition(_))
        ));

        let mounts = store
            .prepare("container".into(), "sha256:1".into(), HashMap::new())
            .await
            .unwrap();
        assert_eq!(mounts[0].r#type, "overlay");
        assert!(mounts[0]
            .options
            .iter()
            .any(|o| o.starts_with("lowerdir=") && o.ends_with("/1/fs")));

        let mounts = store
            .view("ro".into(), "sha256:1".into(), HashMap::new())
            .await
            .unwrap();
        assert_eq!(mounts[0].r#type, "bind");
        assert!(mounts[0].options.contains(&"ro".to_string()));

        assert!(matches!(
            store
                .prepare("other".into(), "container".into(), HashMap::new())
                .await,
            Err(Error::FailedPrecondition(_))
        ));
        assert!(matches!(
            store
                .commit("sha256:2".into(), "ro".into(), HashMap::new())
                .await,
            Err(Error::FailedPrecondition(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_save_keeps_metadata() {
        let tmpdir = tempfile::tempdir().unwrap();
        let store = store(tmpdir.path()).await;

        store
            .prepare("a".into(), String::new(), HashMap::new())
            .await
            .unwrap();
        store
            .commit("base".into(), "a".into(), HashMap::new())
            .await
            .unwrap();

        // A directory in place of the temp file makes every metadata write fail.
        let blocker = tmpdir.path().join("metadata.json.tmp");
        std::fs::create_dir(&blocker).unwrap();

        assert!(matches!(
            store
                .prepare("b".into(), String::new(), HashMap::new())
                .await,
            Err(Error::IoError { .. })
        ));
        assert!(matches!(
            store.stat("b".into()).await,
            Err(Error::NotFound(_))
        ));
        assert!(!tmpdir.path().join("snapshots/2").exists());

        assert!(store.remove("base".into()).await.is_err());
        assert_eq!(store.stat("base".into()).await.unwrap().kind, Kind::Committed);

        let info = stat_named(&store, "base", &[("x", "1")]).await;
        assert!(store.update(info, None).await.is_err());
        assert!(store.stat("base".into()).await.unwrap().labels.is_empty());

        std::fs::remove_dir(&blocker).unwrap();
        store
            .prepare("b".into(), String::new(), HashMap::new())
            .await
            .unwrap();
        assert_eq!(names(&store, vec![]).await, vec!["b", "base"]);
    }

    #[tokio::test]
    async fn test_remove() {
        let tmpdir = tempfile::tempdir().unwrap();
        let store = store(tmpdir.path()).await;

        store
            .prepare("a".into(), String::new(), HashMap::new())
            .await
            .unwrap();
        store
            .commit("base".into(), "a".into(), HashMap::new())
            .await
            .unwrap();
        store
            .prepare("child".into(), "base".into(), HashMap::new())
            .await
            .unwrap();

        assert!(matches!(
            store.remove("base".into()).await,
            Err(Error::FailedPrecondition(_))
        ));
        store.remove("child".into()).await.unwrap();
        store.remove("base".into()).await.unwrap();
        assert!(matches!(
            store.remove("base".into()).await,
            Err(Error::NotFound(_))
        ));
        assert!(!tmpdir.path().join("snapshots/1").exists());
    }

    #[tokio::test]
    async fn test_duplicate_key() {
        let tmpdir = tempfile::tempdir().unwrap();
        let store = store(tmpdir.path()).await;

        store
            .prepare("a".into(), String::new(), HashMap::new())
            .await
            .unwrap();
        assert!(matches!(
            store
                .prepare("a".into(), String::new(), HashMap::new())
                .await,
            Err(Error::AlreadyExists(_))
        ));
        assert!(matches!(
            store
                .prepare("b".into(), "missing".into(), HashMap::new())
                .await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_usage() {
        let tmpdir = tempfile::tempdir().unwrap();
        let store = store(tmpdir.path()).await;

        store
            .prepare("a".into(), String::new(), HashMap::new())
            .await
            .unwrap();
        let fs_dir = tmpdir.path().join("snapshots/1/fs");
        std::fs::write(fs_dir.join("file"), b"hello").unwrap();
        std::fs::create_dir(fs_dir.join("dir")).unwrap();

        let usage = store.usage("a".into()).await.unwrap();
        assert_eq!(usage.size, 5);
        assert_eq!(usage.inodes, 3);
    }

    #[tokio::test]
    async fn test_update_labels() {
        let tmpdir = tempfile::tempdir().unwrap();
        let store = store(tmpdir.path()).await;

        let labels = HashMap::from([("a".to_string(), "1".to_string())]);
        store
            .prepare("key".into(), String::new(), labels)
            .await
            .unwrap();

        let info = stat_with_labels(&store, &[("b", "2")]).await;
        let updated = store
            .update(info, Some(vec!["labels.b".to_string()]))
            .await
            .unwrap();
        assert_eq!(updated.labels.len(), 2);

        let info = stat_with_labels(&store, &[("b", "2")]).await;
        let updated = store
            .update(info, Some(vec!["labels.a".to_string()]))
            .await
            .unwrap();
        assert_eq!(
            updated.labels,
            HashMap::from([("b".to_string(), "2".to_string())])
        );

        let info = stat_with_labels(&store, &[]).await;
        assert!(matches!(
            store.update(info, Some(vec!["parent".to_string()])).await,
            Err(Error::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_list_and_reload() {
        let tmpdir = tempfile::tempdir().unwrap();
        {
            let store = store(tmpdir.path()).await;
            store
                .prepare("a".into(), String::new(), HashMap::new())
                .await
                .unwrap();
            store
                .commit("base".into(), "a".into(), HashMap::new())
                .await
                .unwrap();
            store
                .view("v".into(), "base".into(), HashMap::new())
                .await
                .unwrap();
        }

        let store = store(tmpdir.path()).await;
        assert_eq!(names(&store, vec![]).await, vec!["base", "v"]);
        assert_eq!(
            names(&store, vec!["kind==committed".into()]).await,
            vec!["base"]
        );
        assert_eq!(names(&store, vec!["parent==base".into()]).await, vec!["v"]);
        assert!(matches!(
            store.list("nydus".into(), vec!["size>1".into()]).await,
            Err(Error::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_orphans() {
        let tmpdir = tempfile::tempdir().unwrap();
        let store = store(tmpdir.path()).await;

        store
            .prepare("a".into(), String::new(), HashMap::new())
            .await
            .unwrap();
        let orphan = tmpdir.path().join("snapshots/42/fs");
        std::fs::create_dir_all(&orphan).unwrap();

        store.clear().await.unwrap();
        assert!(!tmpdir.path().join("snapshots/42").exists());
        assert!(tmpdir.path().join("snapshots/1/fs").exists());
    }

    #[test]
    fn test_filter_parse() {
        assert_eq!(
            Filter::parse("labels.\"containerd.io/gc.root\"==true").unwrap(),
            Filter::Label("containerd.io/gc.root".into(), "true".into())
        );
        assert_eq!(
            Filter::parse("name==\"sha256:1\"").unwrap(),
            Filter::Name("sha256:1".into())
        );
        assert!(Filter::parse("kind==unknown").is_err());
    }
}
