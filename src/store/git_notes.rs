//! Record storage on a git notes ref.
//!
//! Every record is a JSON blob in a flat tree whose entry names are key
//! digests; every write commits a new tree onto the notes ref, parented on
//! the previous tip. The current tree is re-read on each write, so records
//! added by other writers between calls are carried forward.

use std::collections::BTreeSet;
use std::path::PathBuf;

use gix::ObjectId;
use gix::objs::tree::{Entry, EntryKind};

use super::{KvStore, StoreError};
use crate::digest::blob_digest;

/// Default ref the mirror's records live under.
pub const DEFAULT_NOTES_REF: &str = "refs/notes/mail-to-pr";

const COMMITTER_NAME: &str = "inbox-mirror";
const COMMITTER_EMAIL: &str = "inbox-mirror@localhost";

pub struct GitNotesStore {
    repo_path: PathBuf,
    notes_ref: String,
}

impl GitNotesStore {
    pub fn new(repo_path: impl Into<PathBuf>, notes_ref: impl Into<String>) -> Self {
        Self {
            repo_path: repo_path.into(),
            notes_ref: notes_ref.into(),
        }
    }

    fn open(&self) -> Result<gix::Repository, StoreError> {
        gix::open(&self.repo_path)
            .map_err(|e| StoreError::Backend(format!("failed to open repository: {}", e)))
    }

    /// Current tree entries and tip of the notes ref, empty when the ref
    /// does not exist yet.
    fn load_entries(
        &self,
        repo: &gix::Repository,
    ) -> Result<(Vec<Entry>, Option<ObjectId>), StoreError> {
        let reference = repo
            .try_find_reference(&self.notes_ref)
            .map_err(|e| StoreError::Backend(format!("failed to look up ref: {}", e)))?;

        let Some(reference) = reference else {
            return Ok((Vec::new(), None));
        };

        let tip = reference
            .target()
            .try_id()
            .ok_or_else(|| {
                StoreError::Backend(format!("{} is not a direct reference", self.notes_ref))
            })?
            .to_owned();

        let commit = repo
            .find_object(tip)
            .map_err(|e| StoreError::Backend(format!("failed to find commit: {}", e)))?
            .try_into_commit()
            .map_err(|e| StoreError::Backend(format!("ref target is not a commit: {}", e)))?;

        let tree = commit
            .tree()
            .map_err(|e| StoreError::Backend(format!("failed to get tree: {}", e)))?;

        let mut entries = Vec::new();
        for entry in tree.iter() {
            let entry =
                entry.map_err(|e| StoreError::Backend(format!("failed to iterate tree: {}", e)))?;
            entries.push(Entry {
                mode: entry.mode(),
                filename: entry.filename().to_owned(),
                oid: entry.id().detach(),
            });
        }

        Ok((entries, Some(tip)))
    }

    fn signature() -> gix::actor::Signature {
        let seconds = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        gix::actor::Signature {
            name: COMMITTER_NAME.into(),
            email: COMMITTER_EMAIL.into(),
            time: gix::date::Time::new(seconds, 0),
        }
    }
}

impl KvStore for GitNotesStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        let repo = self.open()?;
        let (entries, _) = self.load_entries(&repo)?;

        let digest = blob_digest(key);
        let Some(entry) = entries.iter().find(|e| e.filename == digest.as_str()) else {
            return Ok(None);
        };

        let blob = repo
            .find_object(entry.oid)
            .map_err(|e| StoreError::Backend(format!("failed to find record blob: {}", e)))?
            .try_into_blob()
            .map_err(|e| StoreError::Backend(format!("record is not a blob: {}", e)))?;

        Ok(Some(String::from_utf8_lossy(&blob.data).into_owned()))
    }

    fn set_raw(&self, key: &str, json: &str) -> Result<(), StoreError> {
        let repo = self.open()?;
        let (mut entries, parent) = self.load_entries(&repo)?;

        let blob_id = repo
            .write_blob(json.as_bytes())
            .map_err(|e| StoreError::Backend(format!("failed to write record blob: {}", e)))?
            .detach();

        let digest = blob_digest(key);
        entries.retain(|e| e.filename != digest.as_str());
        entries.push(Entry {
            mode: EntryKind::Blob.into(),
            filename: digest.clone().into(),
            oid: blob_id,
        });
        entries.sort();

        let tree_id = repo
            .write_object(gix::objs::Tree { entries })
            .map_err(|e| StoreError::Backend(format!("failed to write tree: {}", e)))?
            .detach();

        let signature = Self::signature();
        let commit = gix::objs::Commit {
            tree: tree_id,
            parents: parent.into_iter().collect(),
            author: signature.clone(),
            committer: signature,
            encoding: None,
            message: format!("update {}\n", digest).into(),
            extra_headers: Vec::new(),
        };

        let commit_id = repo
            .write_object(commit)
            .map_err(|e| StoreError::Backend(format!("failed to write commit: {}", e)))?
            .detach();

        repo.reference(
            self.notes_ref.as_str(),
            commit_id,
            gix::refs::transaction::PreviousValue::Any,
            format!("store: update {}", digest),
        )
        .map_err(|e| StoreError::Backend(format!("failed to move {}: {}", self.notes_ref, e)))?;

        log::trace!("stored {} at {}", digest, commit_id);
        Ok(())
    }

    fn list_digests(&self) -> Result<BTreeSet<String>, StoreError> {
        let repo = self.open()?;
        let (entries, _) = self.load_entries(&repo)?;

        Ok(entries
            .iter()
            .filter(|e| e.mode.is_blob())
            .map(|e| e.filename.to_string())
            .collect())
    }
}
