//! gix-backed archive reader over a local mirror.

use std::collections::{BTreeSet, VecDeque};
use std::path::PathBuf;

use gix::ObjectId;

use super::{Archive, ArchiveError, DiffLines, RevRange};

/// Reads a local mirror of the archive repository.
///
/// The repository is opened per operation; no handle is kept across calls.
/// Tree comparison works on top-level entry names, which matches the flat
/// one-file-per-message layout the archive uses.
pub struct GitArchive {
    repo_path: PathBuf,
}

impl GitArchive {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    fn open(&self) -> Result<gix::Repository, ArchiveError> {
        Ok(gix::open(&self.repo_path)?)
    }
}

impl Archive for GitArchive {
    fn resolve_head(&self, branch: &str) -> Result<String, ArchiveError> {
        let repo = self.open()?;

        let reference = repo
            .find_reference(branch)
            .map_err(|_| ArchiveError::UnresolvedBranch(branch.to_string()))?;

        let target_ref = reference.target();
        let target = target_ref
            .try_id()
            .ok_or_else(|| ArchiveError::UnresolvedBranch(branch.to_string()))?;

        Ok(target.to_hex().to_string())
    }

    fn stream_diff(&self, range: &RevRange) -> Result<DiffLines<'_>, ArchiveError> {
        let repo = self.open()?;

        let to_oid = ObjectId::from_hex(range.to.as_bytes())
            .map_err(|e| ArchiveError::Other(format!("invalid revision `{}`: {}", range.to, e)))?;

        let commit = repo
            .find_object(to_oid)
            .map_err(|e| ArchiveError::Other(format!("failed to find revision: {}", e)))?
            .try_into_commit()
            .map_err(|e| ArchiveError::Other(format!("revision is not a commit: {}", e)))?;

        // Walk ancestry back to the cursor, then reverse so the stream runs
        // oldest to newest.
        let mut new_commits = Vec::new();
        let ancestors = commit
            .ancestors()
            .all()
            .map_err(|e| ArchiveError::Other(format!("failed to walk history: {}", e)))?;

        for info in ancestors {
            let info =
                info.map_err(|e| ArchiveError::Other(format!("failed to read ancestor: {}", e)))?;
            let hex = info.id.to_hex().to_string();
            if hex == range.from {
                break;
            }
            new_commits.push(hex);
        }
        new_commits.reverse();
        drop(commit);

        log::debug!("streaming {} new commits", new_commits.len());

        Ok(Box::new(DiffStream {
            repo,
            commits: new_commits.into_iter(),
            pending: VecDeque::new(),
        }))
    }
}

/// Lazily emits synthetic unified-diff lines, one commit at a time, so peak
/// memory stays bounded by a single message body.
struct DiffStream {
    repo: gix::Repository,
    commits: std::vec::IntoIter<String>,
    pending: VecDeque<String>,
}

impl Iterator for DiffStream {
    type Item = Result<String, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Some(Ok(line));
            }
            let commit = self.commits.next()?;
            if let Err(e) = emit_added_files(&self.repo, &commit, &mut self.pending) {
                return Some(Err(e));
            }
        }
    }
}

/// Push a diff fragment for every file the commit adds relative to its first
/// parent: `diff --git` header, hunk header with the added-line count, then
/// the blob content with `+` markers.
fn emit_added_files(
    repo: &gix::Repository,
    commit_hex: &str,
    out: &mut VecDeque<String>,
) -> Result<(), ArchiveError> {
    let oid = ObjectId::from_hex(commit_hex.as_bytes())
        .map_err(|e| ArchiveError::Other(format!("invalid commit hash: {}", e)))?;

    let commit = repo
        .find_object(oid)
        .map_err(|e| ArchiveError::Other(format!("failed to find commit: {}", e)))?
        .try_into_commit()
        .map_err(|e| ArchiveError::Other(format!("object is not a commit: {}", e)))?;

    let tree = commit
        .tree()
        .map_err(|e| ArchiveError::Other(format!("failed to get tree: {}", e)))?;

    let mut parent_names = BTreeSet::new();
    if let Some(parent_id) = commit.parent_ids().next() {
        let parent_tree = repo
            .find_object(parent_id)
            .map_err(|e| ArchiveError::Other(format!("failed to find parent: {}", e)))?
            .try_into_commit()
            .map_err(|e| ArchiveError::Other(format!("parent is not a commit: {}", e)))?
            .tree()
            .map_err(|e| ArchiveError::Other(format!("failed to get parent tree: {}", e)))?;

        for entry in parent_tree.iter() {
            let entry = entry
                .map_err(|e| ArchiveError::Other(format!("failed to iterate tree: {}", e)))?;
            parent_names.insert(entry.filename().to_string());
        }
    }

    for entry in tree.iter() {
        let entry =
            entry.map_err(|e| ArchiveError::Other(format!("failed to iterate tree: {}", e)))?;
        if !entry.mode().is_blob() {
            continue;
        }
        let name = entry.filename().to_string();
        if parent_names.contains(&name) {
            continue;
        }

        let blob = entry
            .object()
            .map_err(|e| ArchiveError::Other(format!("failed to get object: {}", e)))?
            .try_into_blob()
            .map_err(|e| ArchiveError::Other(format!("object is not a blob: {}", e)))?;

        let text = String::from_utf8_lossy(&blob.data).into_owned();
        let mut lines: Vec<&str> = text.split('\n').collect();
        if lines.last() == Some(&"") {
            lines.pop();
        }

        out.push_back(format!("diff --git a/{} b/{}", name, name));
        out.push_back("new file mode 100644".to_string());
        if !lines.is_empty() {
            out.push_back(format!("@@ -0,0 +1,{} @@", lines.len()));
            for line in lines {
                out.push_back(format!("+{}", line));
            }
        }
    }

    Ok(())
}
