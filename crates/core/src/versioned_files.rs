//! Versioned file operations with Git-based version control.
//!
//! Every patient and doctor record is a directory with its own local Git repository
//! (`git2`/libgit2). Each write to a record is exactly one commit, so the repository history is
//! the audit trail of the record: nothing is ever amended or deleted.
//!
//! ## Commit messages
//!
//! Messages are structured labels rather than prose:
//!
//! ```text
//! diagnosis:append: Diagnosis entry recorded
//!
//! Case-Id: DX-1
//! Doctor-Id: 3f2a...
//! Patient-Id: 9c41...
//! ```
//!
//! Clinical text (symptoms, assessments, prescriptions) never appears in a commit message.
//!
//! ## Branch policy
//!
//! All record repositories use `refs/heads/main`.

use crate::error::{RecordError, RecordResult};
use dxr_types::NonEmptyText;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

const MAIN_REF: &str = "refs/heads/main";

const REGISTRATION_AUTHOR_NAME: &str = "DXR Registration";

/// Identity written as the Git author and committer of a record change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CommitAuthor {
    name: String,
    email: String,
}

impl CommitAuthor {
    /// Author used for registration commits (new patient or doctor records).
    pub(crate) fn registration(namespace: &str) -> Self {
        Self {
            name: REGISTRATION_AUTHOR_NAME.to_string(),
            email: format!("registration@{namespace}"),
        }
    }

    /// Author for a change made by a registered doctor.
    pub(crate) fn doctor(name: &NonEmptyText, doctor_id: impl fmt::Display, namespace: &str) -> Self {
        Self {
            name: name.as_str().to_string(),
            email: format!("{doctor_id}@{namespace}"),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn email(&self) -> &str {
        &self.email
    }
}

/// Record kind a commit touches.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub(crate) enum CommitDomain {
    Patient,
    Doctor,
    Diagnosis,
}

impl CommitDomain {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Doctor => "doctor",
            Self::Diagnosis => "diagnosis",
        }
    }
}

impl fmt::Display for CommitDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Controlled vocabulary for commit actions.
///
/// Records are append-only: `Create` starts a record, `Append` adds to it. There is no update or
/// delete action.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub(crate) enum CommitAction {
    Create,
    Append,
}

impl CommitAction {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Append => "append",
        }
    }
}

impl fmt::Display for CommitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Make free-form text safe for a single-line trailer value.
///
/// Control characters become their escaped form (`\n`, `\u{1b}`), so distinct values stay
/// distinct in the history.
pub(crate) fn escape_control_chars(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_control() {
            escaped.extend(c.escape_default());
        } else {
            escaped.push(c);
        }
    }
    escaped
}

/// A single commit trailer line, rendered as `Key: Value`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub(crate) struct CommitTrailer {
    key: String,
    value: String,
}

impl CommitTrailer {
    /// # Errors
    ///
    /// Returns `RecordError::InvalidInput` if key or value is empty or multi-line, or if the key
    /// contains ':'.
    pub(crate) fn new(key: impl Into<String>, value: impl Into<String>) -> RecordResult<Self> {
        let key = key.into().trim().to_string();
        let value = value.into().trim().to_string();

        if key.is_empty()
            || key.contains(['\n', '\r'])
            || key.contains(':')
            || value.is_empty()
            || value.contains(['\n', '\r'])
        {
            return Err(RecordError::InvalidInput(
                "commit trailer key/value must be non-empty and single-line (key cannot contain ':')".into()
            ));
        }

        Ok(Self { key, value })
    }
}

/// A structured, predictable commit message.
///
/// Subject line `<domain>:<action>: <summary>`, then a blank line and trailers sorted by key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct CommitMessage {
    domain: CommitDomain,
    action: CommitAction,
    summary: NonEmptyText,
    trailers: Vec<CommitTrailer>,
}

impl CommitMessage {
    pub(crate) fn new(
        domain: CommitDomain,
        action: CommitAction,
        summary: impl AsRef<str>,
    ) -> RecordResult<Self> {
        let summary = summary.as_ref().trim();
        if summary.contains(['\n', '\r']) {
            return Err(RecordError::InvalidInput(
                "commit summary must be single-line".into(),
            ));
        }
        let summary = NonEmptyText::new(summary)
            .map_err(|_| RecordError::InvalidInput("commit summary must be non-empty".into()))?;

        Ok(Self {
            domain,
            action,
            summary,
            trailers: Vec::new(),
        })
    }

    pub(crate) fn with_trailer(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> RecordResult<Self> {
        self.trailers.push(CommitTrailer::new(key, value)?);
        Ok(self)
    }

    pub(crate) fn render(&self) -> String {
        let mut rendered = format!("{}:{}: {}", self.domain, self.action, self.summary);

        let mut trailers = self.trailers.clone();
        trailers.sort();

        if !trailers.is_empty() {
            rendered.push('\n');
        }
        for trailer in trailers {
            rendered.push('\n');
            rendered.push_str(&trailer.key);
            rendered.push_str(": ");
            rendered.push_str(&trailer.value);
        }

        rendered
    }
}

/// A file to be written and committed, relative to the repository workdir.
#[derive(Debug, Clone)]
pub(crate) struct FileToWrite<'a> {
    pub relative_path: &'a Path,
    pub content: &'a str,
}

/// Git operations on a record repository rooted at `workdir`.
pub(crate) struct VersionedFileService {
    repo: git2::Repository,
    workdir: PathBuf,
}

impl VersionedFileService {
    /// Create a new Git repository at `workdir`.
    pub(crate) fn init(workdir: &Path) -> RecordResult<Self> {
        let repo = git2::Repository::init(workdir).map_err(RecordError::GitInit)?;
        let actual_workdir = repo
            .workdir()
            .ok_or_else(|| {
                RecordError::GitInit(git2::Error::from_str("repository has no working directory"))
            })?
            .to_path_buf();
        Ok(Self {
            repo,
            workdir: actual_workdir,
        })
    }

    /// Open the repository at exactly `workdir`, never searching parent directories.
    pub(crate) fn open(workdir: &Path) -> RecordResult<Self> {
        let repo = git2::Repository::open_ext(
            workdir,
            git2::RepositoryOpenFlags::NO_SEARCH,
            std::iter::empty::<&std::ffi::OsStr>(),
        )
        .map_err(RecordError::GitOpen)?;
        let actual_workdir = repo
            .workdir()
            .ok_or_else(|| {
                RecordError::GitOpen(git2::Error::from_str("repository has no working directory"))
            })?
            .to_path_buf();
        Ok(Self {
            repo,
            workdir: actual_workdir,
        })
    }

    /// Commit only the given workdir-relative paths.
    ///
    /// Paths containing `..` are rejected.
    pub(crate) fn commit_paths(
        &self,
        author: &CommitAuthor,
        message: &CommitMessage,
        relative_paths: &[PathBuf],
    ) -> RecordResult<git2::Oid> {
        self.repo
            .set_head(MAIN_REF)
            .map_err(RecordError::GitSetHead)?;
        let mut index = self.repo.index().map_err(RecordError::GitIndex)?;

        for path in relative_paths {
            let rel = if path.is_absolute() {
                path.strip_prefix(&self.workdir)
                    .map_err(|_| {
                        RecordError::InvalidInput(
                            "path is outside the repository working directory".into(),
                        )
                    })?
                    .to_path_buf()
            } else {
                path.to_path_buf()
            };

            if rel.components().any(|c| matches!(c, Component::ParentDir)) {
                return Err(RecordError::InvalidInput(
                    "path must not contain parent directory references (..)".into(),
                ));
            }

            index.add_path(&rel).map_err(RecordError::GitAdd)?;
        }
        index.write().map_err(RecordError::GitIndex)?;

        let tree_id = index.write_tree().map_err(RecordError::GitWriteTree)?;
        let tree = self
            .repo
            .find_tree(tree_id)
            .map_err(RecordError::GitFindTree)?;
        let sig = git2::Signature::now(author.name(), author.email())
            .map_err(RecordError::GitSignature)?;

        let parents = self.resolve_head_parents()?;
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        self.repo
            .commit(
                Some("HEAD"),
                &sig,
                &sig,
                &message.render(),
                &tree,
                &parent_refs,
            )
            .map_err(RecordError::GitCommit)
    }

    /// Initialise a repository in `dir`, write `files` and commit them.
    ///
    /// Either the record ends up fully initialised with its first commit, or `dir` is removed.
    pub(crate) fn init_and_commit(
        dir: &Path,
        author: &CommitAuthor,
        message: &CommitMessage,
        files: &[FileToWrite],
    ) -> RecordResult<()> {
        let result: RecordResult<()> = (|| {
            let repo = Self::init(dir)?;
            for file in files {
                fs::write(repo.workdir.join(file.relative_path), file.content)
                    .map_err(RecordError::FileWrite)?;
            }
            let paths: Vec<PathBuf> = files
                .iter()
                .map(|f| f.relative_path.to_path_buf())
                .collect();
            repo.commit_paths(author, message, &paths)?;
            Ok(())
        })();

        match result {
            Ok(()) => Ok(()),
            Err(init_error) => {
                if let Err(cleanup_error) = fs::remove_dir_all(dir) {
                    return Err(RecordError::CleanupAfterInitialiseFailed {
                        path: dir.to_path_buf(),
                        init_error: Box::new(init_error),
                        cleanup_error,
                    });
                }
                Err(init_error)
            }
        }
    }

    fn resolve_head_parents(&self) -> RecordResult<Vec<git2::Commit<'_>>> {
        match self.repo.head() {
            Ok(head) => {
                let commit = head.peel_to_commit().map_err(RecordError::GitPeel)?;
                Ok(vec![commit])
            }
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(vec![]),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(vec![]),
            Err(e) => Err(RecordError::GitHead(e)),
        }
    }
}
