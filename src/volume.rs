//! Volume name grammar
//!
//! Volume names handed over by the container runtime encode a repository and
//! an optional tag:
//!
//! | Name | Repository | Tag | Kind |
//! |------|------------|-----|------|
//! | `repo#hash` | `repo` | `hash` | pinned root hash |
//! | `repo@tag` | `repo` | `tag` | mutable tag |
//! | `repo` | `repo` | `trunk` | mutable tag, canonicalised to `repo@trunk` |

use crate::error::{VolumeError, VolumeResult};
use std::fmt;

/// Tag used when a volume name does not carry one
pub const DEFAULT_TAG: &str = "trunk";

const HASH_SEPARATOR: char = '#';
const TAG_SEPARATOR: char = '@';

/// How a tag pins the repository contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// Root catalog hash; the mount never auto-updates
    PinnedHash,
    /// Named tag that follows the repository history
    MutableTag,
}

impl TagKind {
    fn separator(&self) -> char {
        match self {
            Self::PinnedHash => HASH_SEPARATOR,
            Self::MutableTag => TAG_SEPARATOR,
        }
    }
}

/// A repository at a given tag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub repository: String,
    pub tag: String,
    pub kind: TagKind,
}

impl RepoId {
    /// Repository at an explicit tag
    pub fn new(repository: impl Into<String>, tag: impl Into<String>, kind: TagKind) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
            kind,
        }
    }

    /// Repository at the default tag
    pub fn trunk(repository: impl Into<String>) -> Self {
        Self::new(repository, DEFAULT_TAG, TagKind::MutableTag)
    }

    /// Parse a volume name into a repository identifier
    ///
    /// A `#` takes precedence over `@`: `repo@x#hash` pins repository
    /// `repo@x` at `hash`.
    pub fn parse(volume: &str) -> VolumeResult<Self> {
        let id = if let Some((repo, hash)) = volume.split_once(HASH_SEPARATOR) {
            Self::new(repo, hash, TagKind::PinnedHash)
        } else if let Some((repo, tag)) = volume.split_once(TAG_SEPARATOR) {
            Self::new(repo, tag, TagKind::MutableTag)
        } else {
            Self::trunk(volume)
        };

        id.validate()?;
        Ok(id)
    }

    /// Check that repository and tag are usable as single path segments
    ///
    /// Both end up joined under the mount, cache and config roots.
    pub fn validate(&self) -> VolumeResult<()> {
        if self.repository.is_empty() {
            return Err(VolumeError::RepoNotFound);
        }
        let invalid = |reason| VolumeError::InvalidVolumeName {
            name: self.volume_name(),
            reason,
        };
        check_segment(&self.repository).map_err(invalid)?;
        if self.tag.is_empty() {
            return Err(invalid("empty tag"));
        }
        check_segment(&self.tag).map_err(invalid)
    }

    /// Canonical volume name (`repo#hash` or `repo@tag`)
    pub fn volume_name(&self) -> String {
        format!("{}{}{}", self.repository, self.kind.separator(), self.tag)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.volume_name())
    }
}

fn check_segment(segment: &str) -> Result<(), &'static str> {
    if segment == "." || segment == ".." {
        return Err("relative path component");
    }
    if segment.contains('/') {
        return Err("contains '/'");
    }
    if segment.contains('\0') {
        return Err("contains NUL");
    }
    Ok(())
}
