//! Version ladders.
//!
//! A message layout that grew over firmware releases is a list of rungs,
//! each adding fields at the end for sessions at or above its threshold.
//! Rungs are evaluated in order and evaluation stops at the first rung the
//! session is too old for, so a ladder must be sorted by threshold.

use crate::cursor::{FieldReader, FieldWriter};
use crate::error::Result;
use crate::version::ApiVersion;

pub type ReadStep<T> = fn(&mut FieldReader<'_>, &mut T, ApiVersion) -> Result<()>;
pub type WriteStep<T> = fn(&mut FieldWriter, &T, ApiVersion);

/// One block of fields introduced at `since`.
///
/// `write` is `None` when the set-side layout does not carry the block.
pub struct Rung<T> {
    pub since: ApiVersion,
    pub read: ReadStep<T>,
    pub write: Option<WriteStep<T>>,
}

impl<T> Rung<T> {
    pub const fn new(since: ApiVersion, read: ReadStep<T>, write: WriteStep<T>) -> Self {
        Self {
            since,
            read,
            write: Some(write),
        }
    }

    pub const fn read_only(since: ApiVersion, read: ReadStep<T>) -> Self {
        Self {
            since,
            read,
            write: None,
        }
    }
}

/// Decode every rung the session version reaches.
pub fn read_ladder<T>(
    ladder: &[Rung<T>],
    version: ApiVersion,
    r: &mut FieldReader<'_>,
    record: &mut T,
) -> Result<()> {
    for rung in ladder {
        if version.less_than(rung.since) {
            break;
        }
        (rung.read)(r, record, version)?;
    }
    Ok(())
}

/// Encode every rung the session version reaches, mirroring [`read_ladder`].
pub fn write_ladder<T>(ladder: &[Rung<T>], version: ApiVersion, w: &mut FieldWriter, record: &T) {
    for rung in ladder {
        if version.less_than(rung.since) {
            break;
        }
        if let Some(write) = rung.write {
            write(w, record, version);
        }
    }
}

/// Thresholds never decrease along the ladder.
pub fn is_ascending<T>(ladder: &[Rung<T>]) -> bool {
    ladder.windows(2).all(|pair| pair[0].since <= pair[1].since)
}
