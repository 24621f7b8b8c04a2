//! Change events as delivered by the watch source.

use std::{
	ffi::OsStr,
	fmt,
	path::PathBuf,
};

/// A single filesystem change.
///
/// Events carry just enough to filter on and to log; by the time a restart
/// happens they have been coalesced into a [`Trigger`][crate::ratelimit::Trigger]
/// and the path is informational only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
	/// The path the change was reported for.
	pub path: PathBuf,

	/// What kind of change it was.
	pub op: Op,
}

impl Event {
	/// The final component of the changed path, as matched by filename filters.
	///
	/// Empty when the path has no final component (e.g. the filesystem root)
	/// or it is not valid UTF-8.
	pub fn file_name(&self) -> &str {
		self.path
			.file_name()
			.and_then(OsStr::to_str)
			.unwrap_or_default()
	}
}

impl fmt::Display for Event {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}({})", self.op, self.path.display())
	}
}

/// Coarse classification of a filesystem change.
///
/// The watch backend reports considerably more detail than any consumer here
/// needs; this is the level operation filters and log lines work at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Op {
	Create,
	Modify,
	Remove,
	Rename,
	Other,
}

impl Op {
	/// Lowercase name, as matched by operation filters.
	pub const fn name(self) -> &'static str {
		match self {
			Self::Create => "create",
			Self::Modify => "modify",
			Self::Remove => "remove",
			Self::Rename => "rename",
			Self::Other => "other",
		}
	}
}

impl fmt::Display for Op {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl From<&notify::EventKind> for Op {
	fn from(kind: &notify::EventKind) -> Self {
		use notify::{event::ModifyKind, EventKind};

		match kind {
			EventKind::Create(_) => Self::Create,
			EventKind::Modify(ModifyKind::Name(_)) => Self::Rename,
			EventKind::Modify(_) => Self::Modify,
			EventKind::Remove(_) => Self::Remove,
			_ => Self::Other,
		}
	}
}
