//! Domain types - commit records and tag naming, independent of git operations

pub mod commit;
pub mod tag;

pub use commit::{CommitKind, CommitRecord, Convention, Person, SignatureStatus};
pub use tag::{TagContext, TagTemplate, DEFAULT_TAG_TEMPLATE};
