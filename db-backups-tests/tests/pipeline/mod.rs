//! Backup/restore pipeline tests
//!
//! Whole runs through the managers with the recording executor and the
//! in-memory object store.

mod backup;
mod restore;
