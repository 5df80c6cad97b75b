//! Handler lifecycle tests
//!
//! Every handler runs against the recording executor with fake tools, so the
//! tests check the commands issued and the files left behind.

mod lifecycle;
mod pg_container;
