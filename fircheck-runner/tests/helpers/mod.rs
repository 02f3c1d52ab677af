//! Test helpers for fircheck-runner integration tests
//!
//! - MockExecutor: stands in for the target/simulator, records every call and
//!   writes the artifacts a well-behaved firmware stage would produce
//! - Workspace: scratch bin/out layout with fake firmware images

pub mod mock_executor;
pub mod workspace;

pub use mock_executor::{CallLog, MockExecutor, StageBehavior};
pub use workspace::Workspace;
