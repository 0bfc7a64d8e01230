//! Git-hosting value types.

mod remote;

pub use remote::{
    CheckRun, MergeOutcome, MergeRequest, NewPullRequest, RecordConversionError, RemoteBranch,
    RemotePullRequest, RemotePullRequestState,
};
