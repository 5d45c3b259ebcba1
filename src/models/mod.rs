pub mod certificate;
pub mod completion;
pub mod course;
pub mod coursework;
pub mod roster;
pub mod submission;
pub mod sync_log;

pub use certificate::{Certificate, CompletionSnapshot};
pub use completion::{NewCompletionRequest, StageCompletion};
pub use course::Course;
pub use coursework::Coursework;
pub use roster::RosterMembership;
pub use submission::Submission;
pub use sync_log::SyncLog;
