pub mod request;
pub mod skills;
pub mod user;

pub use request::{
    ApprovalStamp, ApprovalStatus, CandidateProfile, FinalDetails, HiredStatus, HiringRequest,
    JoinStatus, RequestDetails, RequestId, RequestKind, Submission, TentativeDetails,
    UnknownVariant, WorkflowStatus,
};
pub use skills::Skills;
pub use user::{Role, UnknownRole, User, UserId};
