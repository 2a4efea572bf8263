//! Wire types shared with the remote services
//!
//! The budget authority and the sequence provider are external collaborators;
//! these types describe only their JSON boundary.

pub mod types;

pub use types::{
    AuthorityErrorBody, EndSessionRequest, HeartbeatRequest, HeartbeatResponse,
    SequenceResponse, SequencedMediaItem, StartSessionRequest, StartSessionResponse,
};
