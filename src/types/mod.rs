mod command;
mod entity;
mod event;
mod tx;

pub use command::*;
pub use entity::*;
pub use event::*;
pub use tx::*;

/// On-chain token ID of a vote-escrow position.
pub type TokenId = u64;

/// Seconds a submitted transaction stays valid for, enforced by the
/// contracts via the deadline parameter, not by the client.
pub const DEFAULT_DEADLINE_WINDOW: u64 = 600;
