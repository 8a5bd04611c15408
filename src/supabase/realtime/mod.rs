//! Row-change feeds over the Realtime WebSocket.

mod protocol;
mod subscription;

pub use protocol::{ChangeEvent, ChangeFilter, ChangeRecord};
pub use subscription::{RealtimeClient, Subscription};
