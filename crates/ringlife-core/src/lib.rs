//! # RingLife Core
//!
//! Messaging substrate for the RingLife distributed cellular automaton.
//!
//! Workers of a run are symmetric peers that only talk through messages. This
//! crate provides the pieces they share:
//!
//! - [`W2WBroker`] / [`W2WEndpoint`] - bounded worker-to-worker channels
//! - [`Transport`] - two-phase post/complete point-to-point protocol
//! - [`collective`] - gather, scatter, broadcast, sum reduction and barrier
//! - [`RingLifeError`] - fatal error taxonomy with worker and phase context
//!
//! ## Example
//!
//! ```ignore
//! use ringlife_core::prelude::*;
//!
//! let broker = W2WBuilder::new().world_size(2).build();
//! let mut left = broker.register(WorkerId(0));
//! let send = left.post_send(WorkerId(1), Tag::HaloDown, 0, row.to_vec())?;
//! left.wait_all(vec![send], vec![]).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collective;
pub mod error;
pub mod message;
pub mod transport;
pub mod w2w;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::collective::{all_reduce_sum, barrier, broadcast_u64, gather, scatter, Role};
    pub use crate::error::{Phase, Result, RingLifeError};
    pub use crate::message::{MatchKey, MessageEnvelope, MessageHeader, Tag, WorkerId};
    pub use crate::transport::{RecvRequest, SendRequest, Transport};
    pub use crate::w2w::{
        DeliveryReceipt, DeliveryStatus, W2WBroker, W2WBuilder, W2WConfig, W2WEndpoint, W2WStats,
    };
}

pub use collective::Role;
pub use error::{Phase, Result, RingLifeError};
pub use message::{MessageEnvelope, Tag, WorkerId};
pub use transport::Transport;
pub use w2w::{W2WBroker, W2WBuilder, W2WEndpoint};
