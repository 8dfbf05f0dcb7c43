pub mod channel;
pub mod codec;
pub mod conversions;
pub mod registry;
pub mod session;
pub mod signer;
pub mod types;

pub mod builder;
pub mod connector;
pub mod rest;

// Re-export main components
pub use builder::{HuobiBuilder, DEFAULT_BASE_URL, DEFAULT_WS_URL};
pub use channel::{ChannelKind, Route};
pub use codec::{HuobiCodec, HuobiMessage};
pub use connector::{Account, HuobiConnector, MarketData, Streams, Trading};
pub use rest::HuobiRest;
pub use session::{HuobiSession, SessionState, SessionStatus};
pub use signer::HuobiSigner;
