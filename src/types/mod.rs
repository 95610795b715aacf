pub mod asset;
pub mod pair;
pub mod protocol;
pub mod timestamp;

pub use asset::CanonicalAsset;
pub use pair::CanonicalPair;
pub use protocol::Protocol;
pub use timestamp::Timestamp;
