//! Domain types for TCA Lab

pub mod execution;
pub mod fill;
pub mod market;
pub mod peer;

pub use execution::{Execution, Side, SideParseError};
pub use fill::Fill;
pub use market::{Quote, VolumeInterval};
pub use peer::{PeerWeight, Volatility};

/// Integer timestamp in whatever epoch unit the input tables use.
///
/// All arithmetic on timestamps (ordering, interval midpoints, nearest-time
/// lookups) is unit-agnostic, so the engine never needs to know the unit.
pub type Timestamp = i64;
