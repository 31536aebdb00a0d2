//! DataFrame adapters: input frames → domain rows, report → output frames.

pub mod read;
pub mod write;

pub use read::{
    read_covariance, read_fills, read_metadata, read_peer_weights, read_quotes, read_volatilities,
    read_volume,
};
pub use write::{fill_frame, peer_weights_frame, summary_frame, volatilities_frame};
