//! Serializable calculation configuration.

use crate::error::SlippageError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default clamp multiplier for peer returns, in units of peer volatility.
pub const DEFAULT_PEER_RETURN_TRUNCATION: f64 = 2.0;

/// How many peers to keep when deriving weights from a covariance matrix.
///
/// Serialized as an integer or the string `"all"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "PeerCountRepr", into = "PeerCountRepr")]
pub enum PeerCount {
    #[default]
    All,
    Top(usize),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PeerCountRepr {
    Count(usize),
    Keyword(String),
}

impl TryFrom<PeerCountRepr> for PeerCount {
    type Error = String;

    fn try_from(repr: PeerCountRepr) -> Result<Self, Self::Error> {
        match repr {
            PeerCountRepr::Count(n) => Ok(PeerCount::Top(n)),
            PeerCountRepr::Keyword(s) if s.eq_ignore_ascii_case("all") => Ok(PeerCount::All),
            PeerCountRepr::Keyword(s) => Err(format!("num_peers must be an integer or \"all\", got \"{s}\"")),
        }
    }
}

impl From<PeerCount> for PeerCountRepr {
    fn from(count: PeerCount) -> Self {
        match count {
            PeerCount::All => PeerCountRepr::Keyword("all".into()),
            PeerCount::Top(n) => PeerCountRepr::Count(n),
        }
    }
}

impl fmt::Display for PeerCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerCount::All => f.write_str("all"),
            PeerCount::Top(n) => write!(f, "{n}"),
        }
    }
}

/// Scalar knobs of one calculation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalcConfig {
    /// Peer count used when peers are derived from a covariance matrix.
    pub num_peers: PeerCount,

    /// Peer log-returns are clamped to `±truncation × volatility`.
    /// `inf` disables truncation. Peers without a volatility entry are never
    /// truncated.
    pub peer_return_truncation: f64,
}

impl Default for CalcConfig {
    fn default() -> Self {
        Self {
            num_peers: PeerCount::All,
            peer_return_truncation: DEFAULT_PEER_RETURN_TRUNCATION,
        }
    }
}

impl CalcConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, SlippageError> {
        let config: CalcConfig =
            toml::from_str(s).map_err(|e| SlippageError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SlippageError> {
        let tau = self.peer_return_truncation;
        if tau.is_nan() || tau <= 0.0 {
            return Err(SlippageError::InvalidConfig(format!(
                "peer_return_truncation must be positive or inf, got {tau}"
            )));
        }
        Ok(())
    }

    /// Deterministic content hash of this config.
    ///
    /// Two runs with identical configs share a fingerprint, which lets callers
    /// key cached reports on it.
    pub fn fingerprint(&self) -> String {
        // serde_json writes non-finite floats as null, so encode the
        // truncation explicitly to keep `inf` distinct from other values.
        let canonical = serde_json::json!({
            "num_peers": self.num_peers.to_string(),
            "peer_return_truncation": format!("{:?}", self.peer_return_truncation),
        });
        blake3::hash(canonical.to_string().as_bytes()).to_hex().to_string()
    }
}
