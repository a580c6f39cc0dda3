//! Tracked social networks

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A social network the pipeline knows how to scrape
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Network {
    /// X (formerly Twitter)
    X,
    /// Instagram
    Instagram,
}

impl Network {
    /// Every tracked network, in prompt order
    pub const ALL: [Network; 2] = [Network::X, Network::Instagram];

    /// Canonical display name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::X => "X",
            Network::Instagram => "Instagram",
        }
    }

    /// Source label attached to evidence scraped from this network
    #[inline]
    #[must_use]
    pub fn source_label(&self) -> &'static str {
        match self {
            Network::X => "X/Twitter",
            Network::Instagram => "Instagram",
        }
    }

    /// Domains whose profile URLs belong to this network
    #[must_use]
    pub fn domains(&self) -> &'static [&'static str] {
        match self {
            Network::X => &["x.com", "twitter.com"],
            Network::Instagram => &["instagram.com"],
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network name outside the tracked set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown network: {0}")]
pub struct UnknownNetwork(pub String);

impl FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" | "twitter" | "x/twitter" | "x (twitter)" | "x.com" => Ok(Network::X),
            "instagram" | "ig" | "instagram.com" => Ok(Network::Instagram),
            _ => Err(UnknownNetwork(s.to_string())),
        }
    }
}

impl TryFrom<String> for Network {
    type Error = UnknownNetwork;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Network> for String {
    fn from(network: Network) -> Self {
        network.as_str().to_string()
    }
}
