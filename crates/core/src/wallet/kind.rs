//! Currency kinds held in a wallet.

use serde::{Deserialize, Serialize};

use super::error::WalletError;

/// An in-app currency kind.
///
/// Ordering is the declaration order; every multi-kind operation walks kinds
/// in this order so its writes and history rows are reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// Premium hard currency.
    Gold,
    /// Soft currency.
    Silver,
    /// Gems.
    Gem,
    /// Coins.
    Coin,
    /// Loyalty points.
    Point,
    /// Event tickets.
    Ticket,
}

impl Kind {
    /// Every kind, in iteration order.
    pub const ALL: [Self; 6] = [
        Self::Gold,
        Self::Silver,
        Self::Gem,
        Self::Coin,
        Self::Point,
        Self::Ticket,
    ];

    /// Returns the storage name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gold => "gold",
            Self::Silver => "silver",
            Self::Gem => "gem",
            Self::Coin => "coin",
            Self::Point => "point",
            Self::Ticket => "ticket",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Kind {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gold" => Ok(Self::Gold),
            "silver" => Ok(Self::Silver),
            "gem" => Ok(Self::Gem),
            "coin" => Ok(Self::Coin),
            "point" => Ok(Self::Point),
            "ticket" => Ok(Self::Ticket),
            _ => Err(WalletError::InvalidKind(s.to_string())),
        }
    }
}
