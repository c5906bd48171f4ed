//! Signal strength classification.
//!
//! Maps a dBm reading to a qualitative tier and the semantic color key a
//! presenter should draw it with. Higher readings are stronger.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Qualitative signal bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignalTier {
    /// Above -40 dBm.
    Excellent,
    /// Above -55 dBm, up to -40.
    Good,
    /// Above -70 dBm, up to -55.
    Fair,
    /// -70 dBm and below.
    Poor,
}

/// Semantic theme color for a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ColorKey {
    /// Theme success color.
    Success,
    /// Theme warning color.
    Warning,
    /// Theme error color.
    Error,
}

/// Classification result for a single reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SignalClass {
    /// Qualitative tier.
    pub tier: SignalTier,
    /// Color key for the tier.
    pub color: ColorKey,
}

impl SignalTier {
    /// Color key used to render this tier.
    ///
    /// `Good` shares the success color with `Excellent`.
    #[must_use]
    pub const fn color_key(self) -> ColorKey {
        match self {
            Self::Excellent | Self::Good => ColorKey::Success,
            Self::Fair => ColorKey::Warning,
            Self::Poor => ColorKey::Error,
        }
    }
}

/// Classify a signal strength reading in dBm.
#[must_use]
pub const fn classify(signal_strength: i16) -> SignalClass {
    let tier = if signal_strength > -40 {
        SignalTier::Excellent
    } else if signal_strength > -55 {
        SignalTier::Good
    } else if signal_strength > -70 {
        SignalTier::Fair
    } else {
        SignalTier::Poor
    };

    SignalClass {
        tier,
        color: tier.color_key(),
    }
}
