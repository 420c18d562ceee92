//! Achievement badges.

use serde::Serialize;

/// Rarity tier of a badge. Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeLevel {
    Legendary,
    Epic,
    Rare,
    Common,
    Special,
}

/// A derived achievement. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub icon: &'static str,
    pub name: &'static str,
    pub desc: String,
    pub level: BadgeLevel,
}

impl Badge {
    pub fn new(icon: &'static str, name: &'static str, desc: impl Into<String>, level: BadgeLevel) -> Self {
        Self {
            icon,
            name,
            desc: desc.into(),
            level,
        }
    }
}
