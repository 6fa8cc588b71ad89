//! Vote weighting: maps a voter's chat badges to an integer vote weight
//!
//! Two policies are supported:
//! - **Additive**: every badge a voter carries contributes its configured weight.
//! - **Tiered**: only the highest-precedence badge counts
//!   (Moderator > Vip > Founder > Subscriber).
//!
//! A voter without any badge always weighs 1.

use serde::{Deserialize, Serialize};

/// A chat badge that can influence vote weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    Subscriber,
    Vip,
    Founder,
    Moderator,
}

impl Badge {
    /// Every badge, lowest precedence first
    pub const ALL: [Badge; 4] = [
        Badge::Subscriber,
        Badge::Founder,
        Badge::Vip,
        Badge::Moderator,
    ];

    fn bit(self) -> u8 {
        match self {
            Self::Subscriber => 0b0001,
            Self::Vip => 0b0010,
            Self::Founder => 0b0100,
            Self::Moderator => 0b1000,
        }
    }

    /// Map a raw chat badge tag (e.g. `broadcaster/1` → `broadcaster`) to a badge.
    ///
    /// Staff-like roles all count as moderators; unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let key = tag.split('/').next().unwrap_or(tag).trim();
        match key.to_ascii_lowercase().as_str() {
            "admin" | "broadcaster" | "moderator" | "global_mod" | "staff" => Some(Self::Moderator),
            "subscriber" => Some(Self::Subscriber),
            "founder" => Some(Self::Founder),
            "vip" => Some(Self::Vip),
            _ => None,
        }
    }
}

impl std::fmt::Display for Badge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Subscriber => write!(f, "subscriber"),
            Self::Vip => write!(f, "vip"),
            Self::Founder => write!(f, "founder"),
            Self::Moderator => write!(f, "moderator"),
        }
    }
}

/// Set of badges carried by a voter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BadgeSet(u8);

impl BadgeSet {
    /// The empty set
    pub fn empty() -> Self {
        Self(0)
    }

    /// Build a set from raw chat badge tags, ignoring unrecognised ones
    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tags.into_iter()
            .filter_map(|tag| Badge::from_tag(tag.as_ref()))
            .collect()
    }

    pub fn with(mut self, badge: Badge) -> Self {
        self.insert(badge);
        self
    }

    pub fn insert(&mut self, badge: Badge) {
        self.0 |= badge.bit();
    }

    pub fn contains(&self, badge: Badge) -> bool {
        self.0 & badge.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterate the badges present, lowest precedence first
    pub fn iter(&self) -> impl Iterator<Item = Badge> + '_ {
        Badge::ALL.into_iter().filter(|b| self.contains(*b))
    }
}

impl FromIterator<Badge> for BadgeSet {
    fn from_iter<T: IntoIterator<Item = Badge>>(iter: T) -> Self {
        let mut set = Self::empty();
        for badge in iter {
            set.insert(badge);
        }
        set
    }
}

/// How badge weights combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingPolicy {
    /// Sum the weight of every badge present
    Additive,
    /// Use only the highest-precedence badge present
    Tiered,
}

/// Snapshot of the configured badge weights
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteWeights {
    pub subscriber: u32,
    pub vip: u32,
    pub founder: u32,
    pub moderator: u32,
    pub policy: WeightingPolicy,
}

impl Default for VoteWeights {
    fn default() -> Self {
        Self {
            subscriber: 1,
            vip: 1,
            founder: 1,
            moderator: 1,
            policy: WeightingPolicy::Tiered,
        }
    }
}

impl VoteWeights {
    /// Configured weight for a single badge
    pub fn badge_weight(&self, badge: Badge) -> u32 {
        match badge {
            Badge::Subscriber => self.subscriber,
            Badge::Vip => self.vip,
            Badge::Founder => self.founder,
            Badge::Moderator => self.moderator,
        }
    }

    /// Weight of a vote cast by a voter carrying `badges`
    pub fn weight(&self, badges: BadgeSet) -> u32 {
        if badges.is_empty() {
            return 1;
        }

        match self.policy {
            WeightingPolicy::Additive => badges
                .iter()
                .map(|badge| self.badge_weight(badge))
                .fold(0u32, u32::saturating_add),
            WeightingPolicy::Tiered => [
                Badge::Moderator,
                Badge::Vip,
                Badge::Founder,
                Badge::Subscriber,
            ]
            .into_iter()
            .find(|badge| badges.contains(*badge))
            .map(|badge| self.badge_weight(badge))
            .unwrap_or(1),
        }
    }
}
