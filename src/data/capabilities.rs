use serde::{Serialize, Deserialize, Serializer, Deserializer};
use strum_macros::{Display, EnumString, AsRefStr};
use enumflags2::{bitflags, BitFlags};
use std::fmt;

/// Operations a media player entity can advertise to the host
///
/// The discriminants match the host's media player feature flags, so the
/// raw bits of a capability set can be handed over unchanged.
#[bitflags]
#[repr(u32)]  // Explicitly specify representation type for BitFlags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PlayerCapability {
    /// Can pause playback
    Pause = 0x0001,
    /// Can skip to previous track
    Previous = 0x0010,
    /// Can skip to next track
    Next = 0x0020,
    /// Can be switched on
    TurnOn = 0x0080,
    /// Can be switched off
    TurnOff = 0x0100,
    /// Can stop playback
    Stop = 0x1000,
    /// Can start playback
    Play = 0x4000,
}

impl PlayerCapability {
    /// Get the string representation of the capability
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pause => "pause",
            Self::Previous => "previous",
            Self::Next => "next",
            Self::TurnOn => "turn_on",
            Self::TurnOff => "turn_off",
            Self::Stop => "stop",
            Self::Play => "play",
        }
    }

    /// Convert a slice of capabilities to BitFlags
    pub fn vec_to_flags(capabilities: &[PlayerCapability]) -> BitFlags<PlayerCapability> {
        let mut flags = BitFlags::empty();
        for cap in capabilities {
            flags |= BitFlags::from_flag(*cap);
        }
        flags
    }
}

impl From<PlayerCapability> for String {
    fn from(cap: PlayerCapability) -> Self {
        cap.as_str().to_string()
    }
}

/// A set of player capabilities, implemented efficiently using bitflags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerCapabilitySet {
    flags: BitFlags<PlayerCapability>,
}

impl PlayerCapabilitySet {
    /// Create a new empty capabilities set
    pub fn empty() -> Self {
        Self {
            flags: BitFlags::empty(),
        }
    }

    /// Create a set from the raw host feature bits, ignoring unknown bits
    pub fn from_bits_truncate(bits: u32) -> Self {
        Self {
            flags: BitFlags::from_bits_truncate(bits),
        }
    }

    /// Add a capability to the set
    pub fn add_capability(&mut self, capability: PlayerCapability) {
        self.flags |= BitFlags::from_flag(capability);
    }

    /// Remove a capability from the set
    pub fn remove_capability(&mut self, capability: PlayerCapability) {
        self.flags &= !BitFlags::from_flag(capability);
    }

    /// Check if a specific capability is in the set
    pub fn has_capability(&self, capability: PlayerCapability) -> bool {
        self.flags.contains(capability)
    }

    /// Check if the set is empty (contains no capabilities)
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Create a set from a slice of capabilities
    pub fn from_slice(capabilities: &[PlayerCapability]) -> Self {
        Self {
            flags: PlayerCapability::vec_to_flags(capabilities),
        }
    }

    /// Convert to a Vec of individual capabilities
    pub fn to_vec(&self) -> Vec<PlayerCapability> {
        self.flags.iter().collect()
    }

    /// Raw feature bits as understood by the host
    pub fn bits(&self) -> u32 {
        self.flags.bits()
    }
}

impl Default for PlayerCapabilitySet {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<PlayerCapability> for PlayerCapabilitySet {
    fn from(capability: PlayerCapability) -> Self {
        let mut set = Self::empty();
        set.add_capability(capability);
        set
    }
}

impl From<Vec<PlayerCapability>> for PlayerCapabilitySet {
    fn from(capabilities: Vec<PlayerCapability>) -> Self {
        Self::from_slice(&capabilities)
    }
}

impl FromIterator<PlayerCapability> for PlayerCapabilitySet {
    fn from_iter<T: IntoIterator<Item = PlayerCapability>>(iter: T) -> Self {
        let mut set = Self::empty();
        for capability in iter {
            set.add_capability(capability);
        }
        set
    }
}

/// Serialized as a list of capability names
impl Serialize for PlayerCapabilitySet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_vec().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PlayerCapabilitySet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let capabilities = Vec::<PlayerCapability>::deserialize(deserializer)?;
        Ok(Self::from_slice(&capabilities))
    }
}

impl fmt::Display for PlayerCapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let caps = self.to_vec();
        write!(f, "[")?;
        for (i, cap) in caps.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", cap)?;
        }
        write!(f, "]")
    }
}

impl IntoIterator for &PlayerCapabilitySet {
    type Item = PlayerCapability;
    type IntoIter = std::vec::IntoIter<PlayerCapability>;

    fn into_iter(self) -> Self::IntoIter {
        self.to_vec().into_iter()
    }
}
