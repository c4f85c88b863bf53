//! Meshtastic modem presets
//!
//! A channel configured without an explicit name is named after the modem
//! preset in use, so the preset doubles as the default channel name when the
//! channel hash table is built.
//!
//! | Preset | SF | BW | CR | Description |
//! |--------|----|----|-----|-------------|
//! | LongFast | 11 | 250 | 4/5 | Long range, higher throughput |
//! | LongSlow | 12 | 125 | 4/8 | Maximum range, lowest throughput |
//! | LongModerate | 11 | 125 | 4/8 | Long range, moderate throughput |
//! | VeryLongSlow | 12 | 62.5 | 4/8 | Extreme range |
//! | MediumFast | 9 | 250 | 4/5 | Medium range |
//! | MediumSlow | 10 | 250 | 4/5 | Medium range, lower throughput |
//! | ShortFast | 7 | 250 | 4/5 | Short range, high throughput |
//! | ShortSlow | 8 | 250 | 4/5 | Short range |
//! | ShortTurbo | 7 | 500 | 4/5 | Short range, highest throughput |

use std::fmt;
use std::str::FromStr;

/// Meshtastic modem presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModemPreset {
    /// Long range, fast: SF11, BW250, CR4/5
    #[default]
    LongFast,
    /// Long range, slow (maximum range): SF12, BW125, CR4/8
    LongSlow,
    /// Long range, moderate: SF11, BW125, CR4/8
    LongModerate,
    /// Very long range, slow: SF12, BW62.5, CR4/8
    VeryLongSlow,
    /// Medium range, fast: SF9, BW250, CR4/5
    MediumFast,
    /// Medium range, slow: SF10, BW250, CR4/5
    MediumSlow,
    /// Short range, fast: SF7, BW250, CR4/5
    ShortFast,
    /// Short range, slow: SF8, BW250, CR4/5
    ShortSlow,
    /// Short range, turbo: SF7, BW500, CR4/5
    ShortTurbo,
}

impl ModemPreset {
    /// Every preset, in firmware enumeration order
    pub const ALL: [ModemPreset; 9] = [
        ModemPreset::LongFast,
        ModemPreset::LongSlow,
        ModemPreset::VeryLongSlow,
        ModemPreset::MediumSlow,
        ModemPreset::MediumFast,
        ModemPreset::ShortSlow,
        ModemPreset::ShortFast,
        ModemPreset::LongModerate,
        ModemPreset::ShortTurbo,
    ];

    /// Channel name the firmware uses for an unnamed channel on this preset
    pub fn channel_name(&self) -> &'static str {
        match self {
            ModemPreset::LongFast => "LongFast",
            ModemPreset::LongSlow => "LongSlow",
            ModemPreset::LongModerate => "LongMod",
            ModemPreset::VeryLongSlow => "VLongSlow",
            ModemPreset::MediumFast => "MediumFast",
            ModemPreset::MediumSlow => "MediumSlow",
            ModemPreset::ShortFast => "ShortFast",
            ModemPreset::ShortSlow => "ShortSlow",
            ModemPreset::ShortTurbo => "ShortTurbo",
        }
    }

    /// LoRa parameters as (spreading_factor, bandwidth_hz, coding_rate)
    pub fn lora_params(&self) -> (u8, u32, u8) {
        match self {
            ModemPreset::LongFast => (11, 250_000, 5),
            ModemPreset::LongSlow => (12, 125_000, 8),
            ModemPreset::LongModerate => (11, 125_000, 8),
            ModemPreset::VeryLongSlow => (12, 62_500, 8),
            ModemPreset::MediumFast => (9, 250_000, 5),
            ModemPreset::MediumSlow => (10, 250_000, 5),
            ModemPreset::ShortFast => (7, 250_000, 5),
            ModemPreset::ShortSlow => (8, 250_000, 5),
            ModemPreset::ShortTurbo => (7, 500_000, 5),
        }
    }

    /// Preset index as carried in map reports
    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index).ok().and_then(|i| Self::ALL.get(i).copied())
    }
}

impl fmt::Display for ModemPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.channel_name())
    }
}

impl FromStr for ModemPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| {
                let debug_name = format!("{:?}", p).to_ascii_lowercase();
                p.channel_name().to_ascii_lowercase() == wanted || debug_name == wanted
            })
            .ok_or_else(|| format!("unknown modem preset: {}", s))
    }
}
