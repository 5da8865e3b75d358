use serde::{Deserialize, Serialize};
use std::fmt;

/// Field name for the power state capture
pub const POWER: &str = "power";

/// Field name for the input source capture
pub const SOURCE: &str = "source";

/// Field name for the volume capture
pub const VOLUME: &str = "volume";

/// Field name for the mute capture
pub const MUTE: &str = "mute";

/// Field name for the decoder capture
pub const DECODER: &str = "decoder";

/// Receiver generation
///
/// Selects the command table, response grammar, standby rules and default
/// source list. `X10` and `X20` speak the same `Z{zone}` dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    /// MRX 300/500/700 and AVM 50 family (`P{zone}...;`)
    #[default]
    X00,
    /// MRX 310/510/710 family (`Z{zone}...;`)
    X10,
    /// MRX 520/720/1120 family (`Z{zone}...;`)
    X20,
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Model::X00 => "x00",
            Model::X10 => "x10",
            Model::X20 => "x20",
        };
        f.write_str(name)
    }
}

/// Zone identifier
///
/// Zones travel on the wire as a single character, so that is what we keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "String")]
pub struct Zone(char);

impl Zone {
    /// Main zone
    pub const MAIN: Zone = Zone('1');

    /// Second zone
    pub const ZONE2: Zone = Zone('2');

    /// Build a zone from its number (1-9)
    pub fn new(number: u32) -> Option<Self> {
        if number == 0 {
            return None;
        }
        char::from_digit(number, 10).map(Zone)
    }

    /// Build a zone from its wire code
    pub fn from_code(code: char) -> Self {
        Zone(code)
    }

    /// The character sent on the wire
    pub fn code(&self) -> char {
        self.0
    }
}

impl Default for Zone {
    fn default() -> Self {
        Zone::MAIN
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Zone> for String {
    fn from(zone: Zone) -> Self {
        zone.0.to_string()
    }
}

/// Zone as it may appear in configuration: `1` or `"1"`
#[derive(Deserialize)]
#[serde(untagged)]
enum ZoneSpec {
    Number(u32),
    Code(String),
}

impl<'de> Deserialize<'de> for Zone {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        match ZoneSpec::deserialize(deserializer)? {
            ZoneSpec::Number(n) => {
                Zone::new(n).ok_or_else(|| D::Error::custom(format!("zone {} out of range", n)))
            }
            ZoneSpec::Code(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Zone(c)),
                    _ => Err(D::Error::custom(format!(
                        "zone code must be one character, got {:?}",
                        s
                    ))),
                }
            }
        }
    }
}

/// Power state of a zone as last observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerState {
    /// No exchange has completed for the zone yet
    #[default]
    Unknown,
    /// Last exchange showed the zone powered on
    On,
    /// Last exchange showed the zone off, or the receiver did not answer
    Off,
}

/// Device volume range used for normalization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeRange {
    /// Device units mapped to 0.0
    pub min: i32,
    /// Device units mapped to 1.0
    pub max: i32,
}

impl VolumeRange {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Convert a normalized volume into device units
    ///
    /// `raw = round((max - min) * volume + min)`, clamped to the range.
    pub fn to_device(&self, volume: f64) -> i32 {
        let span = f64::from(self.max) - f64::from(self.min);
        let raw = (span * volume + f64::from(self.min)).round();
        raw.clamp(f64::from(self.min), f64::from(self.max)) as i32
    }

    /// Convert device units into a normalized volume in [0, 1]
    pub fn to_normalized(&self, raw: i32) -> f64 {
        let span = f64::from(self.max) - f64::from(self.min);
        ((f64::from(raw) - f64::from(self.min)) / span).clamp(0.0, 1.0)
    }
}

impl Default for VolumeRange {
    fn default() -> Self {
        Self { min: -60, max: -30 }
    }
}
