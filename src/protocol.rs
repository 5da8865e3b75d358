//! Built-in command, response and source tables for each receiver family.
//!
//! `x00` receivers take `P{zone}{opcode}{args};` and answer a zone query with
//! a packed status such as `P1S3V-40M0D2`; a zone in standby answers with a
//! literal `Main.Off` / `Zone2.Off`.
//!
//! `x10` and `x20` receivers take `Z{zone}{opcode}{args};` and answer with one
//! opcode per field (`POW`, `VOL`, `MUT`, `INP`). While the unit is in standby they
//! echo the request behind a `!Z` prefix.

use crate::command::Command;
use crate::types::Model;

pub const DEFAULT_PORT: u16 = 4999;

const X00_COMMANDS: &[(Command, &str)] = &[
    (Command::ZoneQuery, "P{zone}?;"),
    (Command::PowerOn, "P{zone}P1;"),
    (Command::PowerOff, "P{zone}P0;"),
    (Command::PowerQuery, "P{zone}P?;"),
    (Command::VolumeUp, "P{zone}VU{step?};"),
    (Command::VolumeDown, "P{zone}VD{step?};"),
    (Command::VolumeSet, "P{zone}V{volume};"),
    (Command::VolumeQuery, "P{zone}V?;"),
    (Command::MuteOn, "P{zone}M1;"),
    (Command::MuteOff, "P{zone}M0;"),
    (Command::MuteToggle, "P{zone}MT;"),
    (Command::MuteQuery, "P{zone}M?;"),
    (Command::DecoderQuery, "P{zone}D?;"),
    (Command::SourceSet, "P{zone}S{source};"),
    (Command::SourceQuery, "P{zone}S?;"),
];

const X10_COMMANDS: &[(Command, &str)] = &[
    // No packed status on this family; the power query doubles as the zone probe.
    (Command::ZoneQuery, "Z{zone}POW?;"),
    (Command::PowerOn, "Z{zone}POW1;"),
    (Command::PowerOff, "Z{zone}POW0;"),
    (Command::PowerQuery, "Z{zone}POW?;"),
    (Command::VolumeUp, "Z{zone}VUP{step?};"),
    (Command::VolumeDown, "Z{zone}VDN{step?};"),
    (Command::VolumeSet, "Z{zone}VOL{volume};"),
    (Command::VolumeQuery, "Z{zone}V?;"),
    (Command::MuteOn, "Z{zone}MUT1;"),
    (Command::MuteOff, "Z{zone}MUT0;"),
    (Command::MuteToggle, "Z{zone}MUTt;"),
    (Command::MuteQuery, "Z{zone}M?;"),
    (Command::SourceSet, "Z{zone}INP{source};"),
    (Command::SourceQuery, "Z{zone}INP?;"),
    (Command::SourceActiveQuery, "ICN?;"),
    (Command::SourceNameShortQuery, "ISN{source_num}?;"),
    (Command::SourceNameLongQuery, "ILN{source_num}?;"),
    (Command::ModelQuery, "IDQ?;"),
    (Command::HardwareQuery, "IDH?;"),
];

// Order matters: the muted-volume marker `VM` must be tried before the
// plain `V` marker.
const X00_PATTERNS: &[&str] = &[
    r"P(?P<zone>.).*?P(?P<power>[0-1])",
    r"P(?P<zone>.).*?S(?P<source>[a-zA-Z0-9])",
    r"P(?P<zone>.).*?VM(?P<volume>-[0-9][0-9]|[0-9][0-9]|-[0-9]|[0-9])",
    r"P(?P<zone>.).*?V(?P<volume>-[0-9][0-9]|[0-9][0-9]|-[0-9]|[0-9])",
    r"P(?P<zone>.).*?M(?P<mute>[0-1])",
    r"P(?P<zone>.).*?D(?P<decoder>[a-zA-Z0-9])",
];

const X10_PATTERNS: &[&str] = &[
    r"Z(?P<zone>.).*?POW(?P<power>.)",
    r"Z(?P<zone>.).*?VOL(?P<volume>-?[0-9]+)",
    r"Z(?P<zone>.).*?MUT(?P<mute>.)",
    r"Z(?P<zone>.).*?INP(?P<source>[^;]*)",
];

const X00_STANDBY: &[(&str, &str)] = &[(r"Main.Off", "P1P0"), (r"Zone2.Off", "P2P0")];

const X10_STANDBY: &[(&str, &str)] = &[(r"!Z.*?Z(?P<zone>.)", "Z{zone}POW0")];

const X00_SOURCES: &[(&str, &str)] = &[
    ("1", "BDP"),
    ("2", "CD"),
    ("3", "TV"),
    ("4", "SAT"),
    ("5", "GAME"),
    ("6", "AUX"),
    ("7", "MEDIA"),
    ("8", "AM/FM"),
    ("9", "iPod"),
    ("c", "current main zone source"),
    ("d", "USB"),
    ("e", "Internet Radio"),
];

/// Command templates for a model
pub fn commands(model: Model) -> &'static [(Command, &'static str)] {
    match model {
        Model::X00 => X00_COMMANDS,
        Model::X10 | Model::X20 => X10_COMMANDS,
    }
}

/// Extraction patterns for a model, in priority order
pub fn patterns(model: Model) -> &'static [&'static str] {
    match model {
        Model::X00 => X00_PATTERNS,
        Model::X10 | Model::X20 => X10_PATTERNS,
    }
}

/// Standby rewrite rules for a model, in priority order
pub fn standby_rules(model: Model) -> &'static [(&'static str, &'static str)] {
    match model {
        Model::X00 => X00_STANDBY,
        Model::X10 | Model::X20 => X10_STANDBY,
    }
}

/// Default `(code, name)` source list for a model
pub fn default_sources(model: Model) -> &'static [(&'static str, &'static str)] {
    match model {
        Model::X00 => X00_SOURCES,
        Model::X10 | Model::X20 => &[],
    }
}
