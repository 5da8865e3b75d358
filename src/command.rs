//! Command table and wire templates.
//!
//! Every receiver command is a short ASCII statement terminated by `;`.
//! Each model describes its commands as templates such as `P{zone}V{volume};`
//! which are parsed once and rendered per request.

use crate::error::{AnthemError, Result};
use crate::types::{Model, Zone};
use std::collections::HashMap;

/// Parameter names a command template may reference
pub const PARAMETERS: [&str; 5] = ["zone", "volume", "source", "step", "source_num"];

/// Ends every statement on the wire
const TERMINATOR: char = ';';

/// Abstract receiver operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    ZoneQuery,

    PowerOn,
    PowerOff,
    PowerQuery,

    VolumeUp,
    VolumeDown,
    VolumeSet,
    VolumeQuery,

    MuteOn,
    MuteOff,
    MuteToggle,
    MuteQuery,

    SourceSet,
    SourceQuery,

    DecoderQuery,

    SourceActiveQuery,
    SourceNameShortQuery,
    SourceNameLongQuery,
    ModelQuery,
    HardwareQuery,
}

/// Values substituted into a command template
#[derive(Debug, Clone, PartialEq)]
pub struct CommandParams {
    pub zone: Zone,
    /// Volume in device units
    pub volume: Option<i32>,
    /// Source code in device units
    pub source: Option<String>,
    pub step: Option<u32>,
    /// Input slot for the source name queries
    pub source_num: Option<u32>,
}

impl CommandParams {
    pub fn new(zone: Zone) -> Self {
        Self {
            zone,
            volume: None,
            source: None,
            step: None,
            source_num: None,
        }
    }

    pub fn with_volume(mut self, volume: i32) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_step(mut self, step: u32) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_source_num(mut self, source_num: u32) -> Self {
        self.source_num = Some(source_num);
        self
    }

    fn value(&self, name: &str) -> Option<String> {
        match name {
            "zone" => Some(self.zone.to_string()),
            "volume" => self.volume.map(|v| v.to_string()),
            "source" => self.source.clone(),
            "step" => self.step.map(|s| s.to_string()),
            "source_num" => self.source_num.map(|n| n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder { name: String, optional: bool },
}

/// Parsed `{name}` template
///
/// `{name?}` marks a placeholder that renders as nothing when no value is
/// available; a plain `{name}` without a value is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireTemplate {
    text: String,
    segments: Vec<Segment>,
}

impl WireTemplate {
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = |reason: &str| AnthemError::InvalidTemplate {
            template: text.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = text.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        match c {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => return Err(invalid("nested '{'")),
                            _ => name.push(c),
                        }
                    }
                    if !closed {
                        return Err(invalid("unclosed '{'"));
                    }

                    let (name, optional) = match name.strip_suffix('?') {
                        Some(stripped) => (stripped.to_string(), true),
                        None => (name, false),
                    };
                    if name.is_empty()
                        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                    {
                        return Err(invalid("placeholder names must be [A-Za-z0-9_]+"));
                    }

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder { name, optional });
                }
                '}' => return Err(invalid("unmatched '}'")),
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            text: text.to_string(),
            segments,
        })
    }

    /// The template as written
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Names of all placeholders, in order of appearance
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Whether the template uses the named placeholder
    pub fn references(&self, name: &str) -> bool {
        self.placeholders().any(|p| p == name)
    }

    /// Render with values from `lookup`
    ///
    /// Returns the name of the first required placeholder `lookup` could not
    /// fill.
    pub fn render<F>(&self, mut lookup: F) -> std::result::Result<String, String>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut out = String::with_capacity(self.text.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder { name, optional } => match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None if *optional => {}
                    None => return Err(name.clone()),
                },
            }
        }
        Ok(out)
    }
}

/// A model's mapping from [`Command`] to wire template
#[derive(Debug, Clone)]
pub struct CommandTable {
    model: Model,
    templates: HashMap<Command, WireTemplate>,
}

impl CommandTable {
    /// Parse a model's templates
    ///
    /// Fails if a template is malformed or references a parameter outside
    /// [`PARAMETERS`].
    pub fn new(model: Model, entries: &[(Command, &str)]) -> Result<Self> {
        let mut templates = HashMap::with_capacity(entries.len());
        for (command, text) in entries {
            let template = WireTemplate::parse(text)?;
            if let Some(unknown) = template.placeholders().find(|p| !PARAMETERS.contains(p)) {
                return Err(AnthemError::InvalidTemplate {
                    template: text.to_string(),
                    reason: format!("unknown parameter `{}`", unknown),
                });
            }
            templates.insert(*command, template);
        }
        Ok(Self { model, templates })
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn supports(&self, command: Command) -> bool {
        self.templates.contains_key(&command)
    }

    pub fn template(&self, command: Command) -> Result<&WireTemplate> {
        self.templates
            .get(&command)
            .ok_or(AnthemError::UnknownCommand {
                model: self.model,
                command,
            })
    }

    /// Render the wire string for a command
    ///
    /// Parameter values may not contain the `;` statement terminator.
    pub fn resolve(&self, command: Command, params: &CommandParams) -> Result<String> {
        let template = self.template(command)?;
        for name in template.placeholders() {
            if let Some(value) = params.value(name).filter(|v| v.contains(TERMINATOR)) {
                return Err(AnthemError::InvalidParameter {
                    command,
                    parameter: name.to_string(),
                    value,
                });
            }
        }
        template
            .render(|name| params.value(name))
            .map_err(|parameter| AnthemError::MissingParameter { command, parameter })
    }
}
