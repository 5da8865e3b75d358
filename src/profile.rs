use crate::command::{Command, CommandParams, CommandTable};
use crate::error::Result;
use crate::grammar::{GrammarSet, StandbyNormalizer};
use crate::protocol;
use crate::sources::SourceMap;
use crate::state::ZoneState;
use crate::types::{Model, Zone};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Everything needed to speak one receiver dialect
///
/// Built once, then shared read-only (usually behind an `Arc`) by every
/// client talking to that model. All templates and patterns are parsed and
/// compiled here, so a bad table fails at construction rather than on the
/// first exchange.
#[derive(Debug, Clone)]
pub struct ModelProfile {
    model: Model,
    commands: CommandTable,
    grammar: GrammarSet,
    normalizer: StandbyNormalizer,
    sources: SourceMap,
}

impl ModelProfile {
    /// Built-in profile for a model
    pub fn for_model(model: Model) -> Result<Self> {
        Self::builder(model)
            .commands(protocol::commands(model))
            .patterns(protocol::patterns(model))
            .standby_rules(protocol::standby_rules(model))
            .sources(SourceMap::for_model(model))
            .build()
    }

    /// Start a profile from custom tables
    pub fn builder<'a>(model: Model) -> ModelProfileBuilder<'a> {
        ModelProfileBuilder {
            model,
            commands: &[],
            patterns: &[],
            standby_rules: &[],
            sources: SourceMap::new(),
        }
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn grammar(&self) -> &GrammarSet {
        &self.grammar
    }

    pub fn normalizer(&self) -> &StandbyNormalizer {
        &self.normalizer
    }

    /// Default source list
    pub fn sources(&self) -> &SourceMap {
        &self.sources
    }

    /// Render a command for this model
    pub fn resolve(&self, command: Command, params: &CommandParams) -> Result<String> {
        self.commands.resolve(command, params)
    }

    /// Canonicalize standby replies
    pub fn normalize<'a>(&self, response: &'a str) -> Cow<'a, str> {
        self.normalizer.normalize(response)
    }

    /// Normalize then extract a raw response
    pub fn parse(&self, response: &str) -> BTreeMap<Zone, ZoneState> {
        let canonical = self.normalize(response);
        self.grammar.extract(&canonical)
    }
}

/// Builder for [`ModelProfile`]
pub struct ModelProfileBuilder<'a> {
    model: Model,
    commands: &'a [(Command, &'a str)],
    patterns: &'a [&'a str],
    standby_rules: &'a [(&'a str, &'a str)],
    sources: SourceMap,
}

impl<'a> ModelProfileBuilder<'a> {
    pub fn commands(mut self, commands: &'a [(Command, &'a str)]) -> Self {
        self.commands = commands;
        self
    }

    pub fn patterns(mut self, patterns: &'a [&'a str]) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn standby_rules(mut self, rules: &'a [(&'a str, &'a str)]) -> Self {
        self.standby_rules = rules;
        self
    }

    pub fn sources(mut self, sources: SourceMap) -> Self {
        self.sources = sources;
        self
    }

    pub fn build(self) -> Result<ModelProfile> {
        Ok(ModelProfile {
            model: self.model,
            commands: CommandTable::new(self.model, self.commands)?,
            grammar: GrammarSet::new(self.patterns)?,
            normalizer: StandbyNormalizer::new(self.standby_rules)?,
            sources: self.sources,
        })
    }
}
