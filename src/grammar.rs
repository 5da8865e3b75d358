//! Response grammar and standby normalization.
//!
//! Replies are plain text such as `P1S3V-40M0D2`. Each model lists regular
//! expressions with a `zone` capture plus one field capture; all of them are
//! run against every reply. Before that, standby rules rewrite the replies a
//! sleeping receiver sends into the shape of an ordinary power-off status.

use crate::command::WireTemplate;
use crate::error::{AnthemError, Result};
use crate::state::ZoneState;
use crate::types::Zone;
use regex::Regex;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Name of the capture every extraction pattern must provide
pub const ZONE_CAPTURE: &str = "zone";

/// Compiled extraction pattern
#[derive(Debug, Clone)]
pub struct ExtractionPattern {
    regex: Regex,
    fields: Vec<String>,
}

impl ExtractionPattern {
    /// Compile a pattern and check its captures
    pub fn new(pattern: &str) -> Result<Self> {
        let malformed = |reason: String| AnthemError::MalformedPattern {
            pattern: pattern.to_string(),
            reason,
        };

        let regex = Regex::new(pattern).map_err(|e| malformed(e.to_string()))?;

        let names: Vec<&str> = regex.capture_names().flatten().collect();
        if !names.contains(&ZONE_CAPTURE) {
            return Err(malformed("missing `zone` capture".to_string()));
        }
        let fields: Vec<String> = names
            .into_iter()
            .filter(|name| *name != ZONE_CAPTURE)
            .map(str::to_string)
            .collect();
        if fields.is_empty() {
            return Err(malformed("no field capture".to_string()));
        }

        Ok(Self { regex, fields })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Fields this pattern can report
    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

/// Ordered extraction patterns for one model
#[derive(Debug, Clone, Default)]
pub struct GrammarSet {
    patterns: Vec<ExtractionPattern>,
}

impl GrammarSet {
    pub fn new(patterns: &[&str]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| ExtractionPattern::new(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn patterns(&self) -> &[ExtractionPattern] {
        &self.patterns
    }

    /// Extract per-zone fields from a normalized response
    ///
    /// Every pattern is tried in order. When two patterns report the same
    /// field for the same zone, the earlier one wins.
    pub fn extract(&self, response: &str) -> BTreeMap<Zone, ZoneState> {
        let mut zones: BTreeMap<Zone, ZoneState> = BTreeMap::new();

        for pattern in &self.patterns {
            let Some(caps) = pattern.regex.captures(response) else {
                continue;
            };
            let Some(zone) = caps.name(ZONE_CAPTURE).and_then(|m| single_char(m.as_str())) else {
                tracing::debug!(
                    "Pattern {} matched {:?} without a usable zone",
                    pattern.as_str(),
                    response
                );
                continue;
            };

            let bucket = zones.entry(Zone::from_code(zone)).or_default();
            for field in &pattern.fields {
                if let Some(value) = caps.name(field) {
                    bucket.insert_if_absent(field, value.as_str());
                }
            }
        }

        zones
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// One standby rewrite: when `pattern` matches, the whole response is
/// replaced by `replacement` rendered from the pattern's captures
#[derive(Debug, Clone)]
pub struct StandbyRule {
    regex: Regex,
    replacement: WireTemplate,
}

impl StandbyRule {
    pub fn new(pattern: &str, replacement: &str) -> Result<Self> {
        let malformed = |reason: String| AnthemError::MalformedPattern {
            pattern: pattern.to_string(),
            reason,
        };

        let regex = Regex::new(pattern).map_err(|e| malformed(e.to_string()))?;
        let replacement = WireTemplate::parse(replacement)?;

        let names: Vec<&str> = regex.capture_names().flatten().collect();
        if let Some(missing) = replacement.placeholders().find(|p| !names.contains(p)) {
            return Err(malformed(format!(
                "replacement `{}` uses `{}` which the pattern does not capture",
                replacement.as_str(),
                missing
            )));
        }

        Ok(Self { regex, replacement })
    }

    /// `None` when the pattern does not match; otherwise the rendered
    /// replacement, or the name of a capture that took no part in the match
    fn apply(&self, response: &str) -> Option<std::result::Result<String, String>> {
        let caps = self.regex.captures(response)?;
        Some(
            self.replacement
                .render(|name| caps.name(name).map(|m| m.as_str().to_string())),
        )
    }
}

/// Ordered standby rules for one model
#[derive(Debug, Clone, Default)]
pub struct StandbyNormalizer {
    rules: Vec<StandbyRule>,
}

impl StandbyNormalizer {
    pub fn new(rules: &[(&str, &str)]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|(pattern, replacement)| StandbyRule::new(pattern, replacement))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Rewrite a standby reply into canonical form
    ///
    /// The first matching rule wins; with no match the response is returned
    /// unchanged. A matching rule whose replacement cannot be rendered also
    /// leaves the response unchanged.
    pub fn normalize<'a>(&self, response: &'a str) -> Cow<'a, str> {
        for rule in &self.rules {
            match rule.apply(response) {
                Some(Ok(canonical)) => {
                    tracing::debug!("Normalized response {:?} to {:?}", response, canonical);
                    return Cow::Owned(canonical);
                }
                Some(Err(capture)) => {
                    tracing::warn!(
                        "Standby rule {:?} matched {:?} without capturing `{}`",
                        rule.regex.as_str(),
                        response,
                        capture
                    );
                    return Cow::Borrowed(response);
                }
                None => {}
            }
        }
        Cow::Borrowed(response)
    }
}
