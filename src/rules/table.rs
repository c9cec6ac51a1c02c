/// Ordered substitution rule tables
///
/// Rules are kept in registration order and tried first to last. Later
/// rules may overlap earlier ones; the earliest match always wins.
use regex::Regex;

use super::compiler::{compile_pattern, Anchor};
use super::template::{escape_quotes, render};
use crate::error::BuildError;

/// A compiled pattern and the template it rewrites matches into
#[derive(Debug, Clone)]
pub struct SubstitutionRule {
    /// Pattern as written by the author
    pub pattern: String,
    /// Anchored matcher
    pub matcher: Regex,
    /// Output template (for leading-token rules, the speaker name)
    pub template: String,
}

impl SubstitutionRule {
    pub fn new(pattern: &str, template: &str, anchor: Anchor) -> Result<Self, BuildError> {
        Ok(Self {
            pattern: pattern.trim().to_string(),
            matcher: compile_pattern(pattern, anchor)?,
            template: template.trim().to_string(),
        })
    }

    /// Captured groups with double quotes escaped
    fn groups(&self, line: &str) -> Option<Vec<String>> {
        let caps = self.matcher.captures(line)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|m| escape_quotes(m.map_or("", |m| m.as_str())))
                .collect(),
        )
    }
}

/// Name affixes applied to leading-token rules while NVL mode is active
#[derive(Debug, Clone, Copy)]
pub struct NvlAffix<'a> {
    pub prefix: &'a str,
    pub suffix: &'a str,
}

/// The line-rule and leading-token-rule tables
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    line_rules: Vec<SubstitutionRule>,
    prefix_rules: Vec<SubstitutionRule>,
}

impl RuleSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a full-line rule
    pub fn add_line_rule(&mut self, pattern: &str, template: &str) -> Result<(), BuildError> {
        let rule = SubstitutionRule::new(pattern, template, Anchor::FullLine)?;
        self.line_rules.push(rule);
        Ok(())
    }

    /// Register a leading-token rule
    pub fn add_prefix_rule(&mut self, pattern: &str, name: &str) -> Result<(), BuildError> {
        let rule = SubstitutionRule::new(pattern, name, Anchor::LeadingToken)?;
        self.prefix_rules.push(rule);
        Ok(())
    }

    #[must_use]
    pub fn line_rules(&self) -> &[SubstitutionRule] {
        &self.line_rules
    }

    #[must_use]
    pub fn prefix_rules(&self) -> &[SubstitutionRule] {
        &self.prefix_rules
    }

    /// Rewrite `line` with the first matching line rule.
    ///
    /// Returns `None` when no rule matches.
    pub fn apply_line_rules(&self, line: &str) -> Option<Result<String, BuildError>> {
        self.line_rules.iter().find_map(|rule| {
            let groups = rule.groups(line)?;
            let groups: Vec<&str> = groups.iter().map(String::as_str).collect();
            Some(render(&rule.template, &groups))
        })
    }

    /// Rewrite `line` as dialogue with the first matching leading-token rule.
    ///
    /// The trailing argument becomes the quoted text after the rendered name.
    pub fn apply_prefix_rules(
        &self,
        line: &str,
        nvl: Option<NvlAffix<'_>>,
    ) -> Option<Result<String, BuildError>> {
        self.prefix_rules.iter().find_map(|rule| {
            let mut groups = rule.groups(line)?;
            let argument = groups.pop().unwrap_or_default();
            let groups: Vec<&str> = groups.iter().map(String::as_str).collect();
            Some(render(&rule.template, &groups).map(|name| match nvl {
                Some(affix) => format!("{}{name}{} \"{argument}\"", affix.prefix, affix.suffix),
                None => format!("{name} \"{argument}\""),
            }))
        })
    }
}
