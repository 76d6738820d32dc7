use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::rule::ReplaceRule;

#[derive(Debug, Deserialize, Default)]
pub struct RuleFile {
    #[serde(default)]
    pub rename_extension: bool,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

#[derive(Debug, Deserialize)]
pub struct RuleSpec {
    pub pattern: String,
    /// Empty replacement deletes the matches.
    #[serde(default)]
    pub replacement: String,
}

impl RuleFile {
    pub fn compile(&self) -> Result<Vec<ReplaceRule>> {
        self.rules
            .iter()
            .map(|spec| ReplaceRule::new(&spec.pattern, &spec.replacement))
            .collect()
    }
}

/// Loads a rule chain from a YAML or JSON document, chosen by extension.
pub fn load_rules(path: &Path) -> Result<RuleFile> {
    let data = fs::read(path).with_context(|| format!("reading rules file {}", path.display()))?;
    if path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
    {
        Ok(serde_json::from_slice(&data)?)
    } else {
        Ok(serde_yaml::from_slice(&data)?)
    }
}
