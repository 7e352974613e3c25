// src/services/translate.rs

//! Glossary-driven title translation.
//!
//! A crude but predictable word-for-word substitution. The table is data
//! (`data/glossary.toml`), so it can be swapped without touching code.

use std::path::Path;

use regex::{NoExpand, Regex};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{Replacement, TranslationConfig};

const BUILTIN_GLOSSARY: &str = include_str!("../../data/glossary.toml");

/// Substitution table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Glossary {
    /// Multi-word rules, applied first
    #[serde(default)]
    pub phrases: Vec<Replacement>,

    /// Single-word rules
    #[serde(default)]
    pub words: Vec<Replacement>,

    /// Words removed after substitution
    #[serde(default)]
    pub drop_words: Vec<String>,
}

impl Glossary {
    /// The table shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Ok(toml::from_str(BUILTIN_GLOSSARY)?)
    }

    /// Load a table from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

/// Compiled glossary.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    rules: Vec<(Regex, String)>,
    drops: Vec<Regex>,
}

impl Translator {
    /// A translator that returns its input unchanged.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Compile a glossary into case-insensitive, word-bounded rules.
    pub fn new(glossary: &Glossary) -> Result<Self> {
        let rules = glossary
            .phrases
            .iter()
            .chain(&glossary.words)
            .map(|r| -> Result<(Regex, String)> { Ok((word_pattern(&r.from)?, r.to.clone())) })
            .collect::<Result<Vec<_>>>()?;

        let drops = glossary
            .drop_words
            .iter()
            .map(|w| word_pattern(w))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules, drops })
    }

    /// Build the translator described by configuration.
    pub fn from_config(config: &TranslationConfig) -> Result<Self> {
        if !config.enabled {
            return Ok(Self::disabled());
        }
        let glossary = match &config.glossary_file {
            Some(path) => Glossary::load(path)?,
            None => Glossary::builtin()?,
        };
        Self::new(&glossary)
    }

    /// Translate a title. Pure: the same input always yields the same output.
    pub fn translate(&self, text: &str) -> String {
        if self.rules.is_empty() && self.drops.is_empty() {
            return text.to_string();
        }

        let mut result = text.to_string();
        for (pattern, replacement) in &self.rules {
            result = pattern
                .replace_all(&result, NoExpand(replacement))
                .into_owned();
        }
        for pattern in &self.drops {
            result = pattern.replace_all(&result, "").into_owned();
        }

        result.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

fn word_pattern(word: &str) -> Result<Regex> {
    let pattern = format!(r"(?i)\b{}\b", regex::escape(word));
    Regex::new(&pattern).map_err(|e| AppError::pattern(pattern, e))
}
