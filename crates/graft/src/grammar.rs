//! Typed model of the metadata `tree-sitter generate` writes next to a parser.
//!
//! A generated grammar directory carries two JSON files besides `parser.c`:
//! `src/grammar.json`, the normalized rule table, and `src/node-types.json`,
//! the list of node kinds the parser can produce. Both are decoded with
//! [`serde_json`] and used by the loader to cross-check a compiled artifact.

use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

mod node_types;
mod rules;

pub use node_types::{parse_node_types, ChildSpec, NodeType, NodeTypeRef};
pub use rules::{Rule, RuleType, RuleValue};

/// A full Tree-sitter grammar definition, as found in `src/grammar.json`.
///
/// See <https://tree-sitter.github.io/tree-sitter/assets/schemas/grammar.schema.json>
#[derive(Debug, Clone, Deserialize)]
pub struct Grammar {
    /// Optional `$schema` field, typically used for editor integration.
    #[serde(rename = "$schema")]
    pub schema: Option<String>,

    /// The short name of the grammar (e.g. `"dml"` or `"json"`).
    pub name: String,

    /// Optional name of a base grammar that this one inherits from.
    pub inherits: Option<String>,

    /// Map of all rule identifiers to their corresponding definitions.
    pub rules: HashMap<String, Rule>,

    /// Tokens that may appear between any other tokens, such as whitespace or comments.
    #[serde(default)]
    pub extras: Vec<Rule>,

    /// Tokens produced by an external scanner.
    #[serde(default)]
    pub externals: Vec<Rule>,

    /// Names of rules that are inlined into their callers.
    #[serde(default)]
    pub inline: Vec<String>,

    /// Precedence orderings that control operator binding.
    #[serde(default)]
    pub precedences: Vec<Vec<Rule>>,

    /// Conflict groups the generator is told to expect.
    #[serde(default)]
    pub conflicts: Vec<Vec<String>>,

    /// Context-specific reserved word sets.
    pub reserved: Option<HashMap<String, Vec<Rule>>>,

    /// The rule used for keyword extraction.
    pub word: Option<String>,

    /// Hidden rules exposed as supertypes in the syntax tree.
    #[serde(default)]
    pub supertypes: Vec<String>,
}

impl Grammar {
    /// Returns the names of tokens declared by the external scanner.
    ///
    /// External tokens are referenced from rules as ordinary symbols, so they
    /// count as defined even though they have no entry in [`Grammar::rules`].
    pub fn external_names(&self) -> impl Iterator<Item = &str> {
        self.externals.iter().filter_map(Rule::symbol_name)
    }

    /// Returns `true` if `name` is defined by a rule or an external token.
    #[must_use]
    pub fn defines(&self, name: &str) -> bool {
        self.rules.contains_key(name) || self.external_names().any(|ext| ext == name)
    }
}

/// Parse a `grammar.json` document into a strongly typed [`Grammar`].
///
/// # Errors
///
/// Returns [`GrammarError::JsonParse`] if the provided string is not valid JSON
/// or does not match the grammar schema.
pub fn parse_grammar(json: &str) -> Result<Grammar, GrammarError> {
    serde_json::from_str(json).map_err(GrammarError::from)
}

/// Errors raised while decoding generator metadata.
#[derive(Debug, Clone, Error)]
pub enum GrammarError {
    /// The input JSON was syntactically invalid or structurally mismatched.
    ///
    /// The message is a single line ending in the offending line and column.
    #[error("JSON parse error: {0}")]
    JsonParse(String),
}

impl From<serde_json::Error> for GrammarError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonParse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_grammar() {
        let json = r#"{
            "name": "test",
            "rules": {
                "source_file": {
                    "type": "SYMBOL",
                    "name": "expression"
                },
                "expression": {
                    "type": "CHOICE",
                    "members": [
                        {
                            "type": "STRING",
                            "value": "hello"
                        },
                        {
                            "type": "PATTERN",
                            "value": "[0-9]+"
                        }
                    ]
                }
            }
        }"#;

        let grammar = parse_grammar(json).unwrap();
        assert_eq!(grammar.name, "test");
        assert_eq!(grammar.rules.len(), 2);
        assert!(grammar.externals.is_empty());
    }

    #[test]
    fn test_external_tokens_count_as_defined() {
        let json = r#"{
            "name": "dml",
            "rules": {
                "source_file": {"type": "SYMBOL", "name": "heredoc"}
            },
            "externals": [
                {"type": "SYMBOL", "name": "heredoc"},
                {"type": "STRING", "value": "}"}
            ],
            "word": "source_file"
        }"#;

        let grammar = parse_grammar(json).unwrap();
        assert!(grammar.defines("heredoc"));
        assert!(grammar.defines("source_file"));
        assert!(!grammar.defines("identifier"));
        assert_eq!(grammar.word.as_deref(), Some("source_file"));
    }

    #[test]
    fn test_reject_malformed_json() {
        let err = parse_grammar("{\"name\": \"dml\", \"rules\": ").unwrap_err();
        assert!(matches!(err, GrammarError::JsonParse(_)));
        assert!(err.to_string().starts_with("JSON parse error"));
    }

    #[test]
    fn test_parse_error_is_one_plain_line() {
        let err = parse_grammar("{\n  \"name\": \"dml\",\n  \"rules\": {\"a\": {\"type\": \"NOPE\"}}\n}")
            .unwrap_err()
            .to_string();
        assert!(!err.contains('\n'), "{err}");
        assert!(!err.contains('\x1b'), "{err}");
        assert!(err.contains("line 3"), "{err}");
    }

    #[test]
    fn test_string_and_numeric_values_decode() {
        let json = r#"{
            "name": "dml",
            "rules": {
                "source_file": {"type": "PREC", "value": 2, "content": {"type": "STRING", "value": "device"}},
                "word": {"type": "PREC_LEFT", "value": "binary", "content": {"type": "PATTERN", "value": "[a-z]+", "flags": "i"}}
            }
        }"#;

        let grammar = parse_grammar(json).unwrap();
        let source_file = &grammar.rules["source_file"];
        assert!(matches!(source_file.value, Some(RuleValue::Integer(2))));
        assert!(matches!(
            source_file.content.as_deref().and_then(|c| c.value.as_ref()),
            Some(RuleValue::String(s)) if s == "device"
        ));
        assert!(matches!(&grammar.rules["word"].value, Some(RuleValue::String(s)) if s == "binary"));
    }
}
