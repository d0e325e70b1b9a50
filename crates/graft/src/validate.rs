//! Validation routines for Tree-sitter grammars.
//!
//! This module performs structural checks over parsed [`Grammar`] definitions:
//! every symbol a rule references must be defined, and the top-level name
//! lists (`word`, `inline`, `supertypes`, `conflicts`) may only name defined
//! rules. Softer findings (unreachable rules, left recursion, mixed precedence
//! levels) are reported through `tracing` and never fail validation.

use crate::grammar::{Grammar, Rule, RuleType};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tracing::{info, warn};

/// Represents a validation failure encountered when checking a grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// The descriptive human-readable error message.
    pub message: String,
}

impl ValidationError {
    fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

/// Performs semantic validation of a parsed [`Grammar`].
///
/// `entry` names the start rule used for the reachability lint. `grammar.json`
/// is decoded into a hash map, so the start rule cannot be recovered from rule
/// order; pass the root kind from `node-types.json` when it is known.
///
/// # Errors
///
/// Returns a [`ValidationError`] if the grammar has no rules, references an
/// undefined symbol, or names an undefined rule in a top-level list.
pub fn validate(grammar: &Grammar, entry: Option<&str>) -> Result<(), ValidationError> {
    if grammar.rules.is_empty() {
        return Err(ValidationError::new("grammar has no rules"));
    }

    check_undefined_symbols(grammar)?;
    check_declared_names(grammar)?;

    if let Some(entry) = entry {
        check_unreachable_rules(grammar, entry);
    }
    check_left_recursion(grammar);
    check_precedence(grammar);

    Ok(())
}

fn check_undefined_symbols(grammar: &Grammar) -> Result<(), ValidationError> {
    let mut names: Vec<_> = grammar.rules.keys().collect();
    names.sort();

    for rule_name in names {
        let mut referenced = Vec::new();
        grammar.rules[rule_name].referenced_symbols(&mut referenced);
        if let Some(name) = referenced.into_iter().find(|name| !grammar.defines(name)) {
            return Err(ValidationError::new(format!(
                "undefined symbol '{name}' referenced in rule '{rule_name}'"
            )));
        }
    }

    let mut referenced = Vec::new();
    for extra in &grammar.extras {
        extra.referenced_symbols(&mut referenced);
    }
    if let Some(name) = referenced.into_iter().find(|name| !grammar.defines(name)) {
        return Err(ValidationError::new(format!(
            "undefined symbol '{name}' referenced in extras"
        )));
    }

    Ok(())
}

fn check_declared_names(grammar: &Grammar) -> Result<(), ValidationError> {
    let lists = [
        ("word", grammar.word.iter().collect::<Vec<_>>()),
        ("inline", grammar.inline.iter().collect()),
        ("supertypes", grammar.supertypes.iter().collect()),
        ("conflicts", grammar.conflicts.iter().flatten().collect()),
    ];

    for (list, names) in lists {
        if let Some(name) = names.into_iter().find(|name| !grammar.defines(name)) {
            return Err(ValidationError::new(format!(
                "'{list}' names undefined rule '{name}'"
            )));
        }
    }
    Ok(())
}

fn check_unreachable_rules(grammar: &Grammar, entry: &str) {
    let mut reachable = HashSet::new();
    let mut to_visit = vec![entry];

    // Extras and external tokens may appear anywhere.
    for extra in &grammar.extras {
        extra.referenced_symbols(&mut to_visit);
    }
    to_visit.extend(grammar.external_names());

    while let Some(rule_name) = to_visit.pop() {
        if !reachable.insert(rule_name) {
            continue;
        }
        if let Some(rule) = grammar.rules.get(rule_name) {
            rule.referenced_symbols(&mut to_visit);
        }
    }

    let mut unreachable: Vec<_> = grammar
        .rules
        .keys()
        .filter(|name| !reachable.contains(name.as_str()))
        .filter(|name| grammar.word.as_ref() != Some(*name))
        .collect();
    unreachable.sort();

    for rule_name in unreachable {
        warn!(grammar = %grammar.name, rule = %rule_name, "unreachable rule");
    }
}

fn check_left_recursion(grammar: &Grammar) {
    for (rule_name, rule) in &grammar.rules {
        if has_immediate_left_recursion(rule, rule_name) {
            info!(grammar = %grammar.name, rule = %rule_name, "rule is left-recursive");
        }
    }
}

fn has_immediate_left_recursion(rule: &Rule, target: &str) -> bool {
    match rule.rule_type {
        RuleType::Symbol => rule.name.as_deref() == Some(target),
        RuleType::Seq => rule
            .members
            .first()
            .is_some_and(|first| has_immediate_left_recursion(first, target)),
        RuleType::Choice => rule
            .members
            .iter()
            .any(|member| has_immediate_left_recursion(member, target)),
        RuleType::Prec
        | RuleType::PrecLeft
        | RuleType::PrecRight
        | RuleType::PrecDynamic
        | RuleType::Field
        | RuleType::Alias => rule
            .content
            .as_deref()
            .is_some_and(|content| has_immediate_left_recursion(content, target)),
        _ => false,
    }
}

fn check_precedence(grammar: &Grammar) {
    let mut prec_levels: BTreeMap<&str, Vec<i32>> = BTreeMap::new();

    for (rule_name, rule) in &grammar.rules {
        collect_precedence_levels(rule, &mut prec_levels, rule_name);
    }

    for (rule, mut levels) in prec_levels {
        levels.sort_unstable();
        levels.dedup();
        if levels.len() > 1 {
            warn!(grammar = %grammar.name, rule, ?levels, "rule mixes precedence levels");
        }
    }
}

fn collect_precedence_levels<'a>(
    rule: &Rule,
    levels: &mut BTreeMap<&'a str, Vec<i32>>,
    context: &'a str,
) {
    if let Some(p) = rule.precedence() {
        levels.entry(context).or_default().push(p);
    }
    for child in rule.children() {
        collect_precedence_levels(child, levels, context);
    }
}
