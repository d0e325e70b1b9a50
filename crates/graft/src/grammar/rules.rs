//! Rule nodes of a `grammar.json` rule table.

use serde::Deserialize;

/// A grammar rule in the Tree-sitter format.
///
/// Each rule is identified by a [`RuleType`] and carries type-specific fields
/// such as `members` (for `SEQ`/`CHOICE`) or `content` (for wrappers).
#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    /// The discriminant identifying what kind of rule this is.
    #[serde(rename = "type")]
    pub rule_type: RuleType,

    /// Optional literal or numeric value, depending on rule kind.
    pub value: Option<RuleValue>,

    /// Optional name used by `SYMBOL`, `FIELD`, or `ALIAS` rules.
    pub name: Option<String>,

    /// Optional nested rule for unary constructs such as `REPEAT` or `PREC`.
    pub content: Option<Box<Rule>>,

    /// List of child rules for compound constructs (`SEQ`, `CHOICE`).
    #[serde(default)]
    pub members: Vec<Rule>,

    /// Whether the node produced by an `ALIAS` is named.
    pub named: Option<bool>,

    /// Regex flags of a `PATTERN` rule.
    pub flags: Option<String>,

    /// Context label used by `RESERVED` rules.
    pub context_name: Option<String>,
}

/// A literal or numeric value attached to a rule node.
///
/// `grammar.json` stores both under the same `value` key, so the variant is
/// chosen by the JSON type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    /// A string literal value (e.g. `"+"`, `"if"`) or a named precedence.
    String(String),

    /// An integer numeric value (used by precedence modifiers).
    Integer(i32),
}

/// The recognized Tree-sitter rule types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RuleType {
    /// An empty production.
    #[serde(rename = "BLANK")]
    Blank,
    /// A literal string token.
    #[serde(rename = "STRING")]
    String,
    /// A regular-expression pattern token.
    #[serde(rename = "PATTERN")]
    Pattern,
    /// A reference to another named rule.
    #[serde(rename = "SYMBOL")]
    Symbol,
    /// One of several alternatives.
    #[serde(rename = "CHOICE")]
    Choice,
    /// A sequential composition of member rules.
    #[serde(rename = "SEQ")]
    Seq,
    /// Zero or more repetitions.
    #[serde(rename = "REPEAT")]
    Repeat,
    /// One or more repetitions.
    #[serde(rename = "REPEAT1")]
    Repeat1,
    /// A generic precedence wrapper.
    #[serde(rename = "PREC")]
    Prec,
    /// A left-associative precedence wrapper.
    #[serde(rename = "PREC_LEFT")]
    PrecLeft,
    /// A right-associative precedence wrapper.
    #[serde(rename = "PREC_RIGHT")]
    PrecRight,
    /// A dynamic (runtime) precedence wrapper.
    #[serde(rename = "PREC_DYNAMIC")]
    PrecDynamic,
    /// A named field applied to a subrule.
    #[serde(rename = "FIELD")]
    Field,
    /// An alias providing an alternate node name.
    #[serde(rename = "ALIAS")]
    Alias,
    /// A tokenization wrapper.
    #[serde(rename = "TOKEN")]
    Token,
    /// A token that must appear without leading trivia.
    #[serde(rename = "IMMEDIATE_TOKEN")]
    ImmediateToken,
    /// A reserved-word context wrapper.
    #[serde(rename = "RESERVED")]
    Reserved,
}

impl Rule {
    /// Returns the referenced symbol name if this is a `SYMBOL` rule.
    #[must_use]
    pub fn symbol_name(&self) -> Option<&str> {
        if self.rule_type == RuleType::Symbol {
            self.name.as_deref()
        } else {
            None
        }
    }

    /// Returns the numeric precedence value if this rule is a precedence wrapper.
    ///
    /// Named precedences (string values) yield `None`.
    #[must_use]
    pub fn precedence(&self) -> Option<i32> {
        match self.rule_type {
            RuleType::Prec | RuleType::PrecLeft | RuleType::PrecRight | RuleType::PrecDynamic => {
                match self.value {
                    Some(RuleValue::Integer(i)) => Some(i),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Iterates over the direct sub-rules, whether held in `content` or `members`.
    pub fn children(&self) -> impl Iterator<Item = &Rule> {
        self.content.as_deref().into_iter().chain(self.members.iter())
    }

    /// Collects every symbol referenced anywhere below (and including) this rule.
    pub fn referenced_symbols<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(name) = self.symbol_name() {
            out.push(name);
        }
        for child in self.children() {
            child.referenced_symbols(out);
        }
    }
}
