//! Entries of `src/node-types.json`.

use serde::Deserialize;
use std::collections::HashMap;

use super::GrammarError;

/// One node kind the generated parser can produce.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeType {
    /// The node kind, e.g. `"device_declaration"` or `";"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Whether the kind is a named node (as opposed to an anonymous token).
    pub named: bool,

    /// Marks the start rule (newer generators only).
    pub root: Option<bool>,

    /// Marks kinds that may appear anywhere, such as comments.
    pub extra: Option<bool>,

    /// Field children, keyed by field name.
    pub fields: Option<HashMap<String, ChildSpec>>,

    /// Unnamed-field children.
    pub children: Option<ChildSpec>,

    /// Concrete kinds grouped under this supertype.
    pub subtypes: Option<Vec<NodeTypeRef>>,
}

/// The kinds permitted in a field or child slot.
#[derive(Debug, Clone, Deserialize)]
pub struct ChildSpec {
    /// Whether the slot may hold more than one node.
    pub multiple: bool,
    /// Whether the slot must be filled.
    pub required: bool,
    /// The permitted kinds.
    pub types: Vec<NodeTypeRef>,
}

/// A reference to a node kind by name and namedness.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeTypeRef {
    /// The node kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// Whether the referenced kind is named.
    pub named: bool,
}

impl NodeType {
    /// Returns `true` for supertypes, which exist in the tree only through their subtypes.
    #[must_use]
    pub fn is_supertype(&self) -> bool {
        self.subtypes.is_some()
    }

    /// Returns `true` if the compiled symbol table must contain this kind.
    ///
    /// Supertypes and hidden (`_`-prefixed) kinds may be elided by the generator.
    #[must_use]
    pub fn must_resolve(&self) -> bool {
        !self.is_supertype() && !self.kind.starts_with('_')
    }
}

/// Parse a `node-types.json` document.
///
/// # Errors
///
/// Returns [`GrammarError::JsonParse`] if the document does not match the schema.
pub fn parse_node_types(json: &str) -> Result<Vec<NodeType>, GrammarError> {
    serde_json::from_str(json).map_err(GrammarError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_node_types() {
        let json = r#"[
            {
                "type": "_value",
                "named": true,
                "subtypes": [{"type": "number", "named": true}]
            },
            {
                "type": "pair",
                "named": true,
                "fields": {
                    "key": {
                        "multiple": false,
                        "required": true,
                        "types": [{"type": "string", "named": true}]
                    }
                }
            },
            {"type": "document", "named": true, "root": true},
            {"type": ":", "named": false}
        ]"#;

        let types = parse_node_types(json).unwrap();
        assert_eq!(types.len(), 4);
        assert!(types[0].is_supertype());
        assert!(!types[0].must_resolve());
        assert!(types[1].must_resolve());
        assert_eq!(types[2].root, Some(true));
        assert!(!types[3].named);
    }
}
