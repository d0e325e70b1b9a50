//! Load compiled tree-sitter grammars and check them against the runtime.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::multiple_crate_versions)]

/// ABI version bands and the ABI marker in generated parser source.
pub mod abi;

/// Describing compiled grammars and discovering them in grammar directories.
///
/// An artifact pairs the compiled language with whatever generator metadata
/// is on hand. Discovery follows the layout `tree-sitter generate` and
/// `tree-sitter build` produce, so a grammar checkout can be pointed at as is.
pub mod artifact;

/// The load failure taxonomy.
pub mod error;

/// Typed models of `grammar.json` and `node-types.json`.
///
/// This module defines how graft understands the declarative shape of a
/// language. The loader uses it to cross-check the compiled artifact against
/// what the generator says it should contain.
pub mod grammar;

/// Parsing with a loaded grammar and summarizing the resulting tree.
pub mod inspect;

mod library;

/// The load-and-validate entry point and the owned language handle.
pub mod loader;

/// Explicit process-wide bookkeeping of load outcomes.
pub mod registry;

/// Grammar validation and consistency checking utilities.
///
/// Validation rejects rule tables whose symbols do not resolve, before the
/// compiled parser built from them is trusted.
pub mod validate;

pub use abi::AbiRange;
pub use artifact::{ArtifactSource, GrammarArtifact, Metadata};
pub use error::{LoadError, LoadErrorKind};
pub use grammar::{parse_grammar, parse_node_types, Grammar, GrammarError, NodeType, Rule};
pub use loader::{load_and_validate, LanguageHandle, Loader};
pub use registry::{LoadState, Registry};
pub use validate::{validate, ValidationError};
