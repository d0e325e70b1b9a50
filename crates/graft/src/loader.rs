//! The load-and-validate entry point.
//!
//! Loading runs the static checks first (the `parser.c` ABI marker and the
//! `grammar.json` rule table), so a broken artifact is classified before any
//! foreign code runs. The compiled language is then acquired and exercised
//! through the runtime: ABI version, symbol and field tables, the node kinds
//! promised by `node-types.json`, and a parse of empty input.

use std::borrow::Cow;
use std::fmt;

use libloading::Library;
use tracing::{debug, debug_span, info};
use tree_sitter::{Language, LanguageError, Parser};

use crate::abi::{scan_parser_source, AbiRange};
use crate::artifact::{ArtifactSource, GrammarArtifact, Metadata};
use crate::error::LoadError;
use crate::grammar::{parse_grammar, parse_node_types, NodeType};
use crate::library;
use crate::validate::validate;

/// A grammar the runtime has accepted.
///
/// Dropping the handle releases the language. A grammar library, once opened,
/// stays mapped until the process exits, so parsers and trees created from a
/// handle remain valid after the handle is gone.
pub struct LanguageHandle {
    language: Language,
    name: String,
    abi_version: usize,
    library: Option<&'static Library>,
}

impl LanguageHandle {
    /// The grammar name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The runtime language.
    #[must_use]
    pub fn language(&self) -> &Language {
        &self.language
    }

    /// The ABI version the grammar was generated for.
    #[must_use]
    pub fn abi_version(&self) -> usize {
        self.abi_version
    }

    /// Number of node kinds (symbols and aliases) in the grammar.
    #[must_use]
    pub fn node_kind_count(&self) -> usize {
        self.language.node_kind_count()
    }

    /// Number of field names in the grammar.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.language.field_count()
    }

    /// Returns `true` if the grammar was loaded from a shared library.
    #[must_use]
    pub fn is_library_backed(&self) -> bool {
        self.library.is_some()
    }

    /// Creates a parser for this grammar.
    ///
    /// # Errors
    ///
    /// Returns the runtime's [`LanguageError`] if it rejects the language,
    /// which cannot happen for a handle that passed validation.
    pub fn parser(&self) -> Result<Parser, LanguageError> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }
}

impl fmt::Debug for LanguageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageHandle")
            .field("name", &self.name)
            .field("abi_version", &self.abi_version)
            .field("library_backed", &self.library.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for LanguageHandle {
    fn drop(&mut self) {
        debug!(grammar = %self.name, "releasing grammar handle");
    }
}

/// Loader options.
#[derive(Debug, Clone, Copy, Default)]
pub struct Loader {
    abi: AbiRange,
    strict: bool,
}

impl Loader {
    /// A loader accepting the linked runtime's ABI range, non-strict.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the accepted ABI range.
    #[must_use]
    pub fn abi_range(mut self, abi: impl Into<AbiRange>) -> Self {
        self.abi = abi.into();
        self
    }

    /// In strict mode, absent metadata is an error instead of a skipped check.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Loads `artifact` and confirms the runtime can use it.
    ///
    /// # Errors
    ///
    /// - [`LoadError::ArtifactMissing`] if the library, its entry point, or a
    ///   required metadata file cannot be found or read.
    /// - [`LoadError::AbiMismatch`] if the recorded ABI version is outside the
    ///   accepted range or the runtime refuses the language.
    /// - [`LoadError::StructurallyInvalid`] if the artifact is corrupt: bad
    ///   metadata, an unloadable library, a null language, or symbol tables
    ///   that disagree with the metadata.
    pub fn load_and_validate(&self, artifact: &GrammarArtifact) -> Result<LanguageHandle, LoadError> {
        let name = artifact.name();
        let _span = debug_span!("load_grammar", grammar = name).entered();

        let parser_source = self.read_metadata(name, artifact.parser_source(), "parser.c")?;
        let grammar_json = self.read_metadata(name, artifact.grammar_json(), "grammar.json")?;
        let node_types_json =
            self.read_metadata(name, artifact.node_types(), "node-types.json")?;

        let declared_abi = parser_source
            .as_deref()
            .map(|source| self.check_declared_abi(name, source))
            .transpose()?;

        let node_types = node_types_json
            .as_deref()
            .map(|json| {
                parse_node_types(json)
                    .map_err(|e| LoadError::invalid(name, format!("node-types.json: {e}")))
            })
            .transpose()?;

        if let Some(json) = grammar_json.as_deref() {
            check_grammar(name, json, node_types.as_deref())?;
        }

        let (language, library) = library::acquire(name, artifact.source())?;
        let abi_version = language.abi_version();
        debug!(grammar = name, abi_version, "language acquired");

        self.check_runtime_abi(name, &language)?;
        if let Some(declared) = declared_abi {
            if declared != abi_version {
                return Err(LoadError::invalid(
                    name,
                    format!(
                        "library reports ABI {abi_version} but parser.c declares {declared}; \
                         the library is stale"
                    ),
                ));
            }
        }
        check_language_structure(name, &language, node_types.as_deref())?;

        info!(
            grammar = name,
            abi_version,
            node_kinds = language.node_kind_count(),
            library = matches!(artifact.source(), ArtifactSource::Library { .. }),
            "grammar loaded"
        );

        Ok(LanguageHandle {
            language,
            name: name.to_owned(),
            abi_version,
            library,
        })
    }

    fn read_metadata<'a>(
        &self,
        name: &str,
        metadata: Option<&'a Metadata>,
        file: &str,
    ) -> Result<Option<Cow<'a, str>>, LoadError> {
        match metadata {
            Some(metadata) => metadata
                .read()
                .map(Some)
                .map_err(|e| LoadError::missing(name, format!("cannot read {file}: {e}"))),
            None if self.strict => Err(LoadError::missing(name, format!("no {file} supplied"))),
            None => {
                debug!(grammar = name, file, "metadata not supplied, skipping its checks");
                Ok(None)
            }
        }
    }

    fn mismatch(&self, name: &str, found: usize) -> LoadError {
        LoadError::AbiMismatch {
            name: name.to_owned(),
            found,
            min: self.abi.min(),
            max: self.abi.max(),
        }
    }

    fn check_declared_abi(&self, name: &str, source: &str) -> Result<usize, LoadError> {
        let declared = scan_parser_source(source).ok_or_else(|| {
            LoadError::invalid(name, "parser.c has no LANGUAGE_VERSION marker")
        })?;
        if !self.abi.contains(declared) {
            return Err(self.mismatch(name, declared));
        }
        Ok(declared)
    }

    fn check_runtime_abi(&self, name: &str, language: &Language) -> Result<(), LoadError> {
        let version = language.abi_version();
        if !self.abi.contains(version) {
            return Err(self.mismatch(name, version));
        }
        // The runtime has the final say, whatever range was configured.
        Parser::new().set_language(language).map_err(|_| {
            let runtime = AbiRange::runtime();
            LoadError::AbiMismatch {
                name: name.to_owned(),
                found: version,
                min: runtime.min(),
                max: runtime.max(),
            }
        })
    }
}

/// Loads `artifact` with the default [`Loader`].
///
/// # Errors
///
/// See [`Loader::load_and_validate`].
pub fn load_and_validate(artifact: &GrammarArtifact) -> Result<LanguageHandle, LoadError> {
    Loader::new().load_and_validate(artifact)
}

fn check_grammar(name: &str, json: &str, node_types: Option<&[NodeType]>) -> Result<(), LoadError> {
    let grammar =
        parse_grammar(json).map_err(|e| LoadError::invalid(name, format!("grammar.json: {e}")))?;
    if grammar.name != name {
        return Err(LoadError::invalid(
            name,
            format!("grammar.json describes grammar '{}'", grammar.name),
        ));
    }

    let entry = node_types
        .and_then(|types| types.iter().find(|t| t.root == Some(true)))
        .map(|t| t.kind.as_str());
    validate(&grammar, entry)
        .map_err(|e| LoadError::invalid(name, format!("grammar.json: {e}")))
}

fn check_language_structure(
    name: &str,
    language: &Language,
    node_types: Option<&[NodeType]>,
) -> Result<(), LoadError> {
    let kinds = u16::try_from(language.node_kind_count())
        .map_err(|_| LoadError::invalid(name, "symbol table exceeds the symbol id space"))?;

    // Id 0 is the built-in end-of-input symbol.
    let mut visible_named = 0usize;
    for id in 1..kinds {
        if language.node_kind_for_id(id).is_none() {
            return Err(LoadError::invalid(name, format!("symbol {id} has no name")));
        }
        if language.node_kind_is_named(id) && language.node_kind_is_visible(id) {
            visible_named += 1;
        }
    }
    if visible_named == 0 {
        return Err(LoadError::invalid(name, "symbol table has no visible named node kinds"));
    }

    let fields = u16::try_from(language.field_count())
        .map_err(|_| LoadError::invalid(name, "field table exceeds the field id space"))?;
    if let Some(id) = (1..=fields).find(|&id| language.field_name_for_id(id).is_none()) {
        return Err(LoadError::invalid(name, format!("field {id} has no name")));
    }

    if let Some(embedded) = language.name() {
        if embedded != name {
            return Err(LoadError::invalid(
                name,
                format!("library contains grammar '{embedded}'"),
            ));
        }
    }

    for node_type in node_types.unwrap_or_default().iter().filter(|t| t.must_resolve()) {
        if language.id_for_node_kind(&node_type.kind, node_type.named) == 0 {
            return Err(LoadError::invalid(
                name,
                format!(
                    "node kind '{}' from node-types.json is missing from the symbol table",
                    node_type.kind
                ),
            ));
        }
    }

    let mut parser = Parser::new();
    parser
        .set_language(language)
        .map_err(|e| LoadError::invalid(name, e.to_string()))?;
    if parser.parse("", None).is_none() {
        return Err(LoadError::invalid(name, "parser produced no tree for empty input"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadErrorKind;

    fn json_artifact() -> GrammarArtifact {
        GrammarArtifact::builtin("json", tree_sitter_json::LANGUAGE)
    }

    fn json_abi() -> usize {
        Language::new(tree_sitter_json::LANGUAGE).abi_version()
    }

    #[test]
    fn test_known_good_artifact_loads() {
        let handle = load_and_validate(&json_artifact()).unwrap();
        assert_eq!(handle.name(), "json");
        assert_eq!(handle.abi_version(), json_abi());
        assert!(!handle.is_library_backed());
        assert!(handle.node_kind_count() > 1);
        assert!(handle.parser().is_ok());
    }

    #[test]
    fn test_abi_range_excluding_language_is_mismatch() {
        let version = json_abi();
        let loader = Loader::new().abi_range(version + 1..=version + 3);
        let err = loader.load_and_validate(&json_artifact()).unwrap_err();
        assert_eq!(
            err,
            LoadError::AbiMismatch {
                name: "json".into(),
                found: version,
                min: version + 1,
                max: version + 3,
            }
        );
    }

    #[test]
    fn test_forced_version_marker_is_mismatch() {
        let artifact = json_artifact()
            .with_parser_source(Metadata::inline("#define LANGUAGE_VERSION 9\n"));
        let err = load_and_validate(&artifact).unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::AbiMismatch);
    }

    #[test]
    fn test_stale_library_is_structurally_invalid() {
        let version = json_abi();
        let artifact = json_artifact().with_parser_source(Metadata::inline(format!(
            "#define LANGUAGE_VERSION {}\n",
            version - 1
        )));
        let err = Loader::new()
            .abi_range(1..=100)
            .load_and_validate(&artifact)
            .unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::StructurallyInvalid);
    }

    #[test]
    fn test_strict_mode_requires_metadata() {
        let err = Loader::new()
            .strict(true)
            .load_and_validate(&json_artifact())
            .unwrap_err();
        assert_eq!(
            err,
            LoadError::missing("json", "no parser.c supplied"),
        );
    }

    #[test]
    fn test_unreadable_metadata_is_artifact_missing() {
        let artifact = json_artifact()
            .with_grammar_json(Metadata::File("/nonexistent/src/grammar.json".into()));
        let err = load_and_validate(&artifact).unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::ArtifactMissing);
    }

    #[test]
    fn test_grammar_for_another_language_is_rejected() {
        let artifact = json_artifact().with_grammar_json(Metadata::inline(
            r#"{"name": "dml", "rules": {"source_file": {"type": "BLANK"}}}"#,
        ));
        let err = load_and_validate(&artifact).unwrap_err();
        assert_eq!(
            err,
            LoadError::invalid("json", "grammar.json describes grammar 'dml'")
        );
    }

    #[test]
    fn test_missing_parser_marker_is_structurally_invalid() {
        let artifact =
            json_artifact().with_parser_source(Metadata::inline("#include \"parser.h\"\n"));
        let err = load_and_validate(&artifact).unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::StructurallyInvalid);
    }
}
