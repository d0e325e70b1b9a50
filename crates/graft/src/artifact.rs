//! Describing and discovering compiled grammar artifacts.
//!
//! An artifact is the compiled language (a shared library exporting
//! `tree_sitter_<name>`, or a statically linked [`LanguageFn`]) together with
//! whatever generator metadata is available to cross-check it.

use std::borrow::Cow;
use std::env::consts::{DLL_EXTENSION, DLL_PREFIX};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tree_sitter_language::LanguageFn;

use crate::grammar::parse_grammar;

/// Environment variable naming an extra directory of compiled grammars.
///
/// This is the directory the tree-sitter CLI caches compiled parsers in.
pub const LIBDIR_ENV: &str = "TREE_SITTER_LIBDIR";

/// Where the compiled language comes from.
#[derive(Clone)]
pub enum ArtifactSource {
    /// A shared library exporting a language entry point.
    Library {
        /// Path of the library on disk.
        path: PathBuf,
        /// Name of the exported entry point.
        symbol: String,
    },
    /// A language linked into the current binary.
    Builtin(LanguageFn),
}

impl fmt::Debug for ArtifactSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Library { path, symbol } => f
                .debug_struct("Library")
                .field("path", path)
                .field("symbol", symbol)
                .finish(),
            Self::Builtin(_) => f.write_str("Builtin"),
        }
    }
}

/// A generator metadata document, on disk or in memory.
#[derive(Debug, Clone)]
pub enum Metadata {
    /// Read from this path when the artifact is loaded.
    File(PathBuf),
    /// Already in memory (e.g. a grammar crate's `NODE_TYPES` constant).
    Inline(Cow<'static, str>),
}

impl Metadata {
    /// Wraps in-memory text.
    #[must_use]
    pub fn inline(text: impl Into<Cow<'static, str>>) -> Self {
        Self::Inline(text.into())
    }

    pub(crate) fn read(&self) -> io::Result<Cow<'_, str>> {
        match self {
            Self::File(path) => fs::read_to_string(path).map(Cow::Owned),
            Self::Inline(text) => Ok(Cow::Borrowed(text)),
        }
    }
}

/// A compiled grammar plus the metadata available to validate it.
#[derive(Debug, Clone)]
pub struct GrammarArtifact {
    name: String,
    source: ArtifactSource,
    grammar_json: Option<Metadata>,
    node_types: Option<Metadata>,
    parser_source: Option<Metadata>,
}

/// The entry point tree-sitter generates for a grammar: `tree_sitter_<name>`.
#[must_use]
pub fn entry_symbol(name: &str) -> String {
    format!("tree_sitter_{}", name.replace('-', "_"))
}

impl GrammarArtifact {
    /// An artifact backed by the shared library at `path`.
    #[must_use]
    pub fn library(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let name = name.into();
        let symbol = entry_symbol(&name);
        Self::with_source(
            name,
            ArtifactSource::Library {
                path: path.into(),
                symbol,
            },
        )
    }

    /// An artifact for a language linked into this binary.
    #[must_use]
    pub fn builtin(name: impl Into<String>, language: LanguageFn) -> Self {
        Self::with_source(name.into(), ArtifactSource::Builtin(language))
    }

    fn with_source(name: String, source: ArtifactSource) -> Self {
        Self {
            name,
            source,
            grammar_json: None,
            node_types: None,
            parser_source: None,
        }
    }

    /// Discovers an artifact in a tree-sitter grammar directory.
    ///
    /// Metadata is taken from `src/grammar.json`, `src/node-types.json` and
    /// `src/parser.c` when those files exist. The grammar name is `name` if
    /// given, else the `name` in `grammar.json`, else the directory name without
    /// a `tree-sitter-` prefix. The library is the first existing file among
    /// [`library_candidates`]; when none exists the first candidate is used so
    /// that loading reports what was expected.
    #[must_use]
    pub fn from_dir(dir: impl AsRef<Path>, name: Option<&str>) -> Self {
        let dir = dir.as_ref();
        let src = dir.join("src");
        let existing = |file: &str| {
            let path = src.join(file);
            path.is_file().then_some(Metadata::File(path))
        };

        let grammar_json = existing("grammar.json");
        let name = name
            .map(str::to_owned)
            .or_else(|| grammar_name(grammar_json.as_ref()?))
            .unwrap_or_else(|| dir_grammar_name(dir));

        let candidates = library_candidates(dir, &name);
        let library = candidates
            .iter()
            .find(|path| path.is_file())
            .or_else(|| candidates.first())
            .cloned()
            .unwrap_or_else(|| dir.join(&name));

        let mut artifact = Self::library(name, library);
        artifact.grammar_json = grammar_json;
        artifact.node_types = existing("node-types.json");
        artifact.parser_source = existing("parser.c");
        artifact
    }

    /// Replaces the compiled source with the shared library at `path`.
    #[must_use]
    pub fn with_library(mut self, path: impl Into<PathBuf>) -> Self {
        let symbol = entry_symbol(&self.name);
        self.source = ArtifactSource::Library {
            path: path.into(),
            symbol,
        };
        self
    }

    /// Overrides the exported entry point of a library-backed artifact.
    #[must_use]
    pub fn with_symbol(mut self, entry: impl Into<String>) -> Self {
        if let ArtifactSource::Library { symbol, .. } = &mut self.source {
            *symbol = entry.into();
        }
        self
    }

    /// Attaches `grammar.json`.
    #[must_use]
    pub fn with_grammar_json(mut self, metadata: Metadata) -> Self {
        self.grammar_json = Some(metadata);
        self
    }

    /// Attaches `node-types.json`.
    #[must_use]
    pub fn with_node_types(mut self, metadata: Metadata) -> Self {
        self.node_types = Some(metadata);
        self
    }

    /// Attaches the generated `parser.c`.
    #[must_use]
    pub fn with_parser_source(mut self, metadata: Metadata) -> Self {
        self.parser_source = Some(metadata);
        self
    }

    /// The grammar name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the compiled language comes from.
    #[must_use]
    pub fn source(&self) -> &ArtifactSource {
        &self.source
    }

    /// Attached `grammar.json`, if any.
    #[must_use]
    pub fn grammar_json(&self) -> Option<&Metadata> {
        self.grammar_json.as_ref()
    }

    /// Attached `node-types.json`, if any.
    #[must_use]
    pub fn node_types(&self) -> Option<&Metadata> {
        self.node_types.as_ref()
    }

    /// Attached `parser.c`, if any.
    #[must_use]
    pub fn parser_source(&self) -> Option<&Metadata> {
        self.parser_source.as_ref()
    }
}

/// Library paths tried for grammar `name` under `dir`, in priority order.
///
/// `tree-sitter build` writes `<name>.<ext>` to the grammar root; packaged
/// builds use the `lib` prefixed forms. `build/` and [`LIBDIR_ENV`] are searched
/// after the root.
#[must_use]
pub fn library_candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    let file_names = [
        format!("{name}.{DLL_EXTENSION}"),
        format!("{DLL_PREFIX}tree-sitter-{name}.{DLL_EXTENSION}"),
        format!("{DLL_PREFIX}{name}.{DLL_EXTENSION}"),
    ];

    let mut dirs = vec![dir.to_path_buf(), dir.join("build")];
    if let Some(libdir) = std::env::var_os(LIBDIR_ENV) {
        dirs.push(PathBuf::from(libdir));
    }

    dirs.iter()
        .flat_map(|d| file_names.iter().map(move |f| d.join(f)))
        .collect()
}

fn grammar_name(metadata: &Metadata) -> Option<String> {
    let text = metadata.read().ok()?;
    parse_grammar(&text).ok().map(|grammar| grammar.name)
}

fn dir_grammar_name(dir: &Path) -> String {
    // Canonicalizing resolves `.` and `..`, but fails for paths that do not exist.
    let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    let base = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    base.strip_prefix("tree-sitter-")
        .map(str::to_owned)
        .unwrap_or(base)
}
