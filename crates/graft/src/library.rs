//! Acquiring a runtime [`Language`] from an artifact's compiled source.
#![allow(unsafe_code)]

use libloading::Library;
use tracing::debug;
use tree_sitter::Language;
use tree_sitter_language::LanguageFn;

use crate::artifact::ArtifactSource;
use crate::error::LoadError;

/// Signature of a generated `tree_sitter_<name>` entry point.
type EntryPoint = unsafe extern "C" fn() -> *const ();

/// Resolves the language, returning the library it lives in when there is one.
///
/// Opened libraries are never closed. A [`Language`] and every parser and tree
/// built from it point into library memory without borrowing the library, so
/// the mapping has to last for the rest of the process.
pub(crate) fn acquire(
    name: &str,
    source: &ArtifactSource,
) -> Result<(Language, Option<&'static Library>), LoadError> {
    match source {
        ArtifactSource::Builtin(language_fn) => Ok((language_from_fn(name, *language_fn)?, None)),
        ArtifactSource::Library { path, symbol } => {
            if !path.is_file() {
                return Err(LoadError::missing(
                    name,
                    format!("no library at {}", path.display()),
                ));
            }

            debug!(grammar = name, path = %path.display(), "opening grammar library");
            // SAFETY: opening runs the library's initializers. Generated parsers
            // only carry static tables, and we trust the path we were given.
            let library = unsafe { Library::new(path) }.map_err(|e| {
                LoadError::invalid(name, format!("cannot load {}: {e}", path.display()))
            })?;

            // SAFETY: tree-sitter generates entry points with exactly this signature.
            let entry: EntryPoint = unsafe { library.get::<EntryPoint>(symbol.as_bytes()) }
                .map(|sym| *sym)
                .map_err(|e| {
                    LoadError::missing(
                        name,
                        format!("{} does not export `{symbol}`: {e}", path.display()),
                    )
                })?;

            let library: &'static Library = Box::leak(Box::new(library));
            // SAFETY: `library` is leaked, so `entry` stays valid for the rest of
            // the process.
            let language_fn = unsafe { LanguageFn::from_raw(entry) };
            Ok((language_from_fn(name, language_fn)?, Some(library)))
        }
    }
}

fn language_from_fn(name: &str, language_fn: LanguageFn) -> Result<Language, LoadError> {
    let entry = language_fn.into_raw();
    // SAFETY: entry points take no arguments and return a pointer to static data.
    if unsafe { entry() }.is_null() {
        return Err(LoadError::invalid(
            name,
            "language entry point returned a null pointer",
        ));
    }
    Ok(Language::new(language_fn))
}
