//! Check that a compiled tree-sitter grammar loads in this runtime.
//!
//! ```text
//! graft <path> [--name NAME] [--library PATH] [--strict] [--json]
//!              [--parse FILE] [--depth N] [--find KIND]
//! ```
//!
//! `path` is a grammar directory (as laid out by `tree-sitter generate`) or a
//! compiled grammar library. Exit status is 0 when the grammar loads, 1 when
//! it does not, and 2 for usage errors.

use std::env::consts::DLL_PREFIX;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

use facet::Facet;
use graft::inspect::{nodes_of_kind, parse, render_tree, snippet, summarize};
use graft::{GrammarArtifact, LanguageHandle, LoadError, Loader};
use tracing_subscriber::EnvFilter;

const DEFAULT_DEPTH: usize = 20;

/// Check that a compiled tree-sitter grammar loads in this runtime
#[derive(Debug, Facet)]
struct Args {
    /// Grammar directory, or a compiled grammar library
    #[facet(positional)]
    path: String,

    /// Grammar name (default: from grammar.json or the directory name)
    #[facet(named, default)]
    name: Option<String>,

    /// Compiled library to load instead of the discovered one
    #[facet(named, default)]
    library: Option<String>,

    /// Treat missing grammar.json, node-types.json or parser.c as errors
    #[facet(named, default)]
    strict: bool,

    /// Print a JSON report on stdout instead of human-readable output
    #[facet(named, default)]
    json: bool,

    /// Parse this file with the grammar and print its syntax tree
    #[facet(named, default)]
    parse: Option<String>,

    /// Maximum depth of the printed syntax tree (default: 20)
    #[facet(named, default)]
    depth: Option<usize>,

    /// With --parse, list every node of this kind
    #[facet(named, default)]
    find: Option<String>,
}

/// Machine-readable outcome of a check.
#[derive(Debug, Facet)]
struct Report {
    grammar: String,
    ok: bool,
    kind: Option<String>,
    message: Option<String>,
    abi_version: Option<usize>,
    node_kinds: Option<usize>,
    fields: Option<usize>,
}

impl Report {
    fn loaded(handle: &LanguageHandle) -> Self {
        Self {
            grammar: handle.name().to_owned(),
            ok: true,
            kind: None,
            message: None,
            abi_version: Some(handle.abi_version()),
            node_kinds: Some(handle.node_kind_count()),
            fields: Some(handle.field_count()),
        }
    }

    fn failed(err: &LoadError) -> Self {
        Self {
            grammar: err.grammar().to_owned(),
            ok: false,
            kind: Some(err.kind().to_string()),
            message: Some(err.to_string()),
            abi_version: None,
            node_kinds: None,
            fields: None,
        }
    }
}

fn main() -> ExitCode {
    init_tracing();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
    let args: Args = match facet_args::from_slice(&argv) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    let artifact = artifact_for(&args);
    let loader = Loader::new().strict(args.strict);
    let handle = match loader.load_and_validate(&artifact) {
        Ok(handle) => handle,
        Err(err) => {
            if args.json {
                println!("{}", facet_json::to_string(&Report::failed(&err)));
            } else {
                eprintln!("error[{}]: {err}", err.kind());
            }
            return ExitCode::FAILURE;
        }
    };

    if args.json {
        println!("{}", facet_json::to_string(&Report::loaded(&handle)));
        return ExitCode::SUCCESS;
    }

    println!(
        "ok: {} (abi {}, {} node kinds, {} fields)",
        handle.name(),
        handle.abi_version(),
        handle.node_kind_count(),
        handle.field_count()
    );

    match &args.parse {
        Some(file) => print_parse(
            &handle,
            file,
            args.depth.unwrap_or(DEFAULT_DEPTH),
            args.find.as_deref(),
        ),
        None => ExitCode::SUCCESS,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn artifact_for(args: &Args) -> GrammarArtifact {
    let path = Path::new(&args.path);
    let artifact = if path.is_file() {
        let name = args
            .name
            .clone()
            .unwrap_or_else(|| library_grammar_name(path));
        GrammarArtifact::library(name, path)
    } else {
        GrammarArtifact::from_dir(path, args.name.as_deref())
    };

    match &args.library {
        Some(library) => artifact.with_library(library),
        None => artifact,
    }
}

/// `libtree-sitter-dml.so` and `dml.so` both name grammar `dml`.
fn library_grammar_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = stem.strip_prefix(DLL_PREFIX).unwrap_or(&stem);
    stem.strip_prefix("tree-sitter-").unwrap_or(stem).to_owned()
}

fn print_parse(
    handle: &LanguageHandle,
    file: &str,
    depth: usize,
    find: Option<&str>,
) -> ExitCode {
    let source = match fs::read(file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: cannot read {file}: {e}");
            return ExitCode::FAILURE;
        }
    };
    let tree = match parse(handle, &source) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let summary = summarize(&tree);
    println!();
    println!("Root node type: {}", summary.root_kind);
    println!("Number of children: {}", summary.child_count);
    println!("Parse errors: {}", summary.has_error);
    println!();
    println!("Statistics:");
    for (kind, count) in &summary.kind_counts {
        println!("  {kind}: {count}");
    }
    if let Some(kind) = find {
        let found = nodes_of_kind(&tree, kind);
        println!();
        println!("Nodes of kind {kind}: {}", found.len());
        for (i, node) in found.iter().enumerate() {
            let start = node.start_position();
            println!(
                "  {}. {}:{} {:?}",
                i + 1,
                start.row + 1,
                start.column + 1,
                snippet(*node, &source)
            );
        }
    }
    println!();
    println!("Syntax tree (first {depth} levels):");
    print!("{}", render_tree(&tree, &source, depth));
    ExitCode::SUCCESS
}
