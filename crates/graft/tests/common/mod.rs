//! Grammar fixtures shared by the integration tests.

#![allow(dead_code)]

use std::env::consts::DLL_EXTENSION;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

/// Generated sources of `tree-sitter-json`, as a grammar repository lays them out.
pub fn json_sources() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/tree-sitter-json")
}

/// A `tree-sitter-json` grammar directory with `json.<ext>` compiled at its root.
///
/// Built once per test binary, under that binary's own scratch directory.
pub fn compiled_json_grammar() -> &'static Path {
    static DIR: OnceLock<PathBuf> = OnceLock::new();
    DIR.get_or_init(|| {
        let dir = Path::new(env!("CARGO_TARGET_TMPDIR"))
            .join(env!("CARGO_CRATE_NAME"))
            .join("tree-sitter-json");
        if dir.exists() {
            fs::remove_dir_all(&dir).unwrap();
        }
        copy_dir(&json_sources().join("src"), &dir.join("src"));
        compile_shared_library(&dir.join("src"), &dir.join(format!("json.{DLL_EXTENSION}")));
        dir
    })
}

fn copy_dir(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for entry in fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), target).unwrap();
        }
    }
}

fn host_target() -> String {
    let arch = std::env::consts::ARCH;
    if cfg!(target_os = "windows") {
        format!("{arch}-pc-windows-msvc")
    } else if cfg!(target_os = "macos") {
        format!("{arch}-apple-darwin")
    } else {
        format!("{arch}-unknown-linux-gnu")
    }
}

/// Compiles `src/parser.c` into a loadable library with the host C compiler.
fn compile_shared_library(src_dir: &Path, library: &Path) {
    let target = host_target();
    let compiler = cc::Build::new()
        .opt_level(1)
        .debug(false)
        .cargo_metadata(false)
        .cargo_warnings(false)
        .warnings(false)
        .include(src_dir)
        .host(&target)
        .target(&target)
        .get_compiler();

    let mut cmd: Command = compiler.to_command();
    if compiler.is_like_msvc() {
        cmd.args(["/nologo", "/LD"])
            .arg(format!("/Fe:{}", library.display()))
            .arg(src_dir.join("parser.c"));
    } else {
        cmd.args(["-shared", "-fPIC"])
            .arg("-o")
            .arg(library)
            .arg(src_dir.join("parser.c"));
    }

    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "compiling {} failed:\n{}",
        src_dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
}
