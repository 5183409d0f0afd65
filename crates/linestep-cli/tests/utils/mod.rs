use std::path::Path;
use std::process::Command;

pub fn compile_program(c_path: &Path) -> tempfile::TempPath {
    let out_file = tempfile::NamedTempFile::new().expect("tempfile");

    let mut gcc = Command::new("gcc");
    gcc.arg(c_path)
        .arg("-g")
        .arg("-O0")
        .arg("-o")
        .arg(out_file.path());

    println!("running: {gcc:?}");

    let gcc = gcc.output().expect("gcc");

    if !gcc.status.success() {
        let msg = String::from_utf8_lossy(&gcc.stderr);
        panic!("{msg}");
    }

    out_file.into_temp_path()
}
