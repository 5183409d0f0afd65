use std::path::Path;
use std::process::Command;

pub fn compile_c(c_path: &Path, is_pie: bool, with_debug_info: bool) -> tempfile::TempPath {
    let out_file = tempfile::NamedTempFile::new().expect("tempfile");

    let mut gcc = Command::new("gcc");
    gcc.arg(c_path).arg("-O0").arg("-o").arg(out_file.path());

    if with_debug_info {
        gcc.arg("-g");
    }

    if is_pie {
        gcc.arg("-pie").arg("-fPIE");
    } else {
        gcc.arg("-no-pie").arg("-fno-PIE");
    }

    println!("running: {gcc:?}");

    let gcc = gcc.output().expect("gcc");

    if !gcc.status.success() {
        let msg = String::from_utf8_lossy(&gcc.stderr);
        panic!("{msg}");
    }

    out_file.into_temp_path()
}
