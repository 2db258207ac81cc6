use std::{env, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-env-changed=ZLGCAN_LIB_DIR");

    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let target = env::var("TARGET").unwrap();

    // The SDK is not redistributable, so linking is only requested when a
    // library directory is actually available.
    let lib_dir = env::var_os("ZLGCAN_LIB_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("{}/zlgcan/{}", manifest_dir, target)));

    if lib_dir.is_dir() {
        println!("cargo:rustc-link-search={}", lib_dir.display());
        println!("cargo:rustc-link-lib=zlgcan");
    } else {
        println!(
            "cargo:warning=zlgcan library not found in {}, set ZLGCAN_LIB_DIR to link",
            lib_dir.display()
        );
    }
}
