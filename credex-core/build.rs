//! Build script for credex-core.
//!
//! With the `native` feature enabled this points the linker at the pre-built
//! native credential-exchange library. Without it nothing is linked and only
//! the in-process test-mode library is available.

fn main() {
    println!("cargo:rerun-if-env-changed=CREDEX_NATIVE_LIB_DIR");

    if std::env::var_os("CARGO_FEATURE_NATIVE").is_none() {
        return;
    }

    link_native_library();
}

fn link_native_library() {
    // On wasm32 there is no native library to link against.
    let target_arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    if target_arch == "wasm32" {
        println!("cargo:warning=credex-core: the `native` feature is ignored on wasm32");
        return;
    }

    if let Ok(dir) = std::env::var("CREDEX_NATIVE_LIB_DIR") {
        println!("cargo:rustc-link-search=native={dir}");
    }

    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    match target_os.as_str() {
        // The mobile builds ship the library as a static archive.
        "android" | "ios" => println!("cargo:rustc-link-lib=static=vcx"),
        _ => println!("cargo:rustc-link-lib=dylib=vcx"),
    }
}
