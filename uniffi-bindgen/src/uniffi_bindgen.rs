//! Generates the Swift, Kotlin and Python bindings for `credex`.

fn main() {
    uniffi::uniffi_bindgen_main();
}
