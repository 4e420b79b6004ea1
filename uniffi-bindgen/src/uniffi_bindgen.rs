//! Generates the Swift and Kotlin bindings of `applock-core`.

fn main() {
    uniffi::uniffi_bindgen_main();
}
