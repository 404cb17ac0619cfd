fn main() {
    // Recompile when the compile-time API URL changes; option_env!() is cached otherwise.
    println!("cargo:rerun-if-env-changed=MINIAPP_API_URL");
}
