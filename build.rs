use std::env;
use std::fs;
use std::path::PathBuf;

const CONFIG_FILE: &str = "config.toml";

/// Embeds `config.toml` so the binary has defaults when run outside the repo.
fn main() {
    println!("cargo:rerun-if-changed={CONFIG_FILE}");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let contents =
        fs::read_to_string(manifest_dir.join(CONFIG_FILE)).expect("Failed to read config.toml");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(
        out_dir.join("config_embedded.rs"),
        format!("pub const DEFAULT_CONFIG: &str = {contents:?};\n"),
    )
    .expect("Failed to write embedded config");
}
