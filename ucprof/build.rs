use std::env;
use std::fs;
use std::path::PathBuf;

const DEFAULT_BUFFER_SIZE: usize = 4096;
const DEFAULT_CHANNEL: u32 = 2;

/// Reads an integer override from the environment, falling back to `default` when unset.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T
where
    T::Err: std::fmt::Debug,
{
    println!("cargo:rerun-if-env-changed={}", key);
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .unwrap_or_else(|err| panic!("{} is not a valid number ({:?}): {:?}", key, value, err)),
        Err(_) => default,
    }
}

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let buffer_size: usize = env_or("UCPROF_BUFFER_SIZE", DEFAULT_BUFFER_SIZE);
    let channel: u32 = env_or("UCPROF_CHANNEL", DEFAULT_CHANNEL);

    // Generated as plain consts so they stay usable in array lengths and const contexts.
    let config = format!(
        "/// Size in bytes of the up-channel buffer (`UCPROF_BUFFER_SIZE`).\n\
         pub const BUFFER_SIZE: usize = {};\n\
         /// Index of the up channel records are written to (`UCPROF_CHANNEL`).\n\
         pub const CHANNEL_INDEX: u32 = {};\n",
        buffer_size, channel
    );
    fs::write(out_dir.join("config.rs"), config).expect("Unable to write generated config!");

    println!("cargo:rerun-if-changed=build.rs");
}
