//! Build script rendering the `iobus-rpc(1)` man page from the clap
//! definition in `src/cli.rs`.

use std::{env, fs, path::PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli.rs"]
mod cli;

const MAN_DIR: &str = "target/generated-man";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=src/cli.rs");
    println!("cargo:rerun-if-env-changed=IOBUS_MAN_DIR");

    let out_dir = env::var_os("IOBUS_MAN_DIR").map_or_else(|| PathBuf::from(MAN_DIR), PathBuf::from);
    fs::create_dir_all(&out_dir)?;

    let mut page = Vec::new();
    Man::new(cli::Cli::command()).render(&mut page)?;
    fs::write(out_dir.join("iobus-rpc.1"), page)?;

    Ok(())
}
