//! Build script that renders the `flashsync(1)` man page.
//!
//! The page is generated from the same clap definitions the binary uses and
//! written to `OUT_DIR/flashsync.1` for packaging.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli/mod.rs"]
mod cli;

use cli::Cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = io::stdout();
    writeln!(stdout, "cargo:rerun-if-changed=build.rs")?;
    writeln!(stdout, "cargo:rerun-if-changed=src/cli/mod.rs")?;

    let out_dir = env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "OUT_DIR was not set"))?;

    let mut page = Vec::new();
    Man::new(Cli::command())
        .section("1")
        .manual("flashsync manual")
        .render(&mut page)?;
    fs::write(out_dir.join("flashsync.1"), page)?;

    Ok(())
}
