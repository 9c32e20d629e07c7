use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use equiv_core::compat::render_header;

/// Print the compatibility header, or write it to `out`.
pub fn header_command(out: Option<&Path>) -> Result<()> {
    let header = render_header();
    match out {
        Some(path) => {
            fs::write(path, header).with_context(|| format!("Failed to write header to {}", path.display()))?;
            println!("Wrote compatibility header to {}", path.display());
        }
        None => print!("{header}"),
    }
    Ok(())
}
