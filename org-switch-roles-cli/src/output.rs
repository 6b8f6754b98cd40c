//! Writing rendered artifacts to stdout or disk

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use org_switch_roles_core::synthesis::{OuPath, TemplateFormat};

/// `<dir>/<dotted ou path>.<ext>`, e.g. `./eng.prod.yml`
pub fn template_path(dir: &Path, ou: &OuPath, format: TemplateFormat) -> PathBuf {
    dir.join(format!("{}.{}", ou.policy_prefix(), format.extension()))
}

/// Write `contents` to `path`, replacing any existing file
pub fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// Print to stdout, adding a trailing newline only when missing
pub fn print_artifact(contents: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(contents.as_bytes())
        .context("Failed to write to stdout")?;
    if !contents.ends_with('\n') {
        writeln!(stdout).context("Failed to write to stdout")?;
    }
    Ok(())
}
