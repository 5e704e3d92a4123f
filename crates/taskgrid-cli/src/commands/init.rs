use std::path::Path;

use taskgrid_core::SimConfig;

pub fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let content = SimConfig::default().to_toml_string()?;
    std::fs::write(path, content)?;
    println!("✓ Generated {}", path.display());
    Ok(())
}
