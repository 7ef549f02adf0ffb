use std::path::Path;

use anyhow::Context;
use fpt_config::FptConfig;

use crate::cli::GlobalFlags;

/// Load `.env`, then the layered configuration.
///
/// A `.env` in the project directory wins over one found from the current
/// directory upwards. Variables already exported are never overwritten.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<FptConfig> {
    let root = flags.project_root();
    load_project_dotenv(&root)?;
    FptConfig::load_from(&root).context("failed to load configuration")
}

fn load_project_dotenv(root: &Path) -> anyhow::Result<()> {
    let env_path = root.join(".env");
    if env_path.exists() {
        dotenvy::from_path(&env_path)
            .with_context(|| format!("failed to load dotenv file at {}", env_path.display()))?;
        return Ok(());
    }

    dotenvy::dotenv().ok();
    Ok(())
}
