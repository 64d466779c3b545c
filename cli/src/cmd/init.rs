use std::{path::PathBuf, process::ExitCode};

use anyhow::{ensure, Context as _};
use judgebox_core::{print_success, Config};

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    #[arg(default_value = "./")]
    dir: PathBuf,
}

pub fn exec(args: &Args, _: &GlobalArgs) -> SubcmdResult {
    let path = args.dir.join(Config::FILENAME);
    ensure!(
        !path.exists(),
        "{} already exists",
        path.to_string_lossy()
    );

    std::fs::create_dir_all(&args.dir)
        .with_context(|| format!("Failed to create {}", args.dir.to_string_lossy()))?;
    std::fs::write(&path, Config::example_toml())
        .with_context(|| format!("Failed to write {}", path.to_string_lossy()))?;

    print_success!("Created {}", path.to_string_lossy());
    Ok(ExitCode::SUCCESS)
}
