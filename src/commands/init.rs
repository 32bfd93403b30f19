use std::path::PathBuf;

use crate::config::{Config, CONFIG_FILE_NAME};
use crate::error::{CtxWindowError, Result};

/// Options for the `init` command.
pub struct InitOptions {
    pub root: PathBuf,
    pub config_path: Option<PathBuf>,
    pub force: bool,
}

/// Result of a successful `init` operation.
#[derive(Debug)]
pub struct InitResult {
    pub config_path: PathBuf,
    pub overwritten: bool,
}

/// Run the init command: write a default config file.
pub fn run(options: InitOptions) -> Result<InitResult> {
    // An explicit path may live anywhere; the root only matters otherwise.
    let config_path = match options.config_path {
        Some(path) => path,
        None => {
            if !options.root.is_dir() {
                return Err(CtxWindowError::validation(
                    "root",
                    format!("directory '{}' does not exist", options.root.display()),
                ));
            }
            options.root.join(CONFIG_FILE_NAME)
        }
    };

    let exists = config_path.exists();
    if exists && !options.force {
        return Err(CtxWindowError::config(format!(
            "config already exists at '{}' (use --force to overwrite)",
            config_path.display()
        )));
    }

    Config::default().save(&config_path)?;

    Ok(InitResult {
        config_path,
        overwritten: exists,
    })
}
