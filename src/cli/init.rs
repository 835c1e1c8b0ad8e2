//! cotask init command implementation
//!
//! Creates the initial config file and data directory in a working root.

use std::path::{Path, PathBuf};

use crate::config::{Config, CONFIG_FILENAME};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};

#[derive(serde::Serialize)]
struct InitReport {
    root: PathBuf,
    created: InitCreated,
}

#[derive(serde::Serialize)]
struct InitCreated {
    config: bool,
    data_dir: bool,
}

pub fn run(dir: Option<PathBuf>, json: bool, quiet: bool) -> Result<()> {
    let root = match dir {
        Some(path) => path,
        None => std::env::current_dir()?,
    };

    let config = Config::load_or_default(&root)?;

    let created_config = ensure_config(&root, &config)?;
    let created_data_dir = ensure_dir(&root.join(&config.data.dir))?;

    let report = InitReport {
        root: root.clone(),
        created: InitCreated {
            config: created_config,
            data_dir: created_data_dir,
        },
    };

    let mut created_items = Vec::new();
    if created_config {
        created_items.push(CONFIG_FILENAME);
    }
    if created_data_dir {
        created_items.push(config.data.dir.as_str());
    }

    let header = if created_items.is_empty() {
        "cotask init: nothing to do".to_string()
    } else {
        "cotask init: initialized working root".to_string()
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("root", root.display().to_string());
    human.push_summary(
        "created",
        if created_items.is_empty() {
            "none".to_string()
        } else {
            created_items.join(", ")
        },
    );

    emit_success(OutputOptions { json, quiet }, "init", &report, Some(&human))?;

    Ok(())
}

fn ensure_config(root: &Path, config: &Config) -> Result<bool> {
    let config_path = root.join(CONFIG_FILENAME);
    if config_path.exists() {
        if !config_path.is_file() {
            return Err(Error::OperationFailed(format!(
                "{} exists but is not a file: {}",
                CONFIG_FILENAME,
                config_path.display()
            )));
        }
        return Ok(false);
    }

    config.save(&config_path)?;
    Ok(true)
}

fn ensure_dir(path: &Path) -> Result<bool> {
    if path.exists() {
        if !path.is_dir() {
            return Err(Error::OperationFailed(format!(
                "Expected directory at {}",
                path.display()
            )));
        }
        return Ok(false);
    }

    std::fs::create_dir_all(path)?;
    Ok(true)
}
