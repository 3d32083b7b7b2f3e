//! Config commands

use anyhow::Context;
use formkit_core::config::{FormkitConfig, CONFIG_KEYS};

use crate::ConfigCommands;

pub fn handle(action: ConfigCommands, profile: Option<&str>) -> anyhow::Result<()> {
    match action {
        ConfigCommands::Init => {
            let path = FormkitConfig::default().save(profile)?;
            println!("Configuration initialized at {}", path.display());
        }
        ConfigCommands::Set { key, value } => {
            let mut config = FormkitConfig::load(profile).context("loading config")?;
            config.set(&key, &value)?;
            config.save(profile)?;
            println!("Set {} successfully", key);
        }
        ConfigCommands::Get { key } => {
            let config = FormkitConfig::load(profile).context("loading config")?;
            println!("{}: {}", key, config.get(&key)?);
        }
        ConfigCommands::List => {
            let config = FormkitConfig::load(profile).context("loading config")?;
            for key in CONFIG_KEYS {
                println!("{}: {}", key, config.get(key)?);
            }
        }
    }
    Ok(())
}
