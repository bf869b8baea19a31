use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::output;

pub async fn show_config(path: Option<&Path>) -> Result<()> {
    let config = Config::load_from(path)?;
    let config_str = toml::to_string_pretty(&config)?;

    output::section("Current Configuration");
    println!();
    println!("{}", config_str);

    Ok(())
}

pub async fn init_config(path: Option<&Path>, force: bool) -> Result<()> {
    let config_file = Config::resolve_path(path)?;

    if config_file.exists() && !force {
        println!(
            "Configuration file already exists at: {}",
            config_file.display()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    let written = Config::default().save_to(Some(&config_file))?;

    output::success(&format!("Configuration initialized at: {}", written.display()));
    println!();
    println!("Demo frames are read from the [demo] frames_root directory.");

    Ok(())
}
