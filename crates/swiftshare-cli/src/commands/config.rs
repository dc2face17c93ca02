//! Config command implementation.

use anyhow::Result;

use swiftshare_core::config::Config;

use super::{ConfigAction, ConfigArgs};

/// Run the config command.
pub async fn run(args: ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            let config = super::load_config();
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", Config::config_path().display());
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("  Configuration reset to defaults.");
            println!("  {}", Config::config_path().display());
        }
    }
    Ok(())
}
