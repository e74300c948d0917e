//! Print the effective configuration.

use clap::Args;
use rivulet_config::{RuntimeConfig, default_config_path};

use super::common::LoadedConfig;

#[derive(Args)]
pub struct ConfigArgs {
    /// Print built-in defaults instead of the loaded configuration
    #[arg(long)]
    default: bool,
}

pub fn run(args: ConfigArgs, loaded: &LoadedConfig) -> anyhow::Result<()> {
    if args.default {
        println!("# built-in defaults");
        print!("{}", RuntimeConfig::default().to_toml_string()?);
        return Ok(());
    }

    match &loaded.path {
        Some(path) => println!("# loaded from {}", path.display()),
        None => println!(
            "# no config file found; defaults shown (expected at {})",
            default_config_path().display()
        ),
    }
    print!("{}", loaded.config.to_toml_string()?);
    Ok(())
}
