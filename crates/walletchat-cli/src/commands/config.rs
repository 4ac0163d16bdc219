use anyhow::{Context, Result};
use walletchat_infrastructure::ConfigService;

pub fn path(service: &ConfigService) -> Result<()> {
    println!("{}", service.config_path()?.display());
    Ok(())
}

pub fn show(service: &ConfigService) -> Result<()> {
    let config = service.load().context("Failed to load configuration")?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

pub fn init(service: &ConfigService) -> Result<()> {
    let path = service.save_default().context("Failed to write default configuration")?;
    println!("Configuration: {}", path.display());
    Ok(())
}
