use anyhow::Result;
use eventdesk_core::config::EventDeskConfig;
use owo_colors::OwoColorize;

pub fn run() -> Result<()> {
    let config_path = EventDeskConfig::config_path()?;

    if !config_path.exists() {
        EventDeskConfig::create_default_config(&config_path)?;
        println!("{}", "Created a default config file".green());
    }

    let config = EventDeskConfig::load_from(&config_path)?;

    println!("{}", "Paths".bold());
    println!("  Config:     {}", config_path.display());
    println!();
    println!("{}", "Remote".bold());
    println!("  API:        {}", config.api_url);
    println!(
        "  Base:       {}",
        config.base_id.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  API key:    {}",
        if config.api_key.is_some() { "set" } else { "(not set)" }
    );
    println!("  Host:       {}", config.default_host_id);

    Ok(())
}
