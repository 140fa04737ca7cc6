use clap::Subcommand;
use fieldrunner::{AuthMode, Location, config};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as JSON
    Show,
    /// Set the home coordinates sessions start from
    Home {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },
    /// Set the account used to log in (the secret is never stored here)
    Account {
        #[arg(long)]
        username: String,
        #[arg(long, value_enum, default_value_t = AuthMode::Ptc)]
        auth: AuthMode,
    },
}

pub(super) fn run_config(cmd: ConfigCommand) -> Result<(), String> {
    let mut cfg = config::load().map_err(|e| e.to_string())?;

    match cmd {
        ConfigCommand::Show => {
            let json = serde_json::to_string_pretty(&cfg).map_err(|e| e.to_string())?;
            println!("{}", json);
            println!("(from {})", config::config_file_path().display());
        }
        ConfigCommand::Home { lat, lng } => {
            let home = Location::new(lat, lng);
            if !home.in_range() {
                return Err(format!("home coordinates out of range: {}", home));
            }
            cfg.home = home;
            config::save(&cfg).map_err(|e| e.to_string())?;
            println!("Home set to {}", cfg.home);
        }
        ConfigCommand::Account { username, auth } => {
            cfg.username = username.trim().to_string();
            cfg.auth = auth;
            config::save(&cfg).map_err(|e| e.to_string())?;
            println!("Account set to {} ({:?})", cfg.username, cfg.auth);
        }
    }

    Ok(())
}
