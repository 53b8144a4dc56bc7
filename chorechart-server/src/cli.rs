use clap::{Parser, Subcommand};

const HELP_EPILOG: &str = r#"Server options can also be provided via environment variables:
  CONFIG_PATH (default: ./config.yaml)
  DB_PATH     (default: data/app.db)
  PORT        (default: 5152 or config.listen_port)

Use `hash-passcode` to produce bcrypt hashes for the `users` seed list.
"#;

#[derive(Debug, Parser)]
#[command(
    name = "chorechart-server",
    version,
    about = "ChoreChart server",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
pub struct Cli {
    /// Optional subcommand. Without one, runs the server.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print a bcrypt hash of a passcode for use in config.yaml
    HashPasscode {
        /// Passcode to hash
        passcode: String,
        /// bcrypt cost factor
        #[arg(long, default_value_t = bcrypt::DEFAULT_COST)]
        cost: u32,
    },
}
