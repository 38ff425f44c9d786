use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "maskbot")]
#[command(author, version, about = "Mask catalogue REST API with a Telegram onboarding bot", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP API and (if configured) the Telegram bot
    Run,

    /// Create an admin account, or reset its password if it exists
    CreateAdmin {
        /// Admin username (defaults to ADMIN_USERNAME)
        username: Option<String>,

        /// Admin password (defaults to ADMIN_PASSWORD)
        password: Option<String>,
    },

    /// Drop prepared statements left on the database server (DEALLOCATE ALL)
    ClearPreparedStatements,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The requested command; `run` when none is given.
    pub fn command(self) -> Commands {
        self.command.unwrap_or(Commands::Run)
    }
}
