use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Twitch user IDs of the channels to watch
    #[arg(required = true, num_args = 1..)]
    pub channels: Vec<String>,

    /// Twitch application client ID
    #[arg(long, env = "TWITCH_CLIENT_ID")]
    pub client_id: String,

    /// User access token
    #[arg(long = "oauth", env = "TWITCH_OAUTH_TOKEN", default_value = "", hide_env_values = true)]
    pub oauth_token: String,

    /// Seconds between checks
    #[arg(short, long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json: bool,
}
