use clap::Parser;

/// Flags shared by every binary (`spec.md` §6 CLI). Exit codes: 0 normal,
/// 1 config error, 255 (stdlib's representation of -1) runtime fatal.
#[derive(Debug, Clone, Parser)]
pub struct Cli {
    #[arg(long, default_value = "application.yml")]
    pub config: String,

    #[arg(long = "gameDir", default_value = "../config")]
    pub game_dir: String,

    #[arg(long = "serverId")]
    pub server_id: String,
}
