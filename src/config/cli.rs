use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "deal-bot")]
#[command(about = "Posts fresh marketplace deals with affiliate links to a Telegram channel")]
pub struct CliArgs {
    #[arg(short, long, default_value = "deal-bot.toml", help = "TOML configuration file")]
    pub config: PathBuf,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(long, help = "Also append plain-text logs to this file")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "post-once")]
#[command(about = "Runs the deal pipeline a single time and exits")]
pub struct PostOnceArgs {
    #[command(flatten)]
    pub common: CliArgs,

    #[arg(
        short = 'n',
        long,
        help = "Number of deals to post (defaults to [pipeline] default_count)"
    )]
    pub count: Option<usize>,

    #[arg(long, help = "Show what would be posted without converting, posting or recording")]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::parse_from(["deal-bot"]);
        assert_eq!(args.config, PathBuf::from("deal-bot.toml"));
        assert!(!args.verbose);
        assert!(!args.json_logs);
        assert!(args.log_file.is_none());
    }

    #[test]
    fn test_post_once_flags() {
        let args = PostOnceArgs::parse_from([
            "post-once",
            "--config",
            "/etc/deal-bot.toml",
            "-n",
            "3",
            "--dry-run",
            "-v",
            "--log-file",
            "logs/post-once.log",
        ]);
        assert_eq!(args.common.config, PathBuf::from("/etc/deal-bot.toml"));
        assert_eq!(args.count, Some(3));
        assert!(args.dry_run);
        assert!(args.common.verbose);
        assert_eq!(args.common.log_file, Some(PathBuf::from("logs/post-once.log")));
    }
}
