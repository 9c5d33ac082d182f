use clap::{Arg, ArgMatches, Command};

pub const ARG_REDIS_URL: &str = "redis-url";

#[derive(Debug)]
pub struct Options {
    pub redis_url: Option<String>,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        Self {
            redis_url: matches
                .get_one::<String>(ARG_REDIS_URL)
                .cloned()
                .filter(|v| !v.trim().is_empty()),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_REDIS_URL)
            .long(ARG_REDIS_URL)
            .help("Redis URL for the refresh token index")
            .long_help(
                "Redis URL for the refresh token index. Without it, refresh tokens are indexed in process memory and do not survive a restart.",
            )
            .env("MOODSYNC_REDIS_URL"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_redis_url_is_none() {
        temp_env::with_vars([("MOODSYNC_REDIS_URL", Some(""))], || {
            let matches = with_args(Command::new("test")).get_matches_from(["test"]);
            assert_eq!(Options::parse(&matches).redis_url, None);
        });
    }

    #[test]
    fn redis_url_from_flag() {
        temp_env::with_vars([("MOODSYNC_REDIS_URL", None::<&str>)], || {
            let matches = with_args(Command::new("test"))
                .get_matches_from(["test", "--redis-url", "redis://localhost:6379"]);
            assert_eq!(
                Options::parse(&matches).redis_url.as_deref(),
                Some("redis://localhost:6379")
            );
        });
    }
}
