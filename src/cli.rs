use clap::{ Arg, ArgMatches, Command, value_parser };

use std::path::PathBuf;

use crate::config::CONFIG_ENV_VAR;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs
{
    /// Config file named on the command line or through `SDL_GPU_STARTER_CONFIG`.
    pub config: Option<PathBuf>,
}

pub fn command() -> Command
{
    Command::new(crate::PROGRAM_NAME)
        .version(env!("CARGO_PKG_VERSION"))
        .about("Opens a window, claims a GPU device for it and runs until quit or a key press")
        .arg(
            Arg::new("config")
                .value_name("FILE")
                .help("TOML config file (defaults to ./starter.toml when present)")
                .env(CONFIG_ENV_VAR)
                .value_parser(value_parser!(PathBuf))
        )
}

impl CliArgs
{
    /// Parses the process arguments. Prints usage and exits on `--help`,
    /// `--version` or malformed input.
    pub fn parse() -> Self
    {
        Self::from_matches(&command().get_matches())
    }

    fn from_matches(matches: &ArgMatches) -> Self
    {
        Self {
            config: matches.get_one::<PathBuf>("config").cloned(),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use clap::error::ErrorKind;

    fn parse_from(args: &[&str]) -> Result<CliArgs, clap::Error>
    {
        command()
            .try_get_matches_from(args)
            .map(|m| CliArgs::from_matches(&m))
    }

    #[test]
    fn command_definition_is_consistent()
    {
        command().debug_assert();
    }

    #[test]
    fn positional_argument_names_the_config()
    {
        let args = parse_from(&["sdl-gpu-starter", "custom.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn help_and_version_are_not_config_paths()
    {
        assert_eq!(parse_from(&["sdl-gpu-starter", "--help"]).unwrap_err().kind(), ErrorKind::DisplayHelp);
        assert_eq!(parse_from(&["sdl-gpu-starter", "--version"]).unwrap_err().kind(), ErrorKind::DisplayVersion);
        assert_eq!(parse_from(&["sdl-gpu-starter", "-v"]).unwrap_err().kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn environment_variable_is_the_fallback()
    {
        // the only test touching this variable; the others pass the path explicitly
        std::env::set_var(CONFIG_ENV_VAR, "from_env.toml");

        let from_env = parse_from(&["sdl-gpu-starter"]).unwrap();
        let from_arg = parse_from(&["sdl-gpu-starter", "from_arg.toml"]).unwrap();

        std::env::remove_var(CONFIG_ENV_VAR);

        assert_eq!(from_env.config, Some(PathBuf::from("from_env.toml")));
        assert_eq!(from_arg.config, Some(PathBuf::from("from_arg.toml")));
    }
}
