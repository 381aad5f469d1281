use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};
use std::path::PathBuf;

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("image-randomizer")
        .about("Manage your randomized background-image list")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .help("Base URL of the image-randomizer API, example: https://api.image-randomizer.tld")
                .env("IMAGE_RANDOMIZER_API_URL")
                .global(true),
        )
        .arg(
            Arg::new("credentials")
                .long("credentials")
                .help("Path to the credentials file (default: <config dir>/image-randomizer/credentials.json)")
                .env("IMAGE_RANDOMIZER_CREDENTIALS")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("IMAGE_RANDOMIZER_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .subcommand(
            Command::new("login")
                .about("Log in, registering the username first when it does not exist")
                .arg(Arg::new("username").help("Account username").required(true))
                .arg(
                    Arg::new("password")
                        .short('p')
                        .long("password")
                        .help("Account password (read from stdin when omitted)"),
                ),
        )
        .subcommand(Command::new("logout").about("Forget the stored credentials"))
        .subcommand(Command::new("list").about("Show the stored image URLs"))
        .subcommand(
            Command::new("add")
                .about("Add an image URL to the list")
                .arg(Arg::new("url").help("Image URL").required(true)),
        )
        .subcommand(
            Command::new("update")
                .about("Replace an image URL")
                .arg(
                    Arg::new("id")
                        .help("Image id")
                        .required(true)
                        .value_parser(clap::value_parser!(i64)),
                )
                .arg(Arg::new("url").help("New image URL").required(true)),
        )
        .subcommand(
            Command::new("remove").about("Delete an image from the list").arg(
                Arg::new("id")
                    .help("Image id")
                    .required(true)
                    .value_parser(clap::value_parser!(i64)),
            ),
        )
        .subcommand(
            Command::new("random")
                .about("Print the public randomizer URL")
                .arg(Arg::new("username").help("Username (defaults to the logged-in user)")),
        )
}
