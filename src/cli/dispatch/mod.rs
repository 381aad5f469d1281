use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

pub fn handler(matches: &clap::ArgMatches) -> Result<(Action, GlobalArgs)> {
    // Closure to return subcommand matches
    let sub_m = |subcommand| -> Result<&clap::ArgMatches> {
        matches
            .subcommand_matches(subcommand)
            .context("arguments not found")
    };

    let action = match matches.subcommand_name() {
        Some("login") => {
            let matches = sub_m("login")?;
            let password = match matches.get_one::<String>("password") {
                Some(password) => SecretString::from(password.clone()),
                None => prompt_password()?,
            };

            Action::Login {
                username: required(matches, "username")?,
                password,
            }
        }
        Some("logout") => Action::Logout,
        Some("list") => Action::List,
        Some("add") => Action::Add {
            url: required(sub_m("add")?, "url")?,
        },
        Some("update") => {
            let matches = sub_m("update")?;
            Action::Update {
                id: required_id(matches)?,
                url: required(matches, "url")?,
            }
        }
        Some("remove") => Action::Remove {
            id: required_id(sub_m("remove")?)?,
        },
        Some("random") => Action::Random {
            username: sub_m("random")?.get_one::<String>("username").cloned(),
        },
        _ => return Err(anyhow!("missing subcommand")),
    };

    Ok((action, globals(matches)?))
}

fn globals(matches: &clap::ArgMatches) -> Result<GlobalArgs> {
    let api_url = matches
        .get_one("api-url")
        .map(|s: &String| s.to_string())
        .ok_or_else(|| anyhow!("missing required argument: --api-url"))?;

    let credentials = match matches.get_one::<PathBuf>("credentials") {
        Some(path) => path.clone(),
        None => default_credentials_path()?,
    };

    Ok(GlobalArgs::new(api_url, credentials))
}

fn default_credentials_path() -> Result<PathBuf> {
    let config = dirs::config_dir()
        .ok_or_else(|| anyhow!("could not determine the configuration directory"))?;

    Ok(config.join("image-randomizer").join("credentials.json"))
}

fn required(matches: &clap::ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one(name)
        .map(|s: &String| s.to_string())
        .ok_or_else(|| anyhow!("missing required argument: {name}"))
}

fn required_id(matches: &clap::ArgMatches) -> Result<i64> {
    matches
        .get_one::<i64>("id")
        .copied()
        .ok_or_else(|| anyhow!("missing required argument: id"))
}

fn prompt_password() -> Result<SecretString> {
    let mut stderr = io::stderr();
    write!(stderr, "password: ")?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;

    Ok(SecretString::from(
        line.trim_end_matches(['\r', '\n']).to_string(),
    ))
}
