use crate::api;
use crate::cli::actions::{self, Action};
use crate::cli::globals::GlobalArgs;
use crate::client;
use crate::storage::Kind;
use anyhow::{anyhow, Result};

/// Handle the random action: print the public delivery URL for a user's
/// list. Works without a session when a username is given explicitly.
pub fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    if let Action::Random { username } = action {
        let username = match username {
            Some(username) => username,
            None => {
                let stored = actions::store(globals).get(Kind::Username);
                if stored.is_empty() {
                    return Err(anyhow!("no username given and nobody is logged in"));
                }
                stored
            }
        };

        let origin = client::origin_url(&globals.api_url)?;
        println!("{}", api::random_image_url(&origin, &username));
    }

    Ok(())
}
