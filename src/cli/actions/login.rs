use crate::api;
use crate::cli::actions::{self, Action};
use crate::cli::globals::GlobalArgs;
use crate::session;
use anyhow::Result;

/// Handle the login action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    if let Action::Login { username, password } = action {
        let client = actions::client(globals)?;

        session::login_or_register(&client, &username, &password).await?;

        println!("logged in as {username}");
        println!(
            "randomizer URL: {}",
            api::random_image_url(client.origin(), &username)
        );
    }

    Ok(())
}
