use crate::api;
use crate::cli::actions::{self, Action};
use crate::cli::globals::GlobalArgs;
use crate::client::{ApiClient, Error};
use crate::storage::Kind;
use anyhow::{anyhow, Result};

/// Handle the list, add, update and remove actions.
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    let client = actions::client(globals)?;

    let outcome = match action {
        Action::List => list(&client).await,
        Action::Add { url } => client
            .create_image(&url)
            .await
            .map(|image| println!("added {} as id {}", image.image, image.id)),
        Action::Update { id, url } => client
            .update_image(id, &url)
            .await
            .map(|image| println!("updated id {} to {}", image.id, image.image)),
        Action::Remove { id } => client
            .delete_image(id)
            .await
            .map(|()| println!("removed id {id}")),
        _ => Ok(()),
    };

    outcome.map_err(hint_login)
}

async fn list(client: &ApiClient) -> Result<(), Error> {
    let images = client.images().await?;

    let username = client.store().get(Kind::Username);
    if !username.is_empty() {
        println!(
            "{username}'s images ({})",
            api::random_image_url(client.origin(), &username)
        );
    }

    if images.is_empty() {
        println!("no images yet, add one with: image-randomizer add <url>");
    }

    for image in images {
        println!("{:>6}  {}", image.id, image.image);
    }

    Ok(())
}

// A terminal auth failure already wiped the credentials; tell the user what
// to do next instead of echoing the raw 401.
fn hint_login(err: Error) -> anyhow::Error {
    if err.is_auth_terminal() {
        anyhow!("session expired, please run: image-randomizer login <username>")
    } else {
        anyhow::Error::new(err)
    }
}
