use anyhow::Result;
use image_randomizer::cli::{actions, actions::Action, start};

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    // Start the program
    let (action, globals) = start()?;

    // Handle the action
    match action {
        Action::Login { .. } => actions::login::handle(action, &globals).await?,
        Action::Logout => actions::logout::handle(&globals)?,
        Action::List | Action::Add { .. } | Action::Update { .. } | Action::Remove { .. } => {
            actions::images::handle(action, &globals).await?;
        }
        Action::Random { .. } => actions::random::handle(action, &globals)?,
    }

    Ok(())
}
