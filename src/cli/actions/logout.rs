use crate::cli::actions;
use crate::cli::globals::GlobalArgs;
use anyhow::Result;

/// Handle the logout action: drop every stored credential.
pub fn handle(globals: &GlobalArgs) -> Result<()> {
    actions::store(globals).clear()?;

    println!("logged out");

    Ok(())
}
