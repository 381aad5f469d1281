use crate::api::TokenPair;
use crate::client::{ApiClient, Error};
use crate::storage::Kind;
use secrecy::SecretString;
use tracing::{debug, instrument};

/// Logs in, falling back to registration when the username is unknown.
///
/// A 404 from login means the account does not exist yet: register with the
/// same credentials and use the returned token pair directly. Any other
/// failure ends the attempt with the backend's message untouched. On success
/// the store holds the token pair and the submitted username, and the retry
/// protocol of [`ApiClient`] is live from the next request on.
///
/// # Errors
/// Returns the login or registration failure, or a storage error if the
/// credentials cannot be persisted.
#[instrument(skip(client, password))]
pub async fn login_or_register(
    client: &ApiClient,
    username: &str,
    password: &SecretString,
) -> Result<(), Error> {
    let TokenPair {
        access_token,
        refresh_token,
    } = match client.login(username, password).await {
        Ok(pair) => pair,
        Err(Error::Backend { status: 404, .. }) => {
            debug!("username not registered yet, creating the account");
            client.register(username, password).await?
        }
        Err(err) => return Err(err),
    };

    let store = client.store();
    store.save_tokens(&access_token, &refresh_token)?;
    store.save(Kind::Username, username)?;

    Ok(())
}
