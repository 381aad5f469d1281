pub mod images;
pub mod login;
pub mod logout;
pub mod random;

use crate::cli::globals::GlobalArgs;
use crate::client::ApiClient;
use crate::storage::CredentialStore;
use anyhow::Result;
use secrecy::SecretString;
use std::sync::Arc;

#[derive(Debug)]
pub enum Action {
    Login {
        username: String,
        password: SecretString,
    },
    Logout,
    List,
    Add {
        url: String,
    },
    Update {
        id: i64,
        url: String,
    },
    Remove {
        id: i64,
    },
    Random {
        username: Option<String>,
    },
}

pub(crate) fn store(globals: &GlobalArgs) -> Arc<CredentialStore> {
    Arc::new(CredentialStore::open(globals.credentials.clone()))
}

pub(crate) fn client(globals: &GlobalArgs) -> Result<ApiClient> {
    ApiClient::new(&globals.api_url, store(globals))
}
