use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub api_url: String,
    pub credentials: PathBuf,
}

impl GlobalArgs {
    #[must_use]
    pub const fn new(api_url: String, credentials: PathBuf) -> Self {
        Self {
            api_url,
            credentials,
        }
    }
}
