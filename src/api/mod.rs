use crate::client::{unwrap_envelope, ApiClient, Error};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

/// Envelope every backend endpoint wraps its payload in.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub status: u16,
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Image list entry as the backend returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub id: i64,
    pub user_id: i64,
    pub image: String,
}

/// Public delivery URL serving one random image from a user's list. No
/// request and no credentials involved, the endpoint is unauthenticated.
#[must_use]
pub fn random_image_url(origin: &str, username: &str) -> String {
    format!("{origin}/user/{username}/image.jpg")
}

pub(crate) fn parse_data<T: DeserializeOwned>(body: Value) -> Result<T, Error> {
    let Envelope {
        status,
        message,
        data,
    } = serde_json::from_value::<Envelope<T>>(body)?;

    data.ok_or(Error::Backend { status, message })
}

impl ApiClient {
    /// # Errors
    /// Returns `Backend { status: 404, .. }` when the username is unknown and
    /// `Backend { status: 401, .. }` on a wrong password.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<TokenPair, Error> {
        self.credentials_request("/login", username, password).await
    }

    /// # Errors
    /// Returns a `Backend` error when the username is taken or invalid.
    pub async fn register(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<TokenPair, Error> {
        self.credentials_request("/register", username, password)
            .await
    }

    /// Validates the stored access token, refreshing it once if expired.
    /// # Errors
    /// Returns an error if the token (and its refresh) are rejected.
    pub async fn token_check(&self) -> Result<(), Error> {
        self.send(Method::POST, "/token/check", None)
            .await
            .map(drop)
    }

    /// # Errors
    /// Returns an error if the request fails or the session has expired.
    pub async fn images(&self) -> Result<Vec<Image>, Error> {
        let body = self.send(Method::GET, "/images", None).await?;
        parse_data(body)
    }

    /// # Errors
    /// Returns an error if the request fails or the session has expired.
    pub async fn create_image(&self, url: &str) -> Result<Image, Error> {
        let body = self
            .send(Method::POST, "/images", Some(json!({ "image": url })))
            .await?;
        parse_data(body)
    }

    /// # Errors
    /// Returns an error if the request fails or the session has expired.
    pub async fn update_image(&self, id: i64, url: &str) -> Result<Image, Error> {
        let body = self
            .send(
                Method::PATCH,
                &format!("/images/{id}"),
                Some(json!({ "image": url })),
            )
            .await?;
        parse_data(body)
    }

    /// # Errors
    /// Returns an error if the request fails or the session has expired.
    pub async fn delete_image(&self, id: i64) -> Result<(), Error> {
        self.send(Method::DELETE, &format!("/images/{id}"), None)
            .await
            .map(drop)
    }

    async fn credentials_request(
        &self,
        path: &str,
        username: &str,
        password: &SecretString,
    ) -> Result<TokenPair, Error> {
        let payload = json!({
            "username": username,
            "password": password.expose_secret(),
        });

        let response = self
            .http
            .post(self.endpoint(path))
            .json(&payload)
            .send()
            .await?;

        parse_data(unwrap_envelope(response).await?)
    }
}
