//! Username/password login.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::call::{NetworkCall, NetworkCallBuilder, Outcome};
use crate::config::ServerConfiguration;
use crate::error::Error;
use crate::http::{HttpMethod, HttpRequest};
use crate::json::{JsonCall, JsonHandle};

pub const LOGIN_ENDPOINT: &str = "user/auth/local/login";

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

/// What the server returns for a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginSuccess {
    #[serde(default)]
    pub new_user: bool,
    pub api_token: String,
    pub id: String,
}

/// POST of `{username, password}` to the login endpoint.
#[derive(Debug)]
pub struct LoginCall {
    call: JsonCall,
}

impl LoginCall {
    /// Login call with default transport and no stub.
    pub fn new(
        configuration: Arc<ServerConfiguration>,
        username: &str,
        password: &str,
    ) -> Result<Self, Error> {
        Self::with(configuration, username, password, |builder| builder)
    }

    /// Login call whose builder is adjusted by `configure`, e.g. to add a
    /// stub or a transport. Endpoint, method and body are fixed.
    pub fn with(
        configuration: Arc<ServerConfiguration>,
        username: &str,
        password: &str,
        configure: impl FnOnce(NetworkCallBuilder) -> NetworkCallBuilder,
    ) -> Result<Self, Error> {
        let builder = configure(NetworkCall::builder(configuration, LOGIN_ENDPOINT))
            .method(HttpMethod::Post)
            .json_body(&Credentials { username, password })?;
        Ok(Self {
            call: JsonCall::new(builder)?,
        })
    }

    pub fn build_request(&self) -> HttpRequest {
        self.call.build_request()
    }

    pub fn fire(self) -> JsonHandle {
        self.call.fire()
    }

    /// Fire and decode the result. `None` only if the call was cancelled.
    pub async fn login(self) -> Option<Outcome<LoginSuccess>> {
        self.fire().decode::<LoginSuccess>().await
    }
}
