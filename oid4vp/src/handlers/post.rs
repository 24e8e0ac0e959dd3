//! # Post Response
//!
//! Sends an Authorization Response to the Verifier as an
//! `application/x-www-form-urlencoded` POST. This is the only step of an
//! exchange with an external side effect.

use http::header::{LOCATION, SET_COOKIE};
use serde_json::Value;
use tracing::instrument;
use wallet_jose::Signer;

use crate::provider::{OpenIdProvider, Processed};
use crate::types::{PostResult, ResponseMode};
use crate::{Error, Result};

impl<S: Signer> OpenIdProvider<'_, S, Processed> {
    /// Where the response goes: `response_uri` for `direct_post`, otherwise
    /// `redirect_uri`. Either falls back to the other when absent.
    pub(crate) fn destination(&self) -> Result<&str> {
        let request = &self.state.result.request;
        let response_uri = request.response_uri.as_deref();
        let redirect_uri = request.redirect_uri.as_deref();

        let destination = if request.response_mode == Some(ResponseMode::DirectPost) {
            response_uri.or(redirect_uri)
        } else {
            redirect_uri.or(response_uri)
        };
        destination.ok_or_else(|| crate::error::invalid!("no response_uri or redirect_uri"))
    }

    /// POST `form` to `url`. A status of 400 or above is a rejection and
    /// returned as `Error::AccessDenied` with the Verifier's message.
    #[instrument(level = "debug", skip(self, form))]
    pub(crate) async fn post(&self, url: &str, form: &[(String, String)]) -> Result<PostResult> {
        let resp = self.http.post_form(url, form).await?;
        let status_code = resp.status.as_u16();
        let json = serde_json::from_str::<Value>(&resp.body).ok();

        if status_code >= 400 {
            let message = json
                .as_ref()
                .and_then(|v| v.get("message").or_else(|| v.get("error_description")))
                .and_then(Value::as_str)
                .map_or_else(
                    || format!("verifier rejected the response with status {status_code}"),
                    ToString::to_string,
                );
            tracing::warn!(status_code, "response rejected: {message}");
            return Err(Error::AccessDenied(message));
        }

        let location = resp
            .headers
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
            .or_else(|| {
                let redirect = json.as_ref()?.get("redirect_uri")?.as_str()?;
                Some(redirect.to_string())
            });
        let cookies = resp
            .headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(ToString::to_string)
            .collect();

        Ok(PostResult {
            status_code,
            location,
            cookies,
            response_body: (!resp.body.is_empty()).then_some(resp.body),
        })
    }
}
