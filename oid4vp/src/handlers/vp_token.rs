//! # VP Token Response
//!
//! Responds to an `OpenID4VP` request with one presentation per submitted
//! credential and a Presentation Submission mapping each to its Input
//! Descriptor.
//!
//! Each credential answers an Input Descriptor of the request's Presentation
//! Definition. SD-JWT credentials are presented with only the disclosures
//! that descriptor references, bound to the Verifier with a KB-JWT. An SD-JWT
//! submitted without a named descriptor answers the first descriptor it
//! satisfies.
//! `jwt_vc_json` credentials are wrapped in a JWT VP, and may only be sent
//! with the `direct_post` response mode.

use serde_json::{Map, Value};
use tracing::instrument;
use uuid::Uuid;
use wallet_core::urlencode::form_encode;
use wallet_jose::{Signer, decode_jwt};
use wallet_vdc::format::{DC_SD_JWT, JWT_VC_JSON, JWT_VP_JSON, VC_SD_JWT};
use wallet_vdc::pex::{
    DescriptorMap, InputDescriptor, PathNested, PresentationDefinition, PresentationSubmission,
    match_descriptor, select_disclosure,
};
use wallet_vdc::sd_jwt::{SdJwtVpBuilder, divide_sd_jwt};
use wallet_vdc::w3c_vc::W3cVpBuilder;

use crate::error::invalid;
use crate::provider::{OpenIdProvider, Processed};
use crate::types::{
    PostResult, ResponseMode, SharedCredential, SubmissionCredential, VpTokenResponse,
};
use crate::{Error, Result};

// A presentation of one credential.
struct Presented {
    vp_token: String,
    descriptor_map: DescriptorMap,
    shared: SharedCredential,
}

impl<S: Signer> OpenIdProvider<'_, S, Processed> {
    /// Present `credentials` to the Verifier.
    ///
    /// Returns the outcome of the post and, for each credential, the claims
    /// that were shared.
    ///
    /// # Errors
    ///
    /// Returns an error when a credential's format is not supported, a
    /// `jwt_vc_json` credential is requested with a response mode other than
    /// `direct_post`, a credential names an Input Descriptor the request did
    /// not ask for, an SD-JWT discloses nothing its Input Descriptor
    /// references, a presentation cannot be signed, or the Verifier rejects
    /// the response.
    #[instrument(level = "debug", skip_all, fields(count = credentials.len()))]
    pub async fn respond_vp_response(
        self, credentials: &[SubmissionCredential],
    ) -> Result<(PostResult, Vec<SharedCredential>)> {
        let Some(definition) = &self.state.result.presentation_definition else {
            return Err(invalid!("request has no presentation definition"));
        };

        let mut vp_token = Vec::with_capacity(credentials.len());
        let mut descriptor_map = Vec::with_capacity(credentials.len());
        let mut shared = Vec::with_capacity(credentials.len());

        for (i, credential) in credentials.iter().enumerate() {
            let path = if credentials.len() > 1 { format!("$[{i}]") } else { "$".to_string() };

            let presented = match credential.format.as_str() {
                VC_SD_JWT | DC_SD_JWT => self.present_sd_jwt(credential, definition, path).await?,
                JWT_VC_JSON => self.present_jwt_vc(credential, definition, path).await?,
                other => {
                    return Err(Error::VpFormatsNotSupported(format!(
                        "credential {} has unsupported format {other}",
                        credential.id
                    )));
                }
            };

            vp_token.push(presented.vp_token);
            descriptor_map.push(presented.descriptor_map);
            shared.push(presented.shared);
        }

        let response = VpTokenResponse {
            vp_token,
            presentation_submission: PresentationSubmission {
                id: Uuid::new_v4().to_string(),
                definition_id: definition.id.clone(),
                descriptor_map,
            },
            state: self.state.result.request.state.clone(),
        };
        let form = form_encode(&response)?;

        let result = self.post(self.destination()?, &form).await?;
        Ok((result, shared))
    }

    async fn present_sd_jwt(
        &self, credential: &SubmissionCredential, definition: &PresentationDefinition,
        path: String,
    ) -> Result<Presented> {
        let (descriptor, disclosures) = if credential.input_descriptor.id.is_empty() {
            select_disclosure(&credential.credential, definition).ok_or_else(|| {
                invalid!("credential {} satisfies no requested descriptor", credential.id)
            })?
        } else {
            let descriptor = requested(definition, credential)?;
            (descriptor, match_descriptor(&credential.credential, descriptor))
        };
        if disclosures.is_empty() {
            return Err(invalid!(
                "credential {} discloses no claim requested by {}",
                credential.id,
                descriptor.id
            ));
        }
        tracing::debug!(descriptor = %descriptor.id, count = disclosures.len(), "sd-jwt");

        let parts = divide_sd_jwt(&credential.credential);
        let mut builder = SdJwtVpBuilder::new()
            .matched(&parts.issuer_signed_jwt, &disclosures)
            .client_id(self.client_id()?);
        if let Some(nonce) = &self.state.result.request.nonce {
            builder = builder.nonce(nonce);
        }
        let vp_token = builder
            .signer(self.signer)
            .build()
            .await
            .map_err(|e| Error::ServerError(format!("cannot build SD-JWT presentation: {e:#}")))?;

        let shared_claims = disclosures
            .into_iter()
            .filter_map(|d| Some((d.key?, d.value?)))
            .collect::<Map<String, Value>>();

        Ok(Presented {
            vp_token,
            descriptor_map: DescriptorMap {
                id: descriptor.id.clone(),
                format: credential.format.clone(),
                path,
                path_nested: None,
            },
            shared: SharedCredential {
                id: credential.id.clone(),
                format: credential.format.clone(),
                shared_claims,
            },
        })
    }

    async fn present_jwt_vc(
        &self, credential: &SubmissionCredential, definition: &PresentationDefinition,
        path: String,
    ) -> Result<Presented> {
        let request = &self.state.result.request;
        if request.response_mode != Some(ResponseMode::DirectPost) {
            let mode = request.response_mode.map_or("none", |m| m.as_str());
            return Err(Error::UnsupportedResponseMode(format!(
                "{JWT_VC_JSON} requires direct_post, not {mode}"
            )));
        }

        let descriptor = requested(definition, credential)?;

        let vc = decode_jwt::<Value>(&credential.credential)
            .map_err(|e| invalid!("credential {} is not a JWT: {e}", credential.id))?;
        let subject = vc.claims["vc"]["credentialSubject"].as_object();
        let shared_claims = subject.cloned().unwrap_or_default();

        let mut builder = W3cVpBuilder::new()
            .credential(&credential.credential)
            .client_id(self.client_id()?)
            .expires_in(self.option.vp_expiry()?);
        if let Some(nonce) = &request.nonce {
            builder = builder.nonce(nonce);
        }
        let vp_token = builder
            .signer(self.signer)
            .build()
            .await
            .map_err(|e| Error::ServerError(format!("cannot build JWT presentation: {e:#}")))?;

        Ok(Presented {
            vp_token,
            descriptor_map: DescriptorMap {
                id: descriptor.id.clone(),
                format: JWT_VP_JSON.to_string(),
                path_nested: Some(PathNested {
                    format: JWT_VC_JSON.to_string(),
                    path: format!("{path}.vp.verifiableCredential[0]"),
                }),
                path,
            },
            shared: SharedCredential {
                id: credential.id.clone(),
                format: credential.format.clone(),
                shared_claims,
            },
        })
    }
}

// The request's own copy of the descriptor a credential was selected for.
fn requested<'a>(
    definition: &'a PresentationDefinition, credential: &SubmissionCredential,
) -> Result<&'a InputDescriptor> {
    let id = &credential.input_descriptor.id;
    definition.input_descriptors.iter().find(|d| &d.id == id).ok_or_else(|| {
        invalid!("credential {} answers unrequested descriptor {id:?}", credential.id)
    })
}
