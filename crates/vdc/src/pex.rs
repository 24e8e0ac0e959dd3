//! # DIF Presentation Exchange
//!
//! Presentation Definitions sent by Verifiers, the Presentation Submissions
//! returned by the wallet, and selection of the SD-JWT disclosures that
//! satisfy an Input Descriptor.
//!
//! See <https://identity.foundation/presentation-exchange/spec/v2.0.0>.
//!
//! Field paths are matched as top-level claim names only: `$.name` and
//! `$['name']`. Nested or wildcard JSONPath expressions never match.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sd_jwt::{Disclosure, decode_disclosures, divide_sd_jwt};

/// A Verifier's requirements for the credentials it wants presented.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PresentationDefinition {
    /// Unique identifier of the definition.
    pub id: String,

    /// Input Descriptors describing the credentials required.
    pub input_descriptors: Vec<InputDescriptor>,

    /// Human-friendly name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Why the Verifier is requesting the credentials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,

    /// Credential formats the Verifier accepts, keyed by format identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<HashMap<String, ClaimFormat>>,

    /// How Input Descriptors combine to satisfy the definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_requirements: Option<Vec<SubmissionRequirement>>,
}

/// Describes one credential required by a Verifier.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct InputDescriptor {
    /// Identifier, unique within the definition.
    pub id: String,

    /// Human-friendly name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Why the credential is requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,

    /// Accepted formats for this descriptor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<HashMap<String, ClaimFormat>>,

    /// Submission requirement groups the descriptor belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<Vec<String>>,

    /// Constraints on the credential's claims.
    #[serde(default)]
    pub constraints: Constraints,
}

/// Algorithms or proof types accepted for a format.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ClaimFormat {
    /// Accepted JOSE algorithms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<Vec<String>>,

    /// Accepted proof types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_type: Option<Vec<String>>,

    /// Accepted SD-JWT algorithms.
    #[serde(rename = "sd-jwt_alg_values")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sd_jwt_alg_values: Option<Vec<String>>,

    /// Accepted KB-JWT algorithms.
    #[serde(rename = "kb-jwt_alg_values")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kb_jwt_alg_values: Option<Vec<String>>,
}

/// Claim constraints of an Input Descriptor.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Constraints {
    /// Whether only the claims named in `fields` may be disclosed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_disclosure: Option<LimitDisclosure>,

    /// Claims the credential must contain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<Field>>,
}

/// `limit_disclosure` values.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LimitDisclosure {
    /// Only the requested claims may be disclosed.
    Required,

    /// Disclosing only the requested claims is preferred.
    Preferred,
}

/// A claim required by an Input Descriptor.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Field {
    /// JSONPath alternatives locating the claim.
    pub path: Vec<String>,

    /// Field identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Human-friendly name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Why the claim is requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,

    /// JSON Schema the claim value must satisfy. Carried, not evaluated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,

    /// Whether the claim may be omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,

    /// Whether the Verifier intends to retain the claim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_to_retain: Option<bool>,
}

impl Field {
    /// Claim names referenced by the field's `$.name` paths.
    pub fn claim_names(&self) -> impl Iterator<Item = &str> {
        self.path.iter().filter_map(|p| {
            let name = claim_name(p);
            if name.is_none() {
                tracing::debug!(path = %p, "unsupported JSONPath");
            }
            name
        })
    }
}

// `$.name` or `$['name']`
fn claim_name(path: &str) -> Option<&str> {
    let name = if let Some(name) = path.strip_prefix("$.") {
        name
    } else {
        path.strip_prefix("$['")?.strip_suffix("']")?
    };
    let nested = |c: char| matches!(c, '.' | '[' | ']' | '*' | '\'');
    (!name.is_empty() && !name.contains(nested)).then_some(name)
}

/// How Input Descriptors are combined.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SubmissionRequirement {
    /// Human-friendly name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Why the requirement exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,

    /// Combination rule.
    pub rule: Rule,

    /// Exact number of descriptors to submit for `pick`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,

    /// Minimum number of descriptors to submit for `pick`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<usize>,

    /// Maximum number of descriptors to submit for `pick`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,

    /// The descriptor group the rule applies to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Nested requirements the rule applies to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_nested: Option<Vec<SubmissionRequirement>>,
}

/// Submission requirement rule.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Every descriptor in the group is required.
    #[default]
    All,

    /// A subset of the group is required.
    Pick,
}

/// Maps submitted credentials to the Input Descriptors they satisfy.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PresentationSubmission {
    /// Unique identifier of the submission.
    pub id: String,

    /// The Presentation Definition this submission satisfies.
    pub definition_id: String,

    /// One entry per submitted credential.
    pub descriptor_map: Vec<DescriptorMap>,
}

/// Locates the credential satisfying an Input Descriptor in the VP token.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DescriptorMap {
    /// The Input Descriptor satisfied.
    pub id: String,

    /// Format of the object at `path`.
    pub format: String,

    /// JSONPath into the VP token.
    pub path: String,

    /// Location of the credential within a presentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_nested: Option<PathNested>,
}

/// A path within the object located by a [`DescriptorMap`].
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PathNested {
    /// Format of the nested object.
    pub format: String,

    /// JSONPath within the enclosing object.
    pub path: String,
}

/// Find the first Input Descriptor with at least one field referencing a
/// disclosure of `sd_jwt`, returning it with the disclosures it references.
///
/// Descriptors are tried in order and the first match wins. Returns `None`
/// when no descriptor references any disclosed claim.
#[must_use]
pub fn select_disclosure<'a>(
    sd_jwt: &str, definition: &'a PresentationDefinition,
) -> Option<(&'a InputDescriptor, Vec<Disclosure>)> {
    let disclosures = decode_disclosures(&divide_sd_jwt(sd_jwt).disclosures);

    for descriptor in &definition.input_descriptors {
        let matched = referenced(&disclosures, descriptor);
        if !matched.is_empty() {
            tracing::debug!(descriptor = %descriptor.id, count = matched.len(), "descriptor matched");
            return Some((descriptor, matched));
        }
    }
    None
}

/// The disclosures of `sd_jwt` referenced by `descriptor`'s fields, in
/// disclosure order. Empty when the descriptor references none of them.
#[must_use]
pub fn match_descriptor(sd_jwt: &str, descriptor: &InputDescriptor) -> Vec<Disclosure> {
    let disclosures = decode_disclosures(&divide_sd_jwt(sd_jwt).disclosures);
    referenced(&disclosures, descriptor)
}

fn referenced(disclosures: &[Disclosure], descriptor: &InputDescriptor) -> Vec<Disclosure> {
    let fields = descriptor.constraints.fields.as_deref().unwrap_or_default();
    let names = fields.iter().flat_map(Field::claim_names).collect::<Vec<_>>();

    disclosures
        .iter()
        .filter(|d| d.key.as_deref().is_some_and(|k| names.contains(&k)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use base64ct::{Base64UrlUnpadded, Encoding};
    use serde_json::json;

    use super::*;

    fn disclosure(key: &str, value: Value) -> String {
        let json = serde_json::to_vec(&json!(["salt", key, value])).unwrap();
        Base64UrlUnpadded::encode_string(&json)
    }

    fn definition(paths: &[&[&str]]) -> PresentationDefinition {
        let input_descriptors = paths
            .iter()
            .enumerate()
            .map(|(i, paths)| InputDescriptor {
                id: format!("descriptor-{i}"),
                constraints: Constraints {
                    fields: Some(vec![Field {
                        path: paths.iter().map(ToString::to_string).collect(),
                        ..Field::default()
                    }]),
                    ..Constraints::default()
                },
                ..InputDescriptor::default()
            })
            .collect();
        PresentationDefinition { id: "pd".to_string(), input_descriptors, ..Default::default() }
    }

    #[test]
    fn matching_claim() {
        let sd_jwt = format!(
            "ISSUER~{}~{}~",
            disclosure("is_older_than_13", json!(true)),
            disclosure("name", json!("Alice"))
        );
        let pd = definition(&[&["$.is_older_than_13"]]);

        let (descriptor, disclosures) = select_disclosure(&sd_jwt, &pd).expect("should match");
        assert_eq!(descriptor.id, "descriptor-0");
        assert_eq!(disclosures.len(), 1);
        assert_eq!(disclosures[0].key.as_deref(), Some("is_older_than_13"));
    }

    #[test]
    fn missing_claim() {
        let sd_jwt = format!("ISSUER~{}~", disclosure("name", json!("Alice")));
        let pd = definition(&[&["$.is_older_than_13"]]);
        assert!(select_disclosure(&sd_jwt, &pd).is_none());
    }

    #[test]
    fn first_match_wins() {
        let sd_jwt = format!(
            "ISSUER~{}~{}~",
            disclosure("age", json!(20)),
            disclosure("name", json!("Alice"))
        );
        let pd = definition(&[&["$.email"], &["$.age"], &["$.age", "$['name']"]]);

        let (descriptor, disclosures) = select_disclosure(&sd_jwt, &pd).expect("should match");
        assert_eq!(descriptor.id, "descriptor-1");
        assert_eq!(disclosures.len(), 1);
    }

    // A chosen descriptor is matched on its own, not the first that matches.
    #[test]
    fn chosen_descriptor() {
        let sd_jwt = format!(
            "ISSUER~{}~{}~",
            disclosure("age", json!(20)),
            disclosure("name", json!("Alice"))
        );
        let pd = definition(&[&["$.age"], &["$.age", "$['name']"]]);

        let disclosures = match_descriptor(&sd_jwt, &pd.input_descriptors[1]);
        let keys = disclosures.iter().map(|d| d.key.as_deref()).collect::<Vec<_>>();
        assert_eq!(keys, vec![Some("age"), Some("name")]);

        let pd = definition(&[&["$.email"]]);
        assert!(match_descriptor(&sd_jwt, &pd.input_descriptors[0]).is_empty());
    }

    #[test]
    fn path_forms() {
        assert_eq!(claim_name("$.age"), Some("age"));
        assert_eq!(claim_name("$['family_name']"), Some("family_name"));
        assert_eq!(claim_name("$.credentialSubject.age"), None);
        assert_eq!(claim_name("$.address[0]"), None);
        assert_eq!(claim_name("$.*"), None);
        assert_eq!(claim_name("age"), None);
        assert_eq!(claim_name("$."), None);
    }

    #[test]
    fn definition_wire_format() {
        let pd: PresentationDefinition = serde_json::from_value(json!({
            "id": "pd-1",
            "submission_requirements": [{"rule": "pick", "count": 1, "from": "A"}],
            "input_descriptors": [{
                "id": "id-card",
                "group": ["A"],
                "format": {"vc+sd-jwt": {"sd-jwt_alg_values": ["ES256"]}},
                "constraints": {
                    "limit_disclosure": "required",
                    "fields": [{"path": ["$.age"], "filter": {"type": "number", "minimum": 18}}]
                }
            }]
        }))
        .expect("should deserialize");

        let descriptor = &pd.input_descriptors[0];
        assert_eq!(descriptor.constraints.limit_disclosure, Some(LimitDisclosure::Required));
        assert_eq!(pd.submission_requirements.as_ref().unwrap()[0].rule, Rule::Pick);
        let fields = descriptor.constraints.fields.as_ref().unwrap();
        assert_eq!(fields[0].filter.as_ref().unwrap()["minimum"], 18);
    }
}
