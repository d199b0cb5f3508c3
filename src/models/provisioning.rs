//! Create-instance request parsing and response shaping.
//!
//! The request body is parsed from raw JSON rather than through a derived
//! `Deserialize` so that every unrecognized field can be reported by name
//! next to the regular per-field errors.

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::FieldErrors;

/// Current name of the credential reference field.
pub const CREDENTIAL_REF_FIELD: &str = "credential_ref";

/// Deprecated alias still accepted for the credential reference.
pub const DEPRECATED_CREDENTIAL_REF_FIELD: &str = "cloud_provider_token_id";

/// Fields accepted by the create-instance operation.
pub const ALLOWED_FIELDS: &[&str] = &[
    CREDENTIAL_REF_FIELD,
    DEPRECATED_CREDENTIAL_REF_FIELD,
    "location",
    "instance_type",
    "image",
    "name",
    "key_ref",
    "enable_ipv4",
    "enable_ipv6",
    "extra_provider_key_ids",
    "cloud_init_script",
    "instant_validate",
];

/// Image reference: numeric id (Hetzner, DigitalOcean) or slug (DigitalOcean).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ImageRef {
    Id(i64),
    Slug(String),
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageRef::Id(id) => write!(f, "{}", id),
            ImageRef::Slug(slug) => f.write_str(slug),
        }
    }
}

/// Validated create-instance input. Optional fields are still `None` here;
/// defaults are applied by the provisioner.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisioningRequest {
    pub credential_ref: String,
    pub location: String,
    pub instance_type: String,
    pub image: ImageRef,
    pub name: Option<String>,
    pub key_ref: String,
    pub enable_ipv4: Option<bool>,
    pub enable_ipv6: Option<bool>,
    pub extra_provider_key_ids: Option<Vec<i64>>,
    pub cloud_init_script: Option<String>,
    pub validate_after_create: Option<bool>,
}

/// Successful create-instance response (HTTP 201)
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProvisionedServerResponse {
    pub id: Uuid,
    pub remote_instance_id: i64,
    pub ip: String,
}

impl ProvisioningRequest {
    /// Validate a raw JSON body against the allow-list and field rules.
    ///
    /// All problems are collected; an unknown field never hides a missing one.
    pub fn from_json(body: &Value) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        let Some(object) = body.as_object() else {
            return Err(FieldErrors::single("body", "The request body must be a JSON object."));
        };

        for key in object.keys() {
            if !ALLOWED_FIELDS.contains(&key.as_str()) {
                errors.add(key.clone(), format!("The {} field is not allowed.", key));
            }
        }

        let credential_ref = match optional_string(object, CREDENTIAL_REF_FIELD, &mut errors) {
            Some(current) => Some(current),
            None => optional_string(object, DEPRECATED_CREDENTIAL_REF_FIELD, &mut errors),
        };
        if credential_ref.is_none() && !errors.contains(CREDENTIAL_REF_FIELD) {
            errors.add(
                CREDENTIAL_REF_FIELD,
                format!("The {} field is required.", CREDENTIAL_REF_FIELD),
            );
        }

        let location = required_string(object, "location", &mut errors);
        let instance_type = required_string(object, "instance_type", &mut errors);
        let image = image_ref(object, &mut errors);
        let name = optional_string(object, "name", &mut errors);
        let key_ref = required_string(object, "key_ref", &mut errors);
        let enable_ipv4 = optional_bool(object, "enable_ipv4", &mut errors);
        let enable_ipv6 = optional_bool(object, "enable_ipv6", &mut errors);
        let extra_provider_key_ids = optional_id_list(object, "extra_provider_key_ids", &mut errors);
        let cloud_init_script = optional_string(object, "cloud_init_script", &mut errors);
        let validate_after_create = optional_bool(object, "instant_validate", &mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }

        match (credential_ref, location, instance_type, image, key_ref) {
            (Some(credential_ref), Some(location), Some(instance_type), Some(image), Some(key_ref)) => {
                Ok(ProvisioningRequest {
                    credential_ref,
                    location,
                    instance_type,
                    image,
                    name,
                    key_ref,
                    enable_ipv4,
                    enable_ipv6,
                    extra_provider_key_ids,
                    cloud_init_script,
                    validate_after_create,
                })
            }
            _ => Err(FieldErrors::single("body", "The request body is incomplete.")),
        }
    }
}

fn required_string(object: &Map<String, Value>, field: &str, errors: &mut FieldErrors) -> Option<String> {
    let value = optional_string(object, field, errors);
    if value.is_none() && !errors.contains(field) {
        errors.add(field, format!("The {} field is required.", field));
    }
    value
}

/// `null`, absent and blank strings are all treated as "not provided".
fn optional_string(object: &Map<String, Value>, field: &str, errors: &mut FieldErrors) -> Option<String> {
    match object.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.add(field, format!("The {} field must be a string.", field));
            None
        }
    }
}

fn optional_bool(object: &Map<String, Value>, field: &str, errors: &mut FieldErrors) -> Option<bool> {
    match object.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => {
            errors.add(field, format!("The {} field must be true or false.", field));
            None
        }
    }
}

fn optional_id_list(object: &Map<String, Value>, field: &str, errors: &mut FieldErrors) -> Option<Vec<i64>> {
    match object.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => {
            let ids: Vec<i64> = items.iter().filter_map(Value::as_i64).collect();
            if ids.len() != items.len() {
                errors.add(field, format!("The {} field must contain only integers.", field));
                return None;
            }
            Some(ids)
        }
        Some(_) => {
            errors.add(field, format!("The {} field must be an array.", field));
            None
        }
    }
}

fn image_ref(object: &Map<String, Value>, errors: &mut FieldErrors) -> Option<ImageRef> {
    match object.get("image") {
        None | Some(Value::Null) => {
            errors.add("image", "The image field is required.");
            None
        }
        Some(Value::Number(n)) => match n.as_i64() {
            Some(id) => Some(ImageRef::Id(id)),
            None => {
                errors.add("image", "The image field must be an integer id or a slug.");
                None
            }
        },
        Some(Value::String(s)) if s.trim().is_empty() => {
            errors.add("image", "The image field is required.");
            None
        }
        Some(Value::String(s)) => Some(match s.trim().parse::<i64>() {
            Ok(id) => ImageRef::Id(id),
            Err(_) => ImageRef::Slug(s.trim().to_string()),
        }),
        Some(_) => {
            errors.add("image", "The image field must be an integer id or a slug.");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> Value {
        json!({
            "credential_ref": "0b7f3c1e-2a4d-4d6b-9a51-6f0c7f2d1e11",
            "location": "nbg1",
            "instance_type": "cx11",
            "image": 15512617,
            "key_ref": "K1"
        })
    }

    #[test]
    fn test_minimal_request_parses() {
        let request = ProvisioningRequest::from_json(&minimal()).unwrap();
        assert_eq!(request.location, "nbg1");
        assert_eq!(request.image, ImageRef::Id(15512617));
        assert_eq!(request.key_ref, "K1");
        assert!(request.name.is_none());
        assert!(request.enable_ipv4.is_none());
        assert!(request.extra_provider_key_ids.is_none());
    }

    #[test]
    fn test_unknown_field_is_named() {
        let mut body = minimal();
        body["datacenter"] = json!("fsn1");

        let errors = ProvisioningRequest::from_json(&body).unwrap_err();
        assert!(errors.contains("datacenter"));
        assert_eq!(errors.fields().count(), 1);
    }

    #[test]
    fn test_each_unknown_field_named_alongside_field_errors() {
        let body = json!({
            "credential_ref": "abc",
            "instance_type": "cx11",
            "image": 1,
            "key_ref": "K1",
            "foo": 1,
            "bar": true,
            "enable_ipv4": "yes"
        });

        let errors = ProvisioningRequest::from_json(&body).unwrap_err();
        assert!(errors.contains("foo"));
        assert!(errors.contains("bar"));
        assert!(errors.contains("location"));
        assert!(errors.contains("enable_ipv4"));
    }

    #[test]
    fn test_deprecated_credential_alias() {
        let mut body = minimal();
        let object = body.as_object_mut().unwrap();
        object.remove("credential_ref");
        object.insert("cloud_provider_token_id".to_string(), json!("legacy-ref"));

        let request = ProvisioningRequest::from_json(&body).unwrap();
        assert_eq!(request.credential_ref, "legacy-ref");
    }

    #[test]
    fn test_current_credential_ref_preferred_over_alias() {
        let mut body = minimal();
        body["cloud_provider_token_id"] = json!("legacy-ref");

        let request = ProvisioningRequest::from_json(&body).unwrap();
        assert_eq!(request.credential_ref, "0b7f3c1e-2a4d-4d6b-9a51-6f0c7f2d1e11");
    }

    #[test]
    fn test_missing_credential_ref() {
        let mut body = minimal();
        body.as_object_mut().unwrap().remove("credential_ref");

        let errors = ProvisioningRequest::from_json(&body).unwrap_err();
        assert!(errors.contains("credential_ref"));
    }

    #[test]
    fn test_image_accepts_slug_and_numeric_string() {
        let mut body = minimal();
        body["image"] = json!("ubuntu-24-04-x64");
        let request = ProvisioningRequest::from_json(&body).unwrap();
        assert_eq!(request.image, ImageRef::Slug("ubuntu-24-04-x64".to_string()));

        body["image"] = json!("67794580");
        let request = ProvisioningRequest::from_json(&body).unwrap();
        assert_eq!(request.image, ImageRef::Id(67794580));
    }

    #[test]
    fn test_extra_key_ids_must_be_integers() {
        let mut body = minimal();
        body["extra_provider_key_ids"] = json!([1, "two", 3]);

        let errors = ProvisioningRequest::from_json(&body).unwrap_err();
        assert!(errors.contains("extra_provider_key_ids"));
    }

    #[test]
    fn test_non_object_body() {
        let errors = ProvisioningRequest::from_json(&json!([1, 2])).unwrap_err();
        assert!(errors.contains("body"));
    }

    #[test]
    fn test_optional_fields_parsed() {
        let mut body = minimal();
        body["name"] = json!("My Server");
        body["enable_ipv6"] = json!(false);
        body["extra_provider_key_ids"] = json!([7, 8]);
        body["cloud_init_script"] = json!("#cloud-config\npackages: [git]");
        body["instant_validate"] = json!(true);

        let request = ProvisioningRequest::from_json(&body).unwrap();
        assert_eq!(request.name.as_deref(), Some("My Server"));
        assert_eq!(request.enable_ipv6, Some(false));
        assert_eq!(request.extra_provider_key_ids, Some(vec![7, 8]));
        assert!(request.cloud_init_script.unwrap().starts_with("#cloud-config"));
        assert_eq!(request.validate_after_create, Some(true));
    }
}
