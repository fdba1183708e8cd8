//! # Request Helpers
//!
//! Maps JSON and path rejections to [`AppError::BadRequest`] so malformed
//! requests get the same error envelope as every other failure.

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::Path;
use axum::Json;
use dotrack_core::ValidationError;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a path parameter, mapping a malformed segment to [`AppError::BadRequest`].
pub fn extract_path<T>(result: Result<Path<T>, PathRejection>) -> Result<T, AppError> {
    result
        .map(|Path(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// A body field that may be absent from the JSON but is required by the
/// operation. Absence is a validation failure naming the field.
pub fn required<T>(field: &'static str, value: Option<T>) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::MissingField { field })
}

/// Parse a body that may be omitted entirely. An empty body yields `None`.
pub fn extract_optional_json<T: DeserializeOwned>(body: &Bytes) -> Result<Option<T>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|err| AppError::BadRequest(format!("invalid JSON body: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Note {
        note: Option<String>,
    }

    #[test]
    fn empty_body_is_none() {
        assert_eq!(extract_optional_json::<Note>(&Bytes::new()).unwrap(), None);
        assert_eq!(
            extract_optional_json::<Note>(&Bytes::from_static(b"  \n")).unwrap(),
            None
        );
    }

    #[test]
    fn present_body_is_parsed() {
        let parsed = extract_optional_json::<Note>(&Bytes::from_static(br#"{"note":"hi"}"#)).unwrap();
        assert_eq!(
            parsed,
            Some(Note {
                note: Some("hi".into())
            })
        );
    }

    #[test]
    fn absent_field_is_named() {
        assert_eq!(required("note", Some(3)).unwrap(), 3);
        assert_eq!(
            required::<String>("authorized_person", None).unwrap_err(),
            ValidationError::MissingField {
                field: "authorized_person"
            }
        );
    }

    #[test]
    fn malformed_body_is_bad_request() {
        let err = extract_optional_json::<Note>(&Bytes::from_static(b"{nope")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
