//! Messages exchanged with the verifier.

use serde::{Deserialize, Serialize};

/// What a signature covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignedData {
    /// The downloaded file itself.
    Data,
    /// The digest file that lists the downloaded file.
    Digest,
}

/// Verification request for one downloaded file.
///
/// At most one of `digest_file` and `digest_direct` is set; `signed_data`
/// accompanies `signature_file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VerifierRequest {
    pub original_filename: String,
    pub input_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest_direct: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_data: Option<SignedData>,
}

/// Handshake sent to check the verifier is installed and answering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct VersionRequest {
    pub version_request: bool,
}

impl Default for VersionRequest {
    fn default() -> Self {
        Self {
            version_request: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionReply {
    #[serde(default)]
    pub version: Option<String>,
}

/// Result-or-error as the verifier encodes it: `{"Ok": ..}` or `{"Err": ".."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome<T> {
    Ok(T),
    Err(String),
}

/// Every reply shape the verifier may send for a verification request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum VerifierReply {
    /// Full report: integrity result plus one result per signature.
    Report {
        integrity: Outcome<String>,
        signatures: Outcome<Vec<String>>,
    },
    /// Bare verdict code (`integrity`, `authenticity`, `fail`, `error`).
    Result { result: String },
    Error { error: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_uses_kebab_keys_and_skips_absent_material() {
        let request = VerifierRequest {
            original_filename: "f.ext".to_string(),
            input_file: "/a/f.ext".to_string(),
            digest_file: None,
            digest_direct: Some("ab".repeat(20)),
            signature_file: Some("/a/f.ext.sig".to_string()),
            signed_data: Some(SignedData::Data),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "original-filename": "f.ext",
                "input-file": "/a/f.ext",
                "digest-direct": "ab".repeat(20),
                "signature-file": "/a/f.ext.sig",
                "signed-data": "data",
            })
        );
    }

    #[test]
    fn version_request_shape() {
        assert_eq!(
            serde_json::to_value(VersionRequest::default()).unwrap(),
            json!({"version-request": true})
        );
    }

    #[test]
    fn report_reply_decodes_strictly() {
        let reply: VerifierReply = serde_json::from_value(json!({
            "integrity": {"Ok": "PASS"},
            "signatures": {"Err": "no keyring"},
        }))
        .unwrap();
        assert_eq!(
            reply,
            VerifierReply::Report {
                integrity: Outcome::Ok("PASS".to_string()),
                signatures: Outcome::Err("no keyring".to_string()),
            }
        );
    }

    #[test]
    fn flat_and_error_replies() {
        let reply: VerifierReply = serde_json::from_value(json!({"result": "fail"})).unwrap();
        assert_eq!(
            reply,
            VerifierReply::Result {
                result: "fail".to_string()
            }
        );
        let reply: VerifierReply =
            serde_json::from_value(json!({"error": "cannot open file"})).unwrap();
        assert!(matches!(reply, VerifierReply::Error { .. }));
    }

    #[test]
    fn half_report_is_rejected() {
        assert!(serde_json::from_value::<VerifierReply>(json!({"integrity": {"Ok": "PASS"}})).is_err());
        assert!(serde_json::from_value::<VerifierReply>(json!({
            "integrity": {"Maybe": "PASS"},
            "signatures": {"Ok": []},
        }))
        .is_err());
        assert!(serde_json::from_value::<VerifierReply>(json!("PASS")).is_err());
    }
}
