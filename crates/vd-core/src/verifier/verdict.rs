//! Turning verifier replies into a verdict and a notification text.

use std::fmt;

use super::message::{Outcome, VerifierReply};
use crate::error::{Result, VdError};
use crate::settings::Setting;

const PASS: &str = "PASS";
const UNTESTED: &str = "UNTESTED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Digest matched.
    IntegrityPass,
    /// Every signature verified.
    AuthenticityPass,
    Fail,
    Error,
}

impl Verdict {
    /// Parses the bare verdict codes of a `{"result": ..}` reply.
    pub fn from_code(code: &str) -> Option<Verdict> {
        match code {
            "integrity" => Some(Verdict::IntegrityPass),
            "authenticity" => Some(Verdict::AuthenticityPass),
            "fail" => Some(Verdict::Fail),
            "error" => Some(Verdict::Error),
            _ => None,
        }
    }

    /// Setting that decides whether this verdict is announced.
    pub fn notify_setting(self) -> Setting {
        match self {
            Verdict::IntegrityPass | Verdict::AuthenticityPass => Setting::NotifyOnSuccess,
            Verdict::Fail => Setting::NotifyOnFail,
            Verdict::Error => Setting::NotifyOnError,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Verdict::Error => "Error encountered",
            _ => "Verification results",
        }
    }

    fn summary(self) -> &'static str {
        match self {
            Verdict::IntegrityPass => "✅ Integrity check passed",
            Verdict::AuthenticityPass => "✅ Authenticity verified",
            Verdict::Fail => "❌ Verification failed",
            Verdict::Error => "Verification could not be completed",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Verdict::IntegrityPass => "integrity",
            Verdict::AuthenticityPass => "authenticity",
            Verdict::Fail => "fail",
            Verdict::Error => "error",
        };
        f.write_str(code)
    }
}

/// Verdict for a full report.
///
/// Any error is `Error`; a failed digest or signature is `Fail`; all
/// signatures passing is `AuthenticityPass`; a passing digest is
/// `IntegrityPass`. A report that verified nothing is `Error`.
pub fn classify(integrity: &Outcome<String>, signatures: &Outcome<Vec<String>>) -> Verdict {
    let (integrity, signatures) = match (integrity, signatures) {
        (Outcome::Ok(integrity), Outcome::Ok(signatures)) => (integrity, signatures),
        _ => return Verdict::Error,
    };
    let integrity_failed = integrity != PASS && integrity != UNTESTED;
    if integrity_failed || signatures.iter().any(|s| s != PASS) {
        Verdict::Fail
    } else if !signatures.is_empty() {
        Verdict::AuthenticityPass
    } else if integrity == PASS {
        Verdict::IntegrityPass
    } else {
        Verdict::Error
    }
}

fn render_signatures(signatures: &Outcome<Vec<String>>) -> String {
    match signatures {
        Outcome::Ok(list) if list.is_empty() => String::new(),
        Outcome::Ok(list) => {
            let mut text = format!("{} signature(s) processed", list.len());
            for signature in list {
                if signature == PASS {
                    text.push_str("\n\t✅ Signature OK");
                } else {
                    text.push_str("\n\t❌ ");
                    text.push_str(signature);
                }
            }
            text
        }
        Outcome::Err(msg) => format!("Signature verification error: {msg}"),
    }
}

fn render_integrity(integrity: &Outcome<String>) -> String {
    match integrity {
        Outcome::Ok(result) if result == PASS => "✅ Integrity check passed".to_string(),
        Outcome::Ok(result) if result == UNTESTED => String::new(),
        Outcome::Ok(_) => "❌ Integrity check failed".to_string(),
        Outcome::Err(msg) => format!("Integrity verification error: {msg}"),
    }
}

/// Signature lines, then the integrity line, then the verified file.
pub fn render(
    integrity: &Outcome<String>,
    signatures: &Outcome<Vec<String>>,
    input_file: &str,
) -> String {
    let signatures = render_signatures(signatures);
    let integrity = render_integrity(integrity);
    let mut text = signatures;
    if !text.is_empty() {
        text.push('\n');
    }
    text.push_str(&integrity);
    text.push('\n');
    text.push_str(input_file);
    text
}

/// What the user is told about one verified download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub verdict: Verdict,
    pub message: String,
}

impl VerificationReport {
    pub fn from_reply(reply: VerifierReply, input_file: &str) -> Result<Self> {
        match reply {
            VerifierReply::Report {
                integrity,
                signatures,
            } => Ok(Self {
                verdict: classify(&integrity, &signatures),
                message: render(&integrity, &signatures, input_file),
            }),
            VerifierReply::Result { result } => {
                let verdict = Verdict::from_code(&result)
                    .ok_or_else(|| VdError::Protocol(format!("unknown result code {result:?}")))?;
                Ok(Self {
                    verdict,
                    message: format!("{}\n{}", verdict.summary(), input_file),
                })
            }
            VerifierReply::Error { error } => Ok(Self {
                verdict: Verdict::Error,
                message: format!("{error}\n{input_file}"),
            }),
        }
    }

    pub fn title(&self) -> &'static str {
        self.verdict.title()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(s: &str) -> Outcome<String> {
        Outcome::Ok(s.to_string())
    }

    fn sigs(list: &[&str]) -> Outcome<Vec<String>> {
        Outcome::Ok(list.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn classification() {
        assert_eq!(classify(&ok("PASS"), &sigs(&[])), Verdict::IntegrityPass);
        assert_eq!(classify(&ok("UNTESTED"), &sigs(&["PASS"])), Verdict::AuthenticityPass);
        assert_eq!(classify(&ok("PASS"), &sigs(&["PASS", "PASS"])), Verdict::AuthenticityPass);
        assert_eq!(classify(&ok("FAIL"), &sigs(&["PASS"])), Verdict::Fail);
        assert_eq!(classify(&ok("PASS"), &sigs(&["PASS", "BAD SIG"])), Verdict::Fail);
        assert_eq!(classify(&ok("UNTESTED"), &sigs(&[])), Verdict::Error);
        assert_eq!(
            classify(&Outcome::Err("io".to_string()), &sigs(&["PASS"])),
            Verdict::Error
        );
        assert_eq!(
            classify(&ok("PASS"), &Outcome::Err("no key".to_string())),
            Verdict::Error
        );
    }

    #[test]
    fn integrity_only_text() {
        assert_eq!(
            render(&ok("PASS"), &sigs(&[]), "/a/f.iso"),
            "✅ Integrity check passed\n/a/f.iso"
        );
    }

    #[test]
    fn signatures_then_integrity_text() {
        assert_eq!(
            render(&ok("UNTESTED"), &sigs(&["PASS", "expired key"]), "/a/f.iso"),
            "2 signature(s) processed\n\t✅ Signature OK\n\t❌ expired key\n\n/a/f.iso"
        );
        assert_eq!(
            render(&Outcome::Err("unreadable".to_string()), &sigs(&[]), "/a/f.iso"),
            "Integrity verification error: unreadable\n/a/f.iso"
        );
    }

    #[test]
    fn flat_result_codes() {
        let report = VerificationReport::from_reply(
            VerifierReply::Result {
                result: "authenticity".to_string(),
            },
            "/a/f.iso",
        )
        .unwrap();
        assert_eq!(report.verdict, Verdict::AuthenticityPass);
        assert!(report.message.ends_with("/a/f.iso"));

        let err = VerificationReport::from_reply(
            VerifierReply::Result {
                result: "maybe".to_string(),
            },
            "/a/f.iso",
        )
        .unwrap_err();
        assert!(matches!(err, VdError::Protocol(_)));
    }

    #[test]
    fn error_reply_is_error_verdict() {
        let report = VerificationReport::from_reply(
            VerifierReply::Error {
                error: "no such file".to_string(),
            },
            "/a/f.iso",
        )
        .unwrap();
        assert_eq!(report.verdict, Verdict::Error);
        assert_eq!(report.title(), "Error encountered");
        assert_eq!(report.verdict.notify_setting(), Setting::NotifyOnError);
    }

    #[test]
    fn codes_round_trip() {
        for verdict in [
            Verdict::IntegrityPass,
            Verdict::AuthenticityPass,
            Verdict::Fail,
            Verdict::Error,
        ] {
            assert_eq!(Verdict::from_code(&verdict.to_string()), Some(verdict));
        }
    }
}
