//! The JSON message protocol: one object per message, tagged by `kind`.
//!
//! Requests are `{id, kind: "load-classlib", url}` and `{id, kind: "compile",
//! text}`. Responses are `{id, kind: "ok"}`, `{id, kind: "error", text}` and
//! `{id, kind: "diagnostic", ...}` with the fields of [`Diagnostic`].

use crate::error::WorkerError;
use kiln_diagnostics::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Text of the error response sent to requests arriving while busy.
pub const BUSY: &str = "Busy";

/// A decoded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Caller-assigned identifier echoed in every response.
    pub id: String,
    /// What to do.
    pub command: Command,
}

/// The operation a request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch and prepare the standard library from `url`.
    LoadClasslib {
        /// Location of the stdlib archive.
        url: String,
    },
    /// Compile one unit of source text.
    Compile {
        /// Full source of the unit.
        text: String,
    },
    /// A kind the worker does not recognize.
    Unknown(String),
}

impl Request {
    /// Creates a `load-classlib` request.
    pub fn load_classlib(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            command: Command::LoadClasslib { url: url.into() },
        }
    }

    /// Creates a `compile` request.
    pub fn compile(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            command: Command::Compile { text: text.into() },
        }
    }

    /// The wire name of this request's kind.
    pub fn kind(&self) -> &str {
        match &self.command {
            Command::LoadClasslib { .. } => "load-classlib",
            Command::Compile { .. } => "compile",
            Command::Unknown(kind) => kind,
        }
    }

    /// Encodes the request as a single-line JSON object.
    pub fn to_json(&self) -> String {
        let value = match &self.command {
            Command::LoadClasslib { url } => {
                json!({"id": self.id, "kind": "load-classlib", "url": url})
            }
            Command::Compile { text } => json!({"id": self.id, "kind": "compile", "text": text}),
            Command::Unknown(kind) => json!({"id": self.id, "kind": kind}),
        };
        value.to_string()
    }
}

/// A request that could not be decoded, with whatever id could be recovered.
#[derive(Debug)]
pub struct DecodeFailure {
    /// The request id, if the envelope carried one.
    pub id: Option<String>,
    /// What was wrong.
    pub error: WorkerError,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

#[derive(Deserialize)]
struct LoadClasslibPayload {
    url: String,
}

#[derive(Deserialize)]
struct CompilePayload {
    text: String,
}

/// Decodes one request message.
pub fn decode_request(line: &str) -> Result<Request, DecodeFailure> {
    let envelope: Envelope = serde_json::from_str(line).map_err(|e| DecodeFailure {
        id: None,
        error: WorkerError::Malformed(e.to_string()),
    })?;
    let Some(id) = envelope.id else {
        return Err(DecodeFailure {
            id: None,
            error: WorkerError::Malformed("request has no 'id'".to_string()),
        });
    };
    let fail = |id: String, message: String| DecodeFailure {
        id: Some(id),
        error: WorkerError::Malformed(message),
    };
    let Some(kind) = envelope.kind else {
        return Err(fail(id, "request has no 'kind'".to_string()));
    };
    let payload = Value::Object(envelope.payload);
    let command = match kind.as_str() {
        "load-classlib" => match serde_json::from_value::<LoadClasslibPayload>(payload) {
            Ok(p) => Command::LoadClasslib { url: p.url },
            Err(e) => return Err(fail(id, format!("load-classlib: {e}"))),
        },
        "compile" => match serde_json::from_value::<CompilePayload>(payload) {
            Ok(p) => Command::Compile { text: p.text },
            Err(e) => return Err(fail(id, format!("compile: {e}"))),
        },
        _ => Command::Unknown(kind),
    };
    Ok(Request { id, command })
}

/// A response message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// The id of the request this answers.
    pub id: String,
    /// The response payload, tagged by `kind`.
    #[serde(flatten)]
    pub body: ResponseBody,
}

/// The payload of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResponseBody {
    /// The request succeeded.
    Ok,
    /// The request failed.
    Error {
        /// Failure description.
        text: String,
    },
    /// One diagnostic produced while serving the request.
    Diagnostic(Diagnostic),
}

impl Response {
    /// A terminal success response.
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: ResponseBody::Ok,
        }
    }

    /// A terminal failure response.
    pub fn error(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: ResponseBody::Error { text: text.into() },
        }
    }

    /// The rejection sent to requests arriving while a pipeline is active.
    pub fn busy(id: impl Into<String>) -> Self {
        Self::error(id, BUSY)
    }

    /// A non-terminal diagnostic response.
    pub fn diagnostic(id: impl Into<String>, diagnostic: Diagnostic) -> Self {
        Self {
            id: id.into(),
            body: ResponseBody::Diagnostic(diagnostic),
        }
    }

    /// Returns `true` for `ok` and `error` responses.
    pub fn is_terminal(&self) -> bool {
        !matches!(self.body, ResponseBody::Diagnostic(_))
    }

    /// Encodes the response as a single-line JSON object.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_diagnostics::{Severity, SourceDiagnostic};

    #[test]
    fn decode_compile() {
        let req = decode_request(r#"{"id":"7","kind":"compile","text":"class Hello {}"}"#).unwrap();
        assert_eq!(req, Request::compile("7", "class Hello {}"));
        assert_eq!(req.kind(), "compile");
    }

    #[test]
    fn decode_load_classlib() {
        let req =
            decode_request(r#"{"id":"1","kind":"load-classlib","url":"file:///tmp/c.zip"}"#)
                .unwrap();
        assert_eq!(req, Request::load_classlib("1", "file:///tmp/c.zip"));
    }

    #[test]
    fn decode_unknown_kind() {
        let req = decode_request(r#"{"id":"2","kind":"reset"}"#).unwrap();
        assert_eq!(req.command, Command::Unknown("reset".into()));
    }

    #[test]
    fn missing_payload_keeps_id() {
        let err = decode_request(r#"{"id":"3","kind":"compile"}"#).unwrap_err();
        assert_eq!(err.id.as_deref(), Some("3"));
        assert!(matches!(err.error, WorkerError::Malformed(_)));
    }

    #[test]
    fn missing_kind_keeps_id() {
        let err = decode_request(r#"{"id":"4"}"#).unwrap_err();
        assert_eq!(err.id.as_deref(), Some("4"));
    }

    #[test]
    fn missing_id() {
        let err = decode_request(r#"{"kind":"compile","text":""}"#).unwrap_err();
        assert!(err.id.is_none());
    }

    #[test]
    fn not_json() {
        let err = decode_request("hello").unwrap_err();
        assert!(err.id.is_none());
        assert!(err.error.to_string().starts_with("malformed request:"));
    }

    #[test]
    fn request_json_round_trip() {
        let req = Request::compile("9", "line1\n\"quoted\"");
        assert_eq!(decode_request(&req.to_json()).unwrap(), req);
        assert!(!req.to_json().contains('\n'));
    }

    #[test]
    fn ok_response_shape() {
        let json: Value = serde_json::from_str(&Response::ok("5").to_json().unwrap()).unwrap();
        assert_eq!(json, json!({"id": "5", "kind": "ok"}));
    }

    #[test]
    fn busy_response_shape() {
        let json: Value = serde_json::from_str(&Response::busy("6").to_json().unwrap()).unwrap();
        assert_eq!(json, json!({"id": "6", "kind": "error", "text": "Busy"}));
        assert!(Response::busy("6").is_terminal());
    }

    #[test]
    fn diagnostic_response_shape() {
        let source = SourceDiagnostic::error("/Hello.java", "compiler.err.expected", "';' expected")
            .at(3, 9)
            .with_range(40, 41, 42);
        let response = Response::diagnostic("8", Diagnostic::from(&source));
        assert!(!response.is_terminal());
        let json: Value = serde_json::from_str(&response.to_json().unwrap()).unwrap();
        assert_eq!(json["kind"], "diagnostic");
        assert_eq!(json["id"], "8");
        assert_eq!(json["source"]["name"], "/Hello.java");
        assert_eq!(json["startPosition"], 40);
        assert_eq!(json["position"], 41);
        assert_eq!(json["endPosition"], 42);
        assert_eq!(json["line"], 3);
        assert_eq!(json["column"], 9);
        assert_eq!(json["code"], "compiler.err.expected");
        assert_eq!(json["severity"], "error");
    }

    #[test]
    fn response_decodes_back() {
        let source = SourceDiagnostic::error("/Hello.java", "c", "m");
        let response = Response::diagnostic("8", Diagnostic::from(&source));
        let parsed: Response = serde_json::from_str(&response.to_json().unwrap()).unwrap();
        assert_eq!(parsed, response);
        let ResponseBody::Diagnostic(diag) = parsed.body else {
            panic!("expected diagnostic");
        };
        assert_eq!(diag.severity, Severity::Error);
    }
}
