//! Event-driven response decoding.
//!
//! The decoder walks tag open/text/close events over the raw body without
//! materialising a parse tree first. Array and struct boundaries are
//! tracked via a mark stack recording the data-stack depth when the
//! container opened, so a close event can slice exactly the accumulated
//! child values into a compound value. All state lives in a per-call
//! [`Decoder`], keeping decoding reentrant.

use std::collections::BTreeMap;

use crate::error::{DaemonFault, ProtocolError};
use crate::value::{Value, unescape};

/// Outcome of a decoded response document.
#[derive(Debug, PartialEq)]
pub enum RpcResponse {
    /// The call succeeded and produced a value.
    Success(Value),
    /// The daemon reported a method-level fault.
    Fault(DaemonFault),
}

/// Decode a full response body into a value or a daemon fault.
///
/// # Errors
///
/// Returns a [`ProtocolError`] when the stream is malformed, carries an
/// unexpected tag, or ends before the top-level document completes.
pub fn decode_response(raw: &[u8]) -> Result<RpcResponse, ProtocolError> {
    let mut decoder = Decoder::default();
    decoder.run(raw)?;
    decoder.finish_response()
}

/// Decode a request body back into its method name and parameters.
///
/// Primarily used by stub transports in tests and by the batcher's
/// round-trip checks.
///
/// # Errors
///
/// Returns a [`ProtocolError`] under the same conditions as
/// [`decode_response`].
pub fn decode_call(raw: &[u8]) -> Result<(String, Vec<Value>), ProtocolError> {
    let mut decoder = Decoder::default();
    decoder.run(raw)?;
    decoder.finish_call()
}

#[derive(Debug)]
enum Token<'a> {
    Open(&'a str),
    Close(&'a str),
    Text(&'a str),
}

struct Tokenizer<'a> {
    rest: &'a str,
    pending_close: Option<&'a str>,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            rest: input,
            pending_close: None,
        }
    }

    fn next_token(&mut self) -> Result<Option<Token<'a>>, ProtocolError> {
        if let Some(name) = self.pending_close.take() {
            return Ok(Some(Token::Close(name)));
        }
        loop {
            if self.rest.is_empty() {
                return Ok(None);
            }
            if let Some(stripped) = self.rest.strip_prefix('<') {
                let end = stripped.find('>').ok_or(ProtocolError::Truncated)?;
                let tag = &stripped[..end];
                self.rest = &stripped[end + 1..];
                // Declarations and comments carry no protocol data.
                if tag.starts_with('?') || tag.starts_with('!') {
                    continue;
                }
                if let Some(name) = tag.strip_prefix('/') {
                    return Ok(Some(Token::Close(name.trim())));
                }
                if let Some(body) = tag.strip_suffix('/') {
                    // A self-closing tag (`<string/>` for empty strings)
                    // decodes as an immediate open/close pair.
                    let name = tag_name(body);
                    self.pending_close = Some(name);
                    return Ok(Some(Token::Open(name)));
                }
                return Ok(Some(Token::Open(tag_name(tag))));
            }
            let end = self.rest.find('<').unwrap_or(self.rest.len());
            let text = &self.rest[..end];
            self.rest = &self.rest[end..];
            return Ok(Some(Token::Text(text)));
        }
    }
}

fn tag_name(tag: &str) -> &str {
    tag.split_whitespace().next().unwrap_or(tag).trim()
}

/// Per-call decoder state: data stack, container marks, pending text.
#[derive(Default)]
struct Decoder {
    data: Vec<Value>,
    marks: Vec<usize>,
    value_typed: Vec<bool>,
    text: String,
    method: Option<String>,
    fault: bool,
    complete: bool,
}

impl Decoder {
    fn run(&mut self, raw: &[u8]) -> Result<(), ProtocolError> {
        let input = std::str::from_utf8(raw).map_err(|_| ProtocolError::InvalidUtf8)?;
        let mut tokens = Tokenizer::new(input);
        while let Some(token) = tokens.next_token()? {
            match token {
                Token::Open(tag) => self.open(tag)?,
                Token::Text(text) => self.text.push_str(text),
                Token::Close(tag) => self.close(tag)?,
            }
        }
        Ok(())
    }

    fn open(&mut self, tag: &str) -> Result<(), ProtocolError> {
        match tag {
            "array" | "struct" => self.marks.push(self.data.len()),
            "value" => {
                self.value_typed.push(false);
                self.text.clear();
            }
            "name" | "string" | "i4" | "i8" | "int" | "boolean" | "double" => self.text.clear(),
            "methodResponse" | "methodCall" | "methodName" | "params" | "param" | "data"
            | "member" | "fault" => {}
            other => {
                return Err(ProtocolError::UnexpectedTag {
                    tag: other.to_string(),
                });
            }
        }
        Ok(())
    }

    fn close(&mut self, tag: &str) -> Result<(), ProtocolError> {
        match tag {
            "i4" | "i8" | "int" => {
                let text = unescape(self.text.trim());
                let parsed = text.parse().map_err(|_| ProtocolError::InvalidScalar {
                    kind: "int",
                    text: text.clone(),
                })?;
                self.push_typed(Value::Int(parsed));
            }
            "boolean" => {
                let value = match self.text.trim() {
                    "1" | "true" => true,
                    "0" | "false" => false,
                    other => {
                        return Err(ProtocolError::InvalidScalar {
                            kind: "boolean",
                            text: other.to_string(),
                        });
                    }
                };
                self.push_typed(Value::Bool(value));
            }
            "double" => {
                let text = unescape(self.text.trim());
                let parsed = text.parse().map_err(|_| ProtocolError::InvalidScalar {
                    kind: "double",
                    text: text.clone(),
                })?;
                self.push_typed(Value::Double(parsed));
            }
            "string" => {
                let value = Value::String(unescape(&self.text));
                self.push_typed(value);
            }
            "name" => {
                // Member names ride the data stack so struct close can pair
                // the flattened (name, value) sequence back up.
                self.data.push(Value::String(unescape(&self.text)));
            }
            "value" => {
                let typed = self
                    .value_typed
                    .pop()
                    .ok_or_else(|| ProtocolError::UnexpectedTag {
                        tag: "value".to_string(),
                    })?;
                if !typed {
                    // A bare <value> with no typed child defaults to string.
                    let value = Value::String(unescape(&self.text));
                    self.data.push(value);
                    self.mark_enclosing_typed();
                }
            }
            "array" => {
                let mark = self.marks.pop().ok_or(ProtocolError::UnexpectedTag {
                    tag: "array".to_string(),
                })?;
                let items = self.data.split_off(mark);
                self.push_typed(Value::Array(items));
            }
            "struct" => {
                let mark = self.marks.pop().ok_or(ProtocolError::UnexpectedTag {
                    tag: "struct".to_string(),
                })?;
                let flat = self.data.split_off(mark);
                if flat.len() % 2 != 0 {
                    return Err(ProtocolError::Malformed { context: "struct" });
                }
                let mut members = BTreeMap::new();
                let mut entries = flat.into_iter();
                while let (Some(name), Some(value)) = (entries.next(), entries.next()) {
                    let Value::String(name) = name else {
                        return Err(ProtocolError::Malformed { context: "struct" });
                    };
                    members.insert(name, value);
                }
                self.push_typed(Value::Struct(members));
            }
            "methodName" => {
                self.method = Some(unescape(self.text.trim()));
            }
            "fault" => self.fault = true,
            "methodResponse" | "methodCall" => self.complete = true,
            "params" | "param" | "data" | "member" => {}
            other => {
                return Err(ProtocolError::UnexpectedTag {
                    tag: other.to_string(),
                });
            }
        }
        Ok(())
    }

    fn push_typed(&mut self, value: Value) {
        self.data.push(value);
        self.mark_enclosing_typed();
    }

    fn mark_enclosing_typed(&mut self) {
        if let Some(top) = self.value_typed.last_mut() {
            *top = true;
        }
    }

    fn finish_response(mut self) -> Result<RpcResponse, ProtocolError> {
        if !self.complete {
            return Err(ProtocolError::Truncated);
        }
        let top = self
            .data
            .pop()
            .ok_or(ProtocolError::Malformed { context: "response" })?;
        if self.fault {
            return Ok(RpcResponse::Fault(fault_from_value(&top)?));
        }
        Ok(RpcResponse::Success(top))
    }

    fn finish_call(mut self) -> Result<(String, Vec<Value>), ProtocolError> {
        if !self.complete {
            return Err(ProtocolError::Truncated);
        }
        let method = self.method.take().ok_or(ProtocolError::Malformed {
            context: "method call",
        })?;
        Ok((method, std::mem::take(&mut self.data)))
    }
}

fn fault_from_value(value: &Value) -> Result<DaemonFault, ProtocolError> {
    let members = value
        .as_struct()
        .ok_or(ProtocolError::Malformed { context: "fault" })?;
    let code = members
        .get("faultCode")
        .and_then(Value::as_i64)
        .ok_or(ProtocolError::Malformed { context: "fault" })?;
    let message = members
        .get("faultString")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::Malformed { context: "fault" })?
        .to_string();
    Ok(DaemonFault { code, message })
}

/// Interpret an arbitrary decoded value as a per-entry fault, if shaped
/// like one. Multicall responses embed faults as structs amid result
/// arrays.
#[must_use]
pub fn fault_entry(value: &Value) -> Option<DaemonFault> {
    let members = value.as_struct()?;
    let code = members.get("faultCode").and_then(Value::as_i64)?;
    let message = members.get("faultString").and_then(Value::as_str)?;
    Some(DaemonFault {
        code,
        message: message.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode_call;

    fn response(body: &str) -> String {
        format!(
            "<?xml version=\"1.0\"?><methodResponse><params><param><value>{body}</value></param></params></methodResponse>"
        )
    }

    #[test]
    fn scalar_response_decodes() {
        let decoded = decode_response(response("<i8>42</i8>").as_bytes()).expect("decode");
        assert_eq!(decoded, RpcResponse::Success(Value::Int(42)));
    }

    #[test]
    fn bare_value_defaults_to_string() {
        let decoded = decode_response(response("plain text").as_bytes()).expect("decode");
        assert_eq!(decoded, RpcResponse::Success(Value::string("plain text")));
    }

    #[test]
    fn nested_arrays_and_structs_decode() {
        let body = "<array><data>\
            <value><array><data><value><string>a</string></value><value><i8>1</i8></value></data></array></value>\
            <value><struct><member><name>k</name><value><boolean>1</boolean></value></member></struct></value>\
            </data></array>";
        let decoded = decode_response(response(body).as_bytes()).expect("decode");
        let RpcResponse::Success(Value::Array(items)) = decoded else {
            panic!("expected array success");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0],
            Value::Array(vec![Value::string("a"), Value::Int(1)])
        );
        let Value::Struct(members) = &items[1] else {
            panic!("expected struct entry");
        };
        assert_eq!(members.get("k"), Some(&Value::Bool(true)));
    }

    #[test]
    fn entity_escapes_are_reversed() {
        let decoded =
            decode_response(response("<string>a &amp; b &lt;c&gt;</string>").as_bytes())
                .expect("decode");
        assert_eq!(decoded, RpcResponse::Success(Value::string("a & b <c>")));
    }

    #[test]
    fn fault_response_decodes_to_daemon_fault() {
        let raw = "<?xml version=\"1.0\"?><methodResponse><fault><value><struct>\
            <member><name>faultCode</name><value><i8>-506</i8></value></member>\
            <member><name>faultString</name><value><string>Method not found</string></value></member>\
            </struct></value></fault></methodResponse>";
        let decoded = decode_response(raw.as_bytes()).expect("decode");
        assert_eq!(
            decoded,
            RpcResponse::Fault(DaemonFault {
                code: -506,
                message: "Method not found".to_string(),
            })
        );
    }

    #[test]
    fn truncated_stream_is_reported() {
        let raw = "<?xml version=\"1.0\"?><methodResponse><params><param><value><i8>1</i8>";
        assert_eq!(
            decode_response(raw.as_bytes()),
            Err(ProtocolError::Truncated)
        );
    }

    #[test]
    fn unexpected_tag_names_the_offender() {
        let raw = response("<blob>x</blob>");
        assert_eq!(
            decode_response(raw.as_bytes()),
            Err(ProtocolError::UnexpectedTag {
                tag: "blob".to_string()
            })
        );
    }

    #[test]
    fn encoded_calls_decode_back_to_their_inputs() {
        let mut members = std::collections::BTreeMap::new();
        members.insert("methodName".to_string(), Value::string("d.start"));
        members.insert(
            "params".to_string(),
            Value::Array(vec![Value::string("HASH1")]),
        );
        let params = vec![
            Value::string("main"),
            Value::Int(9),
            Value::Bool(true),
            Value::Array(vec![Value::string("x"), Value::Int(-3)]),
            Value::Struct(members),
        ];
        let body = encode_call("system.multicall", &params);
        let (method, decoded) = decode_call(&body).expect("round trip");
        assert_eq!(method, "system.multicall");
        assert_eq!(decoded, params);
    }

    #[test]
    fn self_closing_string_decodes_empty() {
        let decoded = decode_response(response("<string/>").as_bytes()).expect("decode");
        assert_eq!(decoded, RpcResponse::Success(Value::string("")));
    }

    #[test]
    fn whitespace_between_elements_is_ignored() {
        let body = "<array>\n  <data>\n    <value><i8>5</i8></value>\n  </data>\n</array>";
        let decoded = decode_response(response(body).as_bytes()).expect("decode");
        assert_eq!(decoded, RpcResponse::Success(Value::Array(vec![Value::Int(5)])));
    }
}
