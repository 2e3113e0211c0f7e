//! Request body encoding.

use std::fmt::Write as _;

use crate::value::{Value, escape};

/// Encode a remote procedure call into a protocol-correct request body.
#[must_use]
pub fn encode_call(method: &str, params: &[Value]) -> Vec<u8> {
    let mut out = String::with_capacity(128 + params.len() * 32);
    out.push_str("<?xml version=\"1.0\"?>");
    out.push_str("<methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param><value>");
        encode_value(param, &mut out);
        out.push_str("</value></param>");
    }
    out.push_str("</params></methodCall>");
    out.into_bytes()
}

fn encode_value(value: &Value, out: &mut String) {
    match value {
        Value::Int(v) => {
            let _ = write!(out, "<i8>{v}</i8>");
        }
        Value::Bool(v) => {
            let _ = write!(out, "<boolean>{}</boolean>", u8::from(*v));
        }
        Value::Double(v) => {
            let _ = write!(out, "<double>{v}</double>");
        }
        Value::String(v) => {
            out.push_str("<string>");
            out.push_str(&escape(v));
            out.push_str("</string>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                out.push_str("<value>");
                encode_value(item, out);
                out.push_str("</value>");
            }
            out.push_str("</data></array>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str("<member><name>");
                out.push_str(&escape(name));
                out.push_str("</name><value>");
                encode_value(member, out);
                out.push_str("</value></member>");
            }
            out.push_str("</struct>");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_params_render_typed_elements() {
        let body = encode_call("d.name", &[Value::string("abc"), Value::Int(5)]);
        let text = String::from_utf8(body).expect("utf8 body");
        assert!(text.contains("<methodName>d.name</methodName>"));
        assert!(text.contains("<string>abc</string>"));
        assert!(text.contains("<i8>5</i8>"));
    }

    #[test]
    fn text_content_is_entity_escaped() {
        let body = encode_call("d.custom1.set", &[Value::string("tv & <film>")]);
        let text = String::from_utf8(body).expect("utf8 body");
        assert!(text.contains("tv &amp; &lt;film&gt;"));
    }
}
