// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! XML-RPC request encoding and response parsing (§4.1).
//!
//! This is the only module in the workspace that touches raw XML. Every
//! operation funnels its response through `parse_response`, so no caller can
//! quietly assume the body is already a native boolean.

use crate::error::TransportError;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::io::Cursor;

/// A value that can appear as an XML-RPC parameter or be extracted from a
/// response. Only the subset the control plane actually exchanges with
/// agents is modeled (§3 Remote XML-RPC).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    String(String),
    Nil,
    Array(Vec<Value>),
    Struct(Vec<(String, Value)>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.as_struct()?.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

/// The outcome of decoding one XML-RPC response body.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    Value(Value),
    Fault { fault_code: i32, fault_string: String },
}

/// Build the request body for `methodCall` with the given method name and
/// positional string/struct arguments.
pub fn encode_call(method: &str, params: &[Value]) -> Result<String, TransportError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    write_start(&mut writer, "methodCall")?;
    write_text_elem(&mut writer, "methodName", method)?;
    if !params.is_empty() {
        write_start(&mut writer, "params")?;
        for param in params {
            write_start(&mut writer, "param")?;
            write_value(&mut writer, param)?;
            write_end(&mut writer, "param")?;
        }
        write_end(&mut writer, "params")?;
    }
    write_end(&mut writer, "methodCall")?;
    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| TransportError::ParseError(e.to_string()))
}

fn write_start(w: &mut Writer<Cursor<Vec<u8>>>, tag: &str) -> Result<(), TransportError> {
    w.write_event(Event::Start(BytesStart::new(tag)))
        .map_err(|e| TransportError::ParseError(e.to_string()))
}

fn write_end(w: &mut Writer<Cursor<Vec<u8>>>, tag: &str) -> Result<(), TransportError> {
    w.write_event(Event::End(BytesEnd::new(tag))).map_err(|e| TransportError::ParseError(e.to_string()))
}

fn write_text_elem(w: &mut Writer<Cursor<Vec<u8>>>, tag: &str, text: &str) -> Result<(), TransportError> {
    write_start(w, tag)?;
    w.write_event(Event::Text(BytesText::new(text)))
        .map_err(|e| TransportError::ParseError(e.to_string()))?;
    write_end(w, tag)
}

fn write_value(w: &mut Writer<Cursor<Vec<u8>>>, value: &Value) -> Result<(), TransportError> {
    write_start(w, "value")?;
    match value {
        Value::Bool(b) => write_text_elem(w, "boolean", if *b { "1" } else { "0" })?,
        Value::Int(i) => write_text_elem(w, "int", &i.to_string())?,
        Value::String(s) => write_text_elem(w, "string", s)?,
        Value::Nil => {
            write_start(w, "nil")?;
            write_end(w, "nil")?;
        }
        Value::Array(items) => {
            write_start(w, "array")?;
            write_start(w, "data")?;
            for item in items {
                write_value(w, item)?;
            }
            write_end(w, "data")?;
            write_end(w, "array")?;
        }
        Value::Struct(fields) => {
            write_start(w, "struct")?;
            for (name, field_value) in fields {
                write_start(w, "member")?;
                write_text_elem(w, "name", name)?;
                write_value(w, field_value)?;
                write_end(w, "member")?;
            }
            write_end(w, "struct")?;
        }
    }
    write_end(w, "value")
}

/// Parse a `methodResponse` body into a typed outcome (§4.1).
///
/// Handles scalar boolean, scalar string, and `<fault>` with an integer
/// `faultCode` and string `faultString`. Malformed XML yields a
/// `TransportError::ParseError` naming the failure point rather than
/// silently defaulting to a value.
pub fn parse_response(body: &str) -> Result<MethodResponse, TransportError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| {
            TransportError::ParseError(format!("xml read error: {e}"))
        })? {
            Event::Start(e) if e.name().as_ref() == b"fault" => {
                let value = read_next_value(&mut reader)
                    .map_err(|_| TransportError::ParseError("fault missing <value>".into()))?;
                let fields = value
                    .as_struct()
                    .ok_or_else(|| TransportError::ParseError("fault value is not a struct".into()))?;
                let fault_code = fields
                    .iter()
                    .find(|(k, _)| k == "faultCode")
                    .and_then(|(_, v)| match v {
                        Value::Int(i) => Some(*i as i32),
                        Value::String(s) => s.parse().ok(),
                        _ => None,
                    })
                    .ok_or_else(|| TransportError::ParseError("fault missing faultCode".into()))?;
                let fault_string = fields
                    .iter()
                    .find(|(k, _)| k == "faultString")
                    .and_then(|(_, v)| v.as_str())
                    .ok_or_else(|| TransportError::ParseError("fault missing faultString".into()))?
                    .to_string();
                return Ok(MethodResponse::Fault { fault_code, fault_string });
            }
            Event::Start(e) if e.name().as_ref() == b"params" => {
                let value = read_next_value(&mut reader)
                    .map_err(|_| TransportError::ParseError("params missing <value>".into()))?;
                return Ok(MethodResponse::Value(value));
            }
            Event::Eof => {
                return Err(TransportError::ParseError("unexpected end of document".into()))
            }
            _ => {}
        }
        buf.clear();
    }
}

/// Read forward until the next `<value>` element opens, then decode it.
fn read_next_value(reader: &mut Reader<&[u8]>) -> Result<Value, TransportError> {
    let mut buf = Vec::new();
    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| TransportError::ParseError(format!("xml read error: {e}")))?
        {
            Event::Start(e) if e.name().as_ref() == b"value" => return read_value_body(reader),
            Event::Eof => return Err(TransportError::ParseError("no <value> found".into())),
            _ => {}
        }
        buf.clear();
    }
}

fn read_value_body(reader: &mut Reader<&[u8]>) -> Result<Value, TransportError> {
    let mut buf = Vec::new();
    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| TransportError::ParseError(format!("xml read error: {e}")))?
        {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                return match name.as_slice() {
                    b"boolean" => {
                        let text = read_text(reader, "boolean")?;
                        Ok(Value::Bool(text.trim() == "1"))
                    }
                    b"int" | b"i4" => {
                        let tag = String::from_utf8_lossy(&name).into_owned();
                        let text = read_text(reader, &tag)?;
                        text.trim()
                            .parse::<i64>()
                            .map(Value::Int)
                            .map_err(|e| TransportError::ParseError(format!("invalid int: {e}")))
                    }
                    b"string" => Ok(Value::String(read_text(reader, "string")?)),
                    b"nil" => {
                        skip_to_end(reader, "nil")?;
                        Ok(Value::Nil)
                    }
                    b"array" => read_array(reader),
                    b"struct" => read_struct(reader),
                    other => Err(TransportError::ParseError(format!(
                        "unsupported value type <{}>",
                        String::from_utf8_lossy(other)
                    ))),
                };
            }
            Event::Text(t) => {
                // A bare string value with no type wrapper defaults to string,
                // matching the XML-RPC spec's implicit-string rule.
                let text = t.unescape().map_err(|e| TransportError::ParseError(e.to_string()))?.into_owned();
                return Ok(Value::String(text));
            }
            Event::End(e) if e.name().as_ref() == b"value" => return Ok(Value::String(String::new())),
            Event::Eof => return Err(TransportError::ParseError("truncated <value>".into())),
            _ => {}
        }
        buf.clear();
    }
}

fn read_text(reader: &mut Reader<&[u8]>, tag: &str) -> Result<String, TransportError> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| TransportError::ParseError(format!("xml read error: {e}")))?
        {
            Event::Text(t) => {
                text.push_str(&t.unescape().map_err(|e| TransportError::ParseError(e.to_string()))?);
            }
            Event::End(e) if e.name().as_ref() == tag.as_bytes() => return Ok(text),
            Event::Eof => return Err(TransportError::ParseError(format!("truncated <{tag}>"))),
            _ => {}
        }
        buf.clear();
    }
}

fn skip_to_end(reader: &mut Reader<&[u8]>, tag: &str) -> Result<(), TransportError> {
    let mut buf = Vec::new();
    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| TransportError::ParseError(format!("xml read error: {e}")))?
        {
            Event::End(e) if e.name().as_ref() == tag.as_bytes() => return Ok(()),
            Event::Eof => return Err(TransportError::ParseError(format!("truncated <{tag}>"))),
            _ => {}
        }
        buf.clear();
    }
}

fn read_array(reader: &mut Reader<&[u8]>) -> Result<Value, TransportError> {
    let mut items = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| TransportError::ParseError(format!("xml read error: {e}")))?
        {
            Event::Start(e) if e.name().as_ref() == b"value" => items.push(read_value_body(reader)?),
            Event::End(e) if e.name().as_ref() == b"array" => return Ok(Value::Array(items)),
            Event::Eof => return Err(TransportError::ParseError("truncated <array>".into())),
            _ => {}
        }
        buf.clear();
    }
}

fn read_struct(reader: &mut Reader<&[u8]>) -> Result<Value, TransportError> {
    let mut fields = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| TransportError::ParseError(format!("xml read error: {e}")))?
        {
            Event::Start(e) if e.name().as_ref() == b"member" => {
                fields.push(read_member(reader)?);
            }
            Event::End(e) if e.name().as_ref() == b"struct" => return Ok(Value::Struct(fields)),
            Event::Eof => return Err(TransportError::ParseError("truncated <struct>".into())),
            _ => {}
        }
        buf.clear();
    }
}

fn read_member(reader: &mut Reader<&[u8]>) -> Result<(String, Value), TransportError> {
    let mut name = None;
    let mut value = None;
    let mut buf = Vec::new();
    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| TransportError::ParseError(format!("xml read error: {e}")))?
        {
            Event::Start(e) if e.name().as_ref() == b"name" => name = Some(read_text(reader, "name")?),
            Event::Start(e) if e.name().as_ref() == b"value" => value = Some(read_value_body(reader)?),
            Event::End(e) if e.name().as_ref() == b"member" => {
                let name = name.ok_or_else(|| TransportError::ParseError("member missing <name>".into()))?;
                let value =
                    value.ok_or_else(|| TransportError::ParseError("member missing <value>".into()))?;
                return Ok((name, value));
            }
            Event::Eof => return Err(TransportError::ParseError("truncated <member>".into())),
            _ => {}
        }
        buf.clear();
    }
}
