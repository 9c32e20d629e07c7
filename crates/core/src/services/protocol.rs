//! Text protocol between the harness and the generated driver.
//!
//! Input (stdin) is a whitespace-separated token stream, one group per parameter:
//! - scalar: the bit pattern in hex;
//! - pointer: presence flag, then (if present) byte length and the bytes as hex pairs;
//! - by-value aggregate: one hex bit pattern per field.
//!
//! Output lines start with `@@EQ `; anything else on stdout belongs to the function under test
//! and is ignored.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::inputs::{ArgValue, ArgumentSet, ScalarValue};
use crate::model::{FunctionSignature, ReturnType, ScalarType, ValueType};

pub const LINE_PREFIX: &str = "@@EQ ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("expected {expected} arguments, got {got}")]
    Arity { expected: usize, got: usize },
    #[error("argument '{param}' does not match its declared type")]
    TypeMismatch { param: String },
    #[error("driver rejected its input")]
    BadInput,
    #[error("malformed driver line '{0}'")]
    Malformed(String),
    #[error("driver reported memory for parameter {0}, which is not a mutable pointer")]
    UnexpectedMemory(usize),
}

/// Where a returned pointer points, relative to the harness-owned allocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerTarget {
    Null,
    /// Offset into the block passed as parameter `param`.
    Param { param: usize, offset: u64 },
    Foreign,
}

/// A return value as observed by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnValue {
    Void,
    Scalar(ScalarValue),
    Pointer(PointerTarget),
    /// String content, or `None` for a NULL string.
    Str(Option<Vec<u8>>),
}

impl std::fmt::Display for ReturnValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReturnValue::Void => f.write_str("void"),
            ReturnValue::Scalar(v) => write!(f, "{v}"),
            ReturnValue::Pointer(PointerTarget::Null) => f.write_str("NULL"),
            ReturnValue::Pointer(PointerTarget::Param { param, offset }) => write!(f, "&arg{param}[+{offset}]"),
            ReturnValue::Pointer(PointerTarget::Foreign) => f.write_str("<foreign pointer>"),
            ReturnValue::Str(None) => f.write_str("NULL"),
            ReturnValue::Str(Some(bytes)) => write!(f, "{:?}", String::from_utf8_lossy(bytes)),
        }
    }
}

/// Everything the driver printed, decoded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DriverOutput {
    pub ret: Option<ReturnValue>,
    /// `(parameter index, bytes after the call including the guard redzone)`.
    pub memory: Vec<(usize, Vec<u8>)>,
    /// The driver reached `END`.
    pub completed: bool,
}

fn push_word(out: &mut String, bits: u64) {
    let _ = write!(out, "{bits:x} ");
}

fn push_block(out: &mut String, bytes: &[u8]) {
    let _ = write!(out, "1 {:x} ", bytes.len());
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out.push('\n');
}

fn check_scalar(param: &str, ty: ScalarType, value: &ScalarValue) -> Result<u64, ProtocolError> {
    if value.ty != ty {
        return Err(ProtocolError::TypeMismatch { param: param.to_string() });
    }
    Ok(value.bits)
}

/// Encode an argument set for the driver's stdin.
pub fn encode_arguments(signature: &FunctionSignature, args: &ArgumentSet) -> Result<String, ProtocolError> {
    if args.values.len() != signature.params.len() {
        return Err(ProtocolError::Arity { expected: signature.params.len(), got: args.values.len() });
    }

    let mut out = String::new();
    for (param, value) in signature.params.iter().zip(&args.values) {
        let mismatch = || ProtocolError::TypeMismatch { param: param.name.clone() };
        match (&param.ty, value) {
            (ValueType::Scalar(ty), ArgValue::Scalar(v)) => push_word(&mut out, check_scalar(&param.name, *ty, v)?),
            (ValueType::Aggregate { fields }, ArgValue::Aggregate(values)) => {
                if fields.len() != values.len() {
                    return Err(mismatch());
                }
                for (ty, v) in fields.iter().zip(values) {
                    push_word(&mut out, check_scalar(&param.name, *ty, v)?);
                }
            }
            (ty, ArgValue::Null) if ty.is_pointer() => out.push_str("0\n"),
            (ValueType::Buffer { elem, .. }, ArgValue::Buffer { elem: got, bytes }) if elem == got => {
                push_block(&mut out, bytes)
            }
            (ValueType::CString { .. }, ArgValue::CString(_)) | (ValueType::Bytes { .. }, ArgValue::Bytes(_)) => {
                let bytes = value.pointee_bytes().ok_or_else(mismatch)?;
                push_block(&mut out, &bytes);
            }
            _ => return Err(mismatch()),
        }
    }
    out.push('\n');
    Ok(out)
}

fn decode_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len()).step_by(2).map(|i| u8::from_str_radix(text.get(i..i + 2)?, 16).ok()).collect()
}

fn parse_sized_bytes(line: &str, len: Option<&str>, hex: Option<&str>) -> Result<Vec<u8>, ProtocolError> {
    let malformed = || ProtocolError::Malformed(line.to_string());
    let len: usize = len.and_then(|l| l.parse().ok()).ok_or_else(malformed)?;
    let bytes = decode_hex(hex.unwrap_or("")).ok_or_else(malformed)?;
    if bytes.len() != len {
        return Err(malformed());
    }
    Ok(bytes)
}

fn parse_ret(signature: &FunctionSignature, line: &str, fields: &[&str]) -> Result<ReturnValue, ProtocolError> {
    let malformed = || ProtocolError::Malformed(line.to_string());
    match (fields, &signature.ret) {
        (["V"], ReturnType::Void) => Ok(ReturnValue::Void),
        (["I", hex], ReturnType::Scalar(ty @ ScalarType::Int { .. }))
        | (["F", hex], ReturnType::Scalar(ty @ (ScalarType::F32 | ScalarType::F64))) => {
            let bits = u64::from_str_radix(hex, 16).map_err(|_| malformed())?;
            Ok(ReturnValue::Scalar(ScalarValue::new(*ty, bits)))
        }
        (["P", "NULL"], ReturnType::Pointer) => Ok(ReturnValue::Pointer(PointerTarget::Null)),
        (["P", "FOREIGN"], ReturnType::Pointer) => Ok(ReturnValue::Pointer(PointerTarget::Foreign)),
        (["P", param, offset], ReturnType::Pointer) => {
            let param = param.parse().map_err(|_| malformed())?;
            let offset = offset.parse().map_err(|_| malformed())?;
            Ok(ReturnValue::Pointer(PointerTarget::Param { param, offset }))
        }
        (["S", "NULL"], ReturnType::CString) => Ok(ReturnValue::Str(None)),
        (["S", len, rest @ ..], ReturnType::CString) if rest.len() <= 1 => {
            Ok(ReturnValue::Str(Some(parse_sized_bytes(line, Some(*len), rest.first().copied())?)))
        }
        _ => Err(malformed()),
    }
}

/// Decode the driver's stdout. Lines without the `@@EQ ` prefix are skipped.
pub fn parse_output(signature: &FunctionSignature, stdout: &[u8]) -> Result<DriverOutput, ProtocolError> {
    let text = String::from_utf8_lossy(stdout);
    let mut output = DriverOutput::default();

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        let Some(rest) = line.strip_prefix(LINE_PREFIX) else {
            continue;
        };
        let fields: Vec<&str> = rest.split_whitespace().collect();
        match fields.as_slice() {
            ["BADINPUT"] => return Err(ProtocolError::BadInput),
            ["END"] => output.completed = true,
            ["RET", ret @ ..] => {
                if output.ret.is_some() {
                    return Err(ProtocolError::Malformed(line.to_string()));
                }
                output.ret = Some(parse_ret(signature, line, ret)?);
            }
            ["MEM", index, len, hex @ ..] if hex.len() <= 1 => {
                let index: usize = index.parse().map_err(|_| ProtocolError::Malformed(line.to_string()))?;
                let is_mutable_ptr =
                    signature.params.get(index).map(|p| p.ty.is_pointer() && p.ty.is_mutable()).unwrap_or(false);
                if !is_mutable_ptr {
                    return Err(ProtocolError::UnexpectedMemory(index));
                }
                let bytes = parse_sized_bytes(line, Some(*len), hex.first().copied())?;
                output.memory.push((index, bytes));
            }
            _ => return Err(ProtocolError::Malformed(line.to_string())),
        }
    }
    Ok(output)
}
