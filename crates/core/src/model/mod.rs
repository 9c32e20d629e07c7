//! Core data model for the reference corpus.
//!
//! This module contains:
//! - Scalar and pointer-shaped parameter types, always with explicit width/signedness
//! - Length expressions tying buffer sizes to integer parameters
//! - Function signatures and their validation rules
//! - Reference cases (a signature plus category, tags, and original source)

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod parse;

pub use parse::{parse_len_expr, parse_return_type, parse_value_type, TypeParseError};

/// Byte width of an integer scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IntWidth {
    W1,
    W2,
    W4,
    W8,
}

impl IntWidth {
    pub fn bytes(self) -> usize {
        match self {
            IntWidth::W1 => 1,
            IntWidth::W2 => 2,
            IntWidth::W4 => 4,
            IntWidth::W8 => 8,
        }
    }

    pub fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }

    pub fn from_bytes(bytes: usize) -> Option<Self> {
        match bytes {
            1 => Some(IntWidth::W1),
            2 => Some(IntWidth::W2),
            4 => Some(IntWidth::W4),
            8 => Some(IntWidth::W8),
            _ => None,
        }
    }

    /// All-ones mask covering exactly this width.
    pub fn mask(self) -> u64 {
        match self {
            IntWidth::W8 => u64::MAX,
            other => (1u64 << other.bits()) - 1,
        }
    }
}

/// A fixed-width numeric value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Int { width: IntWidth, signed: bool },
    F32,
    F64,
}

impl ScalarType {
    pub const fn int(width: IntWidth, signed: bool) -> Self {
        ScalarType::Int { width, signed }
    }

    /// Size in bytes.
    pub fn size(self) -> usize {
        match self {
            ScalarType::Int { width, .. } => width.bytes(),
            ScalarType::F32 => 4,
            ScalarType::F64 => 8,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, ScalarType::Int { .. })
    }

    pub fn is_float(self) -> bool {
        matches!(self, ScalarType::F32 | ScalarType::F64)
    }

    /// Mask for the raw bit pattern of this type.
    pub fn bit_mask(self) -> u64 {
        match self {
            ScalarType::Int { width, .. } => width.mask(),
            ScalarType::F32 => u32::MAX as u64,
            ScalarType::F64 => u64::MAX,
        }
    }

    /// C spelling used by the generated harness driver.
    pub fn c_type(self) -> &'static str {
        match self {
            ScalarType::Int { width: IntWidth::W1, signed: true } => "int8_t",
            ScalarType::Int { width: IntWidth::W2, signed: true } => "int16_t",
            ScalarType::Int { width: IntWidth::W4, signed: true } => "int32_t",
            ScalarType::Int { width: IntWidth::W8, signed: true } => "int64_t",
            ScalarType::Int { width: IntWidth::W1, signed: false } => "uint8_t",
            ScalarType::Int { width: IntWidth::W2, signed: false } => "uint16_t",
            ScalarType::Int { width: IntWidth::W4, signed: false } => "uint32_t",
            ScalarType::Int { width: IntWidth::W8, signed: false } => "uint64_t",
            ScalarType::F32 => "float",
            ScalarType::F64 => "double",
        }
    }

    /// Canonical compatibility-layer name (`int4`, `uint1`, `float8`, ...).
    pub fn canonical_name(self) -> &'static str {
        match self {
            ScalarType::Int { width: IntWidth::W1, signed: true } => "int1",
            ScalarType::Int { width: IntWidth::W2, signed: true } => "int2",
            ScalarType::Int { width: IntWidth::W4, signed: true } => "int4",
            ScalarType::Int { width: IntWidth::W8, signed: true } => "int8",
            ScalarType::Int { width: IntWidth::W1, signed: false } => "uint1",
            ScalarType::Int { width: IntWidth::W2, signed: false } => "uint2",
            ScalarType::Int { width: IntWidth::W4, signed: false } => "uint4",
            ScalarType::Int { width: IntWidth::W8, signed: false } => "uint8",
            ScalarType::F32 => "float4",
            ScalarType::F64 => "float8",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// Element count of a pointer-to-array parameter.
///
/// Either a constant, the value of an integer parameter, or a sum/product of those.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LenExpr {
    Const(u64),
    Param(String),
    Add(Box<LenExpr>, Box<LenExpr>),
    Mul(Box<LenExpr>, Box<LenExpr>),
}

impl LenExpr {
    /// Names of every parameter referenced by this expression, in first-use order.
    pub fn params(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_params(&mut out);
        out
    }

    fn collect_params<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            LenExpr::Const(_) => {}
            LenExpr::Param(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            LenExpr::Add(a, b) | LenExpr::Mul(a, b) => {
                a.collect_params(out);
                b.collect_params(out);
            }
        }
    }

    /// Evaluate with checked arithmetic; `None` on overflow or unknown parameter.
    pub fn eval(&self, lookup: &dyn Fn(&str) -> Option<u64>) -> Option<u64> {
        match self {
            LenExpr::Const(n) => Some(*n),
            LenExpr::Param(name) => lookup(name),
            LenExpr::Add(a, b) => a.eval(lookup)?.checked_add(b.eval(lookup)?),
            LenExpr::Mul(a, b) => a.eval(lookup)?.checked_mul(b.eval(lookup)?),
        }
    }
}

impl fmt::Display for LenExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LenExpr::Const(n) => write!(f, "{n}"),
            LenExpr::Param(name) => f.write_str(name),
            LenExpr::Add(a, b) => write!(f, "{a}+{b}"),
            LenExpr::Mul(a, b) => {
                for (i, side) in [a, b].into_iter().enumerate() {
                    if i > 0 {
                        f.write_str("*")?;
                    }
                    if matches!(**side, LenExpr::Add(..)) {
                        write!(f, "({side})")?;
                    } else {
                        write!(f, "{side}")?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// Semantic type of a single parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Integer or floating value passed in a register/stack slot.
    Scalar(ScalarType),
    /// Pointer to `len` elements of `elem`.
    Buffer { elem: ScalarType, len: LenExpr, mutable: bool },
    /// Pointer to a NUL-terminated byte string.
    CString { mutable: bool },
    /// Pointer to an opaque aggregate of `size` bytes.
    Bytes { size: u64, mutable: bool },
    /// Aggregate passed by value, described field by field.
    Aggregate { fields: Vec<ScalarType> },
}

impl ValueType {
    pub fn is_pointer(&self) -> bool {
        matches!(self, ValueType::Buffer { .. } | ValueType::CString { .. } | ValueType::Bytes { .. })
    }

    pub fn is_mutable(&self) -> bool {
        match self {
            ValueType::Buffer { mutable, .. }
            | ValueType::CString { mutable }
            | ValueType::Bytes { mutable, .. } => *mutable,
            _ => false,
        }
    }

    pub fn as_integer(&self) -> Option<(IntWidth, bool)> {
        match self {
            ValueType::Scalar(ScalarType::Int { width, signed }) => Some((*width, *signed)),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_mutable() {
            f.write_str("mut ")?;
        }
        match self {
            ValueType::Scalar(s) => write!(f, "{s}"),
            ValueType::Buffer { elem, len, .. } => write!(f, "{elem}[{len}]"),
            ValueType::CString { .. } => f.write_str("cstr"),
            ValueType::Bytes { size, .. } => write!(f, "bytes[{size}]"),
            ValueType::Aggregate { fields } => {
                let names: Vec<&str> = fields.iter().map(|s| s.canonical_name()).collect();
                write!(f, "struct{{{}}}", names.join(","))
            }
        }
    }
}

/// Inclusive range constraining generated values for an integer parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: i64,
    pub max: i64,
}

impl ValueRange {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: i64) -> i64 {
        value.clamp(self.min, self.max)
    }
}

/// Byte range inside a pointed-to aggregate that carries no observable meaning (padding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub offset: usize,
    pub len: usize,
}

impl ByteRange {
    pub fn contains(&self, index: usize) -> bool {
        index >= self.offset && index < self.offset + self.len
    }
}

/// A named parameter with its semantic type and generation constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    pub ty: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<ValueRange>,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<ByteRange>,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, ty: ValueType) -> Self {
        Self { name: name.into(), ty, range: None, nullable: false, ignore: Vec::new() }
    }

    pub fn with_range(mut self, min: i64, max: i64) -> Self {
        self.range = Some(ValueRange::new(min, max));
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_ignored(mut self, offset: usize, len: usize) -> Self {
        self.ignore.push(ByteRange { offset, len });
        self
    }
}

/// Declared return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnType {
    Void,
    Scalar(ScalarType),
    /// Pointer-shaped result, compared after normalization against harness buffers.
    Pointer,
    /// Pointer to a NUL-terminated string, compared by content.
    CString,
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnType::Void => f.write_str("void"),
            ReturnType::Scalar(s) => write!(f, "{s}"),
            ReturnType::Pointer => f.write_str("ptr"),
            ReturnType::CString => f.write_str("cstr"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("'{0}' is not a valid C identifier")]
    InvalidName(String),
    #[error("{function}: duplicate parameter '{param}'")]
    DuplicateParam { function: String, param: String },
    #[error("{function}: length of '{param}' references unknown parameter '{referenced}'")]
    UnknownLengthParam { function: String, param: String, referenced: String },
    #[error("{function}: length parameter '{param}' must be an integer scalar")]
    NonIntegerLengthParam { function: String, param: String },
    #[error("{function}: parameter '{param}' has an invalid range")]
    InvalidRange { function: String, param: String },
    #[error("{function}: only integer parameters accept a range ('{param}')")]
    RangeOnNonInteger { function: String, param: String },
    #[error("{function}: only pointer parameters can be nullable ('{param}')")]
    NullableNonPointer { function: String, param: String },
    #[error("{function}: ignored bytes of '{param}' fall outside the pointed-to object")]
    InvalidIgnoreRange { function: String, param: String },
    #[error("{function}: aggregate '{param}' needs at least one field")]
    EmptyAggregate { function: String, param: String },
    #[error("{function}: opaque object '{param}' must have a non-zero size")]
    ZeroSizedBytes { function: String, param: String },
}

/// Name, ordered parameters, and return type of one testable entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    pub params: Vec<ParamDecl>,
    pub ret: ReturnType,
}

impl FunctionSignature {
    pub fn new(name: impl Into<String>, params: Vec<ParamDecl>, ret: ReturnType) -> Self {
        Self { name: name.into(), params, ret }
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    /// Integer parameters whose value determines some buffer length.
    pub fn dimension_params(&self) -> BTreeSet<&str> {
        self.params
            .iter()
            .filter_map(|p| match &p.ty {
                ValueType::Buffer { len, .. } => Some(len.params()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn has_nullable_pointer(&self) -> bool {
        self.params.iter().any(|p| p.nullable)
    }

    /// Check the structural invariants the generator and driver rely on.
    pub fn validate(&self) -> Result<(), SignatureError> {
        if !is_c_identifier(&self.name) {
            return Err(SignatureError::InvalidName(self.name.clone()));
        }

        let mut seen = HashSet::new();
        for p in &self.params {
            if !is_c_identifier(&p.name) {
                return Err(SignatureError::InvalidName(p.name.clone()));
            }
            if !seen.insert(p.name.as_str()) {
                return Err(SignatureError::DuplicateParam {
                    function: self.name.clone(),
                    param: p.name.clone(),
                });
            }
        }

        let dims = self.dimension_params();
        for p in &self.params {
            let err_ctx = || (self.name.clone(), p.name.clone());

            if let ValueType::Buffer { len, .. } = &p.ty {
                for referenced in len.params() {
                    let Some(idx) = self.param_index(referenced) else {
                        let (function, param) = err_ctx();
                        return Err(SignatureError::UnknownLengthParam {
                            function,
                            param,
                            referenced: referenced.to_string(),
                        });
                    };
                    if self.params[idx].ty.as_integer().is_none() {
                        let (function, _) = err_ctx();
                        return Err(SignatureError::NonIntegerLengthParam {
                            function,
                            param: referenced.to_string(),
                        });
                    }
                }
            }

            if let Some(range) = p.range {
                if p.ty.as_integer().is_none() {
                    let (function, param) = err_ctx();
                    return Err(SignatureError::RangeOnNonInteger { function, param });
                }
                let negative_dim = dims.contains(p.name.as_str()) && range.min < 0;
                if range.min > range.max || negative_dim {
                    let (function, param) = err_ctx();
                    return Err(SignatureError::InvalidRange { function, param });
                }
            }

            if p.nullable && !p.ty.is_pointer() {
                let (function, param) = err_ctx();
                return Err(SignatureError::NullableNonPointer { function, param });
            }

            match &p.ty {
                ValueType::Aggregate { fields } if fields.is_empty() => {
                    let (function, param) = err_ctx();
                    return Err(SignatureError::EmptyAggregate { function, param });
                }
                ValueType::Bytes { size: 0, .. } => {
                    let (function, param) = err_ctx();
                    return Err(SignatureError::ZeroSizedBytes { function, param });
                }
                _ => {}
            }

            if !p.ignore.is_empty() {
                let fits = match &p.ty {
                    ValueType::Bytes { size, .. } => {
                        p.ignore.iter().all(|r| (r.offset + r.len) as u64 <= *size && r.len > 0)
                    }
                    ValueType::Buffer { .. } => p.ignore.iter().all(|r| r.len > 0),
                    _ => false,
                };
                if !fits {
                    let (function, param) = err_ctx();
                    return Err(SignatureError::InvalidIgnoreRange { function, param });
                }
            }
        }

        Ok(())
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", p.ty, p.name)?;
            if let Some(r) = p.range {
                write!(f, " in {}..={}", r.min, r.max)?;
            }
            if p.nullable {
                f.write_str(" nullable")?;
            }
        }
        write!(f, ") -> {}", self.ret)
    }
}

pub(crate) fn is_c_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Code-generation pattern a reference case exercises.
///
/// Declared in label order so the derived `Ord` sorts reports alphabetically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    AggregateAccess,
    Arithmetic,
    Bitwise,
    ControlFlow,
    DynamicMemory,
    PointerAccess,
    Recursion,
    StringOps,
    TypeConversion,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::AggregateAccess,
        Category::Arithmetic,
        Category::Bitwise,
        Category::ControlFlow,
        Category::DynamicMemory,
        Category::PointerAccess,
        Category::Recursion,
        Category::StringOps,
        Category::TypeConversion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::AggregateAccess => "aggregate_access",
            Category::Arithmetic => "arithmetic",
            Category::Bitwise => "bitwise",
            Category::ControlFlow => "control_flow",
            Category::DynamicMemory => "dynamic_memory",
            Category::PointerAccess => "pointer_access",
            Category::Recursion => "recursion",
            Category::StringOps => "string_ops",
            Category::TypeConversion => "type_conversion",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == label)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A literal argument value written in a corpus manifest.
///
/// Integers, floats and strings stand for scalars and C strings; lists stand for buffers,
/// opaque bytes and by-value aggregates; `null` passes a NULL pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExplicitValue {
    Null(()),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    List(Vec<ExplicitValue>),
}

/// Tag selecting the floating-point tolerance in comparisons.
pub const FLOAT_SENSITIVE_TAG: &str = "float_sensitive";

/// One testable function of the reference corpus.
///
/// The decompiled counterpart is supplied at comparison time, see
/// [`crate::corpus::CasePair`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCase {
    pub signature: FunctionSignature,
    pub category: Category,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Original C translation unit, relative to the corpus root.
    pub source: PathBuf,
    /// Hand-picked argument rows run ahead of the random ones.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub explicit: Vec<Vec<ExplicitValue>>,
}

impl ReferenceCase {
    pub fn new(signature: FunctionSignature, category: Category, source: impl Into<PathBuf>) -> Self {
        Self { signature, category, tags: BTreeSet::new(), source: source.into(), explicit: Vec::new() }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_explicit(mut self, row: Vec<ExplicitValue>) -> Self {
        self.explicit.push(row);
        self
    }

    pub fn name(&self) -> &str {
        &self.signature.name
    }

    pub fn is_float_sensitive(&self) -> bool {
        self.tags.contains(FLOAT_SENSITIVE_TAG)
    }
}
