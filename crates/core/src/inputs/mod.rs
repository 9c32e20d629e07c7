//! Deterministic argument-set generation.
//!
//! Every run produces, in order:
//! - boundary rows derived only from the signature shape,
//! - explicit rows listed in the corpus manifest (when generating for a case),
//! - random rows drawn from a ChaCha8 stream seeded by `(seed, signature text)`.
//!
//! Identical `(signature, seed, count)` always yields bit-identical sets.

mod boundary;
mod explicit;
mod random;

use std::collections::HashMap;
use std::fmt;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::GeneratorConfig;
use crate::model::{FunctionSignature, LenExpr, ReferenceCase, ScalarType};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("length of '{param}' overflows")]
    LengthOverflow { param: String },
    #[error("'{param}' needs {elems} elements, above the cap of {cap}")]
    BufferTooLarge { param: String, elems: u64, cap: u64 },
    #[error("explicit row {row}: {reason}")]
    Explicit { row: usize, reason: String },
}

/// Where an argument set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Boundary,
    Random,
    Explicit,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Boundary => "boundary",
            Provenance::Random => "random",
            Provenance::Explicit => "explicit",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s {
            "boundary" => Some(Provenance::Boundary),
            "random" => Some(Provenance::Random),
            "explicit" => Some(Provenance::Explicit),
            _ => None,
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar as its raw bit pattern, masked to the type width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarValue {
    pub ty: ScalarType,
    pub bits: u64,
}

impl ScalarValue {
    pub fn new(ty: ScalarType, bits: u64) -> Self {
        Self { ty, bits: bits & ty.bit_mask() }
    }

    pub fn from_i128(ty: ScalarType, value: i128) -> Self {
        Self::new(ty, value as u64)
    }

    pub fn from_f64(ty: ScalarType, value: f64) -> Self {
        match ty {
            ScalarType::F32 => Self::new(ty, (value as f32).to_bits() as u64),
            ScalarType::F64 => Self::new(ty, value.to_bits()),
            ScalarType::Int { .. } => Self::from_i128(ty, value as i128),
        }
    }

    /// Integer value honoring signedness; floats report their raw bits.
    pub fn as_i128(&self) -> i128 {
        match self.ty {
            ScalarType::Int { width, signed: true } => {
                let shift = 64 - width.bits();
                (((self.bits << shift) as i64) >> shift) as i128
            }
            _ => self.bits as i128,
        }
    }

    /// Bytes in host memory order, as the value sits inside a buffer.
    pub fn to_ne_bytes(&self) -> Vec<u8> {
        match self.ty.size() {
            1 => vec![self.bits as u8],
            2 => (self.bits as u16).to_ne_bytes().to_vec(),
            4 => (self.bits as u32).to_ne_bytes().to_vec(),
            _ => self.bits.to_ne_bytes().to_vec(),
        }
    }

    pub fn from_ne_bytes(ty: ScalarType, bytes: &[u8]) -> Self {
        let bits = match bytes.len() {
            1 => bytes[0] as u64,
            2 => u16::from_ne_bytes([bytes[0], bytes[1]]) as u64,
            4 => u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as u64,
            _ => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&bytes[..8]);
                u64::from_ne_bytes(raw)
            }
        };
        Self::new(ty, bits)
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            ScalarType::Int { .. } => write!(f, "{}", self.as_i128()),
            ScalarType::F32 => write!(f, "{:?}", f32::from_bits(self.bits as u32)),
            ScalarType::F64 => write!(f, "{:?}", f64::from_bits(self.bits)),
        }
    }
}

/// One concrete argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgValue {
    Scalar(ScalarValue),
    /// Elements laid out in host memory order.
    Buffer { elem: ScalarType, bytes: Vec<u8> },
    /// String content without the terminating NUL; never contains NUL.
    CString(Vec<u8>),
    Bytes(Vec<u8>),
    Aggregate(Vec<ScalarValue>),
    Null,
}

impl ArgValue {
    /// Bytes the harness places behind a pointer argument (before the guard redzone).
    pub fn pointee_bytes(&self) -> Option<Vec<u8>> {
        match self {
            ArgValue::Buffer { bytes, .. } | ArgValue::Bytes(bytes) => Some(bytes.clone()),
            ArgValue::CString(bytes) => {
                let mut with_nul = bytes.clone();
                with_nul.push(0);
                Some(with_nul)
            }
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<ScalarValue> {
        match self {
            ArgValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("\"")?;
    for &b in bytes {
        match b {
            b'"' => f.write_str("\\\"")?,
            b'\\' => f.write_str("\\\\")?,
            0x20..=0x7e => write!(f, "{}", b as char)?,
            _ => write!(f, "\\x{b:02x}")?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Scalar(v) => write!(f, "{v}"),
            ArgValue::Buffer { elem, bytes } => {
                f.write_str("[")?;
                for (i, chunk) in bytes.chunks(elem.size()).enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", ScalarValue::from_ne_bytes(*elem, chunk))?;
                }
                f.write_str("]")
            }
            ArgValue::CString(bytes) => write_escaped(f, bytes),
            ArgValue::Bytes(bytes) => {
                f.write_str("bytes:")?;
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            ArgValue::Aggregate(fields) => {
                f.write_str("{")?;
                for (i, v) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("}")
            }
            ArgValue::Null => f.write_str("NULL"),
        }
    }
}

/// Ordered values for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentSet {
    pub index: usize,
    pub provenance: Provenance,
    pub values: Vec<ArgValue>,
}

impl fmt::Display for ArgumentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} (", self.index, self.provenance)?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{v}")?;
        }
        f.write_str(")")
    }
}

/// Current values of dimension parameters while a row is built.
pub(crate) type Dims = HashMap<String, u64>;

/// Element count of a buffer parameter, enforcing overflow and size caps.
pub(crate) fn resolve_len(param: &str, len: &LenExpr, dims: &Dims, cap: u64) -> Result<usize, InputError> {
    let elems = len
        .eval(&|name| dims.get(name).copied())
        .ok_or_else(|| InputError::LengthOverflow { param: param.to_string() })?;
    if elems > cap {
        return Err(InputError::BufferTooLarge { param: param.to_string(), elems, cap });
    }
    Ok(elems as usize)
}

pub(crate) fn fill_buffer(elem: ScalarType, value: ScalarValue, elems: usize) -> ArgValue {
    let one = value.to_ne_bytes();
    let mut bytes = Vec::with_capacity(one.len() * elems);
    for _ in 0..elems {
        bytes.extend_from_slice(&one);
    }
    ArgValue::Buffer { elem, bytes }
}

/// Stream seed derived from the run seed and the canonical signature text.
pub fn rng_for(signature: &FunctionSignature, seed: u64) -> ChaCha8Rng {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(signature.to_string().as_bytes());
    let digest: [u8; 32] = hasher.finalize().into();
    ChaCha8Rng::from_seed(digest)
}

/// Argument-set generator bound to one set of generation limits.
#[derive(Debug, Clone, Default)]
pub struct InputGenerator {
    config: GeneratorConfig,
}

impl InputGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Boundary rows followed by random rows, `count` in total.
    pub fn generate(&self, signature: &FunctionSignature, seed: u64, count: usize) -> Result<Vec<ArgumentSet>, InputError> {
        self.generate_with(signature, &[], seed, count)
    }

    /// Like [`InputGenerator::generate`], with the case's explicit rows after the boundary rows.
    pub fn generate_for_case(&self, case: &ReferenceCase, seed: u64, count: usize) -> Result<Vec<ArgumentSet>, InputError> {
        self.generate_with(&case.signature, &case.explicit, seed, count)
    }

    fn generate_with(
        &self,
        signature: &FunctionSignature,
        explicit_rows: &[Vec<crate::model::ExplicitValue>],
        seed: u64,
        count: usize,
    ) -> Result<Vec<ArgumentSet>, InputError> {
        let mut sets = Vec::with_capacity(count);

        for row in boundary::rows(signature) {
            if sets.len() == count {
                return Ok(sets);
            }
            let values = boundary::build(signature, row, &self.config)?;
            sets.push(ArgumentSet { index: sets.len(), provenance: Provenance::Boundary, values });
        }

        for (row_idx, row) in explicit_rows.iter().enumerate() {
            if sets.len() == count {
                return Ok(sets);
            }
            let values = explicit::build(signature, row_idx, row, &self.config)?;
            sets.push(ArgumentSet { index: sets.len(), provenance: Provenance::Explicit, values });
        }

        let mut rng = rng_for(signature, seed);
        while sets.len() < count {
            let values = random::build(signature, &mut rng, &self.config)?;
            sets.push(ArgumentSet { index: sets.len(), provenance: Provenance::Random, values });
        }
        Ok(sets)
    }
}

/// `generate(signature, seed, count)` with default generation limits.
pub fn generate(signature: &FunctionSignature, seed: u64, count: usize) -> Result<Vec<ArgumentSet>, InputError> {
    InputGenerator::default().generate(signature, seed, count)
}
