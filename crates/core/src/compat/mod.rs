//! Compatibility layer between decompiler pseudo-C and a standard C compiler.
//!
//! The vocabulary of synthetic type names is an explicit enumeration: anything not listed here
//! is rejected when a signature is registered instead of being treated as `int`.

pub mod bits;
pub mod header;

pub use bits::{concat, container_width, mask, sext, sub, zext, BitsError};
pub use header::{render_header, LibcEntry, HEADER_FILE_NAME, LIBC_ROSTER};

use crate::model::{IntWidth, ScalarType};

/// A type name accepted in decompiled output and in corpus signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompatType {
    Int1,
    Int2,
    Int4,
    Int8,
    Uint1,
    Uint2,
    Uint4,
    Uint8,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Float4,
    Float8,
    Bool,
    Undefined,
    Undefined1,
    Undefined2,
    Undefined4,
    Undefined8,
    Unk1,
    Unk2,
    Unk4,
    Unk8,
    Xunknown1,
    Xunknown2,
    Xunknown4,
    Xunknown8,
    Longlong,
    Ulonglong,
    Ulong,
}

impl CompatType {
    pub const ALL: [CompatType; 35] = [
        CompatType::Int1,
        CompatType::Int2,
        CompatType::Int4,
        CompatType::Int8,
        CompatType::Uint1,
        CompatType::Uint2,
        CompatType::Uint4,
        CompatType::Uint8,
        CompatType::I8,
        CompatType::I16,
        CompatType::I32,
        CompatType::I64,
        CompatType::U8,
        CompatType::U16,
        CompatType::U32,
        CompatType::U64,
        CompatType::Float4,
        CompatType::Float8,
        CompatType::Bool,
        CompatType::Undefined,
        CompatType::Undefined1,
        CompatType::Undefined2,
        CompatType::Undefined4,
        CompatType::Undefined8,
        CompatType::Unk1,
        CompatType::Unk2,
        CompatType::Unk4,
        CompatType::Unk8,
        CompatType::Xunknown1,
        CompatType::Xunknown2,
        CompatType::Xunknown4,
        CompatType::Xunknown8,
        CompatType::Longlong,
        CompatType::Ulonglong,
        CompatType::Ulong,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CompatType::Int1 => "int1",
            CompatType::Int2 => "int2",
            CompatType::Int4 => "int4",
            CompatType::Int8 => "int8",
            CompatType::Uint1 => "uint1",
            CompatType::Uint2 => "uint2",
            CompatType::Uint4 => "uint4",
            CompatType::Uint8 => "uint8",
            CompatType::I8 => "i8",
            CompatType::I16 => "i16",
            CompatType::I32 => "i32",
            CompatType::I64 => "i64",
            CompatType::U8 => "u8",
            CompatType::U16 => "u16",
            CompatType::U32 => "u32",
            CompatType::U64 => "u64",
            CompatType::Float4 => "float4",
            CompatType::Float8 => "float8",
            CompatType::Bool => "bool",
            CompatType::Undefined => "undefined",
            CompatType::Undefined1 => "undefined1",
            CompatType::Undefined2 => "undefined2",
            CompatType::Undefined4 => "undefined4",
            CompatType::Undefined8 => "undefined8",
            CompatType::Unk1 => "unk1",
            CompatType::Unk2 => "unk2",
            CompatType::Unk4 => "unk4",
            CompatType::Unk8 => "unk8",
            CompatType::Xunknown1 => "xunknown1",
            CompatType::Xunknown2 => "xunknown2",
            CompatType::Xunknown4 => "xunknown4",
            CompatType::Xunknown8 => "xunknown8",
            CompatType::Longlong => "longlong",
            CompatType::Ulonglong => "ulonglong",
            CompatType::Ulong => "ulong",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// Width/signedness (or float kind) the name stands for.
    ///
    /// Opaque `undefinedN`/`unkN`/`xunknownN` are unsigned byte containers of width N.
    pub fn scalar(self) -> ScalarType {
        use IntWidth::*;
        match self {
            CompatType::Int1 | CompatType::I8 => ScalarType::int(W1, true),
            CompatType::Int2 | CompatType::I16 => ScalarType::int(W2, true),
            CompatType::Int4 | CompatType::I32 => ScalarType::int(W4, true),
            CompatType::Int8 | CompatType::I64 | CompatType::Longlong => ScalarType::int(W8, true),
            CompatType::Uint1
            | CompatType::U8
            | CompatType::Bool
            | CompatType::Undefined
            | CompatType::Undefined1
            | CompatType::Unk1
            | CompatType::Xunknown1 => ScalarType::int(W1, false),
            CompatType::Uint2
            | CompatType::U16
            | CompatType::Undefined2
            | CompatType::Unk2
            | CompatType::Xunknown2 => ScalarType::int(W2, false),
            CompatType::Uint4
            | CompatType::U32
            | CompatType::Undefined4
            | CompatType::Unk4
            | CompatType::Xunknown4 => ScalarType::int(W4, false),
            CompatType::Uint8
            | CompatType::U64
            | CompatType::Undefined8
            | CompatType::Unk8
            | CompatType::Xunknown8
            | CompatType::Ulonglong
            | CompatType::Ulong => ScalarType::int(W8, false),
            CompatType::Float4 => ScalarType::F32,
            CompatType::Float8 => ScalarType::F64,
        }
    }

    /// Underlying C type the header typedefs this name to.
    pub fn c_definition(self) -> &'static str {
        match self {
            CompatType::Bool => "unsigned char",
            CompatType::Float4 => "float",
            CompatType::Float8 => "double",
            CompatType::Longlong => "long long",
            CompatType::Ulonglong => "unsigned long long",
            CompatType::Ulong => "unsigned long",
            other => match other.scalar() {
                ScalarType::Int { width: IntWidth::W1, signed: true } => "signed char",
                ScalarType::Int { width: IntWidth::W2, signed: true } => "short",
                ScalarType::Int { width: IntWidth::W4, signed: true } => "int",
                ScalarType::Int { width: IntWidth::W8, signed: true } => "long long",
                ScalarType::Int { width: IntWidth::W1, signed: false } => "unsigned char",
                ScalarType::Int { width: IntWidth::W2, signed: false } => "unsigned short",
                ScalarType::Int { width: IntWidth::W4, signed: false } => "unsigned int",
                ScalarType::Int { width: IntWidth::W8, signed: false } => "unsigned long long",
                ScalarType::F32 => "float",
                ScalarType::F64 => "double",
            },
        }
    }

    /// Placeholder types a decompiler emits when it could not recover a real type.
    pub fn is_opaque(self) -> bool {
        matches!(
            self,
            CompatType::Undefined
                | CompatType::Undefined1
                | CompatType::Undefined2
                | CompatType::Undefined4
                | CompatType::Undefined8
                | CompatType::Unk1
                | CompatType::Unk2
                | CompatType::Unk4
                | CompatType::Unk8
                | CompatType::Xunknown1
                | CompatType::Xunknown2
                | CompatType::Xunknown4
                | CompatType::Xunknown8
        )
    }

    pub fn size(self) -> usize {
        self.scalar().size()
    }
}
