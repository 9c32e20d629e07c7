use super::{fill_buffer, resolve_len, ArgValue, Dims, InputError, ScalarValue};
use crate::config::GeneratorConfig;
use crate::model::{FunctionSignature, ParamDecl, ScalarType, ValueRange, ValueType};

/// Boundary row shapes, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BoundaryRow {
    Zero,
    One,
    MinusOne,
    Min,
    Max,
    Null,
}

pub(crate) fn rows(signature: &FunctionSignature) -> Vec<BoundaryRow> {
    let mut rows = vec![BoundaryRow::Zero, BoundaryRow::One, BoundaryRow::MinusOne, BoundaryRow::Min, BoundaryRow::Max];
    if signature.has_nullable_pointer() {
        rows.push(BoundaryRow::Null);
    }
    rows
}

pub(crate) fn scalar(ty: ScalarType, row: BoundaryRow, range: Option<ValueRange>) -> ScalarValue {
    match ty {
        ScalarType::Int { width, signed } => {
            let bits = width.bits();
            let (min, max) = if signed {
                (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
            } else {
                (0, width.mask() as i128)
            };
            let value = match row {
                BoundaryRow::Zero => 0,
                BoundaryRow::One | BoundaryRow::Null => 1,
                BoundaryRow::MinusOne if signed => -1,
                BoundaryRow::MinusOne => max,
                BoundaryRow::Min => min,
                BoundaryRow::Max => max,
            };
            let value = match range {
                Some(r) => value.clamp(r.min as i128, r.max as i128),
                None => value,
            };
            ScalarValue::from_i128(ty, value)
        }
        ScalarType::F32 => {
            let value = match row {
                BoundaryRow::Zero => 0.0f32,
                BoundaryRow::One | BoundaryRow::Null => 1.0,
                BoundaryRow::MinusOne => -1.0,
                BoundaryRow::Min => f32::MIN,
                BoundaryRow::Max => f32::MAX,
            };
            ScalarValue::new(ty, value.to_bits() as u64)
        }
        ScalarType::F64 => {
            let value = match row {
                BoundaryRow::Zero => 0.0f64,
                BoundaryRow::One | BoundaryRow::Null => 1.0,
                BoundaryRow::MinusOne => -1.0,
                BoundaryRow::Min => f64::MIN,
                BoundaryRow::Max => f64::MAX,
            };
            ScalarValue::new(ty, value.to_bits())
        }
    }
}

fn dimension(row: BoundaryRow, mid: u64, range: Option<ValueRange>) -> u64 {
    let raw = match row {
        BoundaryRow::Zero => 0,
        BoundaryRow::One | BoundaryRow::Null => 1,
        _ => mid as i64,
    };
    let clamped = match range {
        Some(r) => r.clamp(raw),
        None => raw,
    };
    clamped.max(0) as u64
}

fn fill_byte(row: BoundaryRow) -> u8 {
    match row {
        BoundaryRow::Zero => 0x00,
        BoundaryRow::One | BoundaryRow::Null => 0x01,
        BoundaryRow::MinusOne => 0xFF,
        BoundaryRow::Min => 0x80,
        BoundaryRow::Max => 0x7F,
    }
}

fn string(row: BoundaryRow, mid: u64) -> Vec<u8> {
    match row {
        BoundaryRow::Zero => Vec::new(),
        BoundaryRow::One | BoundaryRow::Null => b"a".to_vec(),
        other => vec![fill_byte(other); mid as usize],
    }
}

fn value(param: &ParamDecl, row: BoundaryRow, dims: &Dims, config: &GeneratorConfig) -> Result<ArgValue, InputError> {
    if row == BoundaryRow::Null && param.nullable {
        return Ok(ArgValue::Null);
    }
    let value = match &param.ty {
        ValueType::Scalar(ty) => match dims.get(&param.name) {
            Some(&dim) => ArgValue::Scalar(ScalarValue::new(*ty, dim)),
            None => ArgValue::Scalar(scalar(*ty, row, param.range)),
        },
        ValueType::Buffer { elem, len, .. } => {
            let elems = resolve_len(&param.name, len, dims, config.max_buffer_elems)?;
            fill_buffer(*elem, scalar(*elem, row, None), elems)
        }
        ValueType::CString { .. } => ArgValue::CString(string(row, config.mid_len)),
        ValueType::Bytes { size, .. } => {
            if *size > config.max_buffer_elems {
                return Err(InputError::BufferTooLarge {
                    param: param.name.clone(),
                    elems: *size,
                    cap: config.max_buffer_elems,
                });
            }
            ArgValue::Bytes(vec![fill_byte(row); *size as usize])
        }
        ValueType::Aggregate { fields } => {
            ArgValue::Aggregate(fields.iter().map(|f| scalar(*f, row, None)).collect())
        }
    };
    Ok(value)
}

pub(crate) fn build(
    signature: &FunctionSignature,
    row: BoundaryRow,
    config: &GeneratorConfig,
) -> Result<Vec<ArgValue>, InputError> {
    let mut dims = Dims::new();
    for name in signature.dimension_params() {
        let range = signature.param_index(name).and_then(|i| signature.params[i].range);
        dims.insert(name.to_string(), dimension(row, config.mid_len, range));
    }
    signature.params.iter().map(|p| value(p, row, &dims, config)).collect()
}
