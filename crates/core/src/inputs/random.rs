use rand::Rng;
use rand_chacha::ChaCha8Rng;

use super::boundary::{self, BoundaryRow};
use super::{resolve_len, ArgValue, Dims, InputError, ScalarValue};
use crate::config::GeneratorConfig;
use crate::model::{FunctionSignature, ParamDecl, ScalarType, ValueRange, ValueType};

const BOUNDARY_PICKS: [BoundaryRow; 5] =
    [BoundaryRow::Zero, BoundaryRow::One, BoundaryRow::MinusOne, BoundaryRow::Min, BoundaryRow::Max];

fn pick_boundary(rng: &mut ChaCha8Rng) -> BoundaryRow {
    BOUNDARY_PICKS[rng.gen_range(0..BOUNDARY_PICKS.len())]
}

pub(crate) fn scalar(rng: &mut ChaCha8Rng, ty: ScalarType, range: Option<ValueRange>) -> ScalarValue {
    match ty {
        ScalarType::Int { width, signed } => {
            if let Some(r) = range {
                if rng.gen_ratio(1, 4) {
                    return boundary::scalar(ty, pick_boundary(rng), Some(r));
                }
                return ScalarValue::from_i128(ty, rng.gen_range(r.min..=r.max) as i128);
            }
            match rng.gen_range(0..4) {
                0 => boundary::scalar(ty, pick_boundary(rng), None),
                1 | 2 if signed => ScalarValue::from_i128(ty, rng.gen_range(-16i64..=16) as i128),
                1 | 2 => ScalarValue::from_i128(ty, rng.gen_range(0i64..=32) as i128),
                _ => ScalarValue::new(ty, rng.gen::<u64>() & width.mask()),
            }
        }
        ScalarType::F32 | ScalarType::F64 => match rng.gen_range(0..4) {
            0 => boundary::scalar(ty, pick_boundary(rng), None),
            1 | 2 => ScalarValue::from_f64(ty, rng.gen_range(-1000.0f64..1000.0)),
            _ => ScalarValue::new(ty, rng.gen::<u64>()),
        },
    }
}

fn dimension(rng: &mut ChaCha8Rng, range: Option<ValueRange>, max_dimension: u64) -> u64 {
    let (lo, hi) = match range {
        Some(r) => {
            let lo = r.min.max(0);
            let hi = r.max.min(lo.saturating_add(max_dimension as i64)).max(lo);
            (lo, hi)
        }
        None => (0, max_dimension as i64),
    };
    rng.gen_range(lo..=hi) as u64
}

fn string(rng: &mut ChaCha8Rng, max_len: usize) -> Vec<u8> {
    let len = rng.gen_range(0..=max_len);
    (0..len)
        .map(|_| if rng.gen_ratio(3, 4) { rng.gen_range(0x20u8..=0x7e) } else { rng.gen_range(1u8..=255) })
        .collect()
}

fn value(
    rng: &mut ChaCha8Rng,
    param: &ParamDecl,
    dims: &Dims,
    config: &GeneratorConfig,
) -> Result<ArgValue, InputError> {
    if param.nullable && rng.gen_ratio(1, 8) {
        return Ok(ArgValue::Null);
    }
    let value = match &param.ty {
        ValueType::Scalar(ty) => match dims.get(&param.name) {
            Some(&dim) => ArgValue::Scalar(ScalarValue::new(*ty, dim)),
            None => ArgValue::Scalar(scalar(rng, *ty, param.range)),
        },
        ValueType::Buffer { elem, len, .. } => {
            let elems = resolve_len(&param.name, len, dims, config.max_buffer_elems)?;
            let mut bytes = Vec::with_capacity(elems * elem.size());
            for _ in 0..elems {
                bytes.extend_from_slice(&scalar(rng, *elem, None).to_ne_bytes());
            }
            ArgValue::Buffer { elem: *elem, bytes }
        }
        ValueType::CString { .. } => ArgValue::CString(string(rng, config.max_string_len)),
        ValueType::Bytes { size, .. } => {
            if *size > config.max_buffer_elems {
                return Err(InputError::BufferTooLarge {
                    param: param.name.clone(),
                    elems: *size,
                    cap: config.max_buffer_elems,
                });
            }
            ArgValue::Bytes((0..*size).map(|_| rng.gen::<u8>()).collect())
        }
        ValueType::Aggregate { fields } => {
            ArgValue::Aggregate(fields.iter().map(|f| scalar(rng, *f, None)).collect())
        }
    };
    Ok(value)
}

pub(crate) fn build(
    signature: &FunctionSignature,
    rng: &mut ChaCha8Rng,
    config: &GeneratorConfig,
) -> Result<Vec<ArgValue>, InputError> {
    let mut dims = Dims::new();
    for name in signature.dimension_params() {
        let range = signature.param_index(name).and_then(|i| signature.params[i].range);
        dims.insert(name.to_string(), dimension(rng, range, config.max_dimension));
    }
    signature.params.iter().map(|p| value(rng, p, &dims, config)).collect()
}
