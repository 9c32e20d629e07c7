use super::{resolve_len, ArgValue, Dims, InputError, ScalarValue};
use crate::config::GeneratorConfig;
use crate::model::{ExplicitValue, FunctionSignature, LenExpr, ScalarType, ValueType};

fn scalar(ty: ScalarType, value: &ExplicitValue) -> Result<ScalarValue, String> {
    match (ty, value) {
        (ScalarType::Int { .. }, ExplicitValue::Int(v)) => Ok(ScalarValue::from_i128(ty, *v as i128)),
        (ScalarType::Int { .. }, ExplicitValue::UInt(v)) => Ok(ScalarValue::new(ty, *v)),
        (ScalarType::F32 | ScalarType::F64, ExplicitValue::Float(v)) => Ok(ScalarValue::from_f64(ty, *v)),
        (ScalarType::F32 | ScalarType::F64, ExplicitValue::Int(v)) => Ok(ScalarValue::from_f64(ty, *v as f64)),
        (ty, other) => Err(format!("{other:?} is not a valid {ty}")),
    }
}

fn list<'a>(value: &'a ExplicitValue, what: &str) -> Result<&'a [ExplicitValue], String> {
    match value {
        ExplicitValue::List(items) => Ok(items),
        other => Err(format!("expected a list for {what}, got {other:?}")),
    }
}

/// Convert one manifest row. Length parameters follow the buffers they size.
pub(crate) fn build(
    signature: &FunctionSignature,
    row: usize,
    values: &[ExplicitValue],
    config: &GeneratorConfig,
) -> Result<Vec<ArgValue>, InputError> {
    let err = |reason: String| InputError::Explicit { row, reason };

    if values.len() != signature.params.len() {
        return Err(err(format!("expected {} values, got {}", signature.params.len(), values.len())));
    }

    let mut dims = Dims::new();
    for name in signature.dimension_params() {
        if let Some(idx) = signature.param_index(name) {
            if let ExplicitValue::Int(v) = &values[idx] {
                dims.insert(name.to_string(), (*v).max(0) as u64);
            }
        }
    }
    for (param, value) in signature.params.iter().zip(values) {
        if let (ValueType::Buffer { len: LenExpr::Param(dim), .. }, ExplicitValue::List(items)) = (&param.ty, value) {
            dims.insert(dim.clone(), items.len() as u64);
        }
    }

    let mut out = Vec::with_capacity(values.len());
    for (param, value) in signature.params.iter().zip(values) {
        if matches!(value, ExplicitValue::Null(())) {
            if !param.ty.is_pointer() {
                return Err(err(format!("'{}' is not a pointer and cannot be null", param.name)));
            }
            out.push(ArgValue::Null);
            continue;
        }

        let arg = match &param.ty {
            ValueType::Scalar(ty) => match dims.get(&param.name) {
                Some(&dim) => ArgValue::Scalar(ScalarValue::new(*ty, dim)),
                None => ArgValue::Scalar(scalar(*ty, value).map_err(err)?),
            },
            ValueType::Buffer { elem, len, .. } => {
                let items = list(value, &param.name).map_err(err)?;
                let elems = resolve_len(&param.name, len, &dims, config.max_buffer_elems)?;
                if elems != items.len() {
                    return Err(err(format!("'{}' has {} elements but its length is {elems}", param.name, items.len())));
                }
                let mut bytes = Vec::with_capacity(elems * elem.size());
                for item in items {
                    bytes.extend_from_slice(&scalar(*elem, item).map_err(err)?.to_ne_bytes());
                }
                ArgValue::Buffer { elem: *elem, bytes }
            }
            ValueType::CString { .. } => match value {
                ExplicitValue::Text(text) if !text.as_bytes().contains(&0) => ArgValue::CString(text.as_bytes().to_vec()),
                other => return Err(err(format!("'{}' expects a string without NUL, got {other:?}", param.name))),
            },
            ValueType::Bytes { size, .. } => {
                let items = list(value, &param.name).map_err(err)?;
                if items.len() as u64 != *size {
                    return Err(err(format!("'{}' needs exactly {size} bytes", param.name)));
                }
                let byte = ScalarType::int(crate::model::IntWidth::W1, false);
                let bytes = items
                    .iter()
                    .map(|item| scalar(byte, item).map(|v| v.bits as u8))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(err)?;
                ArgValue::Bytes(bytes)
            }
            ValueType::Aggregate { fields } => {
                let items = list(value, &param.name).map_err(err)?;
                if items.len() != fields.len() {
                    return Err(err(format!("'{}' needs {} fields", param.name, fields.len())));
                }
                let values = fields
                    .iter()
                    .zip(items)
                    .map(|(ty, item)| scalar(*ty, item))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(err)?;
                ArgValue::Aggregate(values)
            }
        };
        out.push(arg);
    }
    Ok(out)
}
