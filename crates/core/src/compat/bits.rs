//! Reference semantics for the bit concatenation, extraction and extension macros.
//!
//! Widths are in bytes. Every value is treated as an unsigned bit pattern masked to its width,
//! which is exactly what the generated `CONCAT`/`SUB`/`ZEXT`/`SEXT` macros compute in C.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BitsError {
    #[error("width {0} is outside 1..=8 bytes")]
    InvalidWidth(usize),
    #[error("combined width {0} exceeds 8 bytes")]
    WidthOverflow(usize),
    #[error("offset {offset} out of range for extracting {result_width} bytes from {source_width}")]
    OffsetOutOfRange { source_width: usize, offset: usize, result_width: usize },
    #[error("cannot extend from {from} to {to} bytes")]
    NotWidening { from: usize, to: usize },
}

fn check_width(width: usize) -> Result<(), BitsError> {
    if (1..=8).contains(&width) {
        Ok(())
    } else {
        Err(BitsError::InvalidWidth(width))
    }
}

/// All-ones mask of `width` bytes (`width` of 8 or more saturates).
pub fn mask(width: usize) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        (1u64 << (width * 8)) - 1
    }
}

/// Smallest native integer container (1, 2, 4 or 8 bytes) holding `width` bytes.
pub fn container_width(width: usize) -> usize {
    match width {
        0 | 1 => 1,
        2 => 2,
        3 | 4 => 4,
        _ => 8,
    }
}

/// `CONCATab(high, low)`: `high` occupies the upper `high_width` bytes of the result.
pub fn concat(high: u64, high_width: usize, low: u64, low_width: usize) -> Result<u64, BitsError> {
    check_width(high_width)?;
    check_width(low_width)?;
    let total = high_width + low_width;
    if total > 8 {
        return Err(BitsError::WidthOverflow(total));
    }
    Ok(((high & mask(high_width)) << (low_width * 8)) | (low & mask(low_width)))
}

/// `SUBwr(value, offset)`: `result_width` bytes starting `offset` bytes above the low end.
pub fn sub(value: u64, source_width: usize, offset: usize, result_width: usize) -> Result<u64, BitsError> {
    check_width(source_width)?;
    check_width(result_width)?;
    if result_width > source_width || offset > source_width - result_width {
        return Err(BitsError::OffsetOutOfRange { source_width, offset, result_width });
    }
    Ok(((value & mask(source_width)) >> (offset * 8)) & mask(result_width))
}

/// `ZEXTft(value)`: keep the low `from_width` bytes, zero the rest.
pub fn zext(value: u64, from_width: usize) -> Result<u64, BitsError> {
    check_width(from_width)?;
    Ok(value & mask(from_width))
}

/// `SEXTft(value)`: replicate bit `8*from_width - 1` upward, masked to `to_width` bytes.
pub fn sext(value: u64, from_width: usize, to_width: usize) -> Result<u64, BitsError> {
    check_width(from_width)?;
    check_width(to_width)?;
    if from_width > to_width {
        return Err(BitsError::NotWidening { from: from_width, to: to_width });
    }
    let shift = 64 - (from_width as u32 * 8);
    let extended = (((value << shift) as i64) >> shift) as u64;
    Ok(extended & mask(to_width))
}
