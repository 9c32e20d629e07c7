//! Classification of an original/decompiled execution pair.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::HarnessConfig;
use crate::inputs::ScalarValue;
use crate::model::{ReferenceCase, ScalarType};
use crate::services::executor::{AggregateSnapshot, Execution, Fault};
use crate::services::protocol::ReturnValue;

/// Outcome of comparing the two variants on one argument set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Equivalent,
    EquivalentByFault,
    ValueMismatch,
    SideEffectMismatch,
    CrashMismatch,
    CompileFailure,
    Timeout,
}

impl Verdict {
    /// Every verdict, in report order.
    pub const ALL: [Verdict; 7] = [
        Verdict::Equivalent,
        Verdict::EquivalentByFault,
        Verdict::ValueMismatch,
        Verdict::SideEffectMismatch,
        Verdict::Timeout,
        Verdict::CompileFailure,
        Verdict::CrashMismatch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Equivalent => "equivalent",
            Verdict::EquivalentByFault => "equivalent_by_fault",
            Verdict::ValueMismatch => "value_mismatch",
            Verdict::SideEffectMismatch => "side_effect_mismatch",
            Verdict::CrashMismatch => "crash_mismatch",
            Verdict::CompileFailure => "compile_failure",
            Verdict::Timeout => "timeout",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == label)
    }

    /// Higher is worse: CrashMismatch > CompileFailure > Timeout > SideEffectMismatch >
    /// ValueMismatch > EquivalentByFault > Equivalent.
    pub fn severity(&self) -> u8 {
        match self {
            Verdict::Equivalent => 0,
            Verdict::EquivalentByFault => 1,
            Verdict::ValueMismatch => 2,
            Verdict::SideEffectMismatch => 3,
            Verdict::Timeout => 4,
            Verdict::CompileFailure => 5,
            Verdict::CrashMismatch => 6,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Equivalent | Verdict::EquivalentByFault)
    }

    pub fn worst(self, other: Verdict) -> Verdict {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison knobs resolved for one case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparePolicy {
    /// Relative tolerance for float returns; 0 means bit-exact.
    pub float_tolerance: f64,
}

impl Default for ComparePolicy {
    fn default() -> Self {
        Self { float_tolerance: 0.0 }
    }
}

impl ComparePolicy {
    pub fn for_case(case: &ReferenceCase, config: &HarnessConfig) -> Self {
        let float_tolerance =
            if case.is_float_sensitive() { config.float_sensitive_tolerance } else { config.float_tolerance };
        Self { float_tolerance }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub verdict: Verdict,
    pub detail: Option<String>,
}

impl Comparison {
    fn new(verdict: Verdict, detail: impl Into<String>) -> Self {
        Self { verdict, detail: Some(detail.into()) }
    }

    fn equivalent() -> Self {
        Self { verdict: Verdict::Equivalent, detail: None }
    }
}

fn float_value(v: &ScalarValue) -> f64 {
    match v.ty {
        ScalarType::F32 => f32::from_bits(v.bits as u32) as f64,
        _ => f64::from_bits(v.bits),
    }
}

/// Float equality: NaN matches NaN; otherwise bit-exact at tolerance 0, relative above it.
fn floats_match(a: &ScalarValue, b: &ScalarValue, tolerance: f64) -> bool {
    let (x, y) = (float_value(a), float_value(b));
    if x.is_nan() || y.is_nan() {
        return x.is_nan() && y.is_nan();
    }
    if tolerance == 0.0 {
        return a.bits == b.bits;
    }
    if x == y {
        return true;
    }
    let scale = x.abs().max(y.abs());
    (x - y).abs() <= tolerance * scale
}

fn returns_match(original: &ReturnValue, decompiled: &ReturnValue, policy: &ComparePolicy) -> bool {
    match (original, decompiled) {
        (ReturnValue::Scalar(a), ReturnValue::Scalar(b)) if a.ty.is_float() && a.ty == b.ty => {
            floats_match(a, b, policy.float_tolerance)
        }
        (a, b) => a == b,
    }
}

fn first_snapshot_difference(original: &[AggregateSnapshot], decompiled: &[AggregateSnapshot]) -> Option<String> {
    for (a, b) in original.iter().zip(decompiled) {
        let len = a.after.len().max(b.after.len());
        for i in 0..len {
            if !a.is_observed(i) {
                continue;
            }
            let (x, y) = (a.after.get(i), b.after.get(i));
            if x != y {
                let region = if i < a.logical_len {
                    format!("byte {i}")
                } else {
                    format!("guard byte {}", i - a.logical_len)
                };
                let show = |v: Option<&u8>| v.map(|b| format!("{b:02x}")).unwrap_or_else(|| "--".into());
                return Some(format!(
                    "'{}' {region}: original {} vs decompiled {}",
                    a.name,
                    show(x),
                    show(y)
                ));
            }
        }
    }
    if original.len() != decompiled.len() {
        return Some(format!("{} vs {} memory snapshots", original.len(), decompiled.len()));
    }
    None
}

/// Classify a pair of executions of the same argument set.
pub fn compare(original: &Execution, decompiled: &Execution, policy: &ComparePolicy) -> Comparison {
    match (original, decompiled) {
        (Execution::Faulted(a), Execution::Faulted(b)) => {
            if a == b {
                Comparison::new(Verdict::EquivalentByFault, format!("both {a}"))
            } else {
                Comparison::new(Verdict::CrashMismatch, format!("original {a}, decompiled {b}"))
            }
        }
        (Execution::Faulted(Fault::Timeout), Execution::Completed { .. }) => {
            Comparison::new(Verdict::Timeout, "original timed out, decompiled completed")
        }
        (Execution::Completed { .. }, Execution::Faulted(Fault::Timeout)) => {
            Comparison::new(Verdict::Timeout, "decompiled timed out, original completed")
        }
        (Execution::Faulted(a), Execution::Completed { .. }) => {
            Comparison::new(Verdict::CrashMismatch, format!("original {a}, decompiled completed"))
        }
        (Execution::Completed { .. }, Execution::Faulted(b)) => {
            Comparison::new(Verdict::CrashMismatch, format!("decompiled {b}, original completed"))
        }
        (
            Execution::Completed { ret: ret_a, snapshots: snaps_a },
            Execution::Completed { ret: ret_b, snapshots: snaps_b },
        ) => {
            let mut verdict = Verdict::Equivalent;
            let mut details = Vec::new();
            if let Some(diff) = first_snapshot_difference(snaps_a, snaps_b) {
                verdict = verdict.worst(Verdict::SideEffectMismatch);
                details.push(diff);
            }
            if !returns_match(ret_a, ret_b, policy) {
                verdict = verdict.worst(Verdict::ValueMismatch);
                details.push(format!("returned {ret_a} vs {ret_b}"));
            }
            if details.is_empty() {
                Comparison::equivalent()
            } else {
                Comparison::new(verdict, details.join("; "))
            }
        }
    }
}
