use equiv_core::config::HarnessConfig;
use equiv_core::inputs::ScalarValue;
use equiv_core::model::{ByteRange, Category, FunctionSignature, IntWidth, ReferenceCase, ReturnType, ScalarType};
use equiv_core::services::executor::AggregateSnapshot;
use equiv_core::services::protocol::{PointerTarget, ReturnValue};
use equiv_core::services::{compare, ComparePolicy, Execution, Fault, Verdict};

fn int_ret(value: i128) -> ReturnValue {
    ReturnValue::Scalar(ScalarValue::from_i128(ScalarType::int(IntWidth::W4, true), value))
}

fn f32_ret(value: f32) -> ReturnValue {
    ReturnValue::Scalar(ScalarValue::new(ScalarType::F32, value.to_bits() as u64))
}

fn done(ret: ReturnValue) -> Execution {
    Execution::Completed { ret, snapshots: Vec::new() }
}

fn with_memory(ret: ReturnValue, after: &[u8], ignore: Vec<ByteRange>) -> Execution {
    Execution::Completed {
        ret,
        snapshots: vec![AggregateSnapshot {
            param: 0,
            name: "buf".into(),
            logical_len: 4,
            before: vec![0, 0, 0, 0, 0xA5, 0xA5],
            after: after.to_vec(),
            ignore,
        }],
    }
}

fn exact() -> ComparePolicy {
    ComparePolicy::default()
}

#[test]
fn equal_returns_are_equivalent() {
    let cmp = compare(&done(int_ret(5)), &done(int_ret(5)), &exact());
    assert_eq!(cmp.verdict, Verdict::Equivalent);
    assert!(cmp.detail.is_none());
}

#[test]
fn different_returns_are_value_mismatch() {
    let cmp = compare(&done(int_ret(5)), &done(int_ret(-5)), &exact());
    assert_eq!(cmp.verdict, Verdict::ValueMismatch);
    assert!(cmp.detail.unwrap().contains("returned 5 vs -5"));
}

#[test]
fn memory_difference_is_side_effect_mismatch() {
    let original = with_memory(ReturnValue::Void, &[1, 2, 3, 4, 0xA5, 0xA5], Vec::new());
    let decompiled = with_memory(ReturnValue::Void, &[1, 2, 9, 4, 0xA5, 0xA5], Vec::new());
    let cmp = compare(&original, &decompiled, &exact());
    assert_eq!(cmp.verdict, Verdict::SideEffectMismatch);
    assert!(cmp.detail.unwrap().contains("'buf' byte 2"));
}

#[test]
fn guard_overwrite_is_reported() {
    let original = with_memory(ReturnValue::Void, &[1, 2, 3, 4, 0xA5, 0xA5], Vec::new());
    let decompiled = with_memory(ReturnValue::Void, &[1, 2, 3, 4, 0x00, 0xA5], Vec::new());
    let cmp = compare(&original, &decompiled, &exact());
    assert_eq!(cmp.verdict, Verdict::SideEffectMismatch);
    assert!(cmp.detail.unwrap().contains("guard byte 0"));
}

#[test]
fn ignored_padding_is_not_compared() {
    let padding = vec![ByteRange { offset: 1, len: 2 }];
    let original = with_memory(ReturnValue::Void, &[1, 0x11, 0x22, 4, 0xA5, 0xA5], padding.clone());
    let decompiled = with_memory(ReturnValue::Void, &[1, 0x99, 0x88, 4, 0xA5, 0xA5], padding);
    assert_eq!(compare(&original, &decompiled, &exact()).verdict, Verdict::Equivalent);
}

#[test]
fn side_effect_outranks_value_mismatch() {
    let original = with_memory(int_ret(1), &[1, 2, 3, 4, 0xA5, 0xA5], Vec::new());
    let decompiled = with_memory(int_ret(2), &[0, 2, 3, 4, 0xA5, 0xA5], Vec::new());
    let cmp = compare(&original, &decompiled, &exact());
    assert_eq!(cmp.verdict, Verdict::SideEffectMismatch);
    let detail = cmp.detail.unwrap();
    assert!(detail.contains("byte 0") && detail.contains("returned 1 vs 2"));
}

#[test]
fn faults_are_classified() {
    let segv = Execution::Faulted(Fault::Signal(11));
    let abrt = Execution::Faulted(Fault::Signal(6));
    let timeout = Execution::Faulted(Fault::Timeout);

    assert_eq!(compare(&segv, &segv, &exact()).verdict, Verdict::EquivalentByFault);
    assert_eq!(compare(&timeout, &timeout, &exact()).verdict, Verdict::EquivalentByFault);
    assert_eq!(compare(&segv, &abrt, &exact()).verdict, Verdict::CrashMismatch);
    assert_eq!(compare(&done(int_ret(0)), &segv, &exact()).verdict, Verdict::CrashMismatch);
    assert_eq!(compare(&segv, &timeout, &exact()).verdict, Verdict::CrashMismatch);
    assert_eq!(compare(&done(int_ret(0)), &timeout, &exact()).verdict, Verdict::Timeout);
    assert_eq!(compare(&timeout, &done(int_ret(0)), &exact()).verdict, Verdict::Timeout);
}

#[test]
fn floats_are_bit_exact_by_default() {
    assert_eq!(compare(&done(f32_ret(f32::NAN)), &done(f32_ret(f32::NAN)), &exact()).verdict, Verdict::Equivalent);
    assert_eq!(compare(&done(f32_ret(0.0)), &done(f32_ret(-0.0)), &exact()).verdict, Verdict::ValueMismatch);

    let close = f32::from_bits(1.0f32.to_bits() + 1);
    assert_eq!(compare(&done(f32_ret(1.0)), &done(f32_ret(close)), &exact()).verdict, Verdict::ValueMismatch);

    let loose = ComparePolicy { float_tolerance: 1e-6 };
    assert_eq!(compare(&done(f32_ret(1.0)), &done(f32_ret(close)), &loose).verdict, Verdict::Equivalent);
    assert_eq!(compare(&done(f32_ret(1.0)), &done(f32_ret(1.01)), &loose).verdict, Verdict::ValueMismatch);
}

#[test]
fn policy_follows_float_sensitive_tag() {
    let sig = FunctionSignature::new("f", vec![], ReturnType::Scalar(ScalarType::F32));
    let config = HarnessConfig::default();
    let plain = ReferenceCase::new(sig.clone(), Category::TypeConversion, "f.c");
    let tagged = plain.clone().with_tag("float_sensitive");

    assert_eq!(ComparePolicy::for_case(&plain, &config).float_tolerance, config.float_tolerance);
    assert_eq!(ComparePolicy::for_case(&tagged, &config).float_tolerance, config.float_sensitive_tolerance);
}

#[test]
fn pointer_returns_compare_by_target() {
    let a = ReturnValue::Pointer(PointerTarget::Param { param: 0, offset: 12 });
    let b = ReturnValue::Pointer(PointerTarget::Param { param: 0, offset: 8 });
    assert_eq!(compare(&done(a.clone()), &done(a.clone()), &exact()).verdict, Verdict::Equivalent);
    assert_eq!(compare(&done(a), &done(b), &exact()).verdict, Verdict::ValueMismatch);
}

#[test]
fn severity_order() {
    let order = [
        Verdict::Equivalent,
        Verdict::EquivalentByFault,
        Verdict::ValueMismatch,
        Verdict::SideEffectMismatch,
        Verdict::Timeout,
        Verdict::CompileFailure,
        Verdict::CrashMismatch,
    ];
    for pair in order.windows(2) {
        assert!(pair[0].severity() < pair[1].severity(), "{} should rank below {}", pair[0], pair[1]);
    }
    assert!(Verdict::EquivalentByFault.is_pass());
    assert!(!Verdict::Timeout.is_pass());
    assert_eq!(Verdict::from_label("side_effect_mismatch"), Some(Verdict::SideEffectMismatch));
}
