use equiv_core::inputs::{ArgValue, ArgumentSet, Provenance, ScalarValue};
use equiv_core::model::{parse_value_type, FunctionSignature, IntWidth, ParamDecl, ReturnType, ScalarType, ValueType};
use equiv_core::services::driver::{render_driver, GUARD_BYTE};
use equiv_core::services::protocol::{encode_arguments, parse_output, PointerTarget, ProtocolError, ReturnValue};

fn int4() -> ScalarType {
    ScalarType::int(IntWidth::W4, true)
}

fn set(values: Vec<ArgValue>) -> ArgumentSet {
    ArgumentSet { index: 0, provenance: Provenance::Explicit, values }
}

fn fill_sig() -> FunctionSignature {
    FunctionSignature::new(
        "fill",
        vec![
            ParamDecl::new("buf", parse_value_type("mut uint1[n]").unwrap()),
            ParamDecl::new("n", ValueType::Scalar(int4())),
            ParamDecl::new("s", ValueType::CString { mutable: false }).nullable(),
        ],
        ReturnType::Scalar(int4()),
    )
}

#[test]
fn encodes_scalars_blocks_and_nulls() {
    let byte = ScalarType::int(IntWidth::W1, false);
    let args = set(vec![
        ArgValue::Buffer { elem: byte, bytes: vec![0x01, 0xAB] },
        ArgValue::Scalar(ScalarValue::from_i128(int4(), -1)),
        ArgValue::Null,
    ]);
    let encoded = encode_arguments(&fill_sig(), &args).unwrap();
    assert_eq!(encoded, "1 2 01ab\nffffffff 0\n\n");

    let args = set(vec![
        ArgValue::Buffer { elem: byte, bytes: vec![] },
        ArgValue::Scalar(ScalarValue::from_i128(int4(), 0)),
        ArgValue::CString(b"hi".to_vec()),
    ]);
    assert_eq!(encode_arguments(&fill_sig(), &args).unwrap(), "1 0 \n0 1 3 686900\n\n");
}

#[test]
fn encodes_aggregates_field_by_field() {
    let sig = FunctionSignature::new(
        "dot",
        vec![ParamDecl::new("p", parse_value_type("struct{int4,float4}").unwrap())],
        ReturnType::Scalar(int4()),
    );
    let args = set(vec![ArgValue::Aggregate(vec![
        ScalarValue::from_i128(int4(), 3),
        ScalarValue::new(ScalarType::F32, 1.0f32.to_bits() as u64),
    ])]);
    assert_eq!(encode_arguments(&sig, &args).unwrap(), "3 3f800000 \n");
}

#[test]
fn rejects_mismatched_arguments() {
    let args = set(vec![ArgValue::Null]);
    assert_eq!(encode_arguments(&fill_sig(), &args), Err(ProtocolError::Arity { expected: 3, got: 1 }));

    let args = set(vec![
        ArgValue::CString(b"x".to_vec()),
        ArgValue::Scalar(ScalarValue::from_i128(int4(), 1)),
        ArgValue::Null,
    ]);
    assert_eq!(encode_arguments(&fill_sig(), &args), Err(ProtocolError::TypeMismatch { param: "buf".into() }));
}

#[test]
fn parses_driver_report_and_skips_program_output() {
    let stdout = b"hello from the function\n\n@@EQ RET I fffffffe\n@@EQ MEM 0 4 0102a5a5\n@@EQ END\n";
    let output = parse_output(&fill_sig(), stdout).unwrap();
    assert!(output.completed);
    assert_eq!(output.ret, Some(ReturnValue::Scalar(ScalarValue::from_i128(int4(), -2))));
    assert_eq!(output.memory, vec![(0, vec![0x01, 0x02, GUARD_BYTE, GUARD_BYTE])]);
}

#[test]
fn missing_end_means_incomplete() {
    let output = parse_output(&fill_sig(), b"@@EQ RET I 0\n").unwrap();
    assert!(!output.completed);
    assert!(output.ret.is_some());
}

#[test]
fn protocol_errors() {
    assert_eq!(parse_output(&fill_sig(), b"\n@@EQ BADINPUT\n"), Err(ProtocolError::BadInput));
    assert!(matches!(parse_output(&fill_sig(), b"@@EQ RET V\n"), Err(ProtocolError::Malformed(_))));
    assert!(matches!(parse_output(&fill_sig(), b"@@EQ MEM 0 3 0102\n"), Err(ProtocolError::Malformed(_))));
    assert_eq!(parse_output(&fill_sig(), b"@@EQ MEM 1 4 00000000\n"), Err(ProtocolError::UnexpectedMemory(1)));
    assert!(matches!(
        parse_output(&fill_sig(), b"@@EQ RET I 1\n@@EQ RET I 2\n"),
        Err(ProtocolError::Malformed(_))
    ));
}

#[test]
fn parses_pointer_and_string_returns() {
    let ptr_sig = FunctionSignature::new(
        "find",
        vec![ParamDecl::new("arr", parse_value_type("int4[4]").unwrap())],
        ReturnType::Pointer,
    );
    let parse = |text: &[u8]| parse_output(&ptr_sig, text).unwrap().ret;
    assert_eq!(parse(b"@@EQ RET P NULL\n"), Some(ReturnValue::Pointer(PointerTarget::Null)));
    assert_eq!(parse(b"@@EQ RET P 0 8\n"), Some(ReturnValue::Pointer(PointerTarget::Param { param: 0, offset: 8 })));
    assert_eq!(parse(b"@@EQ RET P FOREIGN\n"), Some(ReturnValue::Pointer(PointerTarget::Foreign)));

    let str_sig = FunctionSignature::new("name", vec![], ReturnType::CString);
    let parse = |text: &[u8]| parse_output(&str_sig, text).unwrap().ret;
    assert_eq!(parse(b"@@EQ RET S 3 616263\n"), Some(ReturnValue::Str(Some(b"abc".to_vec()))));
    assert_eq!(parse(b"@@EQ RET S 0\n"), Some(ReturnValue::Str(Some(Vec::new()))));
    assert_eq!(parse(b"@@EQ RET S NULL\n"), Some(ReturnValue::Str(None)));
}

#[test]
fn driver_source_matches_signature() {
    let source = render_driver(&fill_sig(), 16);
    assert!(source.contains("#define EQ_GUARD 16"));
    assert!(source.contains("#define EQ_GUARD_BYTE 0xA5"));
    assert!(source.contains("extern int32_t fill(uint8_t *, int32_t, char *);"));
    assert!(source.contains("int32_t r = fill(a0, a1, a2);"));
    assert!(source.contains("@@EQ MEM 0 "), "mutable buffer is reported");
    assert!(!source.contains("@@EQ MEM 2 "), "read-only string is not reported");
    assert!(source.contains("@@EQ END"));
}

#[test]
fn driver_declares_aggregate_parameters() {
    let sig = FunctionSignature::new(
        "area",
        vec![ParamDecl::new("r", parse_value_type("struct{int4,int4}").unwrap())],
        ReturnType::Void,
    );
    let source = render_driver(&sig, 8);
    assert!(source.contains("struct eq_agg_0 {\n    int32_t f0;\n    int32_t f1;\n};"));
    assert!(source.contains("extern void area(struct eq_agg_0);"));
    assert!(source.contains("@@EQ RET V"));
}
