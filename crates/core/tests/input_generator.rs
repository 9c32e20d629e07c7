use equiv_core::config::GeneratorConfig;
use equiv_core::inputs::{generate, ArgValue, InputError, InputGenerator, Provenance, ScalarValue};
use equiv_core::model::{
    parse_value_type, Category, ExplicitValue, FunctionSignature, IntWidth, ParamDecl, ReferenceCase, ReturnType,
    ScalarType, ValueType,
};

fn int4() -> ScalarType {
    ScalarType::int(IntWidth::W4, true)
}

fn scalar_sig() -> FunctionSignature {
    FunctionSignature::new(
        "mix",
        vec![
            ParamDecl::new("a", ValueType::Scalar(int4())),
            ParamDecl::new("b", ValueType::Scalar(ScalarType::int(IntWidth::W1, false))),
        ],
        ReturnType::Scalar(int4()),
    )
}

fn buffer_sig() -> FunctionSignature {
    FunctionSignature::new(
        "sum",
        vec![
            ParamDecl::new("arr", parse_value_type("int4[n]").unwrap()).nullable(),
            ParamDecl::new("n", ValueType::Scalar(int4())).with_range(0, 6),
        ],
        ReturnType::Scalar(int4()),
    )
}

fn scalar_of(value: &ArgValue) -> ScalarValue {
    value.as_scalar().expect("scalar argument")
}

#[test]
fn same_seed_gives_identical_sets() {
    let a = generate(&buffer_sig(), 42, 40).unwrap();
    let b = generate(&buffer_sig(), 42, 40).unwrap();
    assert_eq!(a, b);

    let c = generate(&buffer_sig(), 43, 40).unwrap();
    assert_ne!(a, c, "a different seed should change the random rows");
    assert_eq!(a[..6], c[..6], "boundary rows do not depend on the seed");
}

#[test]
fn boundary_rows_come_first_in_fixed_order() {
    let sets = generate(&scalar_sig(), 7, 10).unwrap();
    assert_eq!(sets.len(), 10);
    for (i, set) in sets.iter().enumerate() {
        assert_eq!(set.index, i);
    }
    let provenance: Vec<Provenance> = sets.iter().map(|s| s.provenance).collect();
    assert_eq!(&provenance[..5], &[Provenance::Boundary; 5]);
    assert!(provenance[5..].iter().all(|p| *p == Provenance::Random));

    let a: Vec<i128> = sets[..5].iter().map(|s| scalar_of(&s.values[0]).as_i128()).collect();
    assert_eq!(a, vec![0, 1, -1, i32::MIN as i128, i32::MAX as i128]);
    let b: Vec<i128> = sets[..5].iter().map(|s| scalar_of(&s.values[1]).as_i128()).collect();
    assert_eq!(b, vec![0, 1, 255, 0, 255]);
}

#[test]
fn count_below_boundary_rows_truncates() {
    let sets = generate(&scalar_sig(), 0, 2).unwrap();
    assert_eq!(sets.len(), 2);
    assert!(generate(&scalar_sig(), 0, 0).unwrap().is_empty());
}

#[test]
fn nullable_pointer_adds_a_null_row() {
    let sets = generate(&buffer_sig(), 0, 6).unwrap();
    assert_eq!(sets[5].provenance, Provenance::Boundary);
    assert_eq!(sets[5].values[0], ArgValue::Null);
}

#[test]
fn buffer_lengths_match_their_dimension() {
    for set in generate(&buffer_sig(), 99, 200).unwrap() {
        let n = scalar_of(&set.values[1]).as_i128();
        assert!((0..=6).contains(&n), "n={n} escapes its range");
        match &set.values[0] {
            ArgValue::Buffer { elem, bytes } => {
                assert_eq!(*elem, int4());
                assert_eq!(bytes.len() as i128, n * 4);
            }
            ArgValue::Null => {}
            other => panic!("unexpected argument {other:?}"),
        }
    }
}

#[test]
fn ranges_clamp_every_row() {
    let sig = FunctionSignature::new(
        "collatz",
        vec![ParamDecl::new("n", ValueType::Scalar(int4())).with_range(1, 100)],
        ReturnType::Scalar(int4()),
    );
    for set in generate(&sig, 5, 300).unwrap() {
        let n = scalar_of(&set.values[0]).as_i128();
        assert!((1..=100).contains(&n), "n={n}");
    }
}

#[test]
fn strings_never_contain_nul() {
    let sig = FunctionSignature::new(
        "len",
        vec![ParamDecl::new("s", ValueType::CString { mutable: false })],
        ReturnType::Scalar(int4()),
    );
    for set in generate(&sig, 3, 100).unwrap() {
        let ArgValue::CString(bytes) = &set.values[0] else {
            panic!("expected a string");
        };
        assert!(!bytes.contains(&0));
        assert_eq!(set.values[0].pointee_bytes().unwrap().last(), Some(&0));
    }
}

#[test]
fn explicit_rows_follow_boundary_rows() {
    let case = ReferenceCase::new(buffer_sig(), Category::PointerAccess, "src/sum.c")
        .with_explicit(vec![
            ExplicitValue::List(vec![ExplicitValue::Int(1), ExplicitValue::Int(2), ExplicitValue::Int(3)]),
            ExplicitValue::Int(3),
        ])
        .with_explicit(vec![ExplicitValue::Null(()), ExplicitValue::Int(0)]);

    let sets = InputGenerator::default().generate_for_case(&case, 0, 10).unwrap();
    assert_eq!(sets[6].provenance, Provenance::Explicit);
    assert_eq!(sets[7].provenance, Provenance::Explicit);
    assert_eq!(sets[8].provenance, Provenance::Random);

    let ArgValue::Buffer { bytes, .. } = &sets[6].values[0] else {
        panic!("expected a buffer");
    };
    let expected: Vec<u8> = [1i32, 2, 3].iter().flat_map(|v| v.to_ne_bytes()).collect();
    assert_eq!(bytes, &expected);
    assert_eq!(scalar_of(&sets[6].values[1]).as_i128(), 3);
    assert_eq!(sets[7].values[0], ArgValue::Null);
}

#[test]
fn explicit_rows_are_checked_against_the_signature() {
    let short = ReferenceCase::new(buffer_sig(), Category::PointerAccess, "src/sum.c")
        .with_explicit(vec![ExplicitValue::Int(3)]);
    let err = InputGenerator::default().generate_for_case(&short, 0, 10).unwrap_err();
    assert!(matches!(err, InputError::Explicit { row: 0, .. }));

    let wrong_type = ReferenceCase::new(scalar_sig(), Category::Arithmetic, "src/mix.c")
        .with_explicit(vec![ExplicitValue::Text("x".into()), ExplicitValue::Int(1)]);
    assert!(InputGenerator::default().generate_for_case(&wrong_type, 0, 10).is_err());
}

#[test]
fn oversized_buffers_are_rejected() {
    let sig = FunctionSignature::new(
        "big",
        vec![ParamDecl::new("blob", parse_value_type("bytes[64]").unwrap())],
        ReturnType::Void,
    );
    let generator = InputGenerator::new(GeneratorConfig { max_buffer_elems: 16, ..GeneratorConfig::default() });
    let err = generator.generate(&sig, 0, 4).unwrap_err();
    assert_eq!(err, InputError::BufferTooLarge { param: "blob".into(), elems: 64, cap: 16 });
}
