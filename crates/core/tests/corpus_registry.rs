use std::fs;
use std::path::PathBuf;

use equiv_core::corpus::{load_corpus, pair_cases, self_check_pairs, CorpusError, CorpusRegistry};
use equiv_core::model::{
    Category, ExplicitValue, FunctionSignature, IntWidth, ParamDecl, ReferenceCase, ReturnType, ScalarType, ValueType,
};

fn shipped_corpus() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../corpus")
}

fn int_case(name: &str) -> ReferenceCase {
    let int4 = ScalarType::int(IntWidth::W4, true);
    ReferenceCase::new(
        FunctionSignature::new(name, vec![ParamDecl::new("x", ValueType::Scalar(int4))], ReturnType::Scalar(int4)),
        Category::Arithmetic,
        "src/math.c",
    )
}

#[test]
fn registry_rejects_duplicate_names() {
    let mut registry = CorpusRegistry::new();
    registry.register(int_case("negate")).unwrap();
    let err = registry.register(int_case("negate")).unwrap_err();
    assert!(matches!(err, CorpusError::DuplicateName(name) if name == "negate"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn registry_rejects_invalid_signatures() {
    let mut registry = CorpusRegistry::new();
    let mut case = int_case("bad");
    case.signature.params[0].nullable = true;
    let err = registry.register(case).unwrap_err();
    assert!(matches!(err, CorpusError::InvalidSignature { .. }));
    assert!(registry.is_empty());
}

#[test]
fn registry_iterates_in_registration_order() {
    let mut registry = CorpusRegistry::new();
    for name in ["zeta", "alpha", "mid"] {
        registry.register(int_case(name)).unwrap();
    }
    let names: Vec<&str> = registry.all_cases().map(|c| c.name()).collect();
    assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    assert!(registry.get("alpha").is_some());
    assert!(registry.get("missing").is_none());
    assert_eq!(registry.category_counts().get(&Category::Arithmetic), Some(&3));
}

#[test]
fn loads_a_yaml_manifest() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/buf.c"), "int total(const int *a, int n) { return 0; }\n").unwrap();
    fs::write(
        dir.path().join("corpus.yaml"),
        r#"
cases:
  - name: total
    source: src/buf.c
    category: pointer_access
    returns: int4
    tags: [float_sensitive]
    params:
      - { name: a, type: "int4[n]", nullable: true }
      - { name: n, type: int4, range: [0, 4] }
    explicit:
      - [[1, 2], 2]
      - [null, 0]
"#,
    )
    .unwrap();

    let registry = load_corpus(dir.path()).expect("load manifest");
    let case = registry.get("total").expect("case registered");
    assert_eq!(case.category, Category::PointerAccess);
    assert!(case.is_float_sensitive());
    assert!(case.signature.params[0].nullable);
    assert_eq!(case.signature.params[1].range.map(|r| (r.min, r.max)), Some((0, 4)));
    assert_eq!(case.explicit.len(), 2);
    assert_eq!(case.explicit[1][0], ExplicitValue::Null(()));
}

#[test]
fn loads_a_json_manifest_with_void_default() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("noop.c"), "void noop(void) {}\n").unwrap();
    fs::write(
        dir.path().join("corpus.json"),
        r#"{ "cases": [ { "name": "noop", "source": "noop.c", "category": "control_flow" } ] }"#,
    )
    .unwrap();

    let registry = load_corpus(dir.path()).unwrap();
    assert_eq!(registry.get("noop").unwrap().signature.ret, ReturnType::Void);
}

#[test]
fn manifest_errors_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(load_corpus(dir.path()), Err(CorpusError::MissingManifest(_))));

    fs::write(
        dir.path().join("corpus.yaml"),
        "cases:\n  - { name: f, source: missing.c, category: arithmetic, returns: int4 }\n",
    )
    .unwrap();
    assert!(matches!(load_corpus(dir.path()), Err(CorpusError::MissingSource { .. })));

    fs::write(dir.path().join("f.c"), "int f(void) { return 0; }\n").unwrap();
    fs::write(
        dir.path().join("corpus.yaml"),
        "cases:\n  - name: f\n    source: f.c\n    category: arithmetic\n    params:\n      - { name: x, type: int }\n",
    )
    .unwrap();
    assert!(matches!(load_corpus(dir.path()), Err(CorpusError::InvalidType { .. })));

    fs::write(dir.path().join("corpus.yaml"), "cases:\n  - { name: f, source: f.c, category: sorcery }\n").unwrap();
    assert!(matches!(load_corpus(dir.path()), Err(CorpusError::Manifest { .. })));
}

#[test]
fn pairing_mirrors_source_paths() {
    let mut registry = CorpusRegistry::new();
    registry.register(int_case("negate")).unwrap();

    let corpus = tempfile::tempdir().unwrap();
    let decompiled = tempfile::tempdir().unwrap();

    let err = pair_cases(&registry, corpus.path(), decompiled.path()).unwrap_err();
    assert!(matches!(err, CorpusError::MissingDecompiled { ref case, .. } if case == "negate"));

    fs::create_dir_all(decompiled.path().join("src")).unwrap();
    fs::write(decompiled.path().join("src/math.c"), "int negate(int x) { return -x; }\n").unwrap();
    let pairs = pair_cases(&registry, corpus.path(), decompiled.path()).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].original, corpus.path().join("src/math.c"));
    assert_eq!(pairs[0].decompiled, decompiled.path().join("src/math.c"));

    let self_pairs = self_check_pairs(&registry, corpus.path());
    assert_eq!(self_pairs[0].original, self_pairs[0].decompiled);
}

#[test]
fn shipped_corpus_covers_every_category() {
    let registry = load_corpus(&shipped_corpus()).expect("shipped corpus loads");
    let counts = registry.category_counts();
    for category in Category::ALL {
        assert!(counts.get(&category).copied().unwrap_or(0) > 0, "no case for {category}");
    }
    for name in ["max3", "gcd", "is_power_of_two", "tagged_bump", "str_duplicate", "fast_inv_sqrt"] {
        assert!(registry.get(name).is_some(), "missing {name}");
    }
}

#[test]
fn shipped_corpus_covers_structure_families() {
    let corpus = shipped_corpus();
    let registry = load_corpus(&corpus).expect("shipped corpus loads");
    let families = [
        ("union", ["word_mix", "word_set_byte"]),
        ("bit-field", ["insn_field_sum", "insn_set_rd"]),
        ("nested array", ["sum_2d", "transpose_3x3"]),
        ("matrix", ["matrix_multiply", "matrix_transpose"]),
        ("linked list", ["list_weighted_sum", "list_pop_all"]),
        ("tree", ["tree_height_of", "tree_sorted_unique"]),
        ("hash table", ["ht_distinct_count", "word_frequency"]),
        ("hashing", ["simple_hash", "fnv1a_32"]),
        ("function pointer", ["sort_ints", "apply_ops"]),
        ("recursion", ["is_even", "factorial"]),
    ];
    for (family, names) in families {
        for name in names {
            assert!(registry.get(name).is_some(), "no {family} case named {name}");
        }
    }

    let aggregate = fs::read_to_string(corpus.join("src/aggregate_access.c")).unwrap();
    assert!(aggregate.contains("typedef union"));
    assert!(aggregate.contains("uint32_t rd : 5;"));
    assert!(aggregate.contains("int m[3][3]"));
    let heap = fs::read_to_string(corpus.join("src/dynamic_memory.c")).unwrap();
    for self_ref in ["struct Node *next;", "struct TreeNode *left;", "struct IntEntry *next;"] {
        assert!(heap.contains(self_ref), "missing {self_ref}");
    }

    let matrix = registry.get("matrix_multiply").unwrap();
    assert_eq!(matrix.signature.params[0].ty.to_string(), "mut uint4[m*p]");
}
