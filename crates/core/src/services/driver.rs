//! Generated C entry point linked against each variant.
//!
//! The driver reads one argument set from stdin (see [`super::protocol`]), places every pointer
//! argument in a heap block followed by a guard redzone, calls the function under test once and
//! reports the outcome as `@@EQ` lines on stdout.

use std::fmt::Write as _;

use crate::model::{FunctionSignature, IntWidth, ReturnType, ScalarType, ValueType};

/// Byte the guard redzone is filled with.
pub const GUARD_BYTE: u8 = 0xA5;

/// Exit code of a driver that could not parse its input.
pub const BAD_INPUT_EXIT: i32 = 125;

pub const DRIVER_FILE_NAME: &str = "eq_driver.c";

const PRELUDE: &str = r#"#include <stdint.h>
#include <stdio.h>
#include <stdlib.h>
#include <string.h>

static void eq_bad_input(void)
{
    printf("\n@@EQ BADINPUT\n");
    fflush(stdout);
    exit(EQ_BAD_INPUT_EXIT);
}

static unsigned long long eq_read_word(void)
{
    unsigned long long v;
    if (scanf("%llx", &v) != 1)
        eq_bad_input();
    return v;
}

static unsigned char *eq_read_block(size_t *len_out)
{
    unsigned long long present = eq_read_word();
    size_t len, i;
    unsigned char *buf;
    *len_out = 0;
    if (!present)
        return NULL;
    len = (size_t)eq_read_word();
    buf = (unsigned char *)malloc(len + EQ_GUARD + 1);
    if (!buf)
        eq_bad_input();
    for (i = 0; i < len; i++) {
        unsigned int b;
        if (scanf("%2x", &b) != 1)
            eq_bad_input();
        buf[i] = (unsigned char)b;
    }
    memset(buf + len, EQ_GUARD_BYTE, EQ_GUARD);
    *len_out = len;
    return buf;
}

static void eq_dump(const unsigned char *p, size_t n)
{
    size_t i;
    for (i = 0; i < n; i++)
        printf("%02x", p[i]);
}
"#;

fn unsigned_c_type(width: IntWidth) -> &'static str {
    ScalarType::int(width, false).c_type()
}

fn param_c_type(ty: &ValueType, index: usize) -> String {
    match ty {
        ValueType::Scalar(s) => s.c_type().to_string(),
        ValueType::Buffer { elem, .. } => format!("{} *", elem.c_type()),
        ValueType::CString { .. } => "char *".to_string(),
        ValueType::Bytes { .. } => "void *".to_string(),
        ValueType::Aggregate { .. } => format!("struct eq_agg_{index}"),
    }
}

fn return_c_type(ret: &ReturnType) -> &'static str {
    match ret {
        ReturnType::Void => "void",
        ReturnType::Scalar(s) => s.c_type(),
        ReturnType::Pointer => "void *",
        ReturnType::CString => "char *",
    }
}

/// Emit statements that read one scalar into a fresh variable `name`.
fn read_scalar(out: &mut String, ty: ScalarType, name: &str) {
    match ty {
        ScalarType::Int { .. } => {
            let _ = writeln!(out, "    {} {name} = ({})eq_read_word();", ty.c_type(), ty.c_type());
        }
        ScalarType::F32 => {
            let _ = writeln!(out, "    float {name};");
            let _ = writeln!(out, "    {{ uint32_t bits = (uint32_t)eq_read_word(); memcpy(&{name}, &bits, 4); }}");
        }
        ScalarType::F64 => {
            let _ = writeln!(out, "    double {name};");
            let _ = writeln!(out, "    {{ uint64_t bits = (uint64_t)eq_read_word(); memcpy(&{name}, &bits, 8); }}");
        }
    }
}

/// Render the driver translation unit for `signature`.
pub fn render_driver(signature: &FunctionSignature, guard_bytes: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "#define EQ_GUARD {guard_bytes}");
    let _ = writeln!(out, "#define EQ_GUARD_BYTE 0x{GUARD_BYTE:02X}");
    let _ = writeln!(out, "#define EQ_BAD_INPUT_EXIT {BAD_INPUT_EXIT}");
    out.push_str(PRELUDE);
    out.push('\n');

    for (i, p) in signature.params.iter().enumerate() {
        if let ValueType::Aggregate { fields } = &p.ty {
            let _ = writeln!(out, "struct eq_agg_{i} {{");
            for (f, field) in fields.iter().enumerate() {
                let _ = writeln!(out, "    {} f{f};", field.c_type());
            }
            out.push_str("};\n");
        }
    }

    let params: Vec<String> = signature.params.iter().enumerate().map(|(i, p)| param_c_type(&p.ty, i)).collect();
    let params = if params.is_empty() { "void".to_string() } else { params.join(", ") };
    let _ = writeln!(out, "extern {} {}({params});\n", return_c_type(&signature.ret), signature.name);

    out.push_str("int main(void)\n{\n");
    for (i, p) in signature.params.iter().enumerate() {
        let _ = writeln!(out, "    /* {} */", p.name);
        match &p.ty {
            ValueType::Scalar(s) => read_scalar(&mut out, *s, &format!("a{i}")),
            ValueType::Aggregate { fields } => {
                let _ = writeln!(out, "    struct eq_agg_{i} a{i};");
                for (f, field) in fields.iter().enumerate() {
                    let tmp = format!("a{i}_f{f}");
                    read_scalar(&mut out, *field, &tmp);
                    let _ = writeln!(out, "    a{i}.f{f} = {tmp};");
                }
            }
            _ => {
                let _ = writeln!(out, "    size_t a{i}_len;");
                let _ = writeln!(out, "    unsigned char *a{i}_raw = eq_read_block(&a{i}_len);");
                let _ = writeln!(out, "    {} a{i} = ({})a{i}_raw;", param_c_type(&p.ty, i), param_c_type(&p.ty, i));
            }
        }
    }

    let args: Vec<String> = (0..signature.params.len()).map(|i| format!("a{i}")).collect();
    let call = format!("{}({})", signature.name, args.join(", "));
    out.push_str("    fflush(stdout);\n");

    match &signature.ret {
        ReturnType::Void => {
            let _ = writeln!(out, "    {call};");
            out.push_str("    printf(\"\\n@@EQ RET V\\n\");\n");
        }
        ReturnType::Scalar(s @ ScalarType::Int { width, .. }) => {
            let _ = writeln!(out, "    {} r = {call};", s.c_type());
            let _ = writeln!(
                out,
                "    printf(\"\\n@@EQ RET I %llx\\n\", (unsigned long long)({})r);",
                unsigned_c_type(*width)
            );
        }
        ReturnType::Scalar(ScalarType::F32) => {
            let _ = writeln!(out, "    float r = {call};");
            out.push_str("    { uint32_t bits; memcpy(&bits, &r, 4); printf(\"\\n@@EQ RET F %llx\\n\", (unsigned long long)bits); }\n");
        }
        ReturnType::Scalar(ScalarType::F64) => {
            let _ = writeln!(out, "    double r = {call};");
            out.push_str("    { uint64_t bits; memcpy(&bits, &r, 8); printf(\"\\n@@EQ RET F %llx\\n\", (unsigned long long)bits); }\n");
        }
        ReturnType::Pointer => {
            let _ = writeln!(out, "    void *r = {call};");
            out.push_str("    if (r == NULL) {\n        printf(\"\\n@@EQ RET P NULL\\n\");\n    }");
            for (i, p) in signature.params.iter().enumerate() {
                if p.ty.is_pointer() {
                    let _ = write!(
                        out,
                        " else if (a{i}_raw != NULL && (uintptr_t)r >= (uintptr_t)a{i}_raw && \
                         (uintptr_t)r <= (uintptr_t)a{i}_raw + a{i}_len + EQ_GUARD) {{\n        \
                         printf(\"\\n@@EQ RET P %d %llu\\n\", {i}, (unsigned long long)((uintptr_t)r - (uintptr_t)a{i}_raw));\n    }}"
                    );
                }
            }
            out.push_str(" else {\n        printf(\"\\n@@EQ RET P FOREIGN\\n\");\n    }\n");
        }
        ReturnType::CString => {
            let _ = writeln!(out, "    char *r = {call};");
            out.push_str(
                "    if (r == NULL) {\n        printf(\"\\n@@EQ RET S NULL\\n\");\n    } else {\n        \
                 size_t n = strlen(r);\n        printf(\"\\n@@EQ RET S %llu \", (unsigned long long)n);\n        \
                 eq_dump((const unsigned char *)r, n);\n        printf(\"\\n\");\n    }\n",
            );
        }
    }

    for (i, p) in signature.params.iter().enumerate() {
        if p.ty.is_pointer() && p.ty.is_mutable() {
            let _ = writeln!(out, "    if (a{i}_raw != NULL) {{");
            let _ = writeln!(out, "        printf(\"@@EQ MEM {i} %llu \", (unsigned long long)(a{i}_len + EQ_GUARD));");
            let _ = writeln!(out, "        eq_dump(a{i}_raw, a{i}_len + EQ_GUARD);");
            out.push_str("        printf(\"\\n\");\n    }\n");
        }
    }

    out.push_str("    printf(\"@@EQ END\\n\");\n    fflush(stdout);\n    return 0;\n}\n");
    out
}
