//! Generator for `recomp.h`, the header prepended to every decompiled translation unit.
//!
//! The header is fully self-contained: it includes nothing, so it can be force-included ahead of
//! arbitrary decompiler output without clashing with whatever that output includes itself.

use std::fmt::Write as _;

use super::bits::{container_width, mask};
use super::CompatType;

pub const HEADER_FILE_NAME: &str = "recomp.h";

/// A libc function as named in decompiled output, aliased to the real symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibcEntry {
    pub decompiled_name: &'static str,
    pub symbol: &'static str,
    pub ret: &'static str,
    pub params: &'static str,
}

const fn entry(decompiled_name: &'static str, symbol: &'static str, ret: &'static str, params: &'static str) -> LibcEntry {
    LibcEntry { decompiled_name, symbol, ret, params }
}

/// Portable roster. `__assert_rtn` and `___maskrune` are handled per platform in the header.
pub const LIBC_ROSTER: &[LibcEntry] = &[
    entry("_printf", "printf", "int", "const char *, ..."),
    entry("_fprintf", "fprintf", "int", "void *, const char *, ..."),
    entry("_sprintf", "sprintf", "int", "char *, const char *, ..."),
    entry("_snprintf", "snprintf", "int", "char *, unsigned long, const char *, ..."),
    entry("_puts", "puts", "int", "const char *"),
    entry("_putchar", "putchar", "int", "int"),
    entry("_malloc", "malloc", "void *", "unsigned long"),
    entry("_calloc", "calloc", "void *", "unsigned long, unsigned long"),
    entry("_realloc", "realloc", "void *", "void *, unsigned long"),
    entry("_free", "free", "void", "void *"),
    entry("_strlen", "strlen", "unsigned long", "const char *"),
    entry("_strcpy", "strcpy", "char *", "char *, const char *"),
    entry("_strncpy", "strncpy", "char *", "char *, const char *, unsigned long"),
    entry("_strcat", "strcat", "char *", "char *, const char *"),
    entry("_strcmp", "strcmp", "int", "const char *, const char *"),
    entry("_strncmp", "strncmp", "int", "const char *, const char *, unsigned long"),
    entry("_strchr", "strchr", "char *", "const char *, int"),
    entry("_memcpy", "memcpy", "void *", "void *, const void *, unsigned long"),
    entry("_memset", "memset", "void *", "void *, int, unsigned long"),
    entry("_memcmp", "memcmp", "int", "const void *, const void *, unsigned long"),
    entry("_memmove", "memmove", "void *", "void *, const void *, unsigned long"),
    entry("_exit", "exit", "void", "int"),
    entry("___stack_chk_fail", "__stack_chk_fail", "void", "void"),
    entry("_atoi", "atoi", "int", "const char *"),
    entry("_strtol", "strtol", "long", "const char *, char **, int"),
    entry("_strtoul", "strtoul", "unsigned long", "const char *, char **, int"),
    entry("_strtod", "strtod", "double", "const char *, char **"),
    entry("_abs", "abs", "int", "int"),
    entry("_labs", "labs", "long", "long"),
    entry("_sqrt", "sqrt", "double", "double"),
    entry("_pow", "pow", "double", "double, double"),
    entry("_fabs", "fabs", "double", "double"),
    entry("_floor", "floor", "double", "double"),
    entry("_log", "log", "double", "double"),
    entry("_exp", "exp", "double", "double"),
    entry("_qsort", "qsort", "void", "void *, unsigned long, unsigned long, int (*)(const void *, const void *)"),
    entry(
        "_bsearch",
        "bsearch",
        "void *",
        "const void *, const void *, unsigned long, unsigned long, int (*)(const void *, const void *)",
    ),
    entry("_rand", "rand", "int", "void"),
    entry("_srand", "srand", "void", "unsigned int"),
    entry("_fopen", "fopen", "void *", "const char *, const char *"),
    entry("_fclose", "fclose", "int", "void *"),
    entry("_fread", "fread", "unsigned long", "void *, unsigned long, unsigned long, void *"),
    entry("_fwrite", "fwrite", "unsigned long", "const void *, unsigned long, unsigned long, void *"),
];

fn uint_name(width: usize) -> &'static str {
    match width {
        1 => "uint1",
        2 => "uint2",
        4 => "uint4",
        _ => "uint8",
    }
}

fn hex_mask(width: usize) -> String {
    format!("0x{:X}ULL", mask(width))
}

/// `CONCATab(a, b)`: `a` is `high` bytes wide, `b` is `low` bytes wide.
pub fn concat_macro(high: usize, low: usize) -> String {
    let ty = uint_name(container_width(high + low));
    format!(
        "#define CONCAT{high}{low}(a, b) (({ty})((((({ty})(a)) & {hm}) << {shift}) | ((({ty})(b)) & {lm})))",
        hm = hex_mask(high),
        lm = hex_mask(low),
        shift = low * 8,
    )
}

/// `SUBwr(a, off)`: `r` bytes of the `w`-byte value `a`, starting at byte `off`.
pub fn sub_macro(source: usize, result: usize) -> String {
    let src = uint_name(container_width(source));
    let dst = uint_name(container_width(result));
    format!(
        "#define SUB{source}{result}(a, off) (({dst})((((({src})(a)) & {sm}) >> ((off) * 8)) & {rm}))",
        sm = hex_mask(source),
        rm = hex_mask(result),
    )
}

pub fn zext_macro(from: usize, to: usize) -> String {
    let src = uint_name(container_width(from));
    let dst = uint_name(container_width(to));
    format!("#define ZEXT{from}{to}(a) (({dst})((({src})(a)) & {m}))", m = hex_mask(from))
}

pub fn sext_macro(from: usize, to: usize) -> String {
    let dst = uint_name(container_width(to));
    let shift = 64 - from * 8;
    format!(
        "#define SEXT{from}{to}(a) (({dst})(((int8)(((uint8)(a)) << {shift}) >> {shift}) & {m}))",
        m = hex_mask(to),
    )
}

/// Render the complete compatibility header.
pub fn render_header() -> String {
    let mut out = String::new();
    out.push_str("/* recomp.h: compatibility layer for recompiling decompiler output. */\n");
    out.push_str("#ifndef DECOMP_EQUIV_RECOMP_H\n#define DECOMP_EQUIV_RECOMP_H\n\n");

    out.push_str(
        "#if defined(__clang__)\n\
         #pragma clang diagnostic ignored \"-Weverything\"\n\
         #elif defined(__GNUC__)\n\
         #pragma GCC diagnostic ignored \"-Wall\"\n\
         #pragma GCC diagnostic ignored \"-Wextra\"\n\
         #pragma GCC diagnostic ignored \"-Wimplicit-function-declaration\"\n\
         #pragma GCC diagnostic ignored \"-Wint-conversion\"\n\
         #pragma GCC diagnostic ignored \"-Wincompatible-pointer-types\"\n\
         #pragma GCC diagnostic ignored \"-Wbuiltin-declaration-mismatch\"\n\
         #pragma GCC diagnostic ignored \"-Wreturn-type\"\n\
         #endif\n\n",
    );

    out.push_str("/* Sized and placeholder types. */\n");
    for ty in CompatType::ALL {
        let _ = writeln!(out, "typedef {} {};", ty.c_definition(), ty.name());
    }
    out.push('\n');
    for ty in CompatType::ALL {
        let _ = writeln!(
            out,
            "_Static_assert(sizeof({name}) == {size}, \"{name} must be {size} bytes\");",
            name = ty.name(),
            size = ty.size(),
        );
    }
    out.push_str("\n#ifndef true\n#define true 1\n#endif\n#ifndef false\n#define false 0\n#endif\n");
    out.push_str("#ifndef NULL\n#define NULL ((void *)0)\n#endif\n\n");

    out.push_str("/* Byte concatenation. */\n");
    for high in 1..=7 {
        for low in 1..=(8 - high) {
            let _ = writeln!(out, "{}", concat_macro(high, low));
        }
    }

    out.push_str("\n/* Byte extraction. */\n");
    for source in 2..=8 {
        for result in 1..source {
            let _ = writeln!(out, "{}", sub_macro(source, result));
        }
    }

    out.push_str("\n/* Zero and sign extension. */\n");
    for from in 1..=7 {
        for to in (from + 1)..=8 {
            let _ = writeln!(out, "{}", zext_macro(from, to));
            let _ = writeln!(out, "{}", sext_macro(from, to));
        }
    }
    out.push_str("#ifdef __SIZEOF_INT128__\n#define ZEXT816(a) ((unsigned __int128)(uint8)(a))\n#endif\n\n");

    out.push_str("/* libc under decompiler names, bound to the real symbols. */\n");
    out.push_str("#define EQ_STR2(x) #x\n#define EQ_STR(x) EQ_STR2(x)\n");
    out.push_str("#ifdef __USER_LABEL_PREFIX__\n#define EQ_SYM(name) EQ_STR(__USER_LABEL_PREFIX__) name\n");
    out.push_str("#else\n#define EQ_SYM(name) name\n#endif\n");
    for e in LIBC_ROSTER {
        let _ = writeln!(
            out,
            "{ret} {name}({params}) __asm__(EQ_SYM(\"{sym}\"));",
            ret = e.ret,
            name = e.decompiled_name,
            params = e.params,
            sym = e.symbol,
        );
    }
    out.push_str(
        "\n#if defined(__APPLE__)\n\
         void __assert_rtn(const char *, const char *, int, const char *);\n\
         int ___maskrune(int, unsigned long) __asm__(EQ_SYM(\"__maskrune\"));\n\
         #else\n\
         void abort(void);\n\
         static __attribute__((unused)) void __assert_rtn(const char *fn, const char *file, int line, const char *expr)\n\
         {\n    (void)fn;\n    (void)file;\n    (void)line;\n    (void)expr;\n    abort();\n}\n\
         #endif\n",
    );

    out.push_str("\n#endif /* DECOMP_EQUIV_RECOMP_H */\n");
    out
}
