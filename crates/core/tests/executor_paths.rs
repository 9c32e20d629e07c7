use std::path::Path;

use equiv_core::services::executor::mask_workdir;
use tempfile::tempdir;

#[test]
fn mask_workdir_replaces_every_occurrence() {
    let workdir = Path::new("/tmp/decomp-equiv-Ab12Cd");
    let stderr = "/usr/bin/ld: /tmp/decomp-equiv-Ab12Cd/eq_driver.o: in function `main':\n\
                  eq_driver.c:(.text+0x1f): undefined reference to `add_one'\n\
                  see /tmp/decomp-equiv-Ab12Cd/decompiled.o";
    let masked = mask_workdir(stderr, workdir);
    assert_eq!(
        masked,
        "/usr/bin/ld: <workdir>/eq_driver.o: in function `main':\n\
         eq_driver.c:(.text+0x1f): undefined reference to `add_one'\n\
         see <workdir>/decompiled.o"
    );
}

#[test]
fn mask_workdir_handles_canonical_spelling() {
    let temp = tempdir().expect("tempdir");
    let canonical = temp.path().canonicalize().expect("canonicalize");
    let text = format!("{}/a.o and {}/b.o", canonical.display(), temp.path().display());
    assert_eq!(mask_workdir(&text, temp.path()), "<workdir>/a.o and <workdir>/b.o");
}

#[test]
fn mask_workdir_leaves_unrelated_text_alone() {
    let text = "math.c:3:22: error: expected expression";
    assert_eq!(mask_workdir(text, Path::new("/tmp/decomp-equiv-zz")), text);
}
