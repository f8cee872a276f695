//! Exit-code behaviour of inspect_vsfs

use std::fs;
use std::process::{Command, Output};

use tempfile::TempDir;
use vsfs_common::{add_file, create_image};

fn inspect(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_inspect_vsfs"))
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn test_lists_entries_of_read_only_image() {
    let tmp = TempDir::new().unwrap();
    let img = tmp.path().join("disk.img");
    create_image(&img, 64, 16).unwrap();
    let src = tmp.path().join("hello.txt");
    fs::write(&src, b"hi").unwrap();
    add_file(&img, &src).unwrap();

    let mut perms = fs::metadata(&img).unwrap().permissions();
    perms.set_readonly(true);
    fs::set_permissions(&img, perms).unwrap();
    let before = fs::read(&img).unwrap();

    let out = inspect(&[img.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("hello.txt"));
    assert!(stdout.contains("(ok)"));
    assert_eq!(fs::read(&img).unwrap(), before);
}

#[test]
fn test_bad_superblock_exits_1() {
    let tmp = TempDir::new().unwrap();
    let img = tmp.path().join("junk.img");
    fs::write(&img, vec![0u8; 8192]).unwrap();
    assert_eq!(inspect(&[img.to_str().unwrap()]).status.code(), Some(1));
}

#[test]
fn test_missing_image_argument_exits_1() {
    assert_eq!(inspect(&[]).status.code(), Some(1));
}
