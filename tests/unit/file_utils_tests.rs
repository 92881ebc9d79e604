/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use std::fs;
use std::path::Path;
use ldom_render::file_utils::FileManager;
use crate::common;

/// Test that file_exists returns true for existing files
#[test]
fn test_fileExists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "vespers.html", "<p>Amen</p>")?;

    assert!(FileManager::file_exists(&test_file));
    assert!(!FileManager::dir_exists(&test_file));
    Ok(())
}

/// Test that file_exists returns false for non-existent files
#[test]
fn test_fileExists_withNonExistentFile_shouldReturnFalse() {
    assert!(!FileManager::file_exists("non_existent_file.tmp"));
}

/// Test that generate_output_path swaps the extension
#[test]
fn test_generateOutputPath_withValidInputs_shouldCreateCorrectPath() {
    let output_path = FileManager::generate_output_path("/tmp/input/matins.json", "/tmp/output", ".tex");
    assert_eq!(output_path, Path::new("/tmp/output/matins.tex"));
}

/// Test recursive file discovery
#[test]
fn test_findFiles_withNestedDirectories_shouldFindAll() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "a.html", "")?;
    common::create_test_file(temp_dir.path(), "sub/b.html", "")?;
    common::create_test_file(temp_dir.path(), "sub/c.json", "")?;

    let files = FileManager::find_files(temp_dir.path(), "html")?;
    assert_eq!(files.len(), 2);
    Ok(())
}

/// Test that write_to_file creates parent directories
#[test]
fn test_writeToFile_withMissingParent_shouldCreateIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("out").join("deep").join("x.tex");
    FileManager::write_to_file(&path, "content")?;
    assert_eq!(fs::read_to_string(&path)?, "content");
    assert_eq!(FileManager::read_to_string(&path)?, "content");
    Ok(())
}

/// Test that reading a missing file reports the path
#[test]
fn test_readToString_withMissingFile_shouldMentionPath() {
    let err = FileManager::read_to_string("missing-vespers.html").unwrap_err();
    assert!(err.to_string().contains("missing-vespers.html"));
}
