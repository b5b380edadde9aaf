use super::test_helpers::Workspace;
use anyhow::Result;
use cpp_properties::core::platform::HostPlatform;
use cpp_properties::core::properties::CompilerDefaults;
use cpp_properties::core::providers::ProviderRegistry;
use cpp_properties::core::settings::{CppSettings, DefaultProperty};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use test_case::test_case;

const FRAMEWORKS: [&str; 2] = ["/System/Library/Frameworks", "/Library/Frameworks"];

#[test_case(HostPlatform::Linux, "Mac", true ; "mac config on linux host")]
#[test_case(HostPlatform::Linux, "Custom", false ; "custom config on linux host")]
#[test_case(HostPlatform::Mac, "Custom", true ; "custom config on mac host")]
#[test_case(HostPlatform::Mac, "Win32", false ; "win32 config on mac host")]
fn test_version_2_framework_paths(platform: HostPlatform, name: &str, expect_frameworks: bool) {
    let workspace = Workspace::new();
    workspace.write_properties_json(&json!({
        "configurations": [ { "name": name } ],
        "version": 2
    }));

    let (_store, _events) =
        workspace.open_on(platform, CppSettings::new(), Arc::new(ProviderRegistry::new()));

    let written = workspace.read_properties_json();
    assert_eq!(written["version"], json!(4));
    if expect_frameworks {
        assert_eq!(written["configurations"][0]["macFrameworkPath"], json!(FRAMEWORKS));
    } else {
        assert!(written["configurations"][0].get("macFrameworkPath").is_none());
    }
}

#[test]
fn test_version_3_backfills_from_compiler_defaults() -> Result<()> {
    let workspace = Workspace::new();
    let (mut store, _events) = workspace.open();
    store.set_compiler_defaults(CompilerDefaults {
        compiler_path: Some("/usr/bin/gcc-12".to_string()),
        c_standard: Some("c17".to_string()),
        cpp_standard: Some("c++20".to_string()),
        ..CompilerDefaults::default()
    })?;

    workspace.write_properties_json(&json!({
        "configurations": [
            { "name": "Linux" },
            { "name": "CMake", "compileCommands": "build/compile_commands.json", "cStandard": "c99" }
        ],
        "version": 3
    }));
    store.on_properties_file_created()?;

    let written = workspace.read_properties_json();
    let linux = &written["configurations"][0];
    assert_eq!(linux["intelliSenseMode"], json!("gcc-x64"));
    assert_eq!(linux["compilerPath"], json!("/usr/bin/gcc-12"));
    assert_eq!(linux["cStandard"], json!("c17"));
    assert_eq!(linux["cppStandard"], json!("c++20"));

    let cmake = &written["configurations"][1];
    assert!(cmake.get("compilerPath").is_none());
    assert_eq!(cmake["cStandard"], json!("c99"));
    assert_eq!(cmake["cppStandard"], json!("c++20"));

    Ok(())
}

#[test]
fn test_settings_defaults_suppress_backfill() -> Result<()> {
    let workspace = Workspace::new();
    workspace.write_properties_json(&json!({
        "configurations": [ { "name": "Linux" } ],
        "version": 3
    }));
    let settings = CppSettings::new()
        .with(DefaultProperty::IntelliSenseMode, json!("clang-x64"))
        .with(DefaultProperty::CompilerPath, json!("/opt/llvm/bin/clang"));

    let (store, _events) = workspace.open_with(settings, Arc::new(ProviderRegistry::new()));

    let written = workspace.read_properties_json();
    assert_eq!(written["version"], json!(4));
    assert!(written["configurations"][0].get("intelliSenseMode").is_none());
    assert!(written["configurations"][0].get("compilerPath").is_none());
    assert_eq!(
        store.current_resolved().and_then(|c| c.intelli_sense_mode.clone()),
        Some("clang-x64".to_string())
    );

    Ok(())
}

#[test]
fn test_migrated_file_is_stable_on_reload() -> Result<()> {
    let workspace = Workspace::new();
    workspace.write_properties_json(&json!({
        "configurations": [ { "name": "Mac" } ]
    }));
    let (mut store, _events) = workspace.open();
    let first = workspace.read_properties();

    store.on_properties_file_changed()?;

    assert_eq!(workspace.read_properties(), first);
    Ok(())
}
