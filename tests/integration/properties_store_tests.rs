use super::test_helpers::{configurations_changed, drain, messages, StubProvider, Workspace};
use anyhow::Result;
use cpp_properties::core::errors::PropertiesError;
use cpp_properties::core::properties::{CompilerDefaults, Setting};
use cpp_properties::core::providers::{ApiVersion, ProviderRegistry};
use cpp_properties::core::settings::{CppSettings, DefaultProperty};
use cpp_properties::core::watchers::{MessageLevel, PropertiesEvent};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use std::fs;
use std::sync::Arc;

fn two_configs() -> serde_json::Value {
    json!({
        "configurations": [
            { "name": "Custom", "includePath": ["/custom/include"] },
            { "name": "Linux", "includePath": ["${workspaceFolder}/**"] }
        ],
        "version": 4
    })
}

#[test]
fn test_existing_file_is_loaded_and_published() -> Result<()> {
    let workspace = Workspace::new();
    workspace.write_properties_json(&two_configs());

    let (store, mut events) = workspace.open();

    assert!(store.is_complete());
    assert_eq!(store.current_index(), 0);
    assert_eq!(store.current_configuration().map(|c| c.name.as_str()), Some("Custom"));
    assert_eq!(store.resolved().len(), 2);
    assert_eq!(
        store.resolved()[0].include_path,
        Some(vec!["/custom/include".to_string()])
    );
    assert_eq!(configurations_changed(&drain(&mut events)), 1);

    Ok(())
}

#[test]
fn test_structural_error_keeps_previous_document() -> Result<()> {
    let workspace = Workspace::new();
    workspace.write_properties_json(&two_configs());
    let (mut store, mut events) = workspace.open();
    drain(&mut events);

    workspace.write_properties(r#"{ "configurations": [] }"#);
    let result = store.on_properties_file_changed();

    assert!(matches!(result, Err(PropertiesError::Structural { .. })));
    assert_eq!(store.document().configurations.len(), 2);
    assert_eq!(store.document().configurations[0].name, "Custom");

    let errors = messages(&drain(&mut events), MessageLevel::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0]
        .text
        .contains("There must be at least one configuration present in the array."));

    Ok(())
}

#[test]
fn test_syntax_error_is_returned() -> Result<()> {
    let workspace = Workspace::new();
    workspace.write_properties_json(&two_configs());
    let (mut store, _events) = workspace.open();

    workspace.write_properties(r#"{ "configurations": [ { "name": "#);
    let result = store.on_properties_file_changed();

    assert!(matches!(result, Err(PropertiesError::Syntax { .. })));
    assert_eq!(store.document().configurations.len(), 2);

    Ok(())
}

#[test]
fn test_comments_and_trailing_commas_are_accepted() -> Result<()> {
    let workspace = Workspace::new();
    workspace.write_properties(
        r#"{
            // hand-edited
            "configurations": [
                { "name": "Linux", "defines": ["FOO=1",], },
            ],
            "version": 4,
        }"#,
    );

    let (store, _events) = workspace.open();

    assert_eq!(
        store.current_resolved().and_then(|c| c.defines.clone()),
        Some(vec!["FOO=1".to_string()])
    );

    Ok(())
}

#[test]
fn test_current_version_file_is_not_rewritten() -> Result<()> {
    let workspace = Workspace::new();
    let compact = r#"{"configurations":[{"name":"Linux","includePath":["/a"]}],"version":4}"#;
    workspace.write_properties(compact);

    let (_store, _events) = workspace.open();

    assert_eq!(workspace.read_properties(), compact);
    Ok(())
}

#[test]
fn test_versionless_file_is_migrated_and_written() -> Result<()> {
    let workspace = Workspace::new();
    workspace.write_properties_json(&json!({
        "configurations": [ { "name": "Linux", "includePath": ["/a"] } ]
    }));

    let (store, _events) = workspace.open();

    assert_eq!(store.document().version, Some(4));
    let written = workspace.read_properties_json();
    assert_eq!(written["version"], json!(4));
    assert_eq!(written["configurations"][0]["intelliSenseMode"], json!("gcc-x64"));
    assert_eq!(written["configurations"][0]["includePath"], json!(["/a"]));

    Ok(())
}

#[test]
fn test_unknown_version_warns_and_coerces() -> Result<()> {
    let workspace = Workspace::new();
    workspace.write_properties_json(&json!({
        "configurations": [ { "name": "Linux" } ],
        "version": 99
    }));

    let (store, mut events) = workspace.open();

    assert_eq!(store.document().version, Some(4));
    let warnings = messages(&drain(&mut events), MessageLevel::Warning);
    assert!(warnings
        .iter()
        .any(|m| m.text.starts_with("Unknown version number found in c_cpp_properties.json")));
    assert_eq!(workspace.read_properties_json()["version"], json!(4));

    Ok(())
}

#[test]
fn test_unknown_fields_survive_rewrite() -> Result<()> {
    let workspace = Workspace::new();
    workspace.write_properties_json(&json!({
        "configurations": [ { "name": "Linux", "customSetting": { "keep": true } } ],
        "enableConfigurationSquiggles": false
    }));

    let (_store, _events) = workspace.open();

    let written = workspace.read_properties_json();
    assert_eq!(written["configurations"][0]["customSetting"], json!({ "keep": true }));
    assert_eq!(written["enableConfigurationSquiggles"], json!(false));

    Ok(())
}

#[test]
fn test_null_setting_round_trips_as_default_token() -> Result<()> {
    let workspace = Workspace::new();
    workspace.write_properties_json(&json!({
        "configurations": [ { "name": "Linux", "compilerPath": null, "intelliSenseMode": "clang-x64" } ]
    }));
    let settings = CppSettings::new().with(DefaultProperty::CompilerPath, json!("/opt/clang/bin/clang"));

    let (store, _events) = workspace.open_with(settings, Arc::new(ProviderRegistry::new()));

    assert_eq!(store.document().configurations[0].compiler_path, Setting::UseDefault);
    assert_eq!(
        store.current_resolved().and_then(|c| c.compiler_path.clone()),
        Some("/opt/clang/bin/clang".to_string())
    );
    assert_eq!(
        workspace.read_properties_json()["configurations"][0]["compilerPath"],
        json!("${default}")
    );

    Ok(())
}

#[test]
fn test_reserved_env_keys_are_ignored() -> Result<()> {
    let workspace = Workspace::new();
    workspace.write_properties_json(&json!({
        "env": { "workspaceFolder": "/elsewhere", "myInclude": "/my/include" },
        "configurations": [
            { "name": "Linux", "includePath": ["${workspaceFolder}/inc", "${myInclude}"] }
        ],
        "version": 4
    }));

    let (store, _events) = workspace.open();

    let root = workspace.root().to_string_lossy().into_owned();
    assert_eq!(
        store.current_resolved().and_then(|c| c.include_path.clone()),
        Some(vec![format!("{}/inc", root), "/my/include".to_string()])
    );

    Ok(())
}

#[test]
fn test_add_to_include_path_without_file_creates_it() -> Result<()> {
    let workspace = Workspace::new();
    let (mut store, _events) = workspace.open();
    assert!(store.properties_file().is_none());

    store.add_to_include_path("/new/path")?;

    assert!(workspace.properties_path().is_file());
    let written = workspace.read_properties_json();
    assert_eq!(
        written["configurations"][0]["includePath"],
        json!(["${default}", "/new/path"])
    );
    assert_eq!(
        store.current_resolved().and_then(|c| c.include_path.clone()),
        Some(vec!["/new/path".to_string()])
    );

    Ok(())
}

#[test]
fn test_add_to_include_path_appends() -> Result<()> {
    let workspace = Workspace::new();
    workspace.write_properties_json(&two_configs());
    let (mut store, _events) = workspace.open();
    store.select(0)?;

    store.add_to_include_path("/more")?;

    assert_eq!(
        workspace.read_properties_json()["configurations"][0]["includePath"],
        json!(["/custom/include", "/more"])
    );

    Ok(())
}

#[test]
fn test_edit_fails_when_config_folder_is_a_file() -> Result<()> {
    let workspace = Workspace::new();
    fs::write(workspace.root().join(".vscode"), "not a directory")?;
    let (mut store, _events) = workspace.open();

    let result = store.set_compile_commands("build/compile_commands.json");

    assert!(matches!(result, Err(PropertiesError::Write { .. })));
    assert!(store.properties_file().is_none());

    Ok(())
}

#[test]
fn test_read_only_file_keeps_include_path_edit() -> Result<()> {
    let workspace = Workspace::new();
    workspace.write_properties_json(&json!({
        "configurations": [{ "name": "A", "includePath": ["/a"] }],
        "version": 4
    }));
    let (mut store, mut events) = workspace.open();
    drain(&mut events);

    let path = workspace.properties_path();
    let mut permissions = fs::metadata(&path)?.permissions();
    permissions.set_readonly(true);
    fs::set_permissions(&path, permissions)?;
    if fs::OpenOptions::new().write(true).open(&path).is_ok() {
        // Permissions are not enforced for this user (root)
        return Ok(());
    }

    store.add_to_include_path("/new")?;

    assert_eq!(
        store.current_resolved().and_then(|c| c.include_path.clone()),
        Some(vec!["/a".to_string(), "/new".to_string()])
    );
    assert_eq!(
        workspace.read_properties_json()["configurations"][0]["includePath"],
        json!(["/a"])
    );
    assert_eq!(messages(&drain(&mut events), MessageLevel::Warning).len(), 1);

    Ok(())
}

#[test]
fn test_set_compile_commands_resolves_against_root() -> Result<()> {
    let workspace = Workspace::new();
    fs::create_dir_all(workspace.root().join("build"))?;
    fs::write(workspace.root().join("build/compile_commands.json"), "[]")?;
    let (mut store, _events) = workspace.open();

    store.set_compile_commands("build/compile_commands.json")?;

    assert_eq!(
        workspace.read_properties_json()["configurations"][0]["compileCommands"],
        json!("build/compile_commands.json")
    );
    assert!(store
        .compile_commands_files()
        .contains(&workspace.root().join("build/compile_commands.json")));

    Ok(())
}

#[test]
fn test_select_past_end_opens_file_for_editing() -> Result<()> {
    let workspace = Workspace::new();
    let (mut store, mut events) = workspace.open();
    let count = store.document().configurations.len();

    store.select(count)?;

    assert!(workspace.properties_path().is_file());
    assert!(!drain(&mut events)
        .iter()
        .any(|e| matches!(e, PropertiesEvent::SelectionChanged(_))));

    Ok(())
}

#[test]
fn test_settings_change_without_file_re_resolves() -> Result<()> {
    let workspace = Workspace::new();
    let (mut store, _events) = workspace.open();

    let settings = CppSettings::new().with(DefaultProperty::IncludePath, json!(["/from/settings"]));
    store.on_did_change_settings(settings)?;

    assert_eq!(
        store.current_resolved().and_then(|c| c.include_path.clone()),
        Some(vec!["/from/settings".to_string()])
    );

    Ok(())
}

#[test]
fn test_settings_change_with_complete_file_publishes() -> Result<()> {
    let workspace = Workspace::new();
    workspace.write_properties_json(&json!({
        "configurations": [ { "name": "Linux", "includePath": ["${default}", "/extra"] } ],
        "version": 4
    }));
    let (mut store, mut events) = workspace.open();
    drain(&mut events);

    let settings = CppSettings::new().with(DefaultProperty::IncludePath, json!(["/sys/inc"]));
    store.on_did_change_settings(settings)?;

    let drained = drain(&mut events);
    assert_eq!(configurations_changed(&drained), 1);
    assert_eq!(
        store.current_resolved().and_then(|c| c.include_path.clone()),
        Some(vec!["/sys/inc".to_string(), "/extra".to_string()])
    );

    Ok(())
}

#[test]
fn test_reload_settings_reads_settings_file() -> Result<()> {
    let workspace = Workspace::new();
    let (mut store, _events) = workspace.open();
    fs::create_dir_all(workspace.root().join(".vscode"))?;
    fs::write(
        workspace.root().join(".vscode/settings.json"),
        r#"{
            // editor settings
            "C_Cpp.default.cppStandard": "c++20",
        }"#,
    )?;

    store.reload_settings()?;

    assert_eq!(
        store.current_resolved().and_then(|c| c.cpp_standard.clone()),
        Some("c++20".to_string())
    );

    Ok(())
}

#[test]
fn test_file_deletion_resets_to_platform_default() -> Result<()> {
    let workspace = Workspace::new();
    workspace.write_properties_json(&two_configs());
    let (mut store, _events) = workspace.open();
    store.select(0)?;

    fs::remove_file(workspace.properties_path())?;
    store.on_properties_file_deleted()?;

    assert!(store.properties_file().is_none());
    assert_eq!(store.document().configurations.len(), 1);
    assert_eq!(store.document().configurations[0].name, "Linux");
    assert_eq!(store.current_index(), 0);

    Ok(())
}

#[test]
fn test_poll_detects_creation_and_deletion() -> Result<()> {
    let workspace = Workspace::new();
    let (mut store, _events) = workspace.open();

    workspace.write_properties_json(&two_configs());
    store.check_cpp_properties()?;
    assert!(store.properties_file().is_some());
    assert_eq!(store.document().configurations.len(), 2);

    fs::remove_file(workspace.properties_path())?;
    store.check_cpp_properties()?;
    assert!(store.properties_file().is_none());
    assert_eq!(store.document().configurations.len(), 1);

    Ok(())
}

#[test]
fn test_poll_without_changes_is_quiet() -> Result<()> {
    let workspace = Workspace::new();
    let (mut store, mut events) = workspace.open();
    drain(&mut events);

    store.check_cpp_properties()?;

    assert!(drain(&mut events).is_empty());
    Ok(())
}

#[test]
fn test_provider_setting_without_file_stays_in_memory() -> Result<()> {
    let workspace = Workspace::new();
    let (mut store, _events) = workspace.open();

    store.update_custom_configuration_provider(Some("ms-vscode.cmake-tools"))?;

    assert!(!workspace.properties_path().exists());
    assert_eq!(
        store.current_resolved().and_then(|c| c.configuration_provider.clone()),
        Some("ms-vscode.cmake-tools".to_string())
    );

    store.update_custom_configuration_provider(None)?;
    assert_eq!(
        store.current_resolved().and_then(|c| c.configuration_provider.clone()),
        None
    );

    Ok(())
}

#[test]
fn test_provider_setting_with_file_is_written() -> Result<()> {
    let workspace = Workspace::new();
    workspace.write_properties_json(&two_configs());
    let (mut store, _events) = workspace.open();

    store.update_custom_configuration_provider(Some("ms-vscode.cmake-tools"))?;

    assert_eq!(
        workspace.read_properties_json()["configurations"][0]["configurationProvider"],
        json!("ms-vscode.cmake-tools")
    );

    Ok(())
}

#[test]
fn test_provider_name_is_upgraded_to_extension_id() -> Result<()> {
    let workspace = Workspace::new();
    let registry = Arc::new(ProviderRegistry::new());
    assert!(registry.add(StubProvider::new("Foo", Some("ext.foo")).shared(), ApiVersion::V1));
    workspace.write_properties_json(&json!({
        "configurations": [ { "name": "Linux", "configurationProvider": "Foo" } ],
        "version": 4
    }));

    let (store, _events) = workspace.open_with(CppSettings::new(), registry);

    assert_eq!(
        store.document().configurations[0].configuration_provider,
        Setting::Value("ext.foo".to_string())
    );
    assert_eq!(
        workspace.read_properties_json()["configurations"][0]["configurationProvider"],
        json!("ext.foo")
    );

    Ok(())
}

#[test]
fn test_compiler_defaults_fill_new_file() -> Result<()> {
    let workspace = Workspace::new();
    let (mut store, mut events) = workspace.open();
    store.set_compiler_defaults(CompilerDefaults {
        compiler_path: Some("/usr/bin/clang".to_string()),
        cpp_standard: Some("c++17".to_string()),
        includes: vec!["/usr/local/include".to_string()],
        ..CompilerDefaults::default()
    })?;
    assert!(store.is_complete());
    assert_eq!(configurations_changed(&drain(&mut events)), 1);

    store.handle_configuration_edit_command(false)?;

    let written = workspace.read_properties_json();
    assert_eq!(written["configurations"][0]["compilerPath"], json!("/usr/bin/clang"));
    assert_eq!(
        written["configurations"][0]["includePath"],
        json!(["${workspaceFolder}", "/usr/local/include"])
    );

    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_selected_index_stays_in_range(
        initial in 1usize..5,
        selected in 0usize..5,
        remaining in 1usize..5,
    ) {
        let workspace = Workspace::new();
        let names = |n: usize| -> Vec<serde_json::Value> {
            (0..n).map(|i| json!({ "name": format!("Config{}", i) })).collect()
        };
        workspace.write_properties_json(&json!({ "configurations": names(initial), "version": 4 }));
        let (mut store, _events) = workspace.open();
        prop_assert!(store.current_index() < initial);

        if selected < initial {
            store.select(selected).map_err(|e| TestCaseError::fail(e.to_string()))?;
        }

        workspace.write_properties_json(&json!({ "configurations": names(remaining), "version": 4 }));
        store
            .on_properties_file_changed()
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert!(store.current_index() < remaining);
        prop_assert!(store.current_configuration().is_some());
    }
}
