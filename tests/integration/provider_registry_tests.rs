use super::test_helpers::{StubProvider, Workspace};
use anyhow::Result;
use cpp_properties::core::properties::Setting;
use cpp_properties::core::providers::{ApiVersion, ProviderRegistry, Registration};
use cpp_properties::core::settings::CppSettings;
use cpp_properties::RegistrationError;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::thread;

#[test]
fn test_concurrent_registration_keeps_every_identity() {
    let registry = Arc::new(ProviderRegistry::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let id = format!("ext.provider{}", i);
                registry.add(
                    StubProvider::new(&format!("Provider {}", i), Some(&id)).shared(),
                    ApiVersion::V2,
                )
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().expect("registration thread"));
    }
    assert_eq!(registry.len(), 8);
}

#[test]
fn test_legacy_and_explicit_identity_collide() {
    let registry = ProviderRegistry::new();
    assert_eq!(
        registry.register(StubProvider::legacy("tools").shared(), ApiVersion::V0),
        Ok(Registration::Added)
    );

    // An explicit identity equal to a legacy name is a duplicate, not a replacement
    let result = registry.register(
        StubProvider::new("Tools", Some("tools")).shared(),
        ApiVersion::V1,
    );
    assert_eq!(
        result,
        Err(RegistrationError::Duplicate {
            id: "tools".to_string()
        })
    );
    assert_eq!(registry.get("tools").map(|p| p.version()), Some(ApiVersion::V0));
}

#[test]
fn test_legacy_provider_missing_name_is_refused() {
    let registry = ProviderRegistry::new();
    let error = registry
        .register(StubProvider::legacy("").shared(), ApiVersion::V0)
        .expect_err("nameless provider");

    assert_eq!(
        error.to_string(),
        "CustomConfigurationProvider was not registered. The following properties are missing from the implementation: 'name'"
    );
}

#[tokio::test]
async fn test_browse_configuration_requires_v2() {
    let registry = ProviderRegistry::new();
    assert!(registry.add(StubProvider::new("One", Some("ext.one")).shared(), ApiVersion::V1));
    assert!(registry.add(StubProvider::new("Two", Some("ext.two")).shared(), ApiVersion::V2));

    let one = registry.get("ext.one").expect("registered");
    let two = registry.get("ext.two").expect("registered");

    assert!(!one.can_provide_browse_configuration().await);
    assert!(one.provide_browse_configuration().await.browse_path.is_empty());
    assert!(one.can_provide_configuration(Path::new("/src/main.cpp")).await);
    assert!(two.provide_configurations(&[]).await.is_empty());
}

#[test]
fn test_shared_registry_upgrades_every_folder() -> Result<()> {
    let registry = Arc::new(ProviderRegistry::new());
    assert!(registry.add(
        StubProvider::new("CMake Tools", Some("ms-vscode.cmake-tools")).shared(),
        ApiVersion::V2
    ));

    let first = Workspace::new();
    let second = Workspace::new();
    for workspace in [&first, &second] {
        workspace.write_properties_json(&json!({
            "configurations": [ { "name": "Linux", "configurationProvider": "CMake Tools" } ],
            "version": 4
        }));
    }

    let (first_store, _first_events) = first.open_with(CppSettings::new(), Arc::clone(&registry));
    let (second_store, _second_events) = second.open_with(CppSettings::new(), Arc::clone(&registry));

    for store in [&first_store, &second_store] {
        assert_eq!(
            store.document().configurations[0].configuration_provider,
            Setting::Value("ms-vscode.cmake-tools".to_string())
        );
        assert_eq!(
            store.current_resolved().and_then(|c| c.configuration_provider.clone()),
            Some("ms-vscode.cmake-tools".to_string())
        );
    }

    Ok(())
}

#[test]
fn test_provider_registered_later_is_applied_on_reload() -> Result<()> {
    let registry = Arc::new(ProviderRegistry::new());
    let workspace = Workspace::new();
    workspace.write_properties_json(&json!({
        "configurations": [ { "name": "Linux", "configurationProvider": "Foo" } ],
        "version": 4
    }));
    let (mut store, _events) = workspace.open_with(CppSettings::new(), Arc::clone(&registry));
    assert_eq!(
        store.document().configurations[0].configuration_provider,
        Setting::Value("Foo".to_string())
    );

    assert!(registry.add(StubProvider::new("Foo", Some("ext.foo")).shared(), ApiVersion::V1));
    store.on_properties_file_changed()?;

    assert_eq!(
        workspace.read_properties_json()["configurations"][0]["configurationProvider"],
        json!("ext.foo")
    );
    Ok(())
}
