use super::test_helpers::Workspace;
use anyhow::Result;
use cpp_properties::core::service::PropertiesService;
use cpp_properties::core::watchers::{
    NotifyCompileCommandsWatch, PropertiesEvent, PropertiesWatcher, WatchEvent,
};
use serde_json::json;
use std::fs;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

#[tokio::test]
async fn test_service_picks_up_new_properties_file() -> Result<()> {
    let workspace = Workspace::new();
    let (store, _events) = workspace.open();
    let mut updates = store.subscribe();

    let (sender, receiver) = mpsc::unbounded_channel();
    let watcher = PropertiesWatcher::start(workspace.root(), sender)?;
    let service = PropertiesService::new(store, receiver, Duration::from_millis(50))
        .with_watcher(watcher);

    let (stop, stopped) = oneshot::channel::<()>();
    let handle = tokio::spawn(service.run(async move {
        let _ = stopped.await;
    }));

    workspace.write_properties_json(&json!({
        "configurations": [ { "name": "Linux", "defines": ["FROM_FILE"] } ],
        "version": 4
    }));

    let published = timeout(Duration::from_secs(5), async {
        loop {
            match updates.recv().await {
                Ok(PropertiesEvent::ConfigurationsChanged(configs)) => break configs,
                Ok(_) => continue,
                Err(e) => panic!("notification channel failed: {}", e),
            }
        }
    })
    .await?;
    assert_eq!(published[0].defines, Some(vec!["FROM_FILE".to_string()]));

    let _ = stop.send(());
    let store = handle.await?;
    assert!(store.properties_file().is_some());
    Ok(())
}

#[tokio::test]
async fn test_settings_event_reloads_settings_file() -> Result<()> {
    let workspace = Workspace::new();
    let (store, _events) = workspace.open();
    let (sender, receiver) = mpsc::unbounded_channel();
    let mut service = PropertiesService::new(store, receiver, Duration::from_secs(60));

    fs::create_dir_all(workspace.root().join(".vscode"))?;
    fs::write(
        workspace.root().join(".vscode/settings.json"),
        r#"{ "C_Cpp.default.defines": ["FROM_SETTINGS"] }"#,
    )?;
    service.handle_event(WatchEvent::SettingsChanged)?;

    assert_eq!(
        service.store().current_resolved().and_then(|c| c.defines.clone()),
        Some(vec!["FROM_SETTINGS".to_string()])
    );
    drop(sender);
    Ok(())
}

#[tokio::test]
async fn test_invalid_settings_keep_previous_values() -> Result<()> {
    let workspace = Workspace::new();
    let (store, _events) = workspace.open();
    let (_sender, receiver) = mpsc::unbounded_channel();
    let mut service = PropertiesService::new(store, receiver, Duration::from_secs(60));

    fs::create_dir_all(workspace.root().join(".vscode"))?;
    fs::write(workspace.root().join(".vscode/settings.json"), "{ not json")?;

    assert!(service.handle_event(WatchEvent::SettingsChanged).is_err());
    assert_eq!(
        service.store().current_resolved().and_then(|c| c.defines.clone()),
        None
    );
    Ok(())
}

#[tokio::test]
async fn test_compile_commands_watch_follows_configuration() -> Result<()> {
    let workspace = Workspace::new();
    fs::create_dir_all(workspace.root().join("build"))?;
    let database = workspace.root().join("build/compile_commands.json");
    fs::write(&database, "[]")?;

    let (sender, _receiver) = mpsc::unbounded_channel();
    let (store, _events) = workspace.open();
    let mut store = store.with_compile_commands_watch(Box::new(NotifyCompileCommandsWatch::new(sender)));
    assert!(store.compile_commands_files().is_empty());

    store.set_compile_commands("build/compile_commands.json")?;
    assert!(store.compile_commands_files().contains(&database));

    store.set_compile_commands("missing/compile_commands.json")?;
    assert!(store.compile_commands_files().is_empty());
    Ok(())
}
