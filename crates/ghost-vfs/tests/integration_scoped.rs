//! Integration tests for the scoped filesystem over the disk driver.
//!
//! Exercises the full stack a feature service sees: registry, scoped
//! façade, content cache, disk driver and the ghost-ignore file.

use ghost_core::{Error, GhostConfig, ScopeId, SizeLimits};
use ghost_storage::DiskDriver;
use ghost_vfs::{DirectoryListingOptions, GhostRegistry, TextSubstitution, UpsertOptions};
use serde::Deserialize;
use std::sync::Arc;
use tempfile::TempDir;

async fn registry_at(temp: &TempDir) -> GhostRegistry {
    let driver = Arc::new(DiskDriver::new(temp.path()).await.unwrap());
    GhostRegistry::new(driver, GhostConfig::default())
}

#[tokio::test]
async fn test_write_then_read_same_process() {
    let temp = TempDir::new().unwrap();
    let registry = registry_at(&temp).await;
    let ghost = registry.for_scope(&ScopeId::bot("bot-7").unwrap()).unwrap();

    ghost
        .upsert_file("flows", "main.flow.json", b"{\"nodes\":[]}", &UpsertOptions::default())
        .await
        .unwrap();

    // Immediately observable, no intervening operations.
    let content = ghost.read_file_as_buffer("flows", "main.flow.json").await.unwrap();
    assert_eq!(content.as_slice(), b"{\"nodes\":[]}");

    let text = ghost.read_file_as_string("flows", "main.flow.json").await.unwrap();
    assert_eq!(text, "{\"nodes\":[]}");
}

#[tokio::test]
async fn test_overwrite_is_observed_immediately() {
    let temp = TempDir::new().unwrap();
    let registry = registry_at(&temp).await;
    let ghost = registry.global().unwrap();

    ghost
        .upsert_file("config", "ui.config.json", b"v1", &UpsertOptions::default())
        .await
        .unwrap();
    ghost
        .upsert_file("config", "ui.config.json", b"v2", &UpsertOptions::default())
        .await
        .unwrap();

    let content = ghost.read_file_as_buffer("config", "ui.config.json").await.unwrap();
    assert_eq!(content.as_slice(), b"v2");
}

#[tokio::test]
async fn test_delete_then_exists_and_read() {
    let temp = TempDir::new().unwrap();
    let registry = registry_at(&temp).await;
    let ghost = registry.for_scope(&ScopeId::bot("bot-7").unwrap()).unwrap();

    ghost
        .upsert_file("flows", "main.flow.json", b"{}", &UpsertOptions::default())
        .await
        .unwrap();
    ghost.delete_file("flows", "main.flow.json").await.unwrap();

    assert!(!ghost.file_exists("flows", "main.flow.json").await.unwrap());
    let err = ghost
        .read_file_as_buffer("flows", "main.flow.json")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_listing_missing_directory_is_empty() {
    let temp = TempDir::new().unwrap();
    let registry = registry_at(&temp).await;
    let ghost = registry.for_scope(&ScopeId::bot("bot-7").unwrap()).unwrap();

    let listing = ghost
        .directory_listing("never-created", &DirectoryListingOptions::default())
        .await
        .unwrap();
    assert!(listing.is_empty());
}

#[tokio::test]
async fn test_oversize_write_leaves_no_partial_state() {
    let temp = TempDir::new().unwrap();
    let driver = Arc::new(DiskDriver::new(temp.path()).await.unwrap());
    let config = GhostConfig {
        limits: SizeLimits {
            default_bytes: 16,
            ..Default::default()
        },
        ..Default::default()
    };
    let registry = GhostRegistry::new(driver, config);
    let ghost = registry.for_scope(&ScopeId::bot("bot-7").unwrap()).unwrap();

    let err = ghost
        .upsert_file(
            "flows",
            "big.flow.json",
            vec![b'x'; 64],
            &UpsertOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::FileTooLarge { .. }));

    // Not present afterwards, via exists or read.
    assert!(!ghost.file_exists("flows", "big.flow.json").await.unwrap());
    let err = ghost
        .read_file_as_buffer("flows", "big.flow.json")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_model_artifacts_use_higher_ceiling() {
    let temp = TempDir::new().unwrap();
    let driver = Arc::new(DiskDriver::new(temp.path()).await.unwrap());
    let config = GhostConfig {
        limits: SizeLimits {
            default_bytes: 16,
            model_bytes: 1024,
            ..Default::default()
        },
        ..Default::default()
    };
    let registry = GhostRegistry::new(driver, config);
    let ghost = registry.for_scope(&ScopeId::bot("bot-7").unwrap()).unwrap();

    // 64 bytes: over the text ceiling, under the model ceiling.
    let content = vec![b'x'; 64];
    assert!(
        ghost
            .upsert_file("models", "intent.model", &content, &UpsertOptions::default())
            .await
            .is_ok()
    );
    assert!(
        ghost
            .upsert_file("flows", "big.flow.json", &content, &UpsertOptions::default())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_export_import_roundtrip_across_scopes() {
    let temp = TempDir::new().unwrap();
    let registry = registry_at(&temp).await;
    let source = registry.for_scope(&ScopeId::bot("bot-7").unwrap()).unwrap();

    let files: [(&str, &str, &[u8]); 3] = [
        ("flows", "main.flow.json", b"{\"nodes\":[]}"),
        ("content", "faq.json", b"[1,2,3]"),
        ("actions", "hello.js", b"exports.run = () => {}"),
    ];
    for (dir, name, content) in files {
        source
            .upsert_file(dir, name, content, &UpsertOptions::default())
            .await
            .unwrap();
    }

    let archive = source.export_to_archive(&[], None).await.unwrap();

    let target = registry.for_scope(&ScopeId::bot("bot-clone").unwrap()).unwrap();
    target.import_from_archive(&archive).await.unwrap();

    let source_listing = source
        .directory_listing("", &DirectoryListingOptions::default())
        .await
        .unwrap();
    let target_listing = target
        .directory_listing("", &DirectoryListingOptions::default())
        .await
        .unwrap();
    assert_eq!(source_listing, target_listing);

    for (dir, name, content) in files {
        let copied = target.read_file_as_buffer(dir, name).await.unwrap();
        assert_eq!(copied.as_slice(), content);
    }
}

#[tokio::test]
async fn test_export_substitution_neutralizes_tenant_paths() {
    let temp = TempDir::new().unwrap();
    let registry = registry_at(&temp).await;
    let source = registry.for_scope(&ScopeId::bot("bot-7").unwrap()).unwrap();

    source
        .upsert_file(
            "flows",
            "main.flow.json",
            b"{\"skill\":\"bots/bot-7/skills/choice\"}",
            &UpsertOptions::default(),
        )
        .await
        .unwrap();

    let archive = source
        .export_to_archive(
            &[],
            Some(&TextSubstitution {
                from: "bots/bot-7".to_string(),
                to: "bots/__BOT__".to_string(),
            }),
        )
        .await
        .unwrap();

    let target = registry.for_scope(&ScopeId::bot("fresh").unwrap()).unwrap();
    target.import_from_archive(&archive).await.unwrap();

    let flow = target.read_file_as_string("flows", "main.flow.json").await.unwrap();
    assert!(!flow.contains("bots/bot-7"));
    assert!(flow.contains("bots/__BOT__"));
}

#[tokio::test]
async fn test_ghostignore_always_wins() {
    let temp = TempDir::new().unwrap();
    let registry = registry_at(&temp).await;
    let ghost = registry.for_scope(&ScopeId::bot("bot-7").unwrap()).unwrap();

    ghost
        .upsert_file("flows", "main.flow.json", b"{}", &UpsertOptions::default())
        .await
        .unwrap();
    ghost
        .upsert_file("flows", "scratch.draft", b"wip", &UpsertOptions::default())
        .await
        .unwrap();

    tokio::fs::write(temp.path().join("data/.ghostignore"), "*.draft\n")
        .await
        .unwrap();

    // No caller excludes: the ignore file still applies.
    let listing = ghost
        .directory_listing("flows", &DirectoryListingOptions::default())
        .await
        .unwrap();
    assert_eq!(listing, vec!["main.flow.json".to_string()]);

    // Caller excludes do not override it either.
    let listing = ghost
        .directory_listing(
            "flows",
            &DirectoryListingOptions {
                exclude_patterns: vec!["*.unrelated".to_string()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(listing, vec!["main.flow.json".to_string()]);
}

#[tokio::test]
async fn test_name_pattern_filter_stage() {
    let temp = TempDir::new().unwrap();
    let registry = registry_at(&temp).await;
    let ghost = registry.for_scope(&ScopeId::bot("bot-7").unwrap()).unwrap();

    for (dir, name) in [
        ("flows", "Main.Flow.JSON"),
        ("flows", "error.flow.json"),
        ("flows", "notes.txt"),
        ("flows/sub", "deep.flow.json"),
    ] {
        ghost
            .upsert_file(dir, name, b"{}", &UpsertOptions::default())
            .await
            .unwrap();
    }

    // Base-name matching, case-insensitive, across nesting levels.
    let listing = ghost
        .directory_listing(
            "flows",
            &DirectoryListingOptions {
                name_pattern: "*.flow.json".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(
        listing,
        vec![
            "Main.Flow.JSON".to_string(),
            "error.flow.json".to_string(),
            "sub/deep.flow.json".to_string(),
        ]
    );

    // A pattern that spans directories matches whole relative paths.
    let listing = ghost
        .directory_listing(
            "flows",
            &DirectoryListingOptions {
                name_pattern: "sub/*.flow.json".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(listing, vec!["sub/deep.flow.json".to_string()]);
}

#[tokio::test]
async fn test_object_read_distinguishes_parse_from_shape() {
    #[derive(Debug, Deserialize)]
    struct Flow {
        #[allow(dead_code)]
        nodes: Vec<String>,
    }

    let temp = TempDir::new().unwrap();
    let registry = registry_at(&temp).await;
    let ghost = registry.for_scope(&ScopeId::bot("bot-7").unwrap()).unwrap();

    ghost
        .upsert_file("flows", "broken.flow.json", b"{oops", &UpsertOptions::default())
        .await
        .unwrap();
    let err = ghost
        .read_file_as_object::<Flow>("flows", "broken.flow.json")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));
    assert!(format!("{err}").contains("broken.flow.json"));

    ghost
        .upsert_file(
            "flows",
            "wrong-shape.flow.json",
            b"{\"nodes\":\"not-a-list\"}",
            &UpsertOptions::default(),
        )
        .await
        .unwrap();
    let err = ghost
        .read_file_as_object::<Flow>("flows", "wrong-shape.flow.json")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));
    assert!(format!("{err}").contains("wrong-shape.flow.json"));

    ghost
        .upsert_file(
            "flows",
            "good.flow.json",
            b"{\"nodes\":[\"entry\"]}",
            &UpsertOptions::default(),
        )
        .await
        .unwrap();
    let flow: Flow = ghost
        .read_file_as_object("flows", "good.flow.json")
        .await
        .unwrap();
    assert_eq!(flow.nodes, vec!["entry".to_string()]);
}

#[tokio::test]
async fn test_cached_entry_is_proof_of_existence() {
    let temp = TempDir::new().unwrap();
    let registry = registry_at(&temp).await;
    let ghost = registry.for_scope(&ScopeId::bot("bot-7").unwrap()).unwrap();

    ghost
        .upsert_file("flows", "main.flow.json", b"{}", &UpsertOptions::default())
        .await
        .unwrap();

    // Remove the file behind the façade's back: the cache still answers.
    tokio::fs::remove_file(temp.path().join("data/bots/bot-7/flows/main.flow.json"))
        .await
        .unwrap();
    assert!(ghost.file_exists("flows", "main.flow.json").await.unwrap());

    // Once invalidated, existence consults the driver again.
    ghost.invalidate_cached_path("bots/bot-7/flows/main.flow.json");
    assert!(!ghost.file_exists("flows", "main.flow.json").await.unwrap());
}

#[tokio::test]
async fn test_rename_moves_content_and_cache() {
    let temp = TempDir::new().unwrap();
    let registry = registry_at(&temp).await;
    let ghost = registry.for_scope(&ScopeId::bot("bot-7").unwrap()).unwrap();

    ghost
        .upsert_file("flows", "draft.flow.json", b"{}", &UpsertOptions::default())
        .await
        .unwrap();
    ghost
        .rename_file("flows", "draft.flow.json", "main.flow.json")
        .await
        .unwrap();

    assert!(!ghost.file_exists("flows", "draft.flow.json").await.unwrap());
    let content = ghost.read_file_as_buffer("flows", "main.flow.json").await.unwrap();
    assert_eq!(content.as_slice(), b"{}");
}

#[tokio::test]
async fn test_delete_folder_invalidates_subtree() {
    let temp = TempDir::new().unwrap();
    let registry = registry_at(&temp).await;
    let ghost = registry.for_scope(&ScopeId::bot("bot-7").unwrap()).unwrap();

    ghost
        .upsert_file("flows", "a.flow.json", b"{}", &UpsertOptions::default())
        .await
        .unwrap();
    ghost
        .upsert_file("flows/sub", "b.flow.json", b"{}", &UpsertOptions::default())
        .await
        .unwrap();

    ghost.delete_folder("flows").await.unwrap();

    assert!(!ghost.file_exists("flows", "a.flow.json").await.unwrap());
    assert!(!ghost.file_exists("flows/sub", "b.flow.json").await.unwrap());
    let listing = ghost
        .directory_listing("flows", &DirectoryListingOptions::default())
        .await
        .unwrap();
    assert!(listing.is_empty());
}

#[tokio::test]
async fn test_revisions_recorded_on_request() {
    let temp = TempDir::new().unwrap();
    let registry = registry_at(&temp).await;
    let ghost = registry.for_scope(&ScopeId::bot("bot-7").unwrap()).unwrap();

    ghost
        .upsert_file(
            "flows",
            "main.flow.json",
            b"{}",
            &UpsertOptions {
                record_revision: true,
                author: Some("admin".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    ghost
        .upsert_file("flows", "other.flow.json", b"{}", &UpsertOptions::default())
        .await
        .unwrap();

    let revisions = ghost.list_revisions("").await.unwrap();
    assert_eq!(revisions.len(), 1);
    assert_eq!(revisions[0].author, "admin");
    assert_eq!(revisions[0].path, "bots/bot-7/flows/main.flow.json");
}

#[tokio::test]
async fn test_example_scenario_bot_7() {
    let temp = TempDir::new().unwrap();
    let registry = registry_at(&temp).await;
    let ghost = registry.for_scope(&ScopeId::bot("bot-7").unwrap()).unwrap();

    ghost
        .upsert_file("flows", "main.flow.json", b"{\"nodes\":[]}", &UpsertOptions::default())
        .await
        .unwrap();
    assert!(ghost.file_exists("flows", "main.flow.json").await.unwrap());

    let listing = ghost
        .directory_listing(
            "flows",
            &DirectoryListingOptions {
                name_pattern: "*.flow.json".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(listing, vec!["main.flow.json".to_string()]);

    ghost.delete_file("flows", "main.flow.json").await.unwrap();
    let listing = ghost
        .directory_listing(
            "flows",
            &DirectoryListingOptions {
                name_pattern: "*.flow.json".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(listing.is_empty());
}
