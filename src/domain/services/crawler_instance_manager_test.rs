// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

#[cfg(test)]
mod tests {
    use crate::domain::models::config_block::BlockKind;
    use crate::domain::models::crawler_instance::{CrawlerStatus, SeedStatus};
    use crate::domain::repositories::config_store::{ConfigStore, RecordKind};
    use crate::domain::services::crawler_instance_manager::{
        CrawlerInstanceDraft, CrawlerInstanceManager, PageRequest, SeedInput,
    };
    use crate::domain::services::crawler_type_registry::{CrawlerTypeDraft, CrawlerTypeRegistry};
    use crate::infrastructure::repositories::file_store::FileStore;
    use crate::utils::errors::ControlError;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: Arc<FileStore>,
        types: Arc<CrawlerTypeRegistry>,
        manager: CrawlerInstanceManager,
    }

    fn fixture(strict: bool) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path()));
        let types = Arc::new(CrawlerTypeRegistry::new(store.clone()));
        let manager = CrawlerInstanceManager::new(store.clone(), types.clone(), strict);
        Fixture {
            _dir: dir,
            store,
            types,
            manager,
        }
    }

    fn seeds(urls: &[&str]) -> Vec<SeedInput> {
        urls.iter().map(|u| SeedInput::from_url(*u)).collect()
    }

    fn seed_urls(instance: &crate::domain::models::crawler_instance::CrawlerInstance) -> Vec<String> {
        instance.seeds.iter().map(|s| s.url.clone()).collect()
    }

    #[tokio::test]
    async fn test_create_without_overrides_matches_type_defaults() {
        let f = fixture(true);
        let playwright = f.types.get("playwright").await.unwrap();

        let instance = f
            .manager
            .create(CrawlerInstanceDraft {
                name: Some("Shop".to_string()),
                crawler_type: Some("playwright".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(instance.config, playwright.default_config);
        assert_eq!(instance.request_config, playwright.default_request_config);
        assert_eq!(instance.selectors, playwright.default_selectors);
        assert_eq!(instance.tags, playwright.features);
        assert_eq!(instance.status, CrawlerStatus::Idle);
        assert_eq!(instance.created_at, instance.updated_at);
        assert!(instance.seeds.is_empty() && instance.results.is_empty() && instance.logs.is_empty());
        assert_eq!(instance.stats.requests_total, 0);
        for kind in BlockKind::ALL {
            for key in kind.fallback().keys() {
                assert!(instance.block(kind).contains_key(key));
            }
        }
    }

    #[tokio::test]
    async fn test_custom_type_defaults_flow_into_instances() {
        let f = fixture(true);
        f.types
            .create(CrawlerTypeDraft {
                id: Some("custom-http".to_string()),
                name: Some("Custom HTTP".to_string()),
                default_config: Some(json!({ "maxConcurrency": 50 })),
                ..Default::default()
            })
            .await
            .unwrap();

        let instance = f
            .manager
            .create(CrawlerInstanceDraft {
                crawler_type: Some("custom-http".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(instance.crawler_type, "custom-http");
        assert_eq!(instance.config["maxConcurrency"], 50);
    }

    #[tokio::test]
    async fn test_overrides_merge_field_by_field() {
        let f = fixture(true);
        let cheerio = f.types.get("cheerio").await.unwrap();

        let instance = f
            .manager
            .create(CrawlerInstanceDraft {
                config: Some(json!({ "maxConcurrency": 2 })),
                proxy_config: Some(json!("{\"useProxy\": true}")),
                tags: Some(vec!["news".to_string()]),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(instance.crawler_type, "cheerio");
        assert_eq!(instance.config["maxConcurrency"], 2);
        assert_eq!(
            instance.config["requestHandlerTimeoutSecs"],
            cheerio.default_config["requestHandlerTimeoutSecs"]
        );
        assert_eq!(instance.proxy_config["useProxy"], true);
        assert_eq!(instance.proxy_config["rotation"], "round_robin");
        assert_eq!(instance.tags, vec!["news".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_type_falls_back_to_cheerio() {
        let f = fixture(true);
        let instance = f
            .manager
            .create(CrawlerInstanceDraft {
                crawler_type: Some("does-not-exist".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(instance.crawler_type, "cheerio");
    }

    #[tokio::test]
    async fn test_malformed_block_is_rejected_before_write() {
        let f = fixture(true);
        let err = f
            .manager
            .create(CrawlerInstanceDraft {
                selectors: Some(json!("{oops")),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ControlError::Validation(_)));
        assert!(f.store.read_all(RecordKind::CrawlerInstances).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_merges_and_type_change_remerges() {
        let f = fixture(true);
        let created = f
            .manager
            .create(CrawlerInstanceDraft {
                config: Some(json!({ "maxConcurrency": 3 })),
                ..Default::default()
            })
            .await
            .unwrap();

        let updated = f
            .manager
            .update(
                &created.id,
                CrawlerInstanceDraft {
                    config: Some(json!({ "maxRequestRetries": 7 })),
                    name: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.config["maxConcurrency"], 3);
        assert_eq!(updated.config["maxRequestRetries"], 7);
        assert_eq!(updated.name, "Renamed");
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.created_at, created.created_at);

        let http = f.types.get("http").await.unwrap();
        let retyped = f
            .manager
            .update(
                &created.id,
                CrawlerInstanceDraft {
                    crawler_type: Some("http".to_string()),
                    request_config: Some(json!({ "timeoutSecs": 5 })),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(retyped.crawler_type, "http");
        assert_eq!(retyped.config, http.default_config);
        assert_eq!(retyped.request_config["timeoutSecs"], 5);
        assert_eq!(retyped.name, "Renamed");
    }

    #[tokio::test]
    async fn test_unknown_type_on_update_keeps_existing_overrides() {
        let f = fixture(true);
        let created = f
            .manager
            .create(CrawlerInstanceDraft {
                config: Some(json!({ "maxConcurrency": 3 })),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.crawler_type, "cheerio");

        let updated = f
            .manager
            .update(
                &created.id,
                CrawlerInstanceDraft {
                    crawler_type: Some("bogus".to_string()),
                    request_config: Some(json!({ "timeoutSecs": 5 })),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // "bogus" resolves to cheerio, the current type, so nothing is re-merged.
        assert_eq!(updated.crawler_type, "cheerio");
        assert_eq!(updated.config["maxConcurrency"], 3);
        assert_eq!(updated.request_config["timeoutSecs"], 5);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found_everywhere() {
        let f = fixture(true);
        let missing = "missing";

        assert!(matches!(f.manager.get(missing).await, Err(ControlError::NotFound { .. })));
        assert!(matches!(
            f.manager.update(missing, CrawlerInstanceDraft::default()).await,
            Err(ControlError::NotFound { .. })
        ));
        assert!(matches!(f.manager.start(missing, vec![]).await, Err(ControlError::NotFound { .. })));
        assert!(matches!(f.manager.pause(missing).await, Err(ControlError::NotFound { .. })));
        assert!(matches!(f.manager.resume(missing).await, Err(ControlError::NotFound { .. })));
        assert!(matches!(f.manager.stop(missing).await, Err(ControlError::NotFound { .. })));
        assert!(matches!(
            f.manager.add_seeds(missing, seeds(&["https://a"])).await,
            Err(ControlError::NotFound { .. })
        ));
        assert!(matches!(f.manager.delete(missing).await, Err(ControlError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_repeated_starts_concatenate_seed_batches() {
        let f = fixture(true);
        let id = f.manager.create(CrawlerInstanceDraft::default()).await.unwrap().id;

        f.manager.start(&id, seeds(&["https://a", "https://b"])).await.unwrap();
        let instance = f.manager.start(&id, seeds(&["https://c"])).await.unwrap();

        assert_eq!(seed_urls(&instance), vec!["https://a", "https://b", "https://c"]);
        assert!(instance.seeds.iter().all(|s| s.status == SeedStatus::Pending));
        assert_eq!(instance.status, CrawlerStatus::Running);
        assert!(instance.started_at.is_some());
        assert_eq!(instance.started_at, instance.last_run_at);
    }

    #[tokio::test]
    async fn test_start_then_add_seeds_keeps_order() {
        let f = fixture(true);
        let id = f.manager.create(CrawlerInstanceDraft::default()).await.unwrap().id;

        f.manager
            .start(&id, vec![SeedInput::from_url("https://a")])
            .await
            .unwrap();
        let instance = f
            .manager
            .add_seeds(
                &id,
                vec![SeedInput {
                    url: "https://b".to_string(),
                    label: Some("detail".to_string()),
                    priority: Some(5),
                    user_data: None,
                }],
            )
            .await
            .unwrap();

        assert_eq!(seed_urls(&instance), vec!["https://a", "https://b"]);
        assert_eq!(instance.seeds[0].priority, 0);
        assert_eq!(instance.seeds[1].priority, 5);
        assert_eq!(instance.seeds[1].label.as_deref(), Some("detail"));
    }

    #[tokio::test]
    async fn test_add_seeds_requires_urls() {
        let f = fixture(true);
        let id = f.manager.create(CrawlerInstanceDraft::default()).await.unwrap().id;

        let err = f
            .manager
            .add_seeds(&id, seeds(&["https://ok", "  "]))
            .await
            .unwrap_err();

        assert!(matches!(err, ControlError::Validation(_)));
        assert!(f.manager.get(&id).await.unwrap().seeds.is_empty());
    }

    #[tokio::test]
    async fn test_stop_then_start_keeps_engine_state() {
        let f = fixture(true);
        let id = f.manager.create(CrawlerInstanceDraft::default()).await.unwrap().id;
        f.manager.start(&id, seeds(&["https://a"])).await.unwrap();

        // Simulate the execution engine writing back into the record.
        let mut raw = f
            .store
            .find(RecordKind::CrawlerInstances, &id)
            .await
            .unwrap()
            .unwrap();
        raw["results"] = json!([{ "url": "https://a", "title": "A" }]);
        raw["logs"] = json!(["fetched https://a"]);
        raw["stats"] = json!({ "requestsTotal": 1, "requestsFinished": 1, "requestsFailed": 0 });
        f.store.upsert(RecordKind::CrawlerInstances, raw).await.unwrap();

        let stopped = f.manager.stop(&id).await.unwrap();
        assert_eq!(stopped.status, CrawlerStatus::Idle);
        assert_eq!(stopped.finished_at, Some(stopped.updated_at));

        let restarted = f.manager.start(&id, vec![]).await.unwrap();
        assert_eq!(restarted.status, CrawlerStatus::Running);
        assert_eq!(restarted.results, stopped.results);
        assert_eq!(restarted.logs, stopped.logs);
        assert_eq!(restarted.stats, stopped.stats);
        assert_eq!(restarted.stats.requests_finished, 1);
    }

    #[tokio::test]
    async fn test_strict_transitions_reject_invalid_moves() {
        let f = fixture(true);
        let id = f.manager.create(CrawlerInstanceDraft::default()).await.unwrap().id;

        let err = f.manager.pause(&id).await.unwrap_err();
        assert!(matches!(
            err,
            ControlError::InvalidTransition { from: CrawlerStatus::Idle, action: "pause", .. }
        ));
        assert!(matches!(f.manager.resume(&id).await, Err(ControlError::InvalidTransition { .. })));
        assert!(matches!(f.manager.stop(&id).await, Err(ControlError::InvalidTransition { .. })));

        f.manager.start(&id, vec![]).await.unwrap();
        assert_eq!(f.manager.pause(&id).await.unwrap().status, CrawlerStatus::Paused);
        assert!(matches!(f.manager.pause(&id).await, Err(ControlError::InvalidTransition { .. })));
        assert_eq!(f.manager.resume(&id).await.unwrap().status, CrawlerStatus::Running);
        assert_eq!(f.manager.stop(&id).await.unwrap().status, CrawlerStatus::Idle);
    }

    #[tokio::test]
    async fn test_permissive_mode_accepts_any_transition() {
        let f = fixture(false);
        let id = f.manager.create(CrawlerInstanceDraft::default()).await.unwrap().id;

        assert_eq!(f.manager.pause(&id).await.unwrap().status, CrawlerStatus::Paused);
        assert_eq!(f.manager.stop(&id).await.unwrap().status, CrawlerStatus::Idle);
        assert_eq!(f.manager.resume(&id).await.unwrap().status, CrawlerStatus::Running);
    }

    #[tokio::test]
    async fn test_pause_only_touches_status() {
        let f = fixture(true);
        let id = f.manager.create(CrawlerInstanceDraft::default()).await.unwrap().id;
        let running = f.manager.start(&id, seeds(&["https://a"])).await.unwrap();

        let paused = f.manager.pause(&id).await.unwrap();

        assert_eq!(paused.seeds, running.seeds);
        assert_eq!(paused.config, running.config);
        assert_eq!(paused.started_at, running.started_at);
        assert!(paused.updated_at >= running.updated_at);
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let f = fixture(true);
        let a = f.manager.create(CrawlerInstanceDraft::default()).await.unwrap();
        let b = f.manager.create(CrawlerInstanceDraft::default()).await.unwrap();

        assert_eq!(f.manager.list().await.unwrap().len(), 2);
        f.manager.delete(&a.id).await.unwrap();

        let remaining = f.manager.list().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, b.id);
    }

    #[tokio::test]
    async fn test_results_and_logs_are_paged() {
        let f = fixture(true);
        let id = f.manager.create(CrawlerInstanceDraft::default()).await.unwrap().id;
        let mut raw = f
            .store
            .find(RecordKind::CrawlerInstances, &id)
            .await
            .unwrap()
            .unwrap();
        raw["results"] = json!((0..250).map(|i| json!({ "n": i })).collect::<Vec<_>>());
        raw["logs"] = json!(["a", "b", "c"]);
        f.store.upsert(RecordKind::CrawlerInstances, raw).await.unwrap();

        let first = f.manager.results(&id, PageRequest::default()).await.unwrap();
        assert_eq!(first.total, 250);
        assert_eq!(first.items.len(), 100);
        assert_eq!(first.items[0]["n"], 0);

        let tail = f
            .manager
            .results(&id, PageRequest { offset: Some(200), limit: Some(5000) })
            .await
            .unwrap();
        assert_eq!(tail.limit, 1000);
        assert_eq!(tail.items.len(), 50);
        assert_eq!(tail.items[0]["n"], 200);

        let logs = f
            .manager
            .logs(&id, PageRequest { offset: Some(1), limit: Some(1) })
            .await
            .unwrap();
        assert_eq!(logs.items, vec![json!("b")]);
    }

    #[tokio::test]
    async fn test_config_template_scaffolds_type_defaults() {
        let f = fixture(true);
        let http = f.types.get("http").await.unwrap();

        let template = f.manager.config_template(Some("http")).await.unwrap();
        assert_eq!(template["type"], "http");
        assert_eq!(template["config"], json!(http.default_config));
        assert!(template["proxy_config"].is_object());

        let fallback = f.manager.config_template(None).await.unwrap();
        assert_eq!(fallback["type"], "cheerio");

        assert!(matches!(
            f.manager.config_template(Some("nope")).await,
            Err(ControlError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_seed_appends_are_serialized() {
        let f = fixture(true);
        let id = f.manager.create(CrawlerInstanceDraft::default()).await.unwrap().id;
        let manager = Arc::new(f.manager);

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let manager = manager.clone();
                let id = id.clone();
                tokio::spawn(async move {
                    manager
                        .add_seeds(&id, vec![SeedInput::from_url(format!("https://{}", i))])
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(manager.get(&id).await.unwrap().seeds.len(), 10);
    }
}
