use serde_json::json;
use tempfile::tempdir;

use vinaya_notes::fetch::{fetch_dataset, FetchConfig, FetchError, MockTextApi, SuttaCentralClient, TextApi};
use vinaya_notes::loader::load_dataset;

fn mocked_api() -> MockTextApi {
    let mut api = MockTextApi::new();
    api.expect_menu().returning(|uid| match uid {
        "pli-tv-bu-vb" => Ok(json!([{
            "uid": "pli-tv-bu-vb",
            "children": [
                {"uid": "pli-tv-bu-vb-pj", "root_name": "Pārājika"}
            ]
        }])),
        "pli-tv-bu-vb-pj" => Ok(json!([{
            "uid": "pli-tv-bu-vb-pj",
            "children": [
                {"uid": "pli-tv-bu-vb-pj1", "root_name": "Pārājika 1"},
                {"uid": "pli-tv-bu-vb-pj2", "root_name": ""}
            ]
        }])),
        other => Err(FetchError::Api {
            uid: other.to_string(),
            detail: "unexpected menu request".to_string(),
        }),
    });
    api.expect_bilara_text().returning(|uid| {
        let k1 = format!("{uid}:1.1");
        let k2 = format!("{uid}:1.2");
        let k3 = format!("{uid}:1.3");
        Ok(json!({
            "keys_order": [k1.clone(), k2, k3.clone()],
            "translation_text": {
                k1: "Origin story. ",
                k3: "Final ruling."
            }
        }))
    });
    api
}

#[tokio::test]
async fn fetch_writes_loader_parseable_artifacts() {
    let tmp = tempdir().unwrap();
    let data_dir = tmp.path().join("data");
    let api = mocked_api();

    let report = fetch_dataset(
        &api,
        &FetchConfig { data_dir: data_dir.clone(), root_uid: "pli-tv-bu-vb".to_string() },
    )
    .await
    .expect("fetch should succeed");

    assert_eq!(report.categories, 1);
    assert_eq!(report.rules, 2);
    assert_eq!(report.sections, 2);

    let dataset = load_dataset(&data_dir).expect("fetched artifacts must load");
    assert_eq!(dataset.manifest.len(), 3); // category + two rules
    assert_eq!(dataset.sections.len(), 2);
    assert!(dataset.glossary.is_empty()); // placeholder glossary written

    let rule = &dataset.manifest[1];
    assert_eq!(rule.uid, "pli-tv-bu-vb-pj1");
    assert_eq!(rule.chapter.as_deref(), Some("pli-tv-bu-vb-pj"));

    // Child with an empty root_name falls back to its uid as title.
    assert_eq!(dataset.manifest[2].title, "pli-tv-bu-vb-pj2");

    // Segments are flattened in keys_order, skipping untranslated keys.
    assert_eq!(dataset.sections[0].body, "Origin story.\n\nFinal ruling.");
}

#[tokio::test]
async fn fetch_leaves_an_existing_glossary_untouched() {
    let tmp = tempdir().unwrap();
    let data_dir = tmp.path().join("data");
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::write(data_dir.join("glossary.json"), r#"{"upajjhāya": "preceptor"}"#).unwrap();

    let api = mocked_api();
    fetch_dataset(
        &api,
        &FetchConfig { data_dir: data_dir.clone(), root_uid: "pli-tv-bu-vb".to_string() },
    )
    .await
    .expect("fetch should succeed");

    let dataset = load_dataset(&data_dir).unwrap();
    assert_eq!(dataset.glossary.len(), 1);
}

#[tokio::test]
async fn malformed_menu_response_is_fatal() {
    let tmp = tempdir().unwrap();
    let mut api = MockTextApi::new();
    api.expect_menu().returning(|_| Ok(json!({"not": "a menu"})));

    let err = fetch_dataset(
        &api,
        &FetchConfig { data_dir: tmp.path().join("data"), root_uid: "pli-tv-bu-vb".to_string() },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, FetchError::Api { .. }));
}

#[tokio::test]
async fn client_serves_cached_responses_without_a_network_call() {
    let tmp = tempdir().unwrap();
    let cache_dir = tmp.path().join(".cache");
    std::fs::create_dir_all(&cache_dir).unwrap();

    // Seed the cache entry for this uid's menu URL by hand; the client must
    // return it without touching the network.
    let url = "https://suttacentral.net/api/menu/offline-test?language=en";
    let seeded = json!([{ "uid": "offline-test", "children": [] }]);
    std::fs::write(
        cache_dir.join(format!("{}.json", SuttaCentralClient::cache_key(url))),
        serde_json::to_string(&seeded).unwrap(),
    )
    .unwrap();

    let client = SuttaCentralClient::new(cache_dir);
    let value = client.menu("offline-test").await.expect("cache hit should succeed");
    assert_eq!(value, seeded);
}
