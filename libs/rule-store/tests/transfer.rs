//! CSV export/import between stores

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use rule_store::{GroupData, ImportSummary, Result, Rule, RuleStore, StoreConfig};

fn rule_with_groups(id: &str, groups: usize) -> Rule {
    let mut rule = Rule::new(id);
    rule.enable = "True".to_string();
    rule.name = format!("rule {}", id);
    rule.trigger_condition = ">=".to_string();
    rule.trigger_value = "12.5".to_string();
    rule.group_data = (0..groups)
        .map(|i| GroupData {
            index: (i + 1).to_string(),
            logical_condition: if i % 2 == 0 { "AND" } else { "OR" }.to_string(),
            network: format!("10.0.0.{}", i),
            register_address: format!("0x{:04x}", 0x5000 + i),
            data_unit: "word".to_string(),
            data_bit: "16".to_string(),
        })
        .collect();
    rule
}

#[tokio::test]
async fn test_export_then_import_into_fresh_store() -> Result<()> {
    let tmp = tempfile::tempdir().unwrap();
    let csv_path = tmp.path().join("rules_export.csv");

    let source = RuleStore::open(tmp.path().join("source.db")).await?;
    let originals = vec![
        rule_with_groups("a-1", 0),
        rule_with_groups("a-2", 3),
        rule_with_groups("b-1", 1),
    ];
    for rule in &originals {
        source.insert(rule).await?;
    }
    assert_eq!(source.export_csv_file(&csv_path).await?, 3);
    source.close().await;

    let config = StoreConfig::with_path(tmp.path().join("target.db"));
    let target = RuleStore::open_with_config(&config).await?;
    let summary = target.import_csv_file(&csv_path).await?;
    assert_eq!(
        summary,
        ImportSummary {
            inserted: 3,
            updated: 0
        }
    );
    assert_eq!(target.list_all().await?, originals);
    target.close().await;
    Ok(())
}

#[tokio::test]
async fn test_import_updates_existing_rules() -> Result<()> {
    let tmp = tempfile::tempdir().unwrap();
    let csv_path = tmp.path().join("rules.csv");

    let store = RuleStore::open_in_memory().await?;
    store.insert(&rule_with_groups("x", 2)).await?;
    store.export_csv_file(&csv_path).await?;

    // Local edit that the import should overwrite
    let mut edited = rule_with_groups("x", 0);
    edited.name = "edited".to_string();
    store.update("x", &edited).await?;

    let summary = store.import_csv_file(&csv_path).await?;
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.inserted, 0);
    assert_eq!(store.get("x").await?, rule_with_groups("x", 2));
    Ok(())
}
