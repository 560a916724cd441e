//! CSV and JSON interchange
//!
//! CSV layout: one row per rule, the sixteen scalar columns plus `id`, and a
//! `group_data` column holding the JSON array of condition groups.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, StoreError};
use crate::repository::RuleStore;
use crate::types::{GroupData, ImportSummary, Rule, UpsertOutcome};

/// CSV header, in `RuleRecord` field order
const CSV_HEADER: [&str; 18] = [
    "id",
    "enable",
    "name",
    "mode",
    "trigger_method",
    "operator",
    "trigger_condition",
    "trigger_value",
    "func_name",
    "output_network",
    "output_register_address",
    "output_data_unit",
    "output_data_bit",
    "network",
    "register_address",
    "data_unit",
    "data_bit",
    "group_data",
];

/// Flat CSV record; `group_data` is JSON text
#[derive(Debug, Serialize, Deserialize)]
struct RuleRecord {
    id: String,
    #[serde(default)]
    enable: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mode: String,
    #[serde(default, alias = "trg_mtd")]
    trigger_method: String,
    #[serde(default, alias = "ops")]
    operator: String,
    #[serde(default, alias = "trg_cnds")]
    trigger_condition: String,
    #[serde(default, alias = "trg_val")]
    trigger_value: String,
    #[serde(default)]
    func_name: String,
    #[serde(default, alias = "out_net")]
    output_network: String,
    #[serde(default, alias = "out_reg_addr")]
    output_register_address: String,
    #[serde(default, alias = "out_data_unit")]
    output_data_unit: String,
    #[serde(default, alias = "out_data_bit")]
    output_data_bit: String,
    #[serde(default, alias = "net")]
    network: String,
    #[serde(default, alias = "data_addr")]
    register_address: String,
    #[serde(default)]
    data_unit: String,
    #[serde(default)]
    data_bit: String,
    #[serde(default, alias = "grp_data")]
    group_data: String,
}

impl RuleRecord {
    fn from_rule(rule: &Rule) -> Result<Self> {
        Ok(Self {
            id: rule.id.clone(),
            enable: rule.enable.clone(),
            name: rule.name.clone(),
            mode: rule.mode.clone(),
            trigger_method: rule.trigger_method.clone(),
            operator: rule.operator.clone(),
            trigger_condition: rule.trigger_condition.clone(),
            trigger_value: rule.trigger_value.clone(),
            func_name: rule.func_name.clone(),
            output_network: rule.output_network.clone(),
            output_register_address: rule.output_register_address.clone(),
            output_data_unit: rule.output_data_unit.clone(),
            output_data_bit: rule.output_data_bit.clone(),
            network: rule.network.clone(),
            register_address: rule.register_address.clone(),
            data_unit: rule.data_unit.clone(),
            data_bit: rule.data_bit.clone(),
            group_data: serde_json::to_string(&rule.group_data)?,
        })
    }

    fn into_rule(self, line: u64) -> Result<Rule> {
        let group_data: Vec<GroupData> = if self.group_data.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&self.group_data).map_err(|e| {
                StoreError::Serialization(format!("line {}: group_data: {}", line, e))
            })?
        };

        Ok(Rule {
            id: self.id,
            enable: self.enable,
            name: self.name,
            mode: self.mode,
            trigger_method: self.trigger_method,
            operator: self.operator,
            trigger_condition: self.trigger_condition,
            trigger_value: self.trigger_value,
            func_name: self.func_name,
            output_network: self.output_network,
            output_register_address: self.output_register_address,
            output_data_unit: self.output_data_unit,
            output_data_bit: self.output_data_bit,
            network: self.network,
            register_address: self.register_address,
            data_unit: self.data_unit,
            data_bit: self.data_bit,
            group_data,
        })
    }
}

/// Write rules as CSV with a header row (header only when `rules` is empty)
pub fn export_csv<W: Write>(rules: &[Rule], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    if rules.is_empty() {
        csv_writer.write_record(CSV_HEADER)?;
    }
    for rule in rules {
        csv_writer.serialize(RuleRecord::from_rule(rule)?)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Parse rules from CSV produced by [`export_csv`]
pub fn import_csv<R: Read>(reader: R) -> Result<Vec<Rule>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut record = csv::StringRecord::new();
    let mut rules = Vec::new();

    while csv_reader.read_record(&mut record)? {
        let line = record.position().map_or(0, |pos| pos.line());
        let row: RuleRecord = record.deserialize(Some(&headers))?;
        rules.push(row.into_rule(line)?);
    }
    Ok(rules)
}

/// Pretty JSON for one rule
pub fn to_json_pretty(rule: &Rule) -> Result<String> {
    Ok(serde_json::to_string_pretty(rule)?)
}

/// Parse one rule from JSON (current or legacy field names)
pub fn rule_from_json(text: &str) -> Result<Rule> {
    Ok(serde_json::from_str(text)?)
}

impl RuleStore {
    /// Export every rule to a CSV file; returns the number written
    pub async fn export_csv_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let rules = self.list_all().await?;
        if rules.is_empty() {
            warn!("No rules to export");
        }

        let file = File::create(path)?;
        export_csv(&rules, file)?;

        info!("Exported {} rules to {:?}", rules.len(), path);
        Ok(rules.len())
    }

    /// Import a CSV file, updating rules that already exist
    pub async fn import_csv_file(&self, path: impl AsRef<Path>) -> Result<ImportSummary> {
        let path = path.as_ref();
        let rules = import_csv(File::open(path)?)?;

        let mut summary = ImportSummary::default();
        for rule in &rules {
            match self.upsert(rule).await? {
                UpsertOutcome::Inserted => summary.inserted += 1,
                UpsertOutcome::Updated => summary.updated += 1,
            }
        }

        info!(
            "Imported {:?}: {} inserted, {} updated",
            path, summary.inserted, summary.updated
        );
        Ok(summary)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    fn sample_rule() -> Rule {
        Rule {
            enable: "on".to_string(),
            name: "pump, \"main\"".to_string(),
            group_data: vec![GroupData {
                index: "1".to_string(),
                logical_condition: "AND".to_string(),
                ..Default::default()
            }],
            ..Rule::new("r-1")
        }
    }

    #[test]
    fn test_export_quotes_and_embeds_group_json() {
        let mut out = Vec::new();
        export_csv(&[sample_rule()], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let header = text.lines().next().unwrap();
        assert!(header.starts_with("id,enable,name,mode,trigger_method"));
        assert!(header.ends_with(",group_data"));
        assert!(text.contains("\"pump, \"\"main\"\"\""));
        assert!(text.contains("logical_condition"));

        let back = import_csv(text.as_bytes()).unwrap();
        assert_eq!(back, vec![sample_rule()]);
    }

    #[test]
    fn test_import_legacy_columns_and_empty_groups() {
        let csv_text = "id,enable,name,trg_mtd,ops,net,data_addr,grp_data\n\
                        1001,True,alarm,edge,AND,192.168.1.1,0x4000,\n";
        let rules = import_csv(csv_text.as_bytes()).unwrap();

        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].trigger_method, "edge");
        assert_eq!(rules[0].network, "192.168.1.1");
        assert_eq!(rules[0].register_address, "0x4000");
        assert!(rules[0].group_data.is_empty());
    }

    #[test]
    fn test_import_rejects_malformed_group_json() {
        let csv_text = "id,group_data\nr1,[not json\n";
        let err = import_csv(csv_text.as_bytes()).unwrap_err();
        match err {
            StoreError::Serialization(msg) => assert!(msg.contains("line 2")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_import_reports_start_line_of_multiline_record() {
        let csv_text = "id,name,group_data\nr1,\"two\nlines\",\nr2,x,[not json\n";
        let err = import_csv(csv_text.as_bytes()).unwrap_err();
        match err {
            StoreError::Serialization(msg) => assert!(msg.contains("line 4"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_import_accepts_null_group_fields() {
        let csv_text = concat!(
            "id,name,grp_data\n",
            r#"1001,alarm,"[{""index"":""1"",""lgcl_cnds"":""AND"",""net"":null,""data_unit"":null}]""#,
            "\n"
        );
        let rules = import_csv(csv_text.as_bytes()).unwrap();

        assert_eq!(rules.len(), 1);
        let group = &rules[0].group_data[0];
        assert_eq!(group.logical_condition, "AND");
        assert_eq!(group.network, "");
        assert_eq!(group.data_unit, "");
    }

    #[test]
    fn test_empty_export_writes_header() {
        let mut out = Vec::new();
        export_csv(&[], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.trim_end(), CSV_HEADER.join(","));

        let mut full = Vec::new();
        export_csv(&[sample_rule()], &mut full).unwrap();
        let full = String::from_utf8(full).unwrap();
        assert_eq!(full.lines().next().unwrap(), CSV_HEADER.join(","));

        assert!(import_csv(text.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_rule_from_json_null_name() {
        let rule = rule_from_json(r#"{"id": "1", "name": null}"#).unwrap();
        assert_eq!(rule, Rule::new("1"));
    }

    #[test]
    fn test_json_round_trip() {
        let rule = sample_rule();
        let text = to_json_pretty(&rule).unwrap();
        assert!(text.contains("\"group_data\""));
        assert_eq!(rule_from_json(&text).unwrap(), rule);
    }
}
