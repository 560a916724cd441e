//! Rule record types
//!
//! - Rule: one automation rule, all scalar attributes kept as text
//! - GroupData: ordered condition-group row owned by a rule
//! - RuleFilter / UpsertOutcome: query and write helpers
//!
//! Field names follow the canonical schema. Serde aliases accept the short
//! column names used by older exports (`trg_mtd`, `lgcl_cnds`, `grp_data`, ...).

use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Rule
// ============================================================================

/// Rule - one persisted automation rule with its condition groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rule {
    /// Caller-supplied unique identifier
    #[serde(deserialize_with = "deserialize_text")]
    pub id: String,

    /// Enable flag, stored verbatim ("on", "off", "True", ...)
    #[serde(deserialize_with = "deserialize_text")]
    pub enable: String,

    #[serde(deserialize_with = "deserialize_text")]
    pub name: String,

    #[serde(deserialize_with = "deserialize_text")]
    pub mode: String,

    #[serde(alias = "trg_mtd", deserialize_with = "deserialize_text")]
    pub trigger_method: String,

    #[serde(alias = "ops", alias = "operators", deserialize_with = "deserialize_text")]
    pub operator: String,

    #[serde(
        alias = "trg_cnds",
        alias = "trigger_conditions",
        deserialize_with = "deserialize_text"
    )]
    pub trigger_condition: String,

    #[serde(alias = "trg_val", deserialize_with = "deserialize_text")]
    pub trigger_value: String,

    #[serde(deserialize_with = "deserialize_text")]
    pub func_name: String,

    #[serde(alias = "out_net", alias = "out_network", deserialize_with = "deserialize_text")]
    pub output_network: String,

    #[serde(alias = "out_reg_addr", alias = "out_data_addr", deserialize_with = "deserialize_text")]
    pub output_register_address: String,

    #[serde(alias = "out_data_unit", deserialize_with = "deserialize_text")]
    pub output_data_unit: String,

    #[serde(alias = "out_data_bit", deserialize_with = "deserialize_text")]
    pub output_data_bit: String,

    #[serde(alias = "net", deserialize_with = "deserialize_text")]
    pub network: String,

    #[serde(alias = "data_addr", alias = "reg_addr", deserialize_with = "deserialize_text")]
    pub register_address: String,

    #[serde(deserialize_with = "deserialize_text")]
    pub data_unit: String,

    #[serde(deserialize_with = "deserialize_text")]
    pub data_bit: String,

    /// Condition groups in evaluation order
    #[serde(alias = "grp_data")]
    pub group_data: Vec<GroupData>,
}

impl Rule {
    /// Create an empty rule with the given identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Number of condition groups
    pub fn group_data_size(&self) -> usize {
        self.group_data.len()
    }

    /// Interpret the `enable` text against a set of truthy tokens (case-insensitive)
    pub fn is_enabled<S: AsRef<str>>(&self, enable_values: &[S]) -> bool {
        let value = self.enable.trim();
        enable_values
            .iter()
            .any(|token| token.as_ref().eq_ignore_ascii_case(value))
    }

    /// Scalar columns keyed by name, in schema order (excluding `id`)
    pub(crate) fn scalar_columns(&self) -> [(&'static str, &str); 16] {
        [
            ("enable", self.enable.as_str()),
            ("name", self.name.as_str()),
            ("mode", self.mode.as_str()),
            ("trigger_method", self.trigger_method.as_str()),
            ("operator", self.operator.as_str()),
            ("trigger_condition", self.trigger_condition.as_str()),
            ("trigger_value", self.trigger_value.as_str()),
            ("func_name", self.func_name.as_str()),
            ("output_network", self.output_network.as_str()),
            ("output_register_address", self.output_register_address.as_str()),
            ("output_data_unit", self.output_data_unit.as_str()),
            ("output_data_bit", self.output_data_bit.as_str()),
            ("network", self.network.as_str()),
            ("register_address", self.register_address.as_str()),
            ("data_unit", self.data_unit.as_str()),
            ("data_bit", self.data_bit.as_str()),
        ]
    }
}

// ============================================================================
// GroupData
// ============================================================================

/// One condition-group entry; its position is its index in `Rule::group_data`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupData {
    /// Caller-supplied label, independent of the stored position
    #[serde(deserialize_with = "deserialize_text")]
    pub index: String,

    /// "AND" / "OR"
    #[serde(
        alias = "lgcl_cnds",
        alias = "logical_conditions",
        deserialize_with = "deserialize_text"
    )]
    pub logical_condition: String,

    #[serde(alias = "net", deserialize_with = "deserialize_text")]
    pub network: String,

    #[serde(alias = "data_addr", alias = "reg_addr", deserialize_with = "deserialize_text")]
    pub register_address: String,

    #[serde(deserialize_with = "deserialize_text")]
    pub data_unit: String,

    #[serde(deserialize_with = "deserialize_text")]
    pub data_bit: String,
}

impl GroupData {
    /// Columns keyed by name, in schema order (excluding `rule_id` and `position`)
    pub(crate) fn columns(&self) -> [(&'static str, &str); 6] {
        [
            ("item_index", self.index.as_str()),
            ("logical_condition", self.logical_condition.as_str()),
            ("network", self.network.as_str()),
            ("register_address", self.register_address.as_str()),
            ("data_unit", self.data_unit.as_str()),
            ("data_bit", self.data_bit.as_str()),
        ]
    }
}

// ============================================================================
// Query / write helpers
// ============================================================================

/// Exact-match filter; `None` fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleFilter {
    pub name: Option<String>,
    pub mode: Option<String>,
    pub network: Option<String>,
    pub func_name: Option<String>,
}

impl RuleFilter {
    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.mode.is_none()
            && self.network.is_none()
            && self.func_name.is_none()
    }
}

/// Result of an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Rules written by a CSV import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
}

// ============================================================================
// Serde helpers
// ============================================================================

/// Accept strings, booleans and numbers for text columns.
///
/// Booleans render as "True"/"False", the form older exports wrote.
fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextLike {
        String(String),
        Bool(bool),
        Int(i64),
        Float(f64),
        Null(()),
    }

    Ok(match TextLike::deserialize(deserializer)? {
        TextLike::String(s) => s,
        TextLike::Bool(true) => "True".to_string(),
        TextLike::Bool(false) => "False".to_string(),
        TextLike::Int(i) => i.to_string(),
        TextLike::Float(f) => f.to_string(),
        TextLike::Null(()) => String::new(),
    })
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_enabled_case_insensitive() {
        let tokens = ["true", "on", "1"];
        let mut rule = Rule::new("r1");

        rule.enable = "ON".to_string();
        assert!(rule.is_enabled(&tokens));
        rule.enable = " True ".to_string();
        assert!(rule.is_enabled(&tokens));
        rule.enable = "off".to_string();
        assert!(!rule.is_enabled(&tokens));
        rule.enable = String::new();
        assert!(!rule.is_enabled(&tokens));
    }

    #[test]
    fn test_deserialize_legacy_field_names() {
        let value = json!({
            "id": 1001,
            "enable": true,
            "name": "temperature-alarm",
            "trg_mtd": "edge",
            "ops": "AND",
            "trg_cnds": ">",
            "trg_val": 50,
            "out_net": "192.168.1.100",
            "out_reg_addr": "0x3000",
            "net": "192.168.1.1",
            "data_addr": "0x4000",
            "data_bit": 8,
            "grp_data": [
                { "index": "1", "lgcl_cnds": "AND", "net": "192.168.1.2", "data_addr": "0x5000" }
            ]
        });

        let rule: Rule = serde_json::from_value(value).unwrap();
        assert_eq!(rule.id, "1001");
        assert_eq!(rule.enable, "True");
        assert_eq!(rule.trigger_method, "edge");
        assert_eq!(rule.operator, "AND");
        assert_eq!(rule.trigger_value, "50");
        assert_eq!(rule.output_register_address, "0x3000");
        assert_eq!(rule.register_address, "0x4000");
        assert_eq!(rule.data_bit, "8");
        assert_eq!(rule.group_data_size(), 1);
        assert_eq!(rule.group_data[0].logical_condition, "AND");
        assert_eq!(rule.group_data[0].register_address, "0x5000");
        assert_eq!(rule.group_data[0].data_unit, "");
    }

    #[test]
    fn test_scalar_columns_cover_every_field() {
        let rule = Rule::new("r1");
        let names: Vec<_> = rule.scalar_columns().iter().map(|(c, _)| *c).collect();
        assert_eq!(names.len(), 16);
        assert!(!names.contains(&"id"));
        assert_eq!(names.first(), Some(&"enable"));
        assert_eq!(names.last(), Some(&"data_bit"));
    }

    #[test]
    fn test_filter_is_empty() {
        assert!(RuleFilter::default().is_empty());
        let filter = RuleFilter {
            mode: Some("auto".to_string()),
            ..Default::default()
        };
        assert!(!filter.is_empty());
    }

    #[test]
    fn test_null_text_fields_read_as_empty() {
        let value = json!({
            "id": "1",
            "name": null,
            "mode": null,
            "out_net": null,
            "grp_data": [
                { "index": "1", "lgcl_cnds": null, "net": null, "data_addr": null, "data_unit": null }
            ]
        });

        let rule: Rule = serde_json::from_value(value).unwrap();
        assert_eq!(rule.name, "");
        assert_eq!(rule.mode, "");
        assert_eq!(rule.output_network, "");
        assert_eq!(rule.group_data[0], GroupData {
            index: "1".to_string(),
            ..Default::default()
        });
    }
}
