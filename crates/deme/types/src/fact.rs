//! The FactRecord schema.
//!
//! Closed and versioned: every section rejects unknown fields, scalars are
//! bounded in `[0, 1]`, and optional sections mean "no information" rather
//! than "zero". Records are produced by an external fact-extraction service
//! and are immutable once admitted; edits produce a new record.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FactRecordError;
use crate::hash::ContentHash;
use crate::ids::OptionId;

/// Current FactRecord schema version.
pub const FACT_SCHEMA_VERSION: u32 = 1;

fn schema_version_default() -> u32 {
    FACT_SCHEMA_VERSION
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Consequences {
    pub expected_benefit: f64,
    pub expected_harm: f64,
    pub urgency: f64,
    pub affected_count: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RightsAndDuties {
    pub violates_rights: bool,
    pub has_valid_consent: bool,
    pub violates_explicit_rule: bool,
    pub role_duty_conflict: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JusticeAndFairness {
    pub discriminates_on_protected_attr: bool,
    pub prioritizes_most_disadvantaged: bool,
    pub distributes_burdens_fairly: bool,
    pub exploits_vulnerable_population: bool,
    pub exacerbates_power_imbalance: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutonomyAndAgency {
    pub has_meaningful_choice: bool,
    pub coercion_or_undue_influence: bool,
    pub can_withdraw_without_penalty: bool,
    pub manipulative_design_present: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrivacyAndData {
    pub privacy_invasion_level: f64,
    pub data_minimization_respected: bool,
    pub secondary_use_without_consent: bool,
    pub data_retention_excessive: bool,
    pub reidentification_risk: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SocietalAndEnvironmental {
    pub environmental_harm: f64,
    pub long_term_societal_risk: f64,
    pub benefits_to_future_generations: f64,
    pub burden_on_vulnerable_groups: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VirtueAndCare {
    pub expresses_compassion: bool,
    pub betrays_trust: bool,
    pub respects_person_as_end: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProceduralLegitimacy {
    pub followed_approved_procedures: bool,
    pub stakeholders_consulted: bool,
    pub decision_is_explainable: bool,
    pub contestation_available: bool,
}

/// Quality of the evidence behind a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceQuality {
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EpistemicStatus {
    pub uncertainty_level: f64,
    pub evidence_quality: EvidenceQuality,
    pub novel_situation_flag: bool,
}

/// Structured description of one candidate option.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactRecord {
    pub option_id: OptionId,
    #[serde(default = "schema_version_default")]
    pub schema_version: u32,
    pub consequences: Consequences,
    pub rights_and_duties: RightsAndDuties,
    pub justice_and_fairness: JusticeAndFairness,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autonomy_and_agency: Option<AutonomyAndAgency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_and_data: Option<PrivacyAndData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub societal_and_environmental: Option<SocietalAndEnvironmental>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtue_and_care: Option<VirtueAndCare>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedural_legitimacy: Option<ProceduralLegitimacy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epistemic_status: Option<EpistemicStatus>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
}

/// A single flattened field value, used for diffs and edits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Count(u64),
    Scalar(f64),
    Text(String),
    Tags(Vec<String>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Count(n) => write!(f, "{}", n),
            FieldValue::Scalar(x) => write!(f, "{}", x),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Tags(tags) => write!(f, "[{}]", tags.join(", ")),
        }
    }
}

impl FieldValue {
    fn to_json(&self) -> Value {
        match self {
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Count(n) => Value::from(*n),
            FieldValue::Scalar(x) => Value::from(*x),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Tags(tags) => Value::from(tags.clone()),
        }
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::Number(n) if n.is_u64() => n.as_u64().map(FieldValue::Count),
            Value::Number(n) => n.as_f64().map(FieldValue::Scalar),
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            Value::Array(items) => Some(FieldValue::Tags(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            )),
            _ => None,
        }
    }
}

fn check_unit(field: &str, value: f64) -> Result<(), FactRecordError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(FactRecordError::OutOfRange {
            field: field.to_string(),
            value,
        })
    }
}

impl FactRecord {
    /// Parse a record from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self, FactRecordError> {
        let record: FactRecord =
            serde_json::from_str(json).map_err(|e| FactRecordError::Malformed(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    /// Check identifier, schema version and every bounded scalar.
    pub fn validate(&self) -> Result<(), FactRecordError> {
        if self.option_id.as_str().trim().is_empty() {
            return Err(FactRecordError::EmptyOptionId);
        }
        if self.schema_version != FACT_SCHEMA_VERSION {
            return Err(FactRecordError::SchemaVersion {
                found: self.schema_version,
                expected: FACT_SCHEMA_VERSION,
            });
        }

        let c = &self.consequences;
        check_unit("consequences.expected_benefit", c.expected_benefit)?;
        check_unit("consequences.expected_harm", c.expected_harm)?;
        check_unit("consequences.urgency", c.urgency)?;

        if let Some(p) = &self.privacy_and_data {
            check_unit("privacy_and_data.privacy_invasion_level", p.privacy_invasion_level)?;
            check_unit("privacy_and_data.reidentification_risk", p.reidentification_risk)?;
        }
        if let Some(s) = &self.societal_and_environmental {
            check_unit("societal_and_environmental.environmental_harm", s.environmental_harm)?;
            check_unit(
                "societal_and_environmental.long_term_societal_risk",
                s.long_term_societal_risk,
            )?;
            check_unit(
                "societal_and_environmental.benefits_to_future_generations",
                s.benefits_to_future_generations,
            )?;
            check_unit(
                "societal_and_environmental.burden_on_vulnerable_groups",
                s.burden_on_vulnerable_groups,
            )?;
        }
        if let Some(e) = &self.epistemic_status {
            check_unit("epistemic_status.uncertainty_level", e.uncertainty_level)?;
        }
        Ok(())
    }

    /// The same content under a different label.
    pub fn with_option_id(&self, option_id: OptionId) -> Self {
        Self {
            option_id,
            ..self.clone()
        }
    }

    /// Serialized content with the label removed.
    fn content_value(&self) -> Value {
        let mut value = serde_json::to_value(self).expect("fact record serializable");
        if let Value::Object(map) = &mut value {
            map.remove("option_id");
        }
        value
    }

    /// Content-addressed identity: BLAKE3 over the canonical JSON of the
    /// record without its `option_id`. Object keys are emitted in sorted
    /// order, so the hash does not depend on construction order.
    pub fn content_hash(&self) -> ContentHash {
        let bytes = serde_json::to_vec(&self.content_value()).expect("json value serializable");
        ContentHash::hash(&bytes)
    }

    /// Flattened `section.field → value` view of the record content.
    pub fn field_values(&self) -> BTreeMap<String, FieldValue> {
        let mut out = BTreeMap::new();
        flatten("", &self.content_value(), &mut out);
        out
    }

    /// Return a copy with one field replaced. The path must name a field
    /// present in this record (optional sections are not created). The
    /// result is validated.
    pub fn with_field(&self, path: &str, value: FieldValue) -> Result<Self, FactRecordError> {
        if path == "option_id" {
            return Err(FactRecordError::Malformed(
                "option_id is a label, not content".into(),
            ));
        }
        let mut root = serde_json::to_value(self)
            .map_err(|e| FactRecordError::Malformed(e.to_string()))?;
        let mut slot = &mut root;
        for segment in path.split('.') {
            slot = slot
                .get_mut(segment)
                .ok_or_else(|| FactRecordError::Malformed(format!("no field at path {}", path)))?;
        }
        if slot.is_object() {
            return Err(FactRecordError::Malformed(format!(
                "path {} names a section, not a field",
                path
            )));
        }
        *slot = value.to_json();
        let record: FactRecord =
            serde_json::from_value(root).map_err(|e| FactRecordError::Malformed(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut BTreeMap<String, FieldValue>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(&path, child, out);
            }
        }
        other => {
            if let Some(field) = FieldValue::from_json(other) {
                out.insert(prefix.to_string(), field);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample(option_id: &str) -> FactRecord {
        FactRecord {
            option_id: option_id.into(),
            schema_version: FACT_SCHEMA_VERSION,
            consequences: Consequences {
                expected_benefit: 0.7,
                expected_harm: 0.2,
                urgency: 0.5,
                affected_count: 12,
            },
            rights_and_duties: RightsAndDuties {
                violates_rights: false,
                has_valid_consent: true,
                violates_explicit_rule: false,
                role_duty_conflict: false,
            },
            justice_and_fairness: JusticeAndFairness {
                discriminates_on_protected_attr: false,
                prioritizes_most_disadvantaged: true,
                distributes_burdens_fairly: true,
                exploits_vulnerable_population: false,
                exacerbates_power_imbalance: false,
            },
            autonomy_and_agency: None,
            privacy_and_data: None,
            societal_and_environmental: None,
            virtue_and_care: None,
            procedural_legitimacy: None,
            epistemic_status: Some(EpistemicStatus {
                uncertainty_level: 0.1,
                evidence_quality: EvidenceQuality::High,
                novel_situation_flag: false,
            }),
            tags: BTreeSet::new(),
        }
    }

    #[test]
    fn json_round_trip_is_identical() {
        let record = sample("a");
        let json = serde_json::to_string(&record).unwrap();
        let parsed = FactRecord::from_json(&json).unwrap();
        assert_eq!(record, parsed);
        assert_eq!(json, serde_json::to_string(&parsed).unwrap());
    }

    #[test]
    fn unknown_fields_rejected() {
        let mut value = serde_json::to_value(sample("a")).unwrap();
        value["consequences"]["surprise"] = Value::from(1);
        let err = FactRecord::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, FactRecordError::Malformed(_)));
    }

    #[test]
    fn missing_required_section_rejected() {
        let mut value = serde_json::to_value(sample("a")).unwrap();
        value.as_object_mut().unwrap().remove("rights_and_duties");
        assert!(FactRecord::from_json(&value.to_string()).is_err());
    }

    #[test]
    fn out_of_range_scalar_rejected() {
        let mut record = sample("a");
        record.consequences.expected_harm = 1.2;
        assert!(matches!(
            record.validate(),
            Err(FactRecordError::OutOfRange { .. })
        ));
        record.consequences.expected_harm = f64::NAN;
        assert!(record.validate().is_err());
    }

    #[test]
    fn empty_option_id_rejected() {
        let record = sample("  ");
        assert_eq!(record.validate(), Err(FactRecordError::EmptyOptionId));
    }

    #[test]
    fn content_hash_ignores_label() {
        let a = sample("a");
        let b = a.with_option_id("zzz".into());
        assert_eq!(a.content_hash(), b.content_hash());

        let mut c = sample("a");
        c.consequences.urgency = 0.6;
        assert_ne!(a.content_hash(), c.content_hash());
    }

    #[test]
    fn field_values_flatten_sections() {
        let fields = sample("a").field_values();
        assert_eq!(
            fields.get("rights_and_duties.violates_rights"),
            Some(&FieldValue::Bool(false))
        );
        assert_eq!(
            fields.get("consequences.affected_count"),
            Some(&FieldValue::Count(12))
        );
        assert_eq!(
            fields.get("epistemic_status.evidence_quality"),
            Some(&FieldValue::Text("high".into()))
        );
        assert!(!fields.contains_key("option_id"));
    }

    #[test]
    fn with_field_returns_validated_copy() {
        let a = sample("a");
        let edited = a
            .with_field(
                "justice_and_fairness.discriminates_on_protected_attr",
                FieldValue::Bool(true),
            )
            .unwrap();
        assert!(edited.justice_and_fairness.discriminates_on_protected_attr);
        assert!(!a.justice_and_fairness.discriminates_on_protected_attr);

        let err = a
            .with_field("consequences.expected_harm", FieldValue::Scalar(3.0))
            .unwrap_err();
        assert!(matches!(err, FactRecordError::OutOfRange { .. }));
        assert!(a.with_field("privacy_and_data.reidentification_risk", FieldValue::Scalar(0.1)).is_err());
        assert!(a.with_field("option_id", FieldValue::Text("b".into())).is_err());
    }
}
