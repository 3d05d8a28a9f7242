use std::fmt;
use std::str::FromStr;

use deme_types::FactRecord;
use serde::{Deserialize, Serialize};

/// Named hard-veto predicates a profile can activate.
///
/// Every predicate is monotone: making the triggering fields worse never
/// turns a firing predicate off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VetoPredicate {
    RightsViolation,
    ProtectedAttributeDiscrimination,
    ExploitsVulnerablePopulation,
    CoercionOrUndueInfluence,
    SecondaryUseWithoutConsent,
    SeverePrivacyInvasion,
    SevereEnvironmentalHarm,
}

/// Threshold at which scalar dimensions count as severe.
pub const SEVERE_THRESHOLD: f64 = 0.9;

impl VetoPredicate {
    pub const ALL: [VetoPredicate; 7] = [
        VetoPredicate::RightsViolation,
        VetoPredicate::ProtectedAttributeDiscrimination,
        VetoPredicate::ExploitsVulnerablePopulation,
        VetoPredicate::CoercionOrUndueInfluence,
        VetoPredicate::SecondaryUseWithoutConsent,
        VetoPredicate::SeverePrivacyInvasion,
        VetoPredicate::SevereEnvironmentalHarm,
    ];

    /// Predicates the universal floor always applies.
    pub const FLOOR: [VetoPredicate; 2] = [
        VetoPredicate::RightsViolation,
        VetoPredicate::ProtectedAttributeDiscrimination,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VetoPredicate::RightsViolation => "rights_violation",
            VetoPredicate::ProtectedAttributeDiscrimination => "protected_attribute_discrimination",
            VetoPredicate::ExploitsVulnerablePopulation => "exploits_vulnerable_population",
            VetoPredicate::CoercionOrUndueInfluence => "coercion_or_undue_influence",
            VetoPredicate::SecondaryUseWithoutConsent => "secondary_use_without_consent",
            VetoPredicate::SeverePrivacyInvasion => "severe_privacy_invasion",
            VetoPredicate::SevereEnvironmentalHarm => "severe_environmental_harm",
        }
    }

    /// Fact-record field(s) the predicate reads.
    pub fn trigger_fields(&self) -> &'static [&'static str] {
        match self {
            VetoPredicate::RightsViolation => &["rights_and_duties.violates_rights"],
            VetoPredicate::ProtectedAttributeDiscrimination => {
                &["justice_and_fairness.discriminates_on_protected_attr"]
            }
            VetoPredicate::ExploitsVulnerablePopulation => {
                &["justice_and_fairness.exploits_vulnerable_population"]
            }
            VetoPredicate::CoercionOrUndueInfluence => {
                &["autonomy_and_agency.coercion_or_undue_influence"]
            }
            VetoPredicate::SecondaryUseWithoutConsent => {
                &["privacy_and_data.secondary_use_without_consent"]
            }
            VetoPredicate::SeverePrivacyInvasion => &["privacy_and_data.privacy_invasion_level"],
            VetoPredicate::SevereEnvironmentalHarm => {
                &["societal_and_environmental.environmental_harm"]
            }
        }
    }

    pub fn holds(&self, fact: &FactRecord) -> bool {
        match self {
            VetoPredicate::RightsViolation => fact.rights_and_duties.violates_rights,
            VetoPredicate::ProtectedAttributeDiscrimination => {
                fact.justice_and_fairness.discriminates_on_protected_attr
            }
            VetoPredicate::ExploitsVulnerablePopulation => {
                fact.justice_and_fairness.exploits_vulnerable_population
            }
            VetoPredicate::CoercionOrUndueInfluence => fact
                .autonomy_and_agency
                .as_ref()
                .is_some_and(|a| a.coercion_or_undue_influence),
            VetoPredicate::SecondaryUseWithoutConsent => fact
                .privacy_and_data
                .as_ref()
                .is_some_and(|p| p.secondary_use_without_consent),
            VetoPredicate::SeverePrivacyInvasion => fact
                .privacy_and_data
                .as_ref()
                .is_some_and(|p| p.privacy_invasion_level >= SEVERE_THRESHOLD),
            VetoPredicate::SevereEnvironmentalHarm => fact
                .societal_and_environmental
                .as_ref()
                .is_some_and(|s| s.environmental_harm >= SEVERE_THRESHOLD),
        }
    }
}

impl fmt::Display for VetoPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown veto predicate: {0}")]
pub struct UnknownVetoPredicate(pub String);

impl FromStr for VetoPredicate {
    type Err = UnknownVetoPredicate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VetoPredicate::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownVetoPredicate(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deme_types::PrivacyAndData;

    #[test]
    fn names_round_trip() {
        for predicate in VetoPredicate::ALL {
            assert_eq!(predicate.as_str().parse::<VetoPredicate>().unwrap(), predicate);
            let json = serde_json::to_string(&predicate).unwrap();
            assert_eq!(json, format!("\"{}\"", predicate.as_str()));
        }
        assert!("not_a_predicate".parse::<VetoPredicate>().is_err());
    }

    #[test]
    fn floor_predicates_read_required_sections() {
        let mut fact = crate::tests::fact("a");
        assert!(!VetoPredicate::RightsViolation.holds(&fact));
        fact.rights_and_duties.violates_rights = true;
        assert!(VetoPredicate::RightsViolation.holds(&fact));
    }

    #[test]
    fn optional_sections_never_fire_when_absent() {
        let fact = crate::tests::fact("a");
        assert!(!VetoPredicate::SeverePrivacyInvasion.holds(&fact));
        assert!(!VetoPredicate::CoercionOrUndueInfluence.holds(&fact));
    }

    #[test]
    fn severe_privacy_threshold() {
        let mut fact = crate::tests::fact("a");
        fact.privacy_and_data = Some(PrivacyAndData {
            privacy_invasion_level: 0.89,
            data_minimization_respected: true,
            secondary_use_without_consent: false,
            data_retention_excessive: false,
            reidentification_risk: 0.0,
        });
        assert!(!VetoPredicate::SeverePrivacyInvasion.holds(&fact));
        if let Some(p) = fact.privacy_and_data.as_mut() {
            p.privacy_invasion_level = 0.9;
        }
        assert!(VetoPredicate::SeverePrivacyInvasion.holds(&fact));
    }
}
