//! Boundary admission of submitted options.

use std::collections::BTreeSet;

use deme_types::{FactRecordError, OptionInput, RejectedOption};
use tracing::warn;

/// Split submitted options into admitted ones (input order preserved) and
/// rejections. An option is rejected when its record fails validation,
/// when the envelope id disagrees with the record's `option_id`, or when
/// the id was already admitted earlier in the request.
pub fn admit(options: &[OptionInput]) -> (Vec<&OptionInput>, Vec<RejectedOption>) {
    let mut admitted = Vec::with_capacity(options.len());
    let mut rejected = Vec::new();
    let mut seen = BTreeSet::new();

    for option in options {
        let verdict = if option.option_id != option.fact_record.option_id {
            Err(FactRecordError::Malformed(format!(
                "envelope id {} does not match record id {}",
                option.option_id, option.fact_record.option_id
            )))
        } else if seen.contains(&option.option_id) {
            Err(FactRecordError::Malformed(format!(
                "duplicate option_id {}",
                option.option_id
            )))
        } else {
            option.fact_record.validate()
        };

        match verdict {
            Ok(()) => {
                seen.insert(option.option_id.clone());
                admitted.push(option);
            }
            Err(error) => {
                warn!(option_id = %option.option_id, error = %error, "Option rejected at ingestion");
                rejected.push(RejectedOption {
                    option_id: option.option_id.clone(),
                    error,
                });
            }
        }
    }
    (admitted, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_mismatched_and_duplicate() {
        let mut bad = crate::tests::fact("bad");
        bad.consequences.urgency = 2.0;
        let mut mismatched = OptionInput::new(crate::tests::fact("m"));
        mismatched.option_id = "other".into();

        let options = vec![
            OptionInput::new(crate::tests::fact("a")),
            OptionInput::new(bad),
            mismatched,
            OptionInput::new(crate::tests::fact("a")),
            OptionInput::new(crate::tests::fact("b")),
        ];
        let (admitted, rejected) = admit(&options);
        let ids: Vec<&str> = admitted.iter().map(|o| o.option_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(rejected.len(), 3);
        assert!(matches!(rejected[0].error, FactRecordError::OutOfRange { .. }));
    }
}
