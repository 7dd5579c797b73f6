//! Handle codec laws.

use proptest::prelude::*;
use siumai_jobs::handle::HandleCodec;

const ID: &str = "[A-Za-z0-9_.:-]{1,48}";

// ids built from pieces of the default separator
const SEPARATOR_FRAGMENTS: &str = "[XBrand]{1,12}";

proptest! {
    #[test]
    fn composite_handles_round_trip(primary in ID, secondary in ID) {
        let codec = HandleCodec::default();
        prop_assume!(!primary.contains(codec.separator()) && !secondary.contains(codec.separator()));

        let handle = codec.encode(&primary, Some(&secondary)).unwrap();
        let decoded = codec.decode(&handle).unwrap();
        prop_assert_eq!(decoded.primary, primary);
        prop_assert_eq!(decoded.secondary, Some(secondary));
    }

    #[test]
    fn bare_handles_decode_to_themselves(primary in ID) {
        let codec = HandleCodec::default();
        prop_assume!(!primary.contains(codec.separator()));

        let handle = codec.encode(&primary, None).unwrap();
        prop_assert_eq!(handle.as_str(), primary.as_str());
        prop_assert_eq!(codec.decode(&handle).unwrap().secondary, None);
    }

    #[test]
    fn custom_separators_round_trip(primary in "[a-z0-9]{1,20}", secondary in "[a-z0-9]{1,20}") {
        let codec = HandleCodec::new("::").unwrap();
        let handle = codec.encode(&primary, Some(&secondary)).unwrap();
        prop_assert_eq!(handle.as_str(), format!("{primary}::{secondary}"));
        prop_assert_eq!(codec.decode(&handle).unwrap().primary, primary);
    }

    #[test]
    fn ids_embedding_the_separator_are_rejected(prefix in "[a-z]{0,8}", suffix in "[a-z]{0,8}") {
        let codec = HandleCodec::default();
        let id = format!("{prefix}XBrandX{suffix}");
        prop_assert!(codec.encode(&id, None).is_err());
        prop_assert!(codec.encode("job", Some(&id)).is_err());
    }

    #[test]
    fn encoded_handles_never_decode_to_other_ids(
        primary in SEPARATOR_FRAGMENTS,
        secondary in SEPARATOR_FRAGMENTS,
    ) {
        let codec = HandleCodec::default();
        if let Ok(handle) = codec.encode(&primary, Some(&secondary)) {
            let decoded = codec.decode(&handle).unwrap();
            prop_assert_eq!(decoded.primary, primary);
            prop_assert_eq!(decoded.secondary, Some(secondary));
        }
    }

    #[test]
    fn primary_ending_in_a_separator_prefix_is_rejected(stem in "[a-z]{1,8}", tail in "[a-z]{1,8}") {
        let codec = HandleCodec::default();
        let primary = format!("{stem}XBrand");
        let secondary = format!("X{tail}");
        prop_assert!(codec.encode(&primary, Some(&secondary)).is_err());
    }
}
