//! Finding the target gene in a record

use crate::config::{FeatureTypeList, RecognitionList};
use crate::dna::to_text;
use crate::seq::Record;

/// Outcome of looking for the target gene in one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// `gene` is the qualifier value that matched, `sequence` the bases
    /// of the feature it belongs to
    Resolved { gene: String, sequence: String },
    NoGeneFound,
    /// A feature matched but its location could not be extracted
    ParseFailure(String),
}

/// Scans features in table order, and the qualifiers of each feature in
/// the order they were written. The first qualifier value found in
/// `recognition` on a feature whose kind is in `feature_types` decides
/// the outcome; nothing after it is looked at.
pub fn resolve(
    record: &Record,
    recognition: &RecognitionList,
    feature_types: &FeatureTypeList,
) -> Resolution {
    let hit = record
        .features
        .iter()
        .filter(|f| feature_types.contains(&f.kind))
        .find_map(|f| {
            f.values()
                .find(|&(_, value)| recognition.contains(value))
                .map(|(_, value)| (f, value))
        });
    let Some((feature, gene)) = hit else {
        return Resolution::NoGeneFound;
    };
    match record.extract_location(&feature.location) {
        Ok(bases) => Resolution::Resolved {
            gene: gene.to_owned(),
            sequence: to_text(&bases),
        },
        Err(e) => {
            debug!("{}: {} feature at {}: {}", record.id, feature.kind, feature.location, e);
            Resolution::ParseFailure(e.to_string())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reader::parse_slice;

    fn record(features: &str, seq: &str) -> Record {
        let text = format!(
            "LOCUS       MN000001                {:>4} bp    DNA     linear   INV 01-JAN-2020
VERSION     MN000001.1
FEATURES             Location/Qualifiers
{}
ORIGIN
        1 {}
//
",
            seq.len(),
            features,
            seq
        );
        parse_slice(text.as_bytes()).unwrap().pop().unwrap()
    }

    fn defaults() -> (RecognitionList, FeatureTypeList) {
        (RecognitionList::default(), FeatureTypeList::default())
    }

    #[test]
    fn resolved() {
        let (recognition, types) = defaults();
        let r = record(
            "     source          1..12
                     /organism=\"Apis mellifera\"
     CDS             3..8
                     /gene=\"COI\"",
            "aaccggttaacc",
        );
        assert_eq!(
            resolve(&r, &recognition, &types),
            Resolution::Resolved {
                gene: "COI".into(),
                sequence: "CCGGTT".into()
            }
        );
    }

    #[test]
    fn no_gene() {
        let (recognition, types) = defaults();
        let r = record(
            "     gene            1..12
                     /gene=\"ND5\"
     CDS             1..12
                     /gene=\"ND5\"",
            "aaccggttaacc",
        );
        assert_eq!(resolve(&r, &recognition, &types), Resolution::NoGeneFound);
    }

    #[test]
    fn feature_kind_must_qualify() {
        let (recognition, types) = defaults();
        let r = record(
            "     misc_feature    1..4
                     /note=\"COI\"",
            "aaccggttaacc",
        );
        assert_eq!(resolve(&r, &recognition, &types), Resolution::NoGeneFound);
    }

    #[test]
    fn feature_without_qualifiers_is_passed_over() {
        let (recognition, types) = defaults();
        let r = record(
            "     CDS             1..4
     CDS             5..8
                     /gene=\"COI\"",
            "aaccggttaacc",
        );
        assert!(r.features[0].qualifiers.is_empty());
        assert_eq!(
            resolve(&r, &recognition, &types),
            Resolution::Resolved {
                gene: "COI".into(),
                sequence: "GGTT".into()
            }
        );
    }

    #[test]
    fn first_match_wins() {
        let (recognition, types) = defaults();
        // the gene feature comes first, and within the CDS the product
        // comes before the gene
        let r = record(
            "     gene            1..4
                     /gene=\"COX1\"
     CDS             5..8
                     /product=\"cytochrome c oxidase subunit I\"
                     /gene=\"COI\"",
            "aaccggttaacc",
        );
        assert_eq!(
            resolve(&r, &recognition, &types),
            Resolution::Resolved {
                gene: "COX1".into(),
                sequence: "AACC".into()
            }
        );
        let types: FeatureTypeList = ["CDS"].iter().collect();
        assert_eq!(
            resolve(&r, &recognition, &types),
            Resolution::Resolved {
                gene: "cytochrome c oxidase subunit I".into(),
                sequence: "GGTT".into()
            }
        );
    }

    #[test]
    fn matching_is_exact() {
        let (recognition, types) = defaults();
        let r = record(
            "     CDS             1..4
                     /gene=\"Coi\"
                     /product=\"COI \"",
            "aaccggttaacc",
        );
        assert_eq!(resolve(&r, &recognition, &types), Resolution::NoGeneFound);
    }

    #[test]
    fn complement() {
        let (recognition, types) = defaults();
        let r = record(
            "     CDS             complement(1..4)
                     /gene=\"cox1\"",
            "aaccggttaacc",
        );
        assert_eq!(
            resolve(&r, &recognition, &types),
            Resolution::Resolved {
                gene: "cox1".into(),
                sequence: "GGTT".into()
            }
        );
    }

    #[test]
    fn parse_failure() {
        let (recognition, types) = defaults();
        let r = record(
            "     CDS             KX000001.1:1..600
                     /gene=\"COI\"
     CDS             1..4
                     /gene=\"COI\"",
            "aaccggttaacc",
        );
        // the first match decides even though a later one would extract
        match resolve(&r, &recognition, &types) {
            Resolution::ParseFailure(reason) => assert!(reason.contains("another record")),
            x => panic!("{:?}", x),
        }
    }

    #[test]
    fn flag_qualifiers_are_skipped() {
        let (recognition, types) = defaults();
        let r = record(
            "     CDS             1..4
                     /pseudo
                     /gene=\"CO1\"",
            "aaccggttaacc",
        );
        match resolve(&r, &recognition, &types) {
            Resolution::Resolved { gene, .. } => assert_eq!(gene, "CO1"),
            x => panic!("{:?}", x),
        }
    }
}
