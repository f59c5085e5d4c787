//! Static capability graph: which source formats may become which targets.

use crate::format::FormatTag;

/// Every supported edge, grouped by source.
///
/// The only identity edge is CSV to CSV, which normalises the grid so CSV
/// files can join a batch targeting CSV.
const EDGES: &[(FormatTag, &[FormatTag])] = &[
    (FormatTag::Docx, &[FormatTag::PlainText, FormatTag::Html, FormatTag::Pdf, FormatTag::Pptx]),
    (FormatTag::Png, &[FormatTag::Pdf, FormatTag::Docx, FormatTag::Jpeg, FormatTag::Webp]),
    (FormatTag::Jpeg, &[FormatTag::Pdf, FormatTag::Docx, FormatTag::Png, FormatTag::Webp]),
    (FormatTag::Webp, &[FormatTag::Pdf, FormatTag::Docx, FormatTag::Png, FormatTag::Jpeg]),
    (FormatTag::PlainText, &[FormatTag::Pdf, FormatTag::Docx, FormatTag::Html]),
    (FormatTag::Json, &[FormatTag::Csv]),
    (FormatTag::Csv, &[FormatTag::Json, FormatTag::Csv, FormatTag::Xlsx]),
    (FormatTag::Markdown, &[FormatTag::Html, FormatTag::Pdf]),
    (FormatTag::Pdf, &[FormatTag::Jpeg, FormatTag::Png]),
    (FormatTag::Xlsx, &[FormatTag::Csv]),
    (FormatTag::Svg, &[FormatTag::Png]),
    (FormatTag::Xml, &[FormatTag::Json]),
    (FormatTag::Mov, &[FormatTag::Mp4]),
];

/// Targets offered for mixed-type selections with no common target.
pub const MIXED_SELECTION_DEFAULTS: [FormatTag; 5] =
    [FormatTag::Pdf, FormatTag::Png, FormatTag::Jpeg, FormatTag::Html, FormatTag::PlainText];

/// Read-only view over the capability graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityRegistry;

impl CapabilityRegistry {
    /// Returns the targets `source` can be converted to.
    pub fn valid_targets(source: FormatTag) -> &'static [FormatTag] {
        EDGES
            .iter()
            .find(|(from, _)| *from == source)
            .map(|(_, targets)| *targets)
            .unwrap_or(&[])
    }

    /// Whether a (source, target) edge exists.
    pub fn can_convert(source: FormatTag, target: FormatTag) -> bool {
        Self::valid_targets(source).contains(&target)
    }

    /// Iterates over every edge.
    pub fn edges() -> impl Iterator<Item = (FormatTag, FormatTag)> {
        EDGES
            .iter()
            .flat_map(|(from, targets)| targets.iter().map(move |to| (*from, *to)))
    }

    /// Iterates over every format that has at least one outgoing edge.
    pub fn sources() -> impl Iterator<Item = FormatTag> {
        EDGES.iter().map(|(from, _)| *from)
    }

    /// Targets every one of `sources` can reach, in the order of the first source.
    pub fn common_targets(sources: &[FormatTag]) -> Vec<FormatTag> {
        let Some((first, rest)) = sources.split_first() else {
            return Vec::new();
        };

        Self::valid_targets(*first)
            .iter()
            .copied()
            .filter(|target| rest.iter().all(|s| Self::can_convert(*s, *target)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_convert_agrees_with_valid_targets() {
        for source in FormatTag::ALL {
            for target in FormatTag::ALL {
                let listed = CapabilityRegistry::valid_targets(source).contains(&target);
                assert_eq!(
                    CapabilityRegistry::can_convert(source, target),
                    listed,
                    "{} -> {}",
                    source,
                    target
                );
                assert_eq!(
                    CapabilityRegistry::edges().any(|e| e == (source, target)),
                    listed
                );
            }
        }
    }

    #[test]
    fn test_only_csv_has_an_identity_edge() {
        let identity: Vec<_> = CapabilityRegistry::edges().filter(|(from, to)| from == to).collect();
        assert_eq!(identity, vec![(FormatTag::Csv, FormatTag::Csv)]);
    }

    #[test]
    fn test_sources_listed_once() {
        let mut sources: Vec<_> = CapabilityRegistry::sources().collect();
        let count = sources.len();
        sources.sort();
        sources.dedup();
        assert_eq!(sources.len(), count);
    }

    #[test]
    fn test_required_edges() {
        let required = [
            (FormatTag::Docx, FormatTag::PlainText),
            (FormatTag::Docx, FormatTag::Html),
            (FormatTag::Docx, FormatTag::Pdf),
            (FormatTag::Docx, FormatTag::Pptx),
            (FormatTag::Png, FormatTag::Pdf),
            (FormatTag::Png, FormatTag::Docx),
            (FormatTag::Webp, FormatTag::Png),
            (FormatTag::PlainText, FormatTag::Pdf),
            (FormatTag::PlainText, FormatTag::Docx),
            (FormatTag::PlainText, FormatTag::Html),
            (FormatTag::Json, FormatTag::Csv),
            (FormatTag::Csv, FormatTag::Json),
            (FormatTag::Csv, FormatTag::Csv),
            (FormatTag::Markdown, FormatTag::Html),
            (FormatTag::Markdown, FormatTag::Pdf),
            (FormatTag::Pdf, FormatTag::Png),
            (FormatTag::Xlsx, FormatTag::Csv),
            (FormatTag::Svg, FormatTag::Png),
            (FormatTag::Xml, FormatTag::Json),
            (FormatTag::Mov, FormatTag::Mp4),
        ];
        for (from, to) in required {
            assert!(CapabilityRegistry::can_convert(from, to), "{} -> {}", from, to);
        }
    }

    #[test]
    fn test_recognised_formats_without_edges() {
        assert!(CapabilityRegistry::valid_targets(FormatTag::Html).is_empty());
        assert!(CapabilityRegistry::valid_targets(FormatTag::Pptx).is_empty());
        assert!(CapabilityRegistry::valid_targets(FormatTag::Mp4).is_empty());
    }

    #[test]
    fn test_common_targets() {
        assert_eq!(
            CapabilityRegistry::common_targets(&[FormatTag::Png, FormatTag::Jpeg]),
            vec![FormatTag::Pdf, FormatTag::Docx, FormatTag::Webp]
        );
        assert_eq!(
            CapabilityRegistry::common_targets(&[FormatTag::Docx, FormatTag::PlainText]),
            vec![FormatTag::Html, FormatTag::Pdf]
        );
        assert_eq!(
            CapabilityRegistry::common_targets(&[FormatTag::Json, FormatTag::Csv, FormatTag::Xlsx]),
            vec![FormatTag::Csv]
        );
        assert!(CapabilityRegistry::common_targets(&[FormatTag::Json, FormatTag::Xml]).is_empty());
        assert!(CapabilityRegistry::common_targets(&[]).is_empty());
    }
}
