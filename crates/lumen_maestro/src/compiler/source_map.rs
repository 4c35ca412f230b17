//! VLQ source map decoding.

use sourcemap::SourceMap;

use super::{CompileError, RawSegment};

/// Decode a v3 JSON source map into raw segments.
///
/// Segments keep the order they were encoded in, so a map that goes
/// backwards is left for the repair step to reject. Single-field segments
/// (generated position only) come back unmapped.
pub fn decode_source_map(json: &str) -> Result<Vec<RawSegment>, CompileError> {
    let map = SourceMap::from_slice(json.as_bytes())
        .map_err(|err| CompileError::SourceMap(err.to_string()))?;

    let segments: Vec<RawSegment> = map
        .tokens()
        .map(|token| {
            let generated = (token.get_dst_line(), token.get_dst_col());
            if token.get_src_id() == u32::MAX {
                RawSegment::unmapped(generated)
            } else {
                RawSegment::mapped(generated, (token.get_src_line(), token.get_src_col()))
            }
        })
        .collect();

    tracing::trace!(segments = segments.len(), "decoded source map");
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_json(mappings: &str) -> String {
        format!(
            r#"{{"version":3,"sources":["index.astro"],"names":[],"mappings":"{mappings}"}}"#
        )
    }

    #[test]
    fn test_decode_segments() {
        let segments = decode_source_map(&map_json("AAAA,E,IAAI;AACA")).unwrap();

        assert_eq!(
            segments,
            vec![
                RawSegment::mapped((0, 0), (0, 0)),
                RawSegment::unmapped((0, 2)),
                RawSegment::mapped((0, 6), (0, 4)),
                RawSegment::mapped((1, 0), (1, 4)),
            ]
        );
    }

    #[test]
    fn test_decode_keeps_encoded_order() {
        let segments = decode_source_map(&map_json("IAAA,JAAA")).unwrap();
        assert_eq!(
            segments,
            vec![
                RawSegment::mapped((0, 4), (0, 0)),
                RawSegment::mapped((0, 0), (0, 0)),
            ]
        );
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode_source_map(&map_json("")).unwrap().is_empty());
    }

    #[test]
    fn test_decode_invalid() {
        assert!(matches!(
            decode_source_map("[]"),
            Err(CompileError::SourceMap(_))
        ));
    }
}
