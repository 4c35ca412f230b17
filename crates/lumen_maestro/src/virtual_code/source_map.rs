//! Source map implementation for bidirectional position mapping.
//!
//! Maps positions between the original component source and a generated
//! virtual document. Offsets are bytes on both sides.

use bitflags::bitflags;
use lumen_carton::SourceRange;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Editor features a mapping lets through.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Capabilities: u16 {
        const DIAGNOSTICS = 1 << 0;
        const SEMANTIC = 1 << 1;
        const RENAME = 1 << 2;
        const FORMAT = 1 << 3;
        /// Go to definition and references.
        const NAVIGATION = 1 << 4;
        const COMPLETION = 1 << 5;
        /// Document symbols and outline.
        const STRUCTURE = 1 << 6;
        const AUTO_INSERT = 1 << 7;
        const HOVER = 1 << 8;
        const CODE_LENS = 1 << 9;
        const FOLDING = 1 << 10;
        const COLOR = 1 << 11;
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// A single source mapping entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mapping {
    /// Range in the original document
    pub source: SourceRange,
    /// Range in the generated virtual document
    pub generated: SourceRange,
    /// Features enabled for this mapping
    pub capabilities: Capabilities,
}

impl Mapping {
    /// Create a new mapping with all capabilities enabled.
    pub fn new(source: SourceRange, generated: SourceRange) -> Self {
        Self {
            source,
            generated,
            capabilities: Capabilities::all(),
        }
    }

    /// Create a mapping with specific capabilities.
    pub fn with_capabilities(
        source: SourceRange,
        generated: SourceRange,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            source,
            generated,
            capabilities,
        }
    }

    /// Equal-length mapping starting at the given offsets.
    pub fn verbatim(source_start: u32, generated_start: u32, len: u32) -> Self {
        Self::new(
            SourceRange::with_len(source_start, len),
            SourceRange::with_len(generated_start, len),
        )
    }

    /// Both end points are inclusive so that a cursor sitting right after a
    /// mapped token still resolves.
    #[inline]
    pub fn contains_source(&self, offset: u32) -> bool {
        self.source.contains(offset)
    }

    #[inline]
    pub fn contains_generated(&self, offset: u32) -> bool {
        self.generated.contains(offset)
    }

    #[inline]
    pub fn allows(&self, filter: Capabilities) -> bool {
        self.capabilities.contains(filter)
    }

    /// Convert a source offset to generated. The relative offset is clamped
    /// to the generated length for re-encoded (unequal-length) mappings.
    pub fn source_to_generated(&self, offset: u32) -> Option<u32> {
        if !self.contains_source(offset) {
            return None;
        }
        let relative = offset - self.source.start;
        Some(self.generated.start + relative.min(self.generated.len()))
    }

    /// Convert a generated offset to source.
    pub fn generated_to_source(&self, offset: u32) -> Option<u32> {
        if !self.contains_generated(offset) {
            return None;
        }
        let relative = offset - self.generated.start;
        Some(self.source.start + relative.min(self.source.len()))
    }

    /// Whether both sides hold the same bytes.
    pub fn is_verbatim(&self, original: &str, generated: &str) -> bool {
        match (self.source.slice(original), self.generated.slice(generated)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Mappings of one virtual code, kept sorted by generated start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMap {
    mappings: Vec<Mapping>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_mappings(mut mappings: Vec<Mapping>) -> Self {
        mappings.sort_by_key(|m| (m.generated.start, m.generated.end));
        Self { mappings }
    }

    /// Insert a mapping, keeping generated order.
    pub fn add(&mut self, mapping: Mapping) {
        let key = (mapping.generated.start, mapping.generated.end);
        let pos = self
            .mappings
            .partition_point(|m| (m.generated.start, m.generated.end) <= key);
        self.mappings.insert(pos, mapping);
    }

    #[inline]
    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Mapping> {
        self.mappings.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Mappings whose generated range contains `offset`, in generated order.
    fn generated_candidates(&self, offset: u32) -> impl Iterator<Item = &Mapping> {
        let first = self.mappings.partition_point(|m| m.generated.end < offset);
        self.mappings[first..]
            .iter()
            .take_while(move |m| m.generated.start <= offset)
            .filter(move |m| m.contains_generated(offset))
    }

    /// Find the first mapping containing the source offset with all of `filter`.
    pub fn find_by_source(&self, offset: u32, filter: Capabilities) -> Option<&Mapping> {
        self.mappings
            .iter()
            .find(|m| m.allows(filter) && m.contains_source(offset))
    }

    /// Find the first mapping containing the generated offset with all of `filter`.
    pub fn find_by_generated(&self, offset: u32, filter: Capabilities) -> Option<&Mapping> {
        self.generated_candidates(offset).find(|m| m.allows(filter))
    }

    /// Convert a source offset to a generated offset.
    ///
    /// Mappings are tried in generated order, so precise mappings win over
    /// the coarse trailing catch-all a template projection ends with.
    pub fn to_generated(&self, offset: u32, filter: Capabilities) -> Option<u32> {
        self.mappings
            .iter()
            .filter(|m| m.allows(filter))
            .find_map(|m| m.source_to_generated(offset))
    }

    /// Convert a generated offset to a source offset.
    pub fn to_source(&self, offset: u32, filter: Capabilities) -> Option<u32> {
        self.find_by_generated(offset, filter)
            .and_then(|m| m.generated_to_source(offset))
    }

    /// Convert a source range. A single mapping holding both ends is
    /// preferred; otherwise each end is mapped on its own.
    pub fn to_generated_range(&self, range: SourceRange, filter: Capabilities) -> Option<SourceRange> {
        let whole = self.mappings.iter().filter(|m| m.allows(filter)).find_map(|m| {
            Some(SourceRange::new(
                m.source_to_generated(range.start)?,
                m.source_to_generated(range.end)?,
            ))
        });
        whole.or_else(|| {
            let start = self.to_generated(range.start, filter)?;
            let end = self.to_generated(range.end, filter)?;
            (end >= start).then(|| SourceRange::new(start, end))
        })
    }

    /// Convert a generated range to a source range.
    pub fn to_source_range(&self, range: SourceRange, filter: Capabilities) -> Option<SourceRange> {
        let whole = self.generated_candidates(range.start).filter(|m| m.allows(filter)).find_map(|m| {
            Some(SourceRange::new(
                m.generated_to_source(range.start)?,
                m.generated_to_source(range.end)?,
            ))
        });
        whole.or_else(|| {
            let start = self.to_source(range.start, filter)?;
            let end = self.to_source(range.end, filter)?;
            (end >= start).then(|| SourceRange::new(start, end))
        })
    }
}

impl FromIterator<Mapping> for SourceMap {
    fn from_iter<I: IntoIterator<Item = Mapping>>(iter: I) -> Self {
        Self::from_mappings(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a SourceMap {
    type Item = &'a Mapping;
    type IntoIter = std::slice::Iter<'a, Mapping>;

    fn into_iter(self) -> Self::IntoIter {
        self.mappings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u32, end: u32) -> SourceRange {
        SourceRange::new(start, end)
    }

    #[test]
    fn test_capabilities_default_is_all() {
        assert_eq!(Capabilities::default(), Capabilities::all());
        assert!(Capabilities::all().contains(Capabilities::COLOR | Capabilities::FORMAT));
        assert!(Capabilities::empty().contains(Capabilities::empty()));
    }

    #[test]
    fn test_mapping_source_to_generated() {
        let mapping = Mapping::new(range(10, 20), range(100, 110));

        assert_eq!(mapping.source_to_generated(10), Some(100));
        assert_eq!(mapping.source_to_generated(15), Some(105));
        assert_eq!(mapping.source_to_generated(20), Some(110));
        assert_eq!(mapping.source_to_generated(21), None);
        assert_eq!(mapping.source_to_generated(5), None);
    }

    #[test]
    fn test_mapping_generated_to_source() {
        let mapping = Mapping::new(range(10, 20), range(100, 110));

        assert_eq!(mapping.generated_to_source(100), Some(10));
        assert_eq!(mapping.generated_to_source(109), Some(19));
        assert_eq!(mapping.generated_to_source(99), None);
    }

    #[test]
    fn test_mapping_clamps_unequal_lengths() {
        // `key` re-encoded as `"key"`
        let mapping = Mapping::new(range(0, 3), range(20, 25));
        assert_eq!(mapping.source_to_generated(3), Some(23));
        assert_eq!(mapping.generated_to_source(25), Some(3));
        assert_eq!(mapping.generated_to_source(24), Some(3));
    }

    #[test]
    fn test_mapping_is_verbatim() {
        let mapping = Mapping::verbatim(4, 0, 2);
        assert!(mapping.is_verbatim("<p>{hi}", "hi;"));
        assert!(!mapping.is_verbatim("<p>{ho}", "hi;"));
        assert!(!Mapping::verbatim(40, 0, 2).is_verbatim("short", "hi"));
    }

    #[test]
    fn test_source_map_sorted_by_generated() {
        let map = SourceMap::from_mappings(vec![
            Mapping::new(range(0, 5), range(50, 55)),
            Mapping::new(range(10, 15), range(0, 5)),
        ]);
        assert_eq!(map.mappings()[0].generated.start, 0);

        let mut map = map;
        map.add(Mapping::new(range(30, 31), range(20, 21)));
        let starts: Vec<_> = map.iter().map(|m| m.generated.start).collect();
        assert_eq!(starts, vec![0, 20, 50]);
    }

    #[test]
    fn test_source_map_to_generated() {
        let map = SourceMap::from_mappings(vec![
            Mapping::new(range(0, 10), range(0, 10)),
            Mapping::new(range(20, 30), range(50, 60)),
        ]);

        assert_eq!(map.to_generated(5, Capabilities::empty()), Some(5));
        assert_eq!(map.to_generated(25, Capabilities::empty()), Some(55));
        assert_eq!(map.to_generated(15, Capabilities::empty()), None);
    }

    #[test]
    fn test_source_map_to_source() {
        let map = SourceMap::from_mappings(vec![
            Mapping::new(range(0, 10), range(0, 10)),
            Mapping::new(range(20, 30), range(50, 60)),
        ]);

        assert_eq!(map.to_source(5, Capabilities::empty()), Some(5));
        assert_eq!(map.to_source(55, Capabilities::empty()), Some(25));
        assert_eq!(map.to_source(30, Capabilities::empty()), None);
    }

    #[test]
    fn test_source_map_filters_capabilities() {
        let map = SourceMap::from_mappings(vec![
            Mapping::with_capabilities(range(0, 10), range(0, 10), Capabilities::empty()),
            Mapping::with_capabilities(range(0, 10), range(20, 30), Capabilities::RENAME),
        ]);

        assert_eq!(map.to_generated(4, Capabilities::empty()), Some(4));
        assert_eq!(map.to_generated(4, Capabilities::RENAME), Some(24));
        assert_eq!(map.to_generated(4, Capabilities::FORMAT), None);
        assert_eq!(map.to_source(4, Capabilities::RENAME), None);
    }

    #[test]
    fn test_source_map_zero_width_mapping() {
        let map = SourceMap::from_mappings(vec![Mapping::with_capabilities(
            range(7, 7),
            range(40, 40),
            Capabilities::NAVIGATION,
        )]);
        assert_eq!(map.to_source(40, Capabilities::NAVIGATION), Some(7));
        assert_eq!(map.to_generated(7, Capabilities::NAVIGATION), Some(40));
        assert_eq!(map.to_source(40, Capabilities::DIAGNOSTICS), None);
    }

    #[test]
    fn test_source_map_ranges() {
        let map = SourceMap::from_mappings(vec![
            Mapping::new(range(0, 10), range(0, 10)),
            Mapping::new(range(20, 30), range(50, 60)),
        ]);

        assert_eq!(
            map.to_source_range(range(52, 58), Capabilities::empty()),
            Some(range(22, 28))
        );
        // Ends in different mappings
        assert_eq!(
            map.to_source_range(range(5, 55), Capabilities::empty()),
            Some(range(5, 25))
        );
        assert_eq!(
            map.to_generated_range(range(21, 29), Capabilities::empty()),
            Some(range(51, 59))
        );
        assert_eq!(map.to_generated_range(range(12, 14), Capabilities::empty()), None);
    }
}
