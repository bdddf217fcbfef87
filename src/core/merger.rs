//! Fragment Merger (spec §4.3): collapses adjacent text fragments on the
//! same baseline into logical text elements, and coalesces collinear
//! stroke segments into logical ruled lines.

use super::geometry::Point;
use super::interpreter::{LineSegment, TextFragment};

const BASELINE_EPSILON: f64 = 2.0;
const LINE_EPSILON: f64 = 2.0;

/// A merged run of one or more [`TextFragment`]s sharing a baseline, font
/// resource, and font size, with no more than `0.3 * font_size` of gap
/// between consecutive constituents.
#[derive(Debug, Clone, PartialEq)]
pub struct TextElement {
    pub text: String,
    pub origin: Point,
    pub width: f64,
    pub font_size: f64,
    pub font_resource_name: String,
}

impl TextElement {
    pub fn height(&self) -> f64 {
        self.font_size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A coalesced run of overlapping/touching collinear [`LineSegment`]s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuledLine {
    pub orientation: Orientation,
    pub axis: f64,
    pub lo: f64,
    pub hi: f64,
    pub stroke_width: f64,
}

/// Merges adjacent text fragments into logical text elements.
///
/// Sorts by descending `y` then ascending `x` before merging, per spec;
/// this also happens to be a convenient order for the Reconstructor's
/// row bucketing downstream, though the Reconstructor re-sorts its own
/// rows explicitly rather than relying on this.
pub fn merge_text_fragments(mut fragments: Vec<TextFragment>) -> Vec<TextElement> {
    fragments.sort_by(|a, b| {
        b.origin
            .y
            .partial_cmp(&a.origin.y)
            .unwrap()
            .then(a.origin.x.partial_cmp(&b.origin.x).unwrap())
    });

    let mut elements: Vec<TextElement> = Vec::new();
    let mut last: Option<TextFragment> = None;

    for fragment in fragments {
        let merge_with_current = match (&elements.last(), &last) {
            (Some(current), Some(prev)) => {
                (prev.origin.y - fragment.origin.y).abs() < BASELINE_EPSILON
                    && fragment.origin.x - (prev.origin.x + prev.advance_width) >= 0.0
                    && fragment.origin.x - (prev.origin.x + prev.advance_width)
                        < 0.3 * prev.font_size
                    && prev.font_resource_name == fragment.font_resource_name
                    && (prev.font_size - fragment.font_size).abs() < f64::EPSILON
                    && !current.text.is_empty()
            }
            _ => false,
        };

        if merge_with_current {
            let current = elements.last_mut().unwrap();
            current.text.push_str(&fragment.text);
            current.width = (fragment.origin.x + fragment.advance_width) - current.origin.x;
        } else {
            elements.push(TextElement {
                text: fragment.text.clone(),
                origin: fragment.origin,
                width: fragment.advance_width,
                font_size: fragment.font_size,
                font_resource_name: fragment.font_resource_name.clone(),
            });
        }
        last = Some(fragment);
    }

    elements
}

/// Partitions, groups, and coalesces stroked segments into ruled lines.
pub fn coalesce_lines(segments: Vec<LineSegment>) -> Vec<RuledLine> {
    let mut horizontal = Vec::new();
    let mut vertical = Vec::new();

    for seg in segments {
        let dx = (seg.end.x - seg.start.x).abs();
        let dy = (seg.end.y - seg.start.y).abs();
        if dy < LINE_EPSILON {
            let axis = (seg.start.y + seg.end.y) / 2.0;
            let (lo, hi) = if seg.start.x <= seg.end.x {
                (seg.start.x, seg.end.x)
            } else {
                (seg.end.x, seg.start.x)
            };
            horizontal.push((axis, lo, hi, seg.stroke_width));
        } else if dx < LINE_EPSILON {
            let axis = (seg.start.x + seg.end.x) / 2.0;
            let (lo, hi) = if seg.start.y <= seg.end.y {
                (seg.start.y, seg.end.y)
            } else {
                (seg.end.y, seg.start.y)
            };
            vertical.push((axis, lo, hi, seg.stroke_width));
        }
    }

    let mut lines = coalesce_group(horizontal, Orientation::Horizontal);
    lines.extend(coalesce_group(vertical, Orientation::Vertical));
    lines
}

/// Groups `(axis, lo, hi, width)` tuples by axis coordinate (tolerance
/// `LINE_EPSILON`) and merges overlapping/touching spans within a group.
fn coalesce_group(
    mut items: Vec<(f64, f64, f64, f64)>,
    orientation: Orientation,
) -> Vec<RuledLine> {
    items.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    let mut groups: Vec<Vec<(f64, f64, f64, f64)>> = Vec::new();
    for item in items {
        match groups.last_mut() {
            Some(group) if (item.0 - group[0].0).abs() < LINE_EPSILON => group.push(item),
            _ => groups.push(vec![item]),
        }
    }

    let mut result = Vec::new();
    for mut group in groups {
        group.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
        let axis = group.iter().map(|g| g.0).sum::<f64>() / group.len() as f64;

        let mut current: Option<(f64, f64, f64)> = None; // (lo, hi, stroke_width)
        for (_, lo, hi, width) in group {
            current = match current {
                Some((clo, chi, cwidth)) if lo <= chi + LINE_EPSILON => {
                    Some((clo, chi.max(hi), cwidth.max(width)))
                }
                Some((clo, chi, cwidth)) => {
                    result.push(RuledLine {
                        orientation,
                        axis,
                        lo: clo,
                        hi: chi,
                        stroke_width: cwidth,
                    });
                    Some((lo, hi, width))
                }
                None => Some((lo, hi, width)),
            };
        }
        if let Some((lo, hi, width)) = current {
            result.push(RuledLine {
                orientation,
                axis,
                lo,
                hi,
                stroke_width: width,
            });
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(text: &str, x: f64, y: f64, width: f64, font_size: f64, font: &str) -> TextFragment {
        TextFragment {
            text: text.to_string(),
            origin: Point::new(x, y),
            advance_width: width,
            font_size,
            font_resource_name: font.to_string(),
        }
    }

    #[test]
    fn test_merges_adjacent_same_baseline() {
        let fragments = vec![
            frag("Hello ", 0.0, 700.0, 30.0, 10.0, "F1"),
            frag("World", 30.5, 700.0, 25.0, 10.0, "F1"),
        ];
        let elements = merge_text_fragments(fragments);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].text, "Hello World");
        assert_eq!(elements[0].width, 55.5);
    }

    #[test]
    fn test_does_not_merge_across_large_gap() {
        let fragments = vec![
            frag("Name", 50.0, 700.0, 30.0, 10.0, "F1"),
            frag("Age", 200.0, 700.0, 20.0, 10.0, "F1"),
        ];
        let elements = merge_text_fragments(fragments);
        assert_eq!(elements.len(), 2);
    }

    #[test]
    fn test_does_not_merge_different_baselines() {
        let fragments = vec![
            frag("Row1", 50.0, 700.0, 30.0, 10.0, "F1"),
            frag("Row2", 50.0, 680.0, 30.0, 10.0, "F1"),
        ];
        let elements = merge_text_fragments(fragments);
        assert_eq!(elements.len(), 2);
    }

    #[test]
    fn test_does_not_merge_different_fonts() {
        let fragments = vec![
            frag("A", 0.0, 700.0, 6.0, 10.0, "F1"),
            frag("B", 6.0, 700.0, 6.0, 10.0, "F2"),
        ];
        let elements = merge_text_fragments(fragments);
        assert_eq!(elements.len(), 2);
    }

    #[test]
    fn test_sorts_by_descending_y_then_ascending_x() {
        let fragments = vec![
            frag("Second", 50.0, 680.0, 10.0, 10.0, "F1"),
            frag("First", 50.0, 700.0, 10.0, 10.0, "F1"),
        ];
        let elements = merge_text_fragments(fragments);
        assert_eq!(elements[0].text, "First");
        assert_eq!(elements[1].text, "Second");
    }

    #[test]
    fn test_coalesce_merges_overlapping_horizontal_segments() {
        let segments = vec![
            LineSegment {
                start: Point::new(0.0, 100.0),
                end: Point::new(50.0, 100.0),
                stroke_width: 1.0,
            },
            LineSegment {
                start: Point::new(49.0, 100.5),
                end: Point::new(120.0, 100.5),
                stroke_width: 1.0,
            },
        ];
        let lines = coalesce_lines(segments);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].orientation, Orientation::Horizontal);
        assert_eq!(lines[0].lo, 0.0);
        assert_eq!(lines[0].hi, 120.0);
    }

    #[test]
    fn test_coalesce_keeps_disjoint_groups_separate() {
        let segments = vec![
            LineSegment {
                start: Point::new(0.0, 0.0),
                end: Point::new(50.0, 0.0),
                stroke_width: 1.0,
            },
            LineSegment {
                start: Point::new(0.0, 200.0),
                end: Point::new(50.0, 200.0),
                stroke_width: 1.0,
            },
        ];
        let lines = coalesce_lines(segments);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_coalesce_separates_horizontal_and_vertical() {
        let segments = vec![
            LineSegment {
                start: Point::new(0.0, 0.0),
                end: Point::new(50.0, 0.0),
                stroke_width: 1.0,
            },
            LineSegment {
                start: Point::new(0.0, 0.0),
                end: Point::new(0.0, 50.0),
                stroke_width: 1.0,
            },
        ];
        let lines = coalesce_lines(segments);
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().any(|l| l.orientation == Orientation::Horizontal));
        assert!(lines.iter().any(|l| l.orientation == Orientation::Vertical));
    }
}
