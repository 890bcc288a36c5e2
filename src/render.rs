//! Headless SVG export of colored window sets.
//!
//! One horizontal track per window: a contig-edge line, then one glyph per
//! gene. CDS genes render as strand-aware arrows (plus points right, minus
//! points left, unstranded is a plain box), RNA genes as triangles, repeats
//! as diamonds. All geometry works in the window's already-normalized
//! coordinates; the strand decides glyph shape only.

use crate::genome::UNCOLORED;
use crate::neighborhood::{Window, WindowGene};
use svg::Document;
use svg::node::element::{Line, Polygon, Text};

const LABEL_HEIGHT: f64 = 12.0;
const RNA_FILL: &str = "#8c8c8c";
const REPEAT_FILL: &str = "#c9c9c9";
const OUTLINE: &str = "#333333";

/// Linear map from window coordinates to panel pixels.
#[derive(Clone, Copy, Debug)]
struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    fn map(&self, x: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return r0;
        }
        r0 + (x - d0) * (r1 - r0) / (d1 - d0)
    }
}

fn point_list(points: &[(f64, f64)]) -> String {
    points
        .iter()
        .map(|(x, y)| format!("{x},{y}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Arrow polygon for a CDS: a box with a pointed 3' end on stranded genes.
fn gene_arrow_points(gene: &WindowGene, height: f64, offset: f64, space: f64, scale: &LinearScale) -> String {
    let cap = offset + LABEL_HEIGHT + space;
    let bottom = offset + LABEL_HEIGHT + height - space;
    let middle = (cap + bottom) / 2.0;

    let start = scale.map(gene.start as f64);
    let end = scale.map(gene.end as f64);
    // Never let the arrow head push past the other end of the gene.
    let box_end = (end - 2.0 * space).max(start);
    let box_start = (start + 2.0 * space).min(end);

    match gene.strand {
        1 => point_list(&[
            (start, cap),
            (box_end, cap),
            (end, middle),
            (box_end, bottom),
            (start, bottom),
        ]),
        -1 => point_list(&[
            (start, middle),
            (box_start, cap),
            (end, cap),
            (end, bottom),
            (box_start, bottom),
        ]),
        _ => point_list(&[(start, cap), (end, cap), (end, bottom), (start, bottom)]),
    }
}

fn rna_triangle_points(gene: &WindowGene, height: f64, offset: f64, space: f64, scale: &LinearScale) -> String {
    let cap = offset + LABEL_HEIGHT + space;
    let bottom = offset + LABEL_HEIGHT + height - space;
    let start = scale.map(gene.start as f64);
    let end = scale.map(gene.end as f64);
    let center = (start + end) / 2.0;
    point_list(&[(start, bottom), (center, cap), (end, bottom), (start, bottom)])
}

fn repeat_diamond_points(gene: &WindowGene, height: f64, offset: f64, space: f64, scale: &LinearScale) -> String {
    let cap = offset + LABEL_HEIGHT + space;
    let bottom = offset + LABEL_HEIGHT + height - space;
    let start = scale.map(gene.start as f64);
    let end = scale.map(gene.end as f64);
    let center = (start + end) / 2.0;
    let middle = (cap + bottom) / 2.0;
    point_list(&[
        (start, middle),
        (center, cap),
        (end, middle),
        (center, bottom),
        (start, middle),
    ])
}

fn gene_fill(gene: &WindowGene) -> String {
    if gene.is_rna() {
        return RNA_FILL.to_string();
    }
    if gene.is_repeat() {
        return REPEAT_FILL.to_string();
    }
    gene.color.clone().unwrap_or_else(|| UNCOLORED.to_string())
}

impl WindowGene {
    fn is_rna(&self) -> bool {
        self.gene_type.contains("RNA")
    }

    fn is_repeat(&self) -> bool {
        self.gene_type.contains("repeat")
    }
}

/// Render one track per window into an SVG document.
///
/// `track_height` is the glyph lane height in pixels (the original UI default
/// is 20); each track additionally carries a label band above and below.
pub fn windows_svg(windows: &[Window], track_height: f64, width: f64) -> Document {
    let single_track_height = track_height + 2.0 * LABEL_HEIGHT;
    let mut doc = Document::new()
        .set("viewBox", (0.0, 0.0, width, single_track_height * windows.len() as f64))
        .set("width", width)
        .set("height", single_track_height * windows.len() as f64);

    for (i, window) in windows.iter().enumerate() {
        let offset = single_track_height * i as f64;
        let space = track_height / 10.0;
        let scale = LinearScale::new((window.start as f64, window.end as f64), (0.0, width));

        // Contig-edge line. In mirrored windows the contig extends toward
        // negative coordinates, so pick the direction from the bounds' sign.
        let rev = if window.start + window.end > 0 { 1.0 } else { -1.0 };
        let start_pos = scale.map(0.0);
        let end_pos = scale.map(window.contig_length as f64 * rev);
        let y = offset + LABEL_HEIGHT + track_height / 2.0;
        doc = doc.add(
            Line::new()
                .set("x1", start_pos.max(0.0).min(width))
                .set("y1", y)
                .set("x2", end_pos.min(width).max(0.0))
                .set("y2", y)
                .set("stroke", "#000000")
                .set("stroke-width", 1),
        );

        for gene in &window.genes {
            let points = if gene.is_rna() {
                rna_triangle_points(gene, track_height, offset, space, &scale)
            } else if gene.is_repeat() {
                repeat_diamond_points(gene, track_height, offset, space, &scale)
            } else {
                gene_arrow_points(gene, track_height, offset, space, &scale)
            };
            doc = doc.add(
                Polygon::new()
                    .set("points", points)
                    .set("fill", gene_fill(gene))
                    .set("stroke", OUTLINE)
                    .set("stroke-width", 0.5),
            );
        }

        doc = doc.add(
            Text::new(window.label.clone())
                .set("x", width - 5.0)
                .set("y", offset + LABEL_HEIGHT)
                .set("text-anchor", "end")
                .set("font-size", LABEL_HEIGHT),
        );
    }
    doc
}

pub fn windows_svg_string(windows: &[Window], track_height: f64, width: f64) -> String {
    windows_svg(windows, track_height, width).to_string()
}
