//! Neighborhood windower: symmetric flanking windows around every occurrence
//! of a query ortho tag, with strand-aware coordinate renormalization.
//!
//! A window around a minus-strand anchor is expressed in negated coordinates:
//! gene spans are sign-flipped with start/end swapped and strands inverted, so
//! every window reads 5'->3' relative to its anchor. Window coordinates are
//! already normalized; consumers must never re-flip them.

use crate::genome::{Gene, GenomeSet};
use serde::{Deserialize, Serialize};

/// A gene projected into window coordinates.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WindowGene {
    pub gene_name: String,
    pub start: i64,
    pub end: i64,
    pub strand: i8,
    #[serde(rename = "type")]
    pub gene_type: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ortho_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// One flanking window around one anchor occurrence. Ephemeral: recomputed on
/// every query, never persisted back into the genome model.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    /// Window bounds in anchor-relative, strand-normalized coordinates.
    /// Negative values are expected for minus-strand anchors.
    pub start: i64,
    pub end: i64,
    /// Source genome name.
    pub idx: String,
    /// Display label: `<genome>:<contig>(<+|->)`, plus the species when known.
    pub label: String,
    pub contig_length: i64,
    pub genes: Vec<WindowGene>,
}

impl WindowGene {
    fn forward(gene: &Gene) -> Self {
        Self {
            gene_name: gene.gene_name.clone(),
            start: gene.start,
            end: gene.end,
            strand: gene.strand,
            gene_type: gene.gene_type.clone(),
            description: gene.description.clone(),
            ortho_tag: gene.ortho_tag.clone(),
            color: None,
        }
    }

    /// Reverse-complement projection: negate both coordinates (which swaps
    /// their order) and invert the strand.
    fn mirrored(gene: &Gene) -> Self {
        Self {
            gene_name: gene.gene_name.clone(),
            start: -gene.end,
            end: -gene.start,
            strand: -gene.strand,
            gene_type: gene.gene_type.clone(),
            description: gene.description.clone(),
            ortho_tag: gene.ortho_tag.clone(),
            color: None,
        }
    }
}

fn window_label(genome_name: &str, contig_name: &str, sign: char, species: Option<&str>) -> String {
    match species {
        Some(species) => format!("{genome_name}:{contig_name}({sign}) {species}"),
        None => format!("{genome_name}:{contig_name}({sign})"),
    }
}

/// Build the window around one anchor gene on its contig.
///
/// Plus/zero-strand anchors keep original coordinates; a contig gene belongs
/// to the window iff it overlaps the bounds inclusively
/// (`gene.end >= lo && gene.start <= hi`). Minus-strand anchors mirror the
/// whole coordinate system so the anchor reads in canonical orientation.
pub fn center_around(
    anchor: &Gene,
    contig_genes: &[Gene],
    flank_size: i64,
    genome_name: &str,
    species_name: Option<&str>,
    contig_name: &str,
    contig_length: i64,
) -> Window {
    let center_pos = anchor.center();
    if anchor.strand == -1 {
        let start = -center_pos - flank_size;
        let end = -center_pos + flank_size;
        Window {
            start,
            end,
            idx: genome_name.to_string(),
            label: window_label(genome_name, contig_name, '-', species_name),
            contig_length,
            genes: contig_genes
                .iter()
                .filter(|gene| -gene.start >= start && -gene.end <= end)
                .map(WindowGene::mirrored)
                .collect(),
        }
    } else {
        let start = center_pos - flank_size;
        let end = center_pos + flank_size;
        Window {
            start,
            end,
            idx: genome_name.to_string(),
            label: window_label(genome_name, contig_name, '+', species_name),
            contig_length,
            genes: contig_genes
                .iter()
                .filter(|gene| gene.end >= start && gene.start <= end)
                .map(WindowGene::forward)
                .collect(),
        }
    }
}

/// One window per occurrence of `query_tag`, over every genome and contig, in
/// genome x contig x occurrence order. Zero matches yield an empty vector;
/// `flank_size <= 0` yields degenerate windows rather than an error.
pub fn around_ortho(set: &GenomeSet, query_tag: &str, flank_size: i64) -> Vec<Window> {
    let mut windows = vec![];
    for genome in &set.genomes {
        for contig in &genome.contigs {
            for anchor in contig
                .genes
                .iter()
                .filter(|gene| gene.ortho_tag.as_deref() == Some(query_tag))
            {
                windows.push(center_around(
                    anchor,
                    &contig.genes,
                    flank_size,
                    &genome.genome_name,
                    genome.species_name.as_deref(),
                    &contig.contig_name,
                    contig.contig_length,
                ));
            }
        }
    }
    windows
}
