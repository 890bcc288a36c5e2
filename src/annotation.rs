//! Annotation loader: GFF3 files to the normalized genome model.
//!
//! GFF text parsing itself is delegated to `bio::io::gff`; this module only
//! consumes the flat records it emits. The `##sequence-region` headers are
//! scanned from the raw text first, because the record parser skips comment
//! lines. Ortho-tag and species-metadata files are plain-text overlays
//! applied onto an already-loaded [`GenomeSet`].

use crate::error::{OrthoplotError, Result};
use crate::genome::{Contig, Gene, Genome, GenomeSet};
use bio::io::gff::{self, GffType};
use bio_types::strand::Strand;
use csv::ReaderBuilder;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// One flat feature record as produced by the external GFF parser.
///
/// Attributes are key-sorted: the upstream parser hands them back in hash
/// order, which would make gene descriptions nondeterministic.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureRecord {
    pub seq_id: String,
    pub feature_type: String,
    pub start: i64,
    pub end: i64,
    pub strand: i8,
    pub attributes: BTreeMap<String, Vec<String>>,
}

/// Attribute keys that never contribute to a gene description.
const SKIPPED_ATTRIBUTE_KEYS: [&str; 2] = ["source", "phase"];

/// Separator between description fields, kept verbatim for the rendering
/// collaborator which displays descriptions as HTML tooltips.
pub const DESCRIPTION_SEPARATOR: &str = "<br>";

/// Scan `##sequence-region <name> <start> <end>` headers for declared
/// contig lengths. Contigs without a header are simply absent from the map.
pub fn contig_lengths_from_str(gff_text: &str) -> HashMap<String, i64> {
    let mut lengths = HashMap::new();
    for line in gff_text.lines() {
        if !line.starts_with("##sequence-region") {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() >= 4 {
            if let Ok(length) = parts[3].parse::<i64>() {
                lengths.insert(parts[1].to_string(), length);
            }
        }
    }
    lengths
}

/// Run the external GFF parser over `gff_text` and collect flat records.
/// Aborts on the first malformed record, naming it; no partial output.
pub fn records_from_gff_str(gff_text: &str) -> Result<Vec<FeatureRecord>> {
    let mut reader = gff::Reader::new(gff_text.as_bytes(), GffType::GFF3);
    let mut records = vec![];
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            OrthoplotError::Parse(format!("GFF feature record {}: {e}", i + 1))
        })?;
        let strand = match record.strand() {
            Some(Strand::Forward) => 1,
            Some(Strand::Reverse) => -1,
            _ => 0,
        };
        let mut attributes: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for key in record.attributes().keys() {
            if let Some(values) = record.attributes().get_vec(key) {
                attributes.insert(key.clone(), values.clone());
            }
        }
        records.push(FeatureRecord {
            seq_id: record.seqname().to_string(),
            feature_type: record.feature_type().to_string(),
            start: *record.start() as i64,
            end: *record.end() as i64,
            strand,
            attributes,
        });
    }
    Ok(records)
}

fn describe(record: &FeatureRecord) -> String {
    let mut fields = vec![format!("pos={}-{}", record.start, record.end)];
    for (key, values) in &record.attributes {
        if SKIPPED_ATTRIBUTE_KEYS.contains(&key.as_str()) {
            continue;
        }
        if let Some(first) = values.first() {
            fields.push(format!("{key}={first}"));
        }
    }
    fields.join(DESCRIPTION_SEPARATOR)
}

/// Group flat feature records into a [`Genome`], contigs in first-seen order,
/// genes in record order.
///
/// Unnamed features become `unknown_<start>_<end>`. Features of type exactly
/// `repeat_region` are renamed `<contig>_repeat_<n>`, where `n` counts the
/// current unbroken run of repeat records and resets on any other feature.
/// The counter follows record order across the whole file, so the scheme
/// assumes repeats arrive adjacent to each other; interleaved input could
/// produce duplicate names. Deliberately preserved as-is.
pub fn build_genome(
    genome_name: &str,
    records: &[FeatureRecord],
    contig_lengths: &HashMap<String, i64>,
) -> Genome {
    let mut genome = Genome::new(genome_name.to_string());
    let mut contig_order: Vec<String> = vec![];
    let mut contigs: HashMap<String, Contig> = HashMap::new();
    let mut repeat_idx: i64 = -1;

    for record in records {
        let contig = contigs.entry(record.seq_id.clone()).or_insert_with(|| {
            contig_order.push(record.seq_id.clone());
            let mut contig = Contig::new(record.seq_id.clone());
            contig.contig_length = contig_lengths.get(&record.seq_id).copied().unwrap_or(0);
            contig
        });

        let mut gene_name = record
            .attributes
            .get("ID")
            .and_then(|values| values.first().cloned())
            .unwrap_or_else(|| format!("unknown_{}_{}", record.start, record.end));
        if record.feature_type == "repeat_region" {
            repeat_idx += 1;
            gene_name = format!("{}_repeat_{}", record.seq_id, repeat_idx);
        } else {
            repeat_idx = -1;
        }

        contig.add_gene(Gene::new(
            gene_name,
            record.start,
            record.end,
            record.strand,
            record.feature_type.clone(),
            describe(record),
        ));
    }

    for name in contig_order {
        if let Some(contig) = contigs.remove(&name) {
            genome.add_contig(contig);
        }
    }
    genome
}

pub fn genome_from_gff_str(genome_name: &str, gff_text: &str) -> Result<Genome> {
    let contig_lengths = contig_lengths_from_str(gff_text);
    let records = records_from_gff_str(gff_text)?;
    Ok(build_genome(genome_name, &records, &contig_lengths))
}

pub fn genome_from_gff_file(genome_name: &str, path: &str) -> Result<Genome> {
    if !Path::new(path).exists() {
        return Err(OrthoplotError::NotFound(format!("GFF file '{path}'")));
    }
    let text = fs::read_to_string(path)?;
    genome_from_gff_str(genome_name, &text)
}

/// Load every `*.gff` / `*.gff3` file in a directory as one genome named
/// after the file stem. Files are taken in name order so repeated runs over
/// the same directory yield the same genome order.
pub fn genome_set_from_dir(dir: &str) -> Result<GenomeSet> {
    let dir_path = Path::new(dir);
    if !dir_path.is_dir() {
        return Err(OrthoplotError::NotFound(format!("GFF directory '{dir}'")));
    }
    let mut paths: Vec<std::path::PathBuf> = fs::read_dir(dir_path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("gff") | Some("gff3")
            )
        })
        .collect();
    paths.sort();

    let mut set = GenomeSet::default();
    for path in paths {
        let genome_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("genome")
            .to_string();
        let text = fs::read_to_string(&path)?;
        set.add_genome(genome_from_gff_str(&genome_name, &text)?);
    }
    Ok(set)
}

/// Parse a two-column whitespace-delimited `geneName orthoTag` table.
/// Blank lines and `#` comments are ignored; short lines are malformed.
pub fn parse_ortho_tags(text: &str) -> Result<HashMap<String, String>> {
    let mut tags = HashMap::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(gene_name), Some(tag)) => {
                tags.insert(gene_name.to_string(), tag.to_string());
            }
            _ => {
                return Err(OrthoplotError::Parse(format!(
                    "ortho tag line {}: expected 'geneName orthoTag', got '{line}'",
                    i + 1
                )));
            }
        }
    }
    Ok(tags)
}

pub fn ortho_tags_from_file(path: &str) -> Result<HashMap<String, String>> {
    if !Path::new(path).exists() {
        return Err(OrthoplotError::NotFound(format!("ortho tag file '{path}'")));
    }
    parse_ortho_tags(&fs::read_to_string(path)?)
}

/// Attach ortho tags to genes by gene name. Genes without an entry keep
/// `ortho_tag = None`; table entries without a matching gene are ignored.
pub fn apply_ortho_tags(set: &mut GenomeSet, tags: &HashMap<String, String>) {
    for genome in &mut set.genomes {
        for contig in &mut genome.contigs {
            for gene in &mut contig.genes {
                if let Some(tag) = tags.get(&gene.gene_name) {
                    gene.ortho_tag = Some(tag.clone());
                }
            }
        }
    }
}

/// Parse a tab-delimited `genomeName<TAB>taxonomy` table; the species name is
/// the last `;`-separated taxon with its `s__` prefix stripped.
pub fn parse_species_table(text: &str) -> Result<HashMap<String, String>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut species = HashMap::new();
    for (i, result) in reader.records().enumerate() {
        let record =
            result.map_err(|e| OrthoplotError::Parse(format!("species line {}: {e}", i + 1)))?;
        let genome_name = match record.get(0).map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };
        let taxonomy = record.get(1).ok_or_else(|| {
            OrthoplotError::Parse(format!(
                "species line {}: missing taxonomy column for '{genome_name}'",
                i + 1
            ))
        })?;
        let species_name = taxonomy
            .split(';')
            .next_back()
            .unwrap_or("")
            .trim()
            .trim_start_matches("s__")
            .to_string();
        species.insert(genome_name, species_name);
    }
    Ok(species)
}

pub fn species_from_file(path: &str) -> Result<HashMap<String, String>> {
    if !Path::new(path).exists() {
        return Err(OrthoplotError::NotFound(format!("species file '{path}'")));
    }
    parse_species_table(&fs::read_to_string(path)?)
}

/// Attach species names to genomes by genome name.
pub fn apply_species(set: &mut GenomeSet, species: &HashMap<String, String>) {
    for genome in &mut set.genomes {
        if let Some(name) = species.get(&genome.genome_name) {
            genome.species_name = Some(name.clone());
        }
    }
}
