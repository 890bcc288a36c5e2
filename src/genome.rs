//! Normalized genome annotation model: Genome -> Contig -> Gene.
//!
//! This is the single source of truth for a session. Coordinates are 1-based
//! inclusive with `start <= end` on both strands; strand direction is carried
//! separately as -1/0/1. The JSON form of a [`GenomeSet`] is the durable
//! interchange artifact consumed by the rendering collaborator, so field names
//! serialize in camelCase and unset optional fields are omitted.

use crate::error::{OrthoplotError, Result};
use serde::{Deserialize, Serialize};
use std::fs;

/// Sentinel color meaning "no orthology group assigned / not colored".
pub const UNCOLORED: &str = "#FFFFFF";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Gene {
    pub gene_name: String,
    pub start: i64,
    pub end: i64,
    /// -1 (minus), 0 (unstranded), 1 (plus).
    pub strand: i8,
    #[serde(rename = "type")]
    pub gene_type: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ortho_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Gene {
    pub fn new(
        gene_name: String,
        start: i64,
        end: i64,
        strand: i8,
        gene_type: String,
        description: String,
    ) -> Self {
        Self {
            gene_name,
            start,
            end,
            strand,
            gene_type,
            description,
            ortho_tag: None,
            color: None,
        }
    }

    /// Midpoint of the gene span, rounded down.
    pub fn center(&self) -> i64 {
        (self.start + self.end) / 2
    }

    pub fn is_cds(&self) -> bool {
        self.gene_type == "CDS"
    }

    pub fn is_rna(&self) -> bool {
        self.gene_type.contains("RNA")
    }

    pub fn is_repeat(&self) -> bool {
        self.gene_type.contains("repeat")
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Contig {
    pub contig_name: String,
    /// Declared length from the `##sequence-region` header; 0 when absent.
    #[serde(default)]
    pub contig_length: i64,
    #[serde(default)]
    pub genes: Vec<Gene>,
}

impl Contig {
    pub fn new(contig_name: String) -> Self {
        Self {
            contig_name,
            contig_length: 0,
            genes: vec![],
        }
    }

    pub fn add_gene(&mut self, gene: Gene) {
        self.genes.push(gene);
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Genome {
    pub genome_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species_name: Option<String>,
    #[serde(default)]
    pub contigs: Vec<Contig>,
}

impl Genome {
    pub fn new(genome_name: String) -> Self {
        Self {
            genome_name,
            species_name: None,
            contigs: vec![],
        }
    }

    pub fn add_contig(&mut self, contig: Contig) {
        self.contigs.push(contig);
    }

    pub fn gene_count(&self) -> usize {
        self.contigs.iter().map(|c| c.genes.len()).sum()
    }
}

/// The top-level persisted unit.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct GenomeSet {
    pub genomes: Vec<Genome>,
}

impl GenomeSet {
    pub fn new(genomes: Vec<Genome>) -> Self {
        Self { genomes }
    }

    pub fn add_genome(&mut self, genome: Genome) {
        self.genomes.push(genome);
    }

    /// All distinct ortho tags over the whole set, in first-seen order.
    pub fn ortho_tags(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut tags = vec![];
        for genome in &self.genomes {
            for contig in &genome.contigs {
                for gene in &contig.genes {
                    if let Some(tag) = &gene.ortho_tag {
                        if !tag.is_empty() && seen.insert(tag.clone()) {
                            tags.push(tag.clone());
                        }
                    }
                }
            }
        }
        tags
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load_from_path(path: &str) -> Result<Self> {
        if !std::path::Path::new(path).exists() {
            return Err(OrthoplotError::NotFound(format!("genome JSON '{path}'")));
        }
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn save_to_path(&self, path: &str) -> Result<()> {
        let text = self.to_json_pretty()?;
        Ok(fs::write(path, text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_set() -> GenomeSet {
        let mut gene = Gene::new(
            "gene_1".to_string(),
            5000,
            5010,
            1,
            "CDS".to_string(),
            "pos=5000-5010<br>ID=gene_1".to_string(),
        );
        gene.ortho_tag = Some("OG0001".to_string());
        let mut contig = Contig::new("contig_1".to_string());
        contig.contig_length = 10000;
        contig.add_gene(gene);
        let mut genome = Genome::new("genomeA".to_string());
        genome.species_name = Some("Escherichia coli".to_string());
        genome.add_contig(contig);
        GenomeSet::new(vec![genome])
    }

    #[test]
    fn test_json_round_trip() {
        let set = toy_set();
        let text = set.to_json_pretty().unwrap();
        let back = GenomeSet::from_json_str(&text).unwrap();
        assert_eq!(set, back);
    }

    #[test]
    fn test_json_field_names_are_camel_case() {
        let set = toy_set();
        let value: serde_json::Value =
            serde_json::from_str(&set.to_json_pretty().unwrap()).unwrap();
        let genome = &value["genomes"][0];
        assert_eq!(genome["genomeName"], "genomeA");
        assert_eq!(genome["speciesName"], "Escherichia coli");
        let contig = &genome["contigs"][0];
        assert_eq!(contig["contigName"], "contig_1");
        assert_eq!(contig["contigLength"], 10000);
        let gene = &contig["genes"][0];
        assert_eq!(gene["geneName"], "gene_1");
        assert_eq!(gene["type"], "CDS");
        assert_eq!(gene["orthoTag"], "OG0001");
        // Unset options are omitted entirely.
        assert!(gene.get("color").is_none());
    }

    #[test]
    fn test_optional_fields_absent_in_json_parse() {
        let text = r#"{"genomes":[{"genomeName":"g","contigs":[
            {"contigName":"c","contigLength":0,"genes":[
                {"geneName":"x","start":1,"end":9,"strand":0,
                 "type":"tRNA","description":"pos=1-9"}]}]}]}"#;
        let set = GenomeSet::from_json_str(text).unwrap();
        let gene = &set.genomes[0].contigs[0].genes[0];
        assert_eq!(gene.ortho_tag, None);
        assert!(gene.is_rna());
        assert!(!gene.is_cds());
    }

    #[test]
    fn test_gene_center_floors() {
        let gene = Gene::new("g".into(), 5000, 5011, 1, "CDS".into(), String::new());
        assert_eq!(gene.center(), 5005);
    }

    #[test]
    fn test_ortho_tags_first_seen_order() {
        let mut set = toy_set();
        let mut extra = Gene::new("gene_2".into(), 1, 10, 1, "CDS".into(), String::new());
        extra.ortho_tag = Some("OG0002".to_string());
        let mut dup = Gene::new("gene_3".into(), 20, 30, 1, "CDS".into(), String::new());
        dup.ortho_tag = Some("OG0001".to_string());
        set.genomes[0].contigs[0].add_gene(extra);
        set.genomes[0].contigs[0].add_gene(dup);
        assert_eq!(set.ortho_tags(), vec!["OG0001", "OG0002"]);
    }

    #[test]
    fn test_load_missing_path_is_not_found() {
        let err = GenomeSet::load_from_path("/no/such/file.json").unwrap_err();
        assert!(matches!(err, OrthoplotError::NotFound(_)));
    }
}
