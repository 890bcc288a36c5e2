//! Tag colorer: stable, frequency-ranked palette assignment for the ortho
//! tags visible in a window set.
//!
//! The assignment vector is explicit state, threaded through every query by
//! the caller: tags keep their color while they stay visible, and colors are
//! freed the moment their tag scrolls out of view. Fresh colors come from a
//! fixed categorical palette; once that is exhausted, an injectable
//! [`ColorSource`] generates fallback colors so tests stay deterministic.

use crate::error::{OrthoplotError, Result};
use crate::genome::{GenomeSet, UNCOLORED};
use crate::neighborhood::{Window, around_ortho};
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The 12 categorical swatches of the d3 "Set3" scheme, in allocation order.
pub const PALETTE: [&str; 12] = [
    "#8dd3c7", "#ffffb3", "#bebada", "#fb8072", "#80b1d3", "#fdb462", "#b3de69", "#fccde5",
    "#d9d9d9", "#bc80bd", "#ccebc5", "#ffed6f",
];

/// Attempts per tag before fallback generation fails closed.
const MAX_COLOR_ATTEMPTS: usize = 1024;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColorAssignment {
    pub ortho_tag: String,
    pub color: String,
}

/// Supplier of fallback colors once the fixed palette is exhausted.
pub trait ColorSource {
    fn next_color(&mut self) -> String;
}

/// Uniform random RGB hex colors. Seedable so repeated sessions can be
/// reproduced.
pub struct RandomColorSource {
    rng: StdRng,
}

impl RandomColorSource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomColorSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorSource for RandomColorSource {
    fn next_color(&mut self) -> String {
        format!(
            "#{:02X}{:02X}{:02X}",
            self.rng.gen_range(0..=255u16),
            self.rng.gen_range(0..=255u16),
            self.rng.gen_range(0..=255u16)
        )
    }
}

/// Distinct non-empty ortho tags across all window genes, ranked by
/// descending occurrence count; ties keep first-encountered order.
pub fn rank_ortho_tags(windows: &[Window]) -> Vec<String> {
    let mut stats: HashMap<&str, (usize, usize)> = HashMap::new(); // count, first index
    let mut next_idx = 0usize;
    for window in windows {
        for gene in &window.genes {
            let Some(tag) = gene.ortho_tag.as_deref() else {
                continue;
            };
            if tag.is_empty() {
                continue;
            }
            let entry = stats.entry(tag).or_insert_with(|| {
                let idx = next_idx;
                next_idx += 1;
                (0, idx)
            });
            entry.0 += 1;
        }
    }
    stats
        .into_iter()
        .sorted_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_b.cmp(count_a).then(first_a.cmp(first_b))
        })
        .map(|(tag, _)| tag.to_string())
        .collect()
}

/// Update the assignment set to cover exactly `ranked_tags`.
///
/// Prior assignments for still-visible tags are retained untouched; the rest
/// are dropped, freeing their colors. New tags draw palette swatches in rank
/// order, then fall back to `source`, rejecting any color already in use.
pub fn color_ortho(
    prior: &[ColorAssignment],
    ranked_tags: &[String],
    source: &mut dyn ColorSource,
) -> Result<Vec<ColorAssignment>> {
    let retained: Vec<ColorAssignment> = prior
        .iter()
        .filter(|a| a.color != UNCOLORED && ranked_tags.contains(&a.ortho_tag))
        .cloned()
        .collect();
    let mut used: HashSet<String> = retained.iter().map(|a| a.color.clone()).collect();
    let retained_tags: HashSet<&str> = retained.iter().map(|a| a.ortho_tag.as_str()).collect();
    let mut pool = PALETTE
        .iter()
        .filter(|c| !used.contains(**c))
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .into_iter();

    let mut assignments = vec![];
    for tag in ranked_tags {
        if retained_tags.contains(tag.as_str()) {
            continue;
        }
        let color = match pool.next() {
            Some(swatch) => swatch,
            None => {
                let mut generated = None;
                for _ in 0..MAX_COLOR_ATTEMPTS {
                    let candidate = source.next_color();
                    if !used.contains(&candidate) {
                        generated = Some(candidate);
                        break;
                    }
                }
                generated.ok_or_else(|| {
                    OrthoplotError::ColorAllocation(format!(
                        "no unique color for tag '{tag}' after {MAX_COLOR_ATTEMPTS} attempts"
                    ))
                })?
            }
        };
        used.insert(color.clone());
        assignments.push(ColorAssignment {
            ortho_tag: tag.clone(),
            color,
        });
    }
    assignments.extend(retained);
    Ok(assignments)
}

/// Paint every window gene with its tag's color, or the sentinel for genes
/// without a tag or without an assignment.
pub fn color_windows(windows: &mut [Window], assignments: &[ColorAssignment]) {
    let by_tag: HashMap<&str, &str> = assignments
        .iter()
        .map(|a| (a.ortho_tag.as_str(), a.color.as_str()))
        .collect();
    for window in windows {
        for gene in &mut window.genes {
            let color = gene
                .ortho_tag
                .as_deref()
                .and_then(|tag| by_tag.get(tag).copied())
                .unwrap_or(UNCOLORED);
            gene.color = Some(color.to_string());
        }
    }
}

/// The query interface the rendering collaborator calls on every parameter
/// change. The returned assignment vector must be threaded back in as
/// `prior` on the next call; that threading is what keeps colors stable
/// across queries.
pub fn compute_colored_windows(
    set: &GenomeSet,
    prior: &[ColorAssignment],
    query_tag: &str,
    flank_size: i64,
    source: &mut dyn ColorSource,
) -> Result<(Vec<Window>, Vec<ColorAssignment>)> {
    let mut windows = around_ortho(set, query_tag, flank_size);
    let ranked = rank_ortho_tags(&windows);
    let assignments = color_ortho(prior, &ranked, source)?;
    color_windows(&mut windows, &assignments);
    Ok((windows, assignments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::{Contig, Gene, Genome};
    use crate::neighborhood::WindowGene;

    /// Hands out a scripted color sequence; cycles when exhausted so
    /// duplicate-rejection paths can be exercised.
    struct ScriptedColorSource {
        colors: Vec<String>,
        next: usize,
    }

    impl ScriptedColorSource {
        fn new(colors: &[&str]) -> Self {
            Self {
                colors: colors.iter().map(|c| c.to_string()).collect(),
                next: 0,
            }
        }
    }

    impl ColorSource for ScriptedColorSource {
        fn next_color(&mut self) -> String {
            let color = self.colors[self.next % self.colors.len()].clone();
            self.next += 1;
            color
        }
    }

    fn window_with_tags(tags: &[&str]) -> Window {
        Window {
            start: 0,
            end: 1000,
            idx: "g".to_string(),
            label: "g:c(+)".to_string(),
            contig_length: 0,
            genes: tags
                .iter()
                .enumerate()
                .map(|(i, tag)| WindowGene {
                    gene_name: format!("gene_{i}"),
                    start: i as i64 * 10,
                    end: i as i64 * 10 + 5,
                    strand: 1,
                    gene_type: "CDS".to_string(),
                    description: String::new(),
                    ortho_tag: (!tag.is_empty()).then(|| tag.to_string()),
                    color: None,
                })
                .collect(),
        }
    }

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_rank_by_frequency_then_first_seen() {
        let windows = vec![
            window_with_tags(&["B", "A", ""]),
            window_with_tags(&["A", "C", "B"]),
            window_with_tags(&["A"]),
        ];
        // A: 3, B: 2, C: 1; empty tags never ranked.
        assert_eq!(rank_ortho_tags(&windows), tags(&["A", "B", "C"]));
    }

    #[test]
    fn test_rank_tie_keeps_encounter_order() {
        let windows = vec![window_with_tags(&["X", "Y", "X", "Y", "Z"])];
        assert_eq!(rank_ortho_tags(&windows), tags(&["X", "Y", "Z"]));
    }

    #[test]
    fn test_fresh_assignment_walks_palette_in_rank_order() {
        let mut source = ScriptedColorSource::new(&["#000001"]);
        let got = color_ortho(&[], &tags(&["A", "B", "C"]), &mut source).unwrap();
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].ortho_tag, "A");
        assert_eq!(got[0].color, PALETTE[0]);
        assert_eq!(got[1].color, PALETTE[1]);
        assert_eq!(got[2].color, PALETTE[2]);
    }

    #[test]
    fn test_color_stability_across_queries() {
        let mut source = ScriptedColorSource::new(&["#000001"]);
        let first = color_ortho(&[], &tags(&["A", "B", "C"]), &mut source).unwrap();
        let color_of = |set: &[ColorAssignment], tag: &str| {
            set.iter().find(|a| a.ortho_tag == tag).unwrap().color.clone()
        };
        let second = color_ortho(&first, &tags(&["B", "C", "D"]), &mut source).unwrap();
        assert_eq!(color_of(&second, "B"), color_of(&first, "B"));
        assert_eq!(color_of(&second, "C"), color_of(&first, "C"));
        let d = color_of(&second, "D");
        assert_ne!(d, color_of(&second, "B"));
        assert_ne!(d, color_of(&second, "C"));
        assert!(!second.iter().any(|a| a.ortho_tag == "A"));
    }

    #[test]
    fn test_colors_freed_when_tags_leave() {
        let mut source = ScriptedColorSource::new(&["#000001"]);
        let first = color_ortho(&[], &tags(&["A", "B"]), &mut source).unwrap();
        let second = color_ortho(&first, &tags(&["C"]), &mut source).unwrap();
        // A and B dropped; C may take the first swatch again.
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].color, PALETTE[0]);
        let third = color_ortho(&second, &tags(&["C", "E"]), &mut source).unwrap();
        let e = third.iter().find(|a| a.ortho_tag == "E").unwrap();
        assert_eq!(e.color, PALETTE[1]);
        assert_eq!(first[0].color, PALETTE[0]);
    }

    #[test]
    fn test_sentinel_assignments_are_not_retained() {
        let prior = vec![ColorAssignment {
            ortho_tag: "A".to_string(),
            color: UNCOLORED.to_string(),
        }];
        let mut source = ScriptedColorSource::new(&["#000001"]);
        let got = color_ortho(&prior, &tags(&["A"]), &mut source).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].color, PALETTE[0]);
    }

    #[test]
    fn test_pool_exhaustion_uses_source_and_rejects_duplicates() {
        let many: Vec<String> = (0..14).map(|i| format!("T{i}")).collect();
        // First generated candidate collides with itself on the second draw;
        // the cycle forces a duplicate rejection before "#0000FE" is taken.
        let mut source = ScriptedColorSource::new(&["#0000FF", "#0000FF", "#0000FE"]);
        let got = color_ortho(&[], &many, &mut source).unwrap();
        assert_eq!(got[11].color, PALETTE[11]);
        assert_eq!(got[12].color, "#0000FF");
        assert_eq!(got[13].color, "#0000FE");
        let distinct: HashSet<&str> = got.iter().map(|a| a.color.as_str()).collect();
        assert_eq!(distinct.len(), got.len());
    }

    #[test]
    fn test_allocation_fails_closed_on_endless_duplicates() {
        let mut tags_13: Vec<String> = (0..13).map(|i| format!("T{i}")).collect();
        tags_13.push("victim".to_string());
        let mut source = ScriptedColorSource::new(&["#123456"]);
        let err = color_ortho(&[], &tags_13, &mut source).unwrap_err();
        assert!(matches!(err, OrthoplotError::ColorAllocation(_)));
    }

    #[test]
    fn test_color_windows_paints_sentinel_for_untagged() {
        let mut windows = vec![window_with_tags(&["A", "", "B"])];
        let assignments = vec![ColorAssignment {
            ortho_tag: "A".to_string(),
            color: "#8dd3c7".to_string(),
        }];
        color_windows(&mut windows, &assignments);
        let genes = &windows[0].genes;
        assert_eq!(genes[0].color.as_deref(), Some("#8dd3c7"));
        assert_eq!(genes[1].color.as_deref(), Some(UNCOLORED));
        assert_eq!(genes[2].color.as_deref(), Some(UNCOLORED));
    }

    #[test]
    fn test_compute_colored_windows_threads_state() {
        let mut contig = Contig::new("c1".to_string());
        contig.contig_length = 10000;
        for (name, start, tag) in [
            ("a", 1000i64, "OG1"),
            ("b", 1500, "OG2"),
            ("c", 5000, "OG2"),
            ("d", 5400, "OG3"),
        ] {
            let mut gene = Gene::new(
                name.to_string(),
                start,
                start + 100,
                1,
                "CDS".to_string(),
                String::new(),
            );
            gene.ortho_tag = Some(tag.to_string());
            contig.add_gene(gene);
        }
        let mut genome = Genome::new("gA".to_string());
        genome.add_contig(contig);
        let set = GenomeSet::new(vec![genome]);

        let mut source = RandomColorSource::from_seed(7);
        let (windows, state) =
            compute_colored_windows(&set, &[], "OG2", 1000, &mut source).unwrap();
        assert_eq!(windows.len(), 2);
        assert!(windows.iter().all(|w| w
            .genes
            .iter()
            .all(|g| g.color.is_some())));
        // OG2 anchors both windows, so it outranks the flanking tags.
        assert_eq!(state[0].ortho_tag, "OG2");
        assert_eq!(state[0].color, PALETTE[0]);

        let (_, state2) =
            compute_colored_windows(&set, &state, "OG1", 1000, &mut source).unwrap();
        let og2_before = state.iter().find(|a| a.ortho_tag == "OG2").unwrap();
        let og2_after = state2.iter().find(|a| a.ortho_tag == "OG2").unwrap();
        assert_eq!(og2_before.color, og2_after.color);
    }
}
