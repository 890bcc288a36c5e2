use anyhow::{Context, Result, bail};
use orthoplot::annotation::{
    apply_ortho_tags, apply_species, genome_set_from_dir, ortho_tags_from_file, species_from_file,
};
use orthoplot::color::{ColorAssignment, RandomColorSource, compute_colored_windows};
use orthoplot::genome::GenomeSet;
use orthoplot::neighborhood::Window;
use orthoplot::render::windows_svg_string;
use serde::Serialize;
use std::{env, fs};

const DEFAULT_TRACK_HEIGHT: f64 = 20.0;
const DEFAULT_PANEL_WIDTH: f64 = 1000.0;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryOutput {
    windows: Vec<Window>,
    color_state: Vec<ColorAssignment>,
}

fn usage() {
    eprintln!(
        "Usage:\n  \
  orthoplot build GFF_DIR OUTPUT.json [--ortho TAGS.txt] [--species SPECIES.tsv]\n  \
  orthoplot tags GENOMES.json\n  \
  orthoplot query GENOMES.json ORTHO_TAG FLANK_BP [--colors STATE.json]\n  \
  orthoplot render-svg GENOMES.json ORTHO_TAG FLANK_BP OUTPUT.svg [--colors STATE.json]\n\n  \
  With --colors, the color state file is read if present and written back\n  \
  after the query, which keeps tag colors stable across repeated queries."
    );
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Could not serialize JSON output")?;
    println!("{text}");
    Ok(())
}

fn load_color_state(path: &str) -> Result<Vec<ColorAssignment>> {
    if !std::path::Path::new(path).exists() {
        return Ok(vec![]);
    }
    let text =
        fs::read_to_string(path).with_context(|| format!("Could not read color state '{path}'"))?;
    serde_json::from_str(&text).with_context(|| format!("Could not parse color state '{path}'"))
}

fn save_color_state(path: &str, state: &[ColorAssignment]) -> Result<()> {
    let text = serde_json::to_string_pretty(state).context("Could not serialize color state")?;
    fs::write(path, text).with_context(|| format!("Could not write color state '{path}'"))
}

fn run_query(
    genomes_path: &str,
    query_tag: &str,
    flank: i64,
    color_state_path: Option<&str>,
) -> Result<(Vec<Window>, Vec<ColorAssignment>)> {
    let set = GenomeSet::load_from_path(genomes_path)
        .with_context(|| format!("Could not load genomes '{genomes_path}'"))?;
    let prior = match color_state_path {
        Some(path) => load_color_state(path)?,
        None => vec![],
    };
    let mut source = RandomColorSource::new();
    let (windows, state) = compute_colored_windows(&set, &prior, query_tag, flank, &mut source)?;
    if let Some(path) = color_state_path {
        save_color_state(path, &state)?;
    }
    Ok((windows, state))
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() <= 1 {
        usage();
        bail!("Missing command");
    }

    match args[1].as_str() {
        "build" => {
            if args.len() <= 3 {
                usage();
                bail!("build requires: GFF_DIR OUTPUT.json");
            }
            let gff_dir = &args[2];
            let output = &args[3];
            let mut set = genome_set_from_dir(gff_dir)
                .with_context(|| format!("Could not load GFF directory '{gff_dir}'"))?;
            if let Some(path) = flag_value(&args, "--ortho") {
                let tags = ortho_tags_from_file(&path)
                    .with_context(|| format!("Could not load ortho tags '{path}'"))?;
                apply_ortho_tags(&mut set, &tags);
            }
            if let Some(path) = flag_value(&args, "--species") {
                let species = species_from_file(&path)
                    .with_context(|| format!("Could not load species table '{path}'"))?;
                apply_species(&mut set, &species);
            }
            set.save_to_path(output)
                .with_context(|| format!("Could not write genome JSON '{output}'"))?;
            let gene_count: usize = set.genomes.iter().map(|g| g.gene_count()).sum();
            println!(
                "Wrote {} genomes ({gene_count} genes) to '{output}'",
                set.genomes.len()
            );
            Ok(())
        }
        "tags" => {
            if args.len() <= 2 {
                usage();
                bail!("tags requires: GENOMES.json");
            }
            let set = GenomeSet::load_from_path(&args[2])
                .with_context(|| format!("Could not load genomes '{}'", args[2]))?;
            print_json(&set.ortho_tags())
        }
        "query" => {
            if args.len() <= 4 {
                usage();
                bail!("query requires: GENOMES.json ORTHO_TAG FLANK_BP");
            }
            let flank: i64 = args[4]
                .parse()
                .with_context(|| format!("Invalid flank size '{}'", args[4]))?;
            let colors = flag_value(&args, "--colors");
            let (windows, state) = run_query(&args[2], &args[3], flank, colors.as_deref())?;
            print_json(&QueryOutput {
                windows,
                color_state: state,
            })
        }
        "render-svg" => {
            if args.len() <= 5 {
                usage();
                bail!("render-svg requires: GENOMES.json ORTHO_TAG FLANK_BP OUTPUT.svg");
            }
            let flank: i64 = args[4]
                .parse()
                .with_context(|| format!("Invalid flank size '{}'", args[4]))?;
            let output = &args[5];
            let colors = flag_value(&args, "--colors");
            let (windows, _) = run_query(&args[2], &args[3], flank, colors.as_deref())?;
            if windows.is_empty() {
                println!("No occurrence of '{}' found; nothing to render", args[3]);
                return Ok(());
            }
            let svg = windows_svg_string(&windows, DEFAULT_TRACK_HEIGHT, DEFAULT_PANEL_WIDTH);
            fs::write(output, svg)
                .with_context(|| format!("Could not write SVG output '{output}'"))?;
            println!("Wrote {} neighborhood tracks to '{output}'", windows.len());
            Ok(())
        }
        other => {
            usage();
            bail!("Unknown command '{other}'");
        }
    }
}
