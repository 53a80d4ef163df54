use anyhow::Result;
use std::env;
use std::path::Path;
use std::process;

use uai_finder::{
    load_input, load_reference, write_output, ResolutionPipeline, ReferenceIndexBuilder,
    NOT_FOUND_LABEL,
};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: uai-finder <input.csv> <reference.csv> [output.csv]");
        process::exit(2);
    }

    let input_path = Path::new(&args[1]);
    let reference_path = Path::new(&args[2]);
    let default_output = "uai_results.csv".to_string();
    let output_path = Path::new(args.get(3).unwrap_or(&default_output));

    run(input_path, reference_path, output_path)
}

fn run(input_path: &Path, reference_path: &Path, output_path: &Path) -> Result<()> {
    println!("🏫 UAI Finder and Académie Determiner");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Load and index the reference directory
    println!("\n📚 Loading reference directory...");
    let raw_reference = load_reference(reference_path)?;
    println!("✓ Loaded {} reference rows", raw_reference.row_count());

    let (reference, warnings) = ReferenceIndexBuilder::new().build(&raw_reference)?;
    for warning in &warnings {
        println!("⚠️  {}", warning);
    }
    println!("✓ Search index ready ({} records)", reference.len());

    // 2. Read the input file (encoding and delimiter are sniffed)
    println!("\n📂 Reading input file...");
    let input = load_input(input_path)?;
    println!("✓ Read {} input rows", input.row_count());

    // 3. Resolve every row
    println!("\n🔎 Resolving...");
    let results = ResolutionPipeline::new().resolve(&input, &reference)?;

    let matched = results.iter().filter(|r| r.uai != NOT_FOUND_LABEL).count();
    println!(
        "✓ Resolved {} rows: {} matched, {} not found",
        results.len(),
        matched,
        results.len() - matched
    );

    // 4. Preview the first rows
    for record in results.iter().take(5) {
        println!(
            "  {} | {} → {} ({}%) | {}",
            record.name, record.postal_code, record.uai, record.score, record.academie
        );
    }
    if results.len() > 5 {
        println!("  ... {} more rows", results.len() - 5);
    }

    // 5. Export
    if results.is_empty() {
        println!("\n⚠️  No rows to export");
        return Ok(());
    }

    write_output(output_path, &results)?;
    println!("\n💾 Results written to {:?}", output_path);

    Ok(())
}
