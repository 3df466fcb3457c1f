//! lineage-reg: register the lineage trees of two embryos
//!
//! Commands:
//!   lineage-reg register   match two lineage graphs and report the result
//!   lineage-reg sort       reorder the children of B to follow A
//!   lineage-reg tag        tag unmatched and flipped cells in both graphs
//!   lineage-reg copy-tags  copy a tag set of A onto B
//!   lineage-reg color      give each common lineage the same color in both graphs
//!   lineage-reg demo       register a synthetic embryo against a moved, shuffled copy

use lineage_registration::annotate::{copy_tag_set_locked, tag_cells_locked, unmatched_branch_starts};
use lineage_registration::coloring::color_lineages_locked;
use lineage_registration::graph::{GraphHandle, GraphSnapshot, LineageGraph, SpotId};
use lineage_registration::registration::{register_handles, sort_second_to_match, Registration};
use lineage_registration::synthetic::{flip_randomly, generate_embryo, transformed_copy, EmbryoParams};
use lineage_registration::{RegistrationConfig, SimilarityTransform};
use nalgebra::{Rotation3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::env;
use std::error::Error;

type CliResult = Result<(), Box<dyn Error>>;

fn print_usage() {
    println!(
        r#"
Lineage registration: match the cell lineages of two embryos

Usage: lineage-reg <command> [options] [--config <config.json>]

Commands:
  register  <a.json> <b.json>                                 Register A against B and report
  sort      <a.json> <b.json> <out-b.json>                    Reorder B's children to follow A
  tag       <a.json> <b.json> <out-a.json> <out-b.json>       Tag unmatched and flipped cells
  copy-tags <a.json> <b.json> <tag-set> <out-b.json> [name]   Copy a tag set of A onto B
  color     <a.json> <b.json> <out-a.json> <out-b.json>       Color common lineages alike
  demo      [seed]                                            Run on a synthetic embryo

Graph files are JSON graph snapshots. The log level follows RUST_LOG (default: info).

Examples:
  lineage-reg register embryo1.json embryo2.json
  lineage-reg sort embryo1.json embryo2.json embryo2-sorted.json --config reg.json
  lineage-reg demo 7
"#
    );
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return;
    }

    let (positional, config_path) = split_config_flag(&args[2..]);
    let config = match config_path {
        Some(path) => match RegistrationConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("  Invalid config {}: {}", path, e);
                std::process::exit(2);
            }
        },
        None => RegistrationConfig::default(),
    };

    let result = match args[1].as_str() {
        "register" => cmd_register(&positional, &config),
        "sort" => cmd_sort(&positional, &config),
        "tag" => cmd_tag(&positional, &config),
        "copy-tags" => cmd_copy_tags(&positional, &config),
        "color" => cmd_color(&positional, &config),
        "demo" => cmd_demo(&positional, &config),
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("  Error: {}", e);
        std::process::exit(1);
    }
}

/// Removes `--config <path>` from the arguments
fn split_config_flag(args: &[String]) -> (Vec<String>, Option<String>) {
    let mut positional = Vec::new();
    let mut config = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            config = iter.next().cloned();
        } else {
            positional.push(arg.clone());
        }
    }
    (positional, config)
}

fn load_graph(path: &str) -> Result<LineageGraph, Box<dyn Error>> {
    let (graph, _) = GraphSnapshot::load(path)?.into_graph()?;
    println!(
        "  Loaded {} ({} spots, {} links)",
        path,
        graph.spot_count(),
        graph.link_count()
    );
    Ok(graph)
}

fn save_graph(handle: &GraphHandle, path: &str) -> CliResult {
    let snapshot = GraphSnapshot::from_graph(&*handle.read()?);
    snapshot.save(path)?;
    println!("  Saved to {}", path);
    Ok(())
}

fn describe(graph: &LineageGraph, spot: SpotId) -> String {
    match graph.spot(spot) {
        Some(s) => format!("{}@t{}", s.label, s.timepoint),
        None => spot.to_string(),
    }
}

fn print_registration(r: &Registration, a: &LineageGraph, b: &LineageGraph) {
    let t = &r.transform_ab;
    println!("\n  Anchors ({}):", r.roots.len());
    for label in r.roots.keys() {
        println!("    {}", label);
    }
    println!("\n  Transform A -> B:");
    println!("    scale       {:.6}", t.scale);
    println!(
        "    translation [{:.3}, {:.3}, {:.3}]",
        t.translation.x, t.translation.y, t.translation.z
    );
    for row in 0..3 {
        println!(
            "    rotation    [{:+.4}, {:+.4}, {:+.4}]",
            t.rotation[(row, 0)],
            t.rotation[(row, 1)],
            t.rotation[(row, 2)]
        );
    }
    println!("\n  Mapped branches:  {}", r.mapping.len());
    println!(
        "  Divisions:        {} matched, {} partial, {} unmatched",
        r.stats.matched, r.stats.partial, r.stats.unmatched
    );

    let unmatched_a = unmatched_branch_starts(a, &r.mapping);
    let unmatched_b = unmatched_branch_starts(b, &r.mapping.inverse());
    println!("  Not mapped in A:  {}", unmatched_a.len());
    println!("  Not mapped in B:  {}", unmatched_b.len());

    println!("\n  Flipped divisions ({}):", r.flips_b.len());
    for &spot_b in &r.flips_b {
        let spot_a = r
            .divisions
            .iter()
            .find(|d| d.division_b == spot_b)
            .map(|d| describe(a, d.division_a))
            .unwrap_or_else(|| "?".to_string());
        println!("    A {:<20} B {}", spot_a, describe(b, spot_b));
    }
}

fn cmd_register(args: &[String], config: &RegistrationConfig) -> CliResult {
    if args.len() < 2 {
        eprintln!("Usage: lineage-reg register <a.json> <b.json> [--config c.json]");
        return Ok(());
    }
    let a = GraphHandle::new(load_graph(&args[0])?);
    let b = GraphHandle::new(load_graph(&args[1])?);
    let r = register_handles(&a, &b, config)?;
    print_registration(&r, &*a.read()?, &*b.read()?);
    Ok(())
}

fn cmd_sort(args: &[String], config: &RegistrationConfig) -> CliResult {
    if args.len() < 3 {
        eprintln!("Usage: lineage-reg sort <a.json> <b.json> <out-b.json> [--config c.json]");
        return Ok(());
    }
    let a = GraphHandle::new(load_graph(&args[0])?);
    let b = GraphHandle::new(load_graph(&args[1])?);
    let r = sort_second_to_match(&a, &b, config)?;
    println!(
        "\n  Reordered {} divisions of B ({} branches mapped)",
        r.flips_b.len(),
        r.mapping.len()
    );
    save_graph(&b, &args[2])
}

fn cmd_tag(args: &[String], config: &RegistrationConfig) -> CliResult {
    if args.len() < 4 {
        eprintln!(
            "Usage: lineage-reg tag <a.json> <b.json> <out-a.json> <out-b.json> [--config c.json]"
        );
        return Ok(());
    }
    let a = GraphHandle::new(load_graph(&args[0])?);
    let b = GraphHandle::new(load_graph(&args[1])?);
    let r = tag_cells_locked(&a, &b, true, true, config)?;
    println!(
        "\n  Tagged '{}': {} flipped in A, {} flipped in B",
        config.annotation.tag_set_name,
        r.flips_a.len(),
        r.flips_b.len()
    );
    save_graph(&a, &args[2])?;
    save_graph(&b, &args[3])
}

fn cmd_copy_tags(args: &[String], config: &RegistrationConfig) -> CliResult {
    if args.len() < 4 {
        eprintln!(
            "Usage: lineage-reg copy-tags <a.json> <b.json> <tag-set> <out-b.json> [name] [--config c.json]"
        );
        return Ok(());
    }
    let a = GraphHandle::new(load_graph(&args[0])?);
    let b = GraphHandle::new(load_graph(&args[1])?);
    let source = &args[2];
    let name = args.get(4).cloned().unwrap_or_else(|| source.clone());
    copy_tag_set_locked(&a, &b, source, &name, config)?;
    save_graph(&b, &args[3])
}

fn cmd_color(args: &[String], config: &RegistrationConfig) -> CliResult {
    if args.len() < 4 {
        eprintln!(
            "Usage: lineage-reg color <a.json> <b.json> <out-a.json> <out-b.json> [--config c.json]"
        );
        return Ok(());
    }
    let a = GraphHandle::new(load_graph(&args[0])?);
    let b = GraphHandle::new(load_graph(&args[1])?);
    let colors = color_lineages_locked(&a, &b, config)?;
    println!(
        "\n  Tagged '{}' with {} lineages:",
        config.annotation.lineage_tag_set_name,
        colors.colors.len()
    );
    for (label, color) in &colors.colors {
        println!("    {:<12} #{:08x}", label, color);
    }
    save_graph(&a, &args[2])?;
    save_graph(&b, &args[3])
}

fn cmd_demo(args: &[String], config: &RegistrationConfig) -> CliResult {
    let seed: u64 = args.first().and_then(|s| s.parse().ok()).unwrap_or(42);
    let mut rng = StdRng::seed_from_u64(seed);

    println!("\nStep 1: Growing a synthetic embryo (seed {})...", seed);
    println!("{}", "-".repeat(60));
    let embryo = generate_embryo(&mut rng, &EmbryoParams::default())?;
    println!(
        "  {} spots, {} links, {} timepoints",
        embryo.spot_count(),
        embryo.link_count(),
        embryo.timepoint_count()
    );

    println!("\nStep 2: Moving and shuffling a copy...");
    println!("{}", "-".repeat(60));
    let rotation = Rotation3::from_euler_angles(
        rng.gen_range(-3.1..3.1),
        rng.gen_range(-1.5..1.5),
        rng.gen_range(-3.1..3.1),
    );
    let moved = SimilarityTransform::new(
        rotation,
        rng.gen_range(0.5..2.0),
        Vector3::new(rng.gen_range(-20.0..20.0), rng.gen_range(-20.0..20.0), 0.0),
    );
    let mut copy = transformed_copy(&embryo, &moved)?;
    let shuffled = flip_randomly(&mut copy, &mut rng)?;
    println!("  scale {:.3}, {} divisions flipped", moved.scale, shuffled);

    let a = GraphHandle::new(embryo);
    let b = GraphHandle::new(copy);

    println!("\nStep 3: Registering...");
    println!("{}", "-".repeat(60));
    let r = register_handles(&a, &b, config)?;
    print_registration(&r, &*a.read()?, &*b.read()?);
    let scale_error = (r.transform_ab.scale - moved.scale).abs();
    println!("\n  Scale error: {:.2e}", scale_error);
    println!(
        "  Flip set matches shuffle: {}",
        if r.flips_b.len() == shuffled { "yes" } else { "no" }
    );

    println!("\nStep 4: Sorting the copy to follow the embryo...");
    println!("{}", "-".repeat(60));
    sort_second_to_match(&a, &b, config)?;
    let again = register_handles(&a, &b, config)?;
    println!("  Remaining flips after sorting: {}", again.flips_b.len());

    println!("\nDone.");
    Ok(())
}
