mod commons;
use clap::Parser;
use commons::*;
use kd_palette::synthetic::*;
use kd_palette::*;
use std::process::ExitCode;
use std::time::Instant;
use thousands::*;
use tracing::{error, info};

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let method: SearchMethod = match cli.method.parse() {
        Ok(method) => method,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("-----------------------------");
    println!(
        "Generating synthetic image: {} pixels, {} base colours, catalogue of {}.",
        cli.n_pixels.separate_with_underscores(),
        cli.n_clusters,
        cli.catalogue_size
    );
    println!("-----------------------------");

    let pixels = generate_clustered_pixels(cli.n_pixels, cli.n_clusters, cli.spread, cli.seed);
    let catalogue = generate_catalogue(cli.catalogue_size, cli.seed + 1);

    let params = QuantiseParams {
        n_colours: cli.n_colours,
        method,
        seed: cli.seed,
        ..Default::default()
    };

    let start = Instant::now();
    let res = match quantise(&pixels, &catalogue, &params) {
        Ok(res) => res,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    info!(
        "Quantised in {:.2} ms",
        start.elapsed().as_secs_f64() * 1000.0
    );

    for warning in &res.warnings {
        println!("Warning: {:?}", warning);
    }

    println!("\n{:=>60}", "");
    println!("{:<8} {:<10} {:<8} {}", "Symbol", "Name", "Hex", "Description");
    println!("{:->60}", "");
    for entry in legend(&res.palette) {
        println!(
            "{:<8} {:<10} {:<8} {}",
            entry.symbol, entry.colour.name, entry.colour.hex, entry.colour.description
        );
    }
    println!("{:->60}\n", "");

    // the other method as reference
    let other = match method {
        SearchMethod::Tree => SearchMethod::Naive,
        SearchMethod::Naive => SearchMethod::Tree,
    };
    let reference = match quantise(&pixels, &catalogue, &QuantiseParams { method: other, ..params }) {
        Ok(res) => res,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mismatches = compare_mappings(&res.pixels, &reference.pixels, cli.width.max(1));
    println!(
        "{:?} vs {:?}: {} of {} pixels differ",
        method,
        other,
        mismatches.len().separate_with_underscores(),
        res.pixels.len().separate_with_underscores()
    );
    for m in mismatches.iter().take(10) {
        println!(
            "  ({}, {}): #{} vs #{} at distance {:.3}",
            m.x,
            m.y,
            m.left.hex(),
            m.right.hex(),
            m.distance
        );
    }

    ExitCode::SUCCESS
}
