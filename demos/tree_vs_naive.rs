mod commons;
use clap::Parser;
use commons::*;
use kd_palette::synthetic::generate_clustered_coords;
use kd_palette::*;
use std::time::Instant;
use thousands::*;
use tracing::info;

fn main() {
    init_tracing();
    let cli = Cli::parse();

    println!("-----------------------------");
    println!(
        "Generating synthetic data: {} points, {} dimensions, {} clusters.",
        cli.n_points.separate_with_underscores(),
        cli.dim,
        cli.n_clusters
    );
    println!("-----------------------------");

    let data: Vec<Coords<f64>> = generate_clustered_coords(cli.n_points, cli.dim, cli.n_clusters, 0.25, cli.seed);
    let queries: Vec<Coords<f64>> = generate_clustered_coords(DEFAULT_N_QUERY, cli.dim, cli.n_clusters, 0.5, cli.seed + 1);
    let mut results = Vec::new();

    // Exhaustive benchmark
    println!("Building exhaustive index...");
    let start = Instant::now();
    let naive_idx = build_naive_index(data.clone(), projection_axes(cli.dim));
    let build_time = start.elapsed().as_secs_f64() * 1000.0;
    let index_size_mb = naive_idx.memory_usage_bytes() as f64 / (1024.0 * 1024.0);

    println!("Querying exhaustive index...");
    let start = Instant::now();
    let _ = query_index_parallel(&naive_idx, &queries);
    let query_time = start.elapsed().as_secs_f64() * 1000.0;

    results.push(BenchmarkResult {
        method: "Exhaustive".to_string(),
        build_time_ms: build_time,
        query_time_ms: query_time,
        total_time_ms: build_time + query_time,
        agreement: 1.0,
        max_dist_err: 0.0,
        index_size_mb,
    });

    // kd-tree benchmark
    println!("Building kd-tree index...");
    let start = Instant::now();
    let mut tree_idx = build_kd_tree_index(data, projection_axes(cli.dim));
    let build_time = start.elapsed().as_secs_f64() * 1000.0;
    let index_size_mb = tree_idx.memory_usage_bytes() as f64 / (1024.0 * 1024.0);
    info!("kd-tree depth: {}", tree_idx.depth());

    println!("Querying kd-tree index...");
    let start = Instant::now();
    let _ = query_index_parallel(&tree_idx, &queries);
    let query_time = start.elapsed().as_secs_f64() * 1000.0;

    let report = validate_against(&tree_idx, &naive_idx, &queries);

    results.push(BenchmarkResult {
        method: "kd-tree (parallel)".to_string(),
        build_time_ms: build_time,
        query_time_ms: query_time,
        total_time_ms: build_time + query_time,
        agreement: report.agreement,
        max_dist_err: report.max_dist_err,
        index_size_mb,
    });

    // memoised queries, every query twice
    println!("Querying kd-tree index through the cache...");
    let repeated: Vec<Coords<f64>> = queries.iter().chain(queries.iter()).cloned().collect();
    let start = Instant::now();
    let _ = query_index(&mut tree_idx, &repeated);
    let query_time = start.elapsed().as_secs_f64() * 1000.0;
    info!(
        "Cache hits: {} of {} queries",
        tree_idx.cache_hits().separate_with_underscores(),
        tree_idx.n_queries().separate_with_underscores()
    );

    results.push(BenchmarkResult {
        method: "kd-tree (memoised, 2x queries)".to_string(),
        build_time_ms: build_time,
        query_time_ms: query_time,
        total_time_ms: build_time + query_time,
        agreement: report.agreement,
        max_dist_err: report.max_dist_err,
        index_size_mb,
    });

    print_results(
        &format!(
            "{} points, {} queries, {} dims",
            cli.n_points.separate_with_underscores(),
            DEFAULT_N_QUERY.separate_with_underscores(),
            cli.dim
        ),
        &results,
    );
}
