#![allow(dead_code)]

use clap::Parser;
use tracing_subscriber::EnvFilter;

////////////
// Consts //
////////////

pub const DEFAULT_N_POINTS: usize = 100_000;
pub const DEFAULT_N_QUERY: usize = DEFAULT_N_POINTS / 10;
pub const DEFAULT_DIM: usize = 3;
pub const DEFAULT_N_CLUSTERS: usize = 25;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_METHOD: &str = "tree";
pub const DEFAULT_N_PIXELS: usize = 250_000;
pub const DEFAULT_WIDTH: usize = 500;
pub const DEFAULT_CATALOGUE_SIZE: usize = 450;
pub const DEFAULT_SPREAD: u8 = 24;

////////////
// Parser //
////////////

/// Parsing structure
///
/// ### Fields
///
/// * `n_points` - Number of indexed points (tree vs naive)
/// * `dim` - Number of dimensions to use
/// * `n_clusters` - Number of clusters in the data
/// * `seed` - Random seed for reproducibility
/// * `method` - The search method. One of `"tree"` or `"naive"`.
/// * `n_pixels` - Number of synthetic pixels to quantise
/// * `width` - Row width of the synthetic image
/// * `catalogue_size` - Number of catalogue colours
/// * `n_colours` - Optional colour limit for the quantisation
/// * `spread` - Per-channel noise of the synthetic pixels
#[derive(Parser)]
pub struct Cli {
    #[arg(long, default_value_t = DEFAULT_N_POINTS)]
    pub n_points: usize,

    #[arg(long, default_value_t = DEFAULT_DIM)]
    pub dim: usize,

    #[arg(long, default_value_t = DEFAULT_N_CLUSTERS)]
    pub n_clusters: usize,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    #[arg(long, default_value = DEFAULT_METHOD)]
    pub method: String,

    #[arg(long, default_value_t = DEFAULT_N_PIXELS)]
    pub n_pixels: usize,

    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub width: usize,

    #[arg(long, default_value_t = DEFAULT_CATALOGUE_SIZE)]
    pub catalogue_size: usize,

    #[arg(long)]
    pub n_colours: Option<usize>,

    #[arg(long, default_value_t = DEFAULT_SPREAD)]
    pub spread: u8,
}

/// Install the log subscriber
///
/// Honours `RUST_LOG`, falls back to `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();
}

/////////////
// Results //
/////////////

/// BenchmarkResult
///
/// ### Fields
///
/// * `method` - Name of the method
/// * `build_time_ms` - The build time of the index in ms
/// * `query_time_ms` - The query time of the index in ms
/// * `total_time_ms` - Total time the index build & query takes in ms
/// * `agreement` - Fraction of queries answered at the exhaustive distance
/// * `max_dist_err` - Largest excess distance over the exhaustive answer
/// * `index_size_mb` - Index size in MB
pub struct BenchmarkResult {
    pub method: String,
    pub build_time_ms: f64,
    pub query_time_ms: f64,
    pub total_time_ms: f64,
    pub agreement: f64,
    pub max_dist_err: f64,
    pub index_size_mb: f64,
}

////////////
// Prints //
////////////

/// Helper to print results to console
///
/// ### Params
///
/// * `config` - Benchmark configuration
/// * `results` - Benchmark results to print
pub fn print_results(config: &str, results: &[BenchmarkResult]) {
    println!("\n{:=>123}", "");
    println!("Benchmark: {}", config);
    println!("{:=>123}", "");
    println!(
        "{:<45} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "Method", "Build (ms)", "Query (ms)", "Total (ms)", "Agreement", "Dist Error", "Size (MB)"
    );
    println!("{:->123}", "");
    for result in results {
        println!(
            "{:<45} {:>12.2} {:>12.2} {:>12.2} {:>12.4} {:>12.6} {:>12.2}",
            result.method,
            result.build_time_ms,
            result.query_time_ms,
            result.total_time_ms,
            result.agreement,
            result.max_dist_err,
            result.index_size_mb
        );
    }
    println!("{:->123}\n", "");
}
