use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::palette::{CatalogueColour, Rgb};
use crate::utils::axis::Coords;
use crate::utils::traits::IndexFloat;

/// Generate synthetic points with cluster structure
///
/// Cluster centres are drawn uniformly from `[-1, 1]` per dimension and
/// points are assigned to clusters round-robin with uniform noise.
///
/// ### Params
///
/// * `n_samples` - Number of points
/// * `dim` - Dimensionality
/// * `n_clusters` - Number of distinct clusters
/// * `cluster_std` - Half-width of the noise around each centre
/// * `seed` - Random seed for reproducibility
///
/// ### Returns
///
/// `n_samples` coordinate tuples
pub fn generate_clustered_coords<T>(
    n_samples: usize,
    dim: usize,
    n_clusters: usize,
    cluster_std: f64,
    seed: u64,
) -> Vec<Coords<T>>
where
    T: IndexFloat,
{
    assert!(n_clusters > 0, "Need at least one cluster");

    let mut rng = StdRng::seed_from_u64(seed);

    let centres: Vec<Vec<f64>> = (0..n_clusters)
        .map(|_| (0..dim).map(|_| rng.random_range(-1.0..1.0)).collect())
        .collect();

    (0..n_samples)
        .map(|i| {
            let centre = &centres[i % n_clusters];
            let values = centre
                .iter()
                .map(|&c| {
                    let noise: f64 = if cluster_std > 0.0 {
                        rng.random_range(-cluster_std..cluster_std)
                    } else {
                        0.0
                    };
                    T::from_f64(c + noise).unwrap_or_else(T::zero)
                })
                .collect();
            Coords(values)
        })
        .collect()
}

/// Generate pixels scattered around a few base colours
///
/// ### Params
///
/// * `n_pixels` - Number of pixels
/// * `n_clusters` - Number of base colours
/// * `spread` - Maximum per-channel offset from the base colour
/// * `seed` - Random seed for reproducibility
///
/// ### Returns
///
/// The pixels, base colours assigned round-robin
pub fn generate_clustered_pixels(n_pixels: usize, n_clusters: usize, spread: u8, seed: u64) -> Vec<Rgb> {
    assert!(n_clusters > 0, "Need at least one cluster");

    let mut rng = StdRng::seed_from_u64(seed);
    let bases: Vec<[u8; 3]> = (0..n_clusters).map(|_| rng.random()).collect();
    let spread = spread as i16;

    (0..n_pixels)
        .map(|i| {
            let base = bases[i % n_clusters];
            let channel = |c: u8, rng: &mut StdRng| -> u8 {
                let offset = rng.random_range(-spread..=spread);
                (c as i16 + offset).clamp(0, 255) as u8
            };
            Rgb::new(
                channel(base[0], &mut rng),
                channel(base[1], &mut rng),
                channel(base[2], &mut rng),
            )
        })
        .collect()
}

/// Generate a random colour catalogue
///
/// Names are running numbers, descriptions are the hex codes.
///
/// ### Params
///
/// * `n_colours` - Number of catalogue colours
/// * `seed` - Random seed for reproducibility
///
/// ### Returns
///
/// The catalogue
pub fn generate_catalogue(n_colours: usize, seed: u64) -> Vec<CatalogueColour> {
    let mut rng = StdRng::seed_from_u64(seed);

    (0..n_colours)
        .map(|i| {
            let rgb = Rgb::new(rng.random(), rng.random(), rng.random());
            CatalogueColour::new(rgb, &format!("{}", 100 + i), &format!("Shade #{}", rgb.hex()))
        })
        .collect()
}

///////////
// Tests //
///////////
