use rustc_hash::FxHashSet;
use std::cmp::Ordering;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::*;
use crate::exhaustive::NaiveIndex;
use crate::kd_tree::KdTreeIndex;
use crate::utils::dist::euclidean_distance_static;
use crate::utils::heap_structs::OrderedFloat;
use crate::utils::k_means::*;
use crate::utils::NearestNeighbour;

/// Symbols handed out to legend entries, cycled when the palette is larger
pub const LEGEND_SYMBOLS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZæøåÆØÅ1234567890,.<>`~!@#$%^&*()λπ=+¡ºª¢€ħðþ‘’×¹²³£¥ĦÐÞ“”÷[]{}«»‹›'\"|õ/?-_–äÄ";

////////////
// Colour //
////////////

/// An 8-bit RGB colour
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    /// Generate a new colour
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Colour from floating point channels
    ///
    /// Channels are truncated towards zero and saturate at `0` and `255`.
    ///
    /// ### Params
    ///
    /// * `channels` - `[red, green, blue]`
    ///
    /// ### Returns
    ///
    /// The `Rgb` colour
    pub fn from_f64(channels: [f64; 3]) -> Self {
        Self::new(channels[0] as u8, channels[1] as u8, channels[2] as u8)
    }

    /// Channels as floats
    pub fn channels(&self) -> [f64; 3] {
        [self.red as f64, self.green as f64, self.blue as f64]
    }

    /// Upper case hex code without leading `#`
    pub fn hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }

    /// Hue, saturation and value
    ///
    /// ### Returns
    ///
    /// `(hue, saturation, value)` with hue in degrees `[0, 360)` and the
    /// other two in `[0, 1]`. Greys have hue and saturation `0`.
    pub fn hsv(&self) -> (f64, f64, f64) {
        let [r, g, b] = self.channels().map(|c| c / 255.0);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        if max == 0.0 {
            return (0.0, 0.0, 0.0);
        }
        let saturation = delta / max;
        if delta == 0.0 {
            return (0.0, saturation, max);
        }

        // later channels win when several share the maximum
        let mut hue = if max == b {
            (r - g) / delta + 4.0
        } else if max == g {
            (b - r) / delta + 2.0
        } else {
            (g - b) / delta
        };
        hue *= 60.0;
        if hue < 0.0 {
            hue += 360.0;
        }

        (hue, saturation, max)
    }
}

/// Order two colours by hue, saturation and value
pub fn hsv_order(a: &Rgb, b: &Rgb) -> Ordering {
    let (ha, sa, va) = a.hsv();
    let (hb, sb, vb) = b.hsv();
    (OrderedFloat(ha), OrderedFloat(sa), OrderedFloat(va)).cmp(&(
        OrderedFloat(hb),
        OrderedFloat(sb),
        OrderedFloat(vb),
    ))
}

/// A yarn/paint colour of a colour system, with display metadata
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct CatalogueColour {
    pub rgb: Rgb,
    pub name: String,
    pub description: String,
    pub hex: String,
}

impl CatalogueColour {
    /// Generate a named catalogue colour
    pub fn new(rgb: Rgb, name: &str, description: &str) -> Self {
        Self {
            rgb,
            name: name.to_string(),
            description: description.to_string(),
            hex: rgb.hex(),
        }
    }

    /// A colour without metadata, used as query point
    pub fn unnamed(rgb: Rgb) -> Self {
        Self {
            rgb,
            ..Self::default()
        }
    }
}

/// Access to the RGB value of a colour-like point
pub trait HasRgb {
    fn rgb(&self) -> Rgb;
}

impl HasRgb for Rgb {
    fn rgb(&self) -> Rgb {
        *self
    }
}

impl HasRgb for CatalogueColour {
    fn rgb(&self) -> Rgb {
        self.rgb
    }
}

/// Axis type of the colour indices
pub type ColourAxis<C> = fn(&C) -> f64;

fn red<C: HasRgb>(c: &C) -> f64 {
    c.rgb().red as f64
}

fn green<C: HasRgb>(c: &C) -> f64 {
    c.rgb().green as f64
}

fn blue<C: HasRgb>(c: &C) -> f64 {
    c.rgb().blue as f64
}

/// The red, green and blue axes
///
/// ### Returns
///
/// One axis per channel, in RGB order
pub fn rgb_axes<C: HasRgb>() -> Vec<ColourAxis<C>> {
    vec![red::<C>, green::<C>, blue::<C>]
}

//////////////////
// PaletteIndex //
//////////////////

/// Which nearest neighbour index to map colours with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SearchMethod {
    /// kd-tree search
    #[default]
    Tree,
    /// Exhaustive linear scan
    Naive,
}

/// Parsing the search method
///
/// ### Params
///
/// * `s` - One of `"tree"` or `"naive"` (case insensitive)
///
/// ### Returns
///
/// The `SearchMethod`, `None` for anything else
pub fn parse_search_method(s: &str) -> Option<SearchMethod> {
    match s.to_lowercase().as_str() {
        "tree" => Some(SearchMethod::Tree),
        "naive" => Some(SearchMethod::Naive),
        _ => None,
    }
}

impl FromStr for SearchMethod {
    type Err = PaletteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_search_method(s).ok_or_else(|| PaletteError::UnknownMethod(s.to_string()))
    }
}

/// Nearest colour lookup over a catalogue, by either method
pub enum PaletteIndex {
    Tree(KdTreeIndex<CatalogueColour, f64, ColourAxis<CatalogueColour>>),
    Naive(NaiveIndex<CatalogueColour, f64, ColourAxis<CatalogueColour>>),
}

impl PaletteIndex {
    /// Build the index over catalogue colours
    ///
    /// ### Params
    ///
    /// * `colours` - The catalogue colours
    /// * `method` - The `SearchMethod`
    ///
    /// ### Returns
    ///
    /// The initialised index
    pub fn new(colours: Vec<CatalogueColour>, method: SearchMethod) -> Self {
        match method {
            SearchMethod::Tree => PaletteIndex::Tree(KdTreeIndex::new(colours, rgb_axes())),
            SearchMethod::Naive => PaletteIndex::Naive(NaiveIndex::new(colours, rgb_axes())),
        }
    }

    /// Closest catalogue colour to a pixel
    ///
    /// ### Params
    ///
    /// * `pixel` - The pixel colour
    ///
    /// ### Returns
    ///
    /// The nearest catalogue colour
    pub fn nearest(&mut self, pixel: Rgb) -> &CatalogueColour {
        let query = CatalogueColour::unnamed(pixel);
        match self {
            PaletteIndex::Tree(index) => index.nearest_neighbour(&query),
            PaletteIndex::Naive(index) => index.nearest_neighbour(&query),
        }
    }

    /// Catalogue colours handed out so far
    pub fn selected(&self) -> &FxHashSet<CatalogueColour> {
        match self {
            PaletteIndex::Tree(index) => index.selected(),
            PaletteIndex::Naive(index) => index.selected(),
        }
    }

    /// Number of catalogue colours in the index
    pub fn len(&self) -> usize {
        match self {
            PaletteIndex::Tree(index) => index.len(),
            PaletteIndex::Naive(index) => index.len(),
        }
    }

    /// Is the index empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//////////////////
// Quantisation //
//////////////////

/// Parameters of the palette reduction
///
/// ### Fields
///
/// * `n_colours` - Maximum number of colours. `None` maps every pixel
///   straight to the catalogue.
/// * `method` - The `SearchMethod` for the colour lookups
/// * `seed` - Seed of the k-means initialisation
/// * `max_iters` - k-means iteration budget
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuantiseParams {
    pub n_colours: Option<usize>,
    pub method: SearchMethod,
    pub seed: u64,
    pub max_iters: usize,
}

impl Default for QuantiseParams {
    fn default() -> Self {
        Self {
            n_colours: None,
            method: SearchMethod::Tree,
            seed: DEFAULT_SEED,
            max_iters: MAX_ITERS,
        }
    }
}

/// Non-fatal conditions of a palette reduction
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaletteWarning {
    /// Several centroids snapped to the same catalogue colour
    CollapsedColours { requested: usize, distinct: usize },
    /// Fewer reduced colours ended up used by any pixel
    FewerColoursUsed { requested: usize, used: usize },
    /// k-means hit its iteration budget
    NotConverged { iterations: usize },
}

/// Result of a palette reduction
///
/// ### Fields
///
/// * `pixels` - The mapped pixels, same order as the input
/// * `palette` - Catalogue colours used by at least one pixel, sorted by
///   RGB value and name
/// * `warnings` - Non-fatal conditions met on the way
#[derive(Clone, Debug)]
pub struct Quantisation {
    pub pixels: Vec<Rgb>,
    pub palette: Vec<CatalogueColour>,
    pub warnings: Vec<PaletteWarning>,
}

/// Reduce pixels to catalogue colours
///
/// Without a colour limit, every pixel maps to its nearest catalogue colour.
/// With a limit `n`, k-means finds `n` centroids over the pixels, each
/// centroid snaps to its nearest catalogue colour and the pixels map to the
/// nearest of those.
///
/// ### Params
///
/// * `pixels` - The pixel colours
/// * `catalogue` - The colours available
/// * `params` - The `QuantiseParams`
///
/// ### Returns
///
/// The `Quantisation`, or an error if the catalogue is empty or k-means
/// preconditions fail
pub fn quantise(
    pixels: &[Rgb],
    catalogue: &[CatalogueColour],
    params: &QuantiseParams,
) -> PaletteResult<Quantisation> {
    if catalogue.is_empty() {
        return Err(PaletteError::EmptyCatalogue);
    }

    let mut colour_index = PaletteIndex::new(catalogue.to_vec(), params.method);
    let mut warnings = Vec::new();

    let mut final_index = match params.n_colours {
        None => colour_index,
        Some(n_colours) => {
            let kmeans_params = KMeansParams {
                k: n_colours,
                seed: params.seed,
                max_iters: params.max_iters,
            };
            let res = kmeans(pixels, &rgb_axes::<Rgb>(), &kmeans_params)?;
            if !res.converged {
                warn!(
                    "Colour reduction did not converge within {} iterations",
                    res.iterations
                );
                warnings.push(PaletteWarning::NotConverged {
                    iterations: res.iterations,
                });
            }

            let mut seen = FxHashSet::default();
            let mut reduced = Vec::with_capacity(res.centroids.len());
            for centroid in &res.centroids {
                let query = Rgb::from_f64([centroid[0], centroid[1], centroid[2]]);
                let snapped = colour_index.nearest(query).clone();
                if seen.insert(snapped.clone()) {
                    reduced.push(snapped);
                }
            }

            if reduced.len() != n_colours {
                warn!(
                    "Wanted {} colours but the catalogue reduced them to {}",
                    n_colours,
                    reduced.len()
                );
                warnings.push(PaletteWarning::CollapsedColours {
                    requested: n_colours,
                    distinct: reduced.len(),
                });
            }

            PaletteIndex::new(reduced, params.method)
        }
    };

    let mapped: Vec<Rgb> = pixels
        .iter()
        .map(|&pixel| final_index.nearest(pixel).rgb)
        .collect();

    let mut palette: Vec<CatalogueColour> = final_index.selected().iter().cloned().collect();
    palette.sort_by(|a, b| a.rgb.cmp(&b.rgb).then_with(|| a.name.cmp(&b.name)));

    if let Some(n_colours) = params.n_colours {
        if palette.len() != n_colours {
            warn!(
                "Fewer than the wanted colours ended up being used ({} != {})",
                palette.len(),
                n_colours
            );
            warnings.push(PaletteWarning::FewerColoursUsed {
                requested: n_colours,
                used: palette.len(),
            });
        }
    }

    info!(
        "Mapped {} pixels onto {} colours",
        mapped.len(),
        palette.len()
    );

    Ok(Quantisation {
        pixels: mapped,
        palette,
        warnings,
    })
}

////////////
// Legend //
////////////

/// A palette colour paired with its pattern symbol
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegendEntry {
    pub colour: CatalogueColour,
    pub symbol: char,
}

/// Build the legend of a palette
///
/// Colours are ordered by hue, then saturation, then value; symbols are
/// handed out in `LEGEND_SYMBOLS` order and repeat once exhausted.
///
/// ### Params
///
/// * `palette` - The palette colours
///
/// ### Returns
///
/// One `LegendEntry` per palette colour
pub fn legend(palette: &[CatalogueColour]) -> Vec<LegendEntry> {
    let mut colours = palette.to_vec();
    colours.sort_by(|a, b| hsv_order(&a.rgb, &b.rgb));

    colours
        .into_iter()
        .zip(LEGEND_SYMBOLS.chars().cycle())
        .map(|(colour, symbol)| LegendEntry { colour, symbol })
        .collect()
}

////////////////
// Comparison //
////////////////

/// A pixel where two mappings disagree
#[derive(Clone, Debug, PartialEq)]
pub struct Mismatch {
    pub x: usize,
    pub y: usize,
    pub left: Rgb,
    pub right: Rgb,
    pub distance: f64,
}

/// Compare two mapped pixel buffers pixel by pixel
///
/// ### Params
///
/// * `left` - First buffer
/// * `right` - Second buffer, same length as `left`
/// * `width` - Row width, to report positions as `(x, y)`
///
/// ### Returns
///
/// Every disagreeing pixel in row-major order
pub fn compare_mappings(left: &[Rgb], right: &[Rgb], width: usize) -> Vec<Mismatch> {
    assert_eq!(left.len(), right.len(), "Pixel buffers differ in size");
    assert!(width > 0, "Row width must be positive");

    left.iter()
        .zip(right)
        .enumerate()
        .filter(|(_, (l, r))| l != r)
        .map(|(i, (&l, &r))| Mismatch {
            x: i % width,
            y: i / width,
            left: l,
            right: r,
            distance: euclidean_distance_static(&l.channels(), &r.channels()),
        })
        .collect()
}


///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn primaries() -> Vec<CatalogueColour> {
        vec![
            CatalogueColour::new(Rgb::new(0, 0, 0), "310", "Black"),
            CatalogueColour::new(Rgb::new(255, 255, 255), "B5200", "Snow White"),
            CatalogueColour::new(Rgb::new(255, 0, 0), "321", "Red"),
            CatalogueColour::new(Rgb::new(0, 255, 0), "702", "Kelly Green"),
            CatalogueColour::new(Rgb::new(0, 0, 255), "796", "Royal Blue"),
        ]
    }

    fn two_groups() -> Vec<Rgb> {
        vec![
            Rgb::new(250, 0, 0),
            Rgb::new(240, 0, 0),
            Rgb::new(0, 0, 250),
            Rgb::new(0, 0, 240),
        ]
    }

    #[test]
    fn test_hsv_primaries() {
        let (h, s, v) = Rgb::new(255, 0, 0).hsv();
        assert_relative_eq!(h, 0.0);
        assert_relative_eq!(s, 1.0);
        assert_relative_eq!(v, 1.0);

        assert_relative_eq!(Rgb::new(0, 255, 0).hsv().0, 120.0);
        assert_relative_eq!(Rgb::new(0, 0, 255).hsv().0, 240.0);
        assert_relative_eq!(Rgb::new(255, 255, 0).hsv().0, 60.0);
        assert_relative_eq!(Rgb::new(255, 0, 255).hsv().0, 300.0);
    }

    #[test]
    fn test_hsv_greys() {
        assert_eq!(Rgb::new(0, 0, 0).hsv(), (0.0, 0.0, 0.0));

        let (h, s, v) = Rgb::new(128, 128, 128).hsv();
        assert_eq!(h, 0.0);
        assert_eq!(s, 0.0);
        assert_relative_eq!(v, 128.0 / 255.0);
    }

    #[test]
    fn test_hsv_negative_hue_wraps() {
        let (h, _, _) = Rgb::new(255, 0, 128).hsv();
        assert!(h > 300.0 && h < 360.0);
    }

    #[test]
    fn test_hex_and_float_conversion() {
        assert_eq!(Rgb::new(255, 16, 0).hex(), "FF1000");
        assert_eq!(Rgb::from_f64([12.9, 255.7, -3.0]), Rgb::new(12, 255, 0));

        let colour = CatalogueColour::new(Rgb::new(1, 2, 3), "x", "y");
        assert_eq!(colour.hex, "010203");
    }

    #[test]
    fn test_parse_search_method() {
        assert_eq!(parse_search_method("tree"), Some(SearchMethod::Tree));
        assert_eq!(parse_search_method("NAIVE"), Some(SearchMethod::Naive));
        assert_eq!(parse_search_method("kd"), None);

        assert_eq!("naive".parse::<SearchMethod>(), Ok(SearchMethod::Naive));
        assert_eq!(
            "kd".parse::<SearchMethod>(),
            Err(PaletteError::UnknownMethod("kd".to_string()))
        );
    }

    #[test]
    fn test_palette_index_methods_agree() {
        for method in [SearchMethod::Tree, SearchMethod::Naive] {
            let mut index = PaletteIndex::new(primaries(), method);
            assert_eq!(index.len(), 5);
            assert!(!index.is_empty());

            assert_eq!(index.nearest(Rgb::new(250, 10, 10)).name, "321");
            assert_eq!(index.nearest(Rgb::new(10, 10, 200)).name, "796");
            assert_eq!(index.nearest(Rgb::new(200, 210, 220)).name, "B5200");
            assert_eq!(index.nearest(Rgb::new(30, 20, 25)).name, "310");
            assert_eq!(index.selected().len(), 4);
        }
    }

    #[test]
    fn test_quantise_without_limit() {
        let pixels = vec![
            Rgb::new(250, 5, 5),
            Rgb::new(5, 250, 5),
            Rgb::new(240, 240, 240),
            Rgb::new(250, 5, 5),
        ];
        let res = quantise(&pixels, &primaries(), &QuantiseParams::default()).unwrap();

        assert_eq!(
            res.pixels,
            vec![
                Rgb::new(255, 0, 0),
                Rgb::new(0, 255, 0),
                Rgb::new(255, 255, 255),
                Rgb::new(255, 0, 0),
            ]
        );
        let names: Vec<&str> = res.palette.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["702", "321", "B5200"]);
        assert!(res.warnings.is_empty());
    }

    #[test]
    fn test_quantise_with_limit() {
        let params = QuantiseParams {
            n_colours: Some(2),
            ..Default::default()
        };
        let res = quantise(&two_groups(), &primaries(), &params).unwrap();

        assert_eq!(
            res.pixels,
            vec![
                Rgb::new(255, 0, 0),
                Rgb::new(255, 0, 0),
                Rgb::new(0, 0, 255),
                Rgb::new(0, 0, 255),
            ]
        );
        assert_eq!(res.palette.len(), 2);
        assert!(res.warnings.is_empty());
    }

    #[test]
    fn test_quantise_naive_matches_tree() {
        let tree = quantise(
            &two_groups(),
            &primaries(),
            &QuantiseParams {
                n_colours: Some(2),
                ..Default::default()
            },
        )
        .unwrap();
        let naive = quantise(
            &two_groups(),
            &primaries(),
            &QuantiseParams {
                n_colours: Some(2),
                method: SearchMethod::Naive,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(tree.pixels, naive.pixels);
        assert_eq!(tree.palette, naive.palette);
    }

    #[test]
    fn test_quantise_collapsed_colours() {
        let catalogue = vec![
            CatalogueColour::new(Rgb::new(0, 0, 0), "310", "Black"),
            CatalogueColour::new(Rgb::new(255, 255, 255), "B5200", "Snow White"),
        ];
        let params = QuantiseParams {
            n_colours: Some(2),
            ..Default::default()
        };
        let res = quantise(&two_groups(), &catalogue, &params).unwrap();

        assert!(res.pixels.iter().all(|p| *p == Rgb::new(0, 0, 0)));
        assert_eq!(res.palette.len(), 1);
        assert_eq!(
            res.warnings,
            vec![
                PaletteWarning::CollapsedColours {
                    requested: 2,
                    distinct: 1
                },
                PaletteWarning::FewerColoursUsed {
                    requested: 2,
                    used: 1
                },
            ]
        );
    }

    #[test]
    fn test_quantise_errors() {
        let res = quantise(&two_groups(), &[], &QuantiseParams::default());
        assert_eq!(res.unwrap_err(), PaletteError::EmptyCatalogue);

        let params = QuantiseParams {
            n_colours: Some(5),
            ..Default::default()
        };
        let res = quantise(&two_groups(), &primaries(), &params);
        assert_eq!(
            res.unwrap_err(),
            PaletteError::Cluster(ClusterError::InvalidK { k: 5, n_distinct: 4 })
        );

        let params = QuantiseParams {
            n_colours: Some(1),
            ..Default::default()
        };
        let res = quantise(&[], &primaries(), &params);
        assert_eq!(
            res.unwrap_err(),
            PaletteError::Cluster(ClusterError::EmptyInput)
        );
    }

    #[test]
    fn test_legend_order() {
        let palette = vec![
            CatalogueColour::new(Rgb::new(0, 0, 255), "796", "Royal Blue"),
            CatalogueColour::new(Rgb::new(0, 255, 0), "702", "Kelly Green"),
            CatalogueColour::new(Rgb::new(255, 0, 0), "321", "Red"),
            CatalogueColour::new(Rgb::new(255, 255, 255), "B5200", "Snow White"),
        ];
        let entries = legend(&palette);

        let names: Vec<&str> = entries.iter().map(|e| e.colour.name.as_str()).collect();
        assert_eq!(names, vec!["B5200", "321", "702", "796"]);
        let symbols: Vec<char> = entries.iter().map(|e| e.symbol).collect();
        assert_eq!(symbols, vec!['a', 'b', 'c', 'd']);
    }

    #[test]
    fn test_legend_symbols_cycle() {
        let n_symbols = LEGEND_SYMBOLS.chars().count();
        let palette: Vec<CatalogueColour> = (0..=n_symbols)
            .map(|i| CatalogueColour::new(Rgb::new(i as u8, 0, 0), &i.to_string(), ""))
            .collect();
        let entries = legend(&palette);

        assert_eq!(entries.len(), n_symbols + 1);
        assert_eq!(entries[0].symbol, 'a');
        assert_eq!(entries[n_symbols].symbol, 'a');
        assert_eq!(entries[n_symbols].colour.name, n_symbols.to_string());
    }

    #[test]
    fn test_compare_mappings() {
        let a = Rgb::new(0, 0, 0);
        let b = Rgb::new(3, 4, 0);
        let left = vec![a, a, a, a];
        let right = vec![a, b, a, b];

        let mismatches = compare_mappings(&left, &right, 2);
        assert_eq!(mismatches.len(), 2);
        assert_eq!((mismatches[0].x, mismatches[0].y), (1, 0));
        assert_eq!((mismatches[1].x, mismatches[1].y), (1, 1));
        assert_relative_eq!(mismatches[0].distance, 5.0);

        assert!(compare_mappings(&left, &left, 2).is_empty());
    }

    #[test]
    #[should_panic(expected = "differ in size")]
    fn test_compare_mappings_size_mismatch() {
        compare_mappings(&[Rgb::new(0, 0, 0)], &[], 1);
    }
}
