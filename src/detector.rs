use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, RgbImage};
use imageproc::gradients::sobel_gradients;
use imageproc::template_matching::{MatchTemplateMethod, find_extremes, match_template};

use crate::ui_config::{SearchArea, UiConfig};

/// Best match of a template on a screenshot (template centre, screenshot pixels).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateMatch {
    pub x: u32,
    pub y: u32,
    pub score: f32,
}

/// Windows whose summed squared deviation is below `n * MIN_VARIANCE` are
/// treated as flat and score 0.
const MIN_VARIANCE: f64 = 1.0;

/// Reference image split into R, G, B and a Sobel edge plane.
///
/// Matching uses the mean-subtracted normalized correlation (the usual
/// `CCOEFF_NORMED`), summed over the colour planes, so a score keeps the
/// same meaning on flat and on busy screens. The edge plane is scored the
/// same way and the final score is the lower of the two: colour and
/// structure must both agree.
pub struct PreparedTemplate {
    pub width: u32,
    pub height: u32,
    channels: [GrayImage; 3],
    edge: GrayImage,
    channel_stats: [PlaneStats; 3],
    edge_stats: PlaneStats,
}

impl PreparedTemplate {
    pub fn from_image(img: &DynamicImage) -> Self {
        let planes = Planes::from_image(img);
        PreparedTemplate {
            width: img.width(),
            height: img.height(),
            channel_stats: planes.channels.each_ref().map(PlaneStats::of),
            edge_stats: PlaneStats::of(&planes.edge),
            channels: planes.channels,
            edge: planes.edge,
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let img = image::open(path).with_context(|| format!("failed to decode {}", path.display()))?;
        Ok(Self::from_image(&img))
    }

    fn pixel_count(&self) -> f64 {
        f64::from(self.width) * f64::from(self.height)
    }
}

struct Planes {
    channels: [GrayImage; 3],
    edge: GrayImage,
}

impl Planes {
    fn from_image(img: &DynamicImage) -> Self {
        Planes {
            channels: colour_planes(&img.to_rgb8()),
            edge: edge_plane(&img.to_luma8()),
        }
    }
}

fn colour_planes(rgb: &RgbImage) -> [GrayImage; 3] {
    let (w, h) = rgb.dimensions();
    std::array::from_fn(|c| GrayImage::from_fn(w, h, |x, y| Luma([rgb.get_pixel(x, y)[c]])))
}

/// Sobel magnitude rescaled so the strongest edge in `gray` is 255.
fn edge_plane(gray: &GrayImage) -> GrayImage {
    let grad = sobel_gradients(gray);
    let peak = grad.pixels().map(|p| u32::from(p[0])).max().unwrap_or(0).max(1);
    GrayImage::from_fn(grad.width(), grad.height(), |x, y| {
        let v = u32::from(grad.get_pixel(x, y)[0]) * 255 / peak;
        Luma([v as u8])
    })
}

/// Sum and summed squared deviation of a whole plane.
#[derive(Debug, Clone, Copy)]
struct PlaneStats {
    sum: f64,
    spread: f64,
}

impl PlaneStats {
    fn of(plane: &GrayImage) -> Self {
        let n = f64::from(plane.width()) * f64::from(plane.height());
        let (sum, sq) = plane.pixels().fold((0.0, 0.0), |(s, q), p| {
            let v = f64::from(p[0]);
            (s + v, q + v * v)
        });
        PlaneStats {
            sum,
            spread: if n > 0.0 { sq - sum * sum / n } else { 0.0 },
        }
    }
}

/// Summed-area tables of a plane and of its squares, for window means and variances.
struct WindowSums {
    stride: usize,
    sum: Vec<f64>,
    sq: Vec<f64>,
}

impl WindowSums {
    fn new(plane: &GrayImage) -> Self {
        let (w, h) = (plane.width() as usize, plane.height() as usize);
        let stride = w + 1;
        let mut sum = vec![0.0; stride * (h + 1)];
        let mut sq = vec![0.0; stride * (h + 1)];
        for y in 0..h {
            let (mut row_sum, mut row_sq) = (0.0, 0.0);
            for x in 0..w {
                let v = f64::from(plane.get_pixel(x as u32, y as u32)[0]);
                row_sum += v;
                row_sq += v * v;
                let at = (y + 1) * stride + x + 1;
                sum[at] = sum[at - stride] + row_sum;
                sq[at] = sq[at - stride] + row_sq;
            }
        }
        WindowSums { stride, sum, sq }
    }

    /// `(sum, sum of squares)` over the `w`×`h` window with top-left `(x, y)`.
    fn window(&self, x: u32, y: u32, w: u32, h: u32) -> (f64, f64) {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        let rect = |t: &[f64]| {
            t[y1 * self.stride + x1] - t[y0 * self.stride + x1] - t[y1 * self.stride + x0]
                + t[y0 * self.stride + x0]
        };
        (rect(&self.sum), rect(&self.sq))
    }
}

/// Raw cross-correlation of one plane plus what is needed to centre it.
struct PlaneScorer<'a> {
    cross: ImageBuffer<Luma<f32>, Vec<f32>>,
    sums: WindowSums,
    template: &'a PlaneStats,
}

impl<'a> PlaneScorer<'a> {
    fn new(region: &GrayImage, template: &GrayImage, stats: &'a PlaneStats) -> Self {
        PlaneScorer {
            cross: match_template(region, template, MatchTemplateMethod::CrossCorrelation),
            sums: WindowSums::new(region),
            template: stats,
        }
    }

    /// Centred numerator and window spread at `(x, y)`.
    fn terms(&self, x: u32, y: u32, w: u32, h: u32, n: f64) -> (f64, f64) {
        let (sum, sq) = self.sums.window(x, y, w, h);
        let cross = f64::from(self.cross.get_pixel(x, y)[0]);
        (cross - sum * self.template.sum / n, sq - sum * sum / n)
    }
}

fn correlation(num: f64, window_spread: f64, template_spread: f64, n: f64) -> f64 {
    let floor = n * MIN_VARIANCE;
    if window_spread <= floor || template_spread <= floor {
        return 0.0;
    }
    (num / (window_spread * template_spread).sqrt()).clamp(-1.0, 1.0)
}

/// Find the best position of `template` inside `area` (whole screen when `None`).
/// Returns `None` if the area is empty or not larger than the template.
pub fn find_best_match(
    screenshot: &DynamicImage,
    template: &PreparedTemplate,
    area: Option<SearchArea>,
) -> Option<TemplateMatch> {
    let (sw, sh) = (screenshot.width(), screenshot.height());
    let area = match area {
        Some(a) => a.clamp_to(sw, sh)?,
        None => SearchArea { x1: 0, y1: 0, x2: sw, y2: sh },
    };

    if template.width >= area.width() || template.height >= area.height() {
        tracing::warn!(
            "template {}x{} is too large for search area {}x{}, skipping",
            template.width,
            template.height,
            area.width(),
            area.height()
        );
        return None;
    }

    let region = screenshot.crop_imm(area.x1, area.y1, area.width(), area.height());
    let planes = Planes::from_image(&region);

    let colour: Vec<PlaneScorer> = (0..3)
        .map(|c| PlaneScorer::new(&planes.channels[c], &template.channels[c], &template.channel_stats[c]))
        .collect();
    let n = template.pixel_count();
    let template_spread: f64 = template.channel_stats.iter().map(|s| s.spread).sum();
    // A template without structure (a flat swatch) is judged on colour alone.
    let edge = (template.edge_stats.spread > n * MIN_VARIANCE)
        .then(|| PlaneScorer::new(&planes.edge, &template.edge, &template.edge_stats));

    let (tw, th) = (template.width, template.height);
    let (w, h) = colour[0].cross.dimensions();
    let combined: ImageBuffer<Luma<f32>, Vec<f32>> = ImageBuffer::from_fn(w, h, |x, y| {
        let (num, spread) = colour.iter().fold((0.0, 0.0), |(num, spread), plane| {
            let (pn, ps) = plane.terms(x, y, tw, th, n);
            (num + pn, spread + ps)
        });
        let mut score = correlation(num, spread, template_spread, n);
        if let Some(edge) = &edge {
            let (en, es) = edge.terms(x, y, tw, th, n);
            score = score.min(correlation(en, es, edge.template.spread, n));
        }
        Luma([score as f32])
    });

    let extremes = find_extremes(&combined);
    let (bx, by) = extremes.max_value_location;
    Some(TemplateMatch {
        x: area.x1 + bx + template.width / 2,
        y: area.y1 + by + template.height / 2,
        score: extremes.max_value,
    })
}

/// Templates for every configured UI element, keyed by element name.
#[derive(Clone, Default)]
pub struct TemplateStore {
    templates: HashMap<String, Arc<PreparedTemplate>>,
}

impl TemplateStore {
    /// Prepare every element in `config`. Elements whose image cannot be read
    /// are logged and left out; lookups will retry loading them.
    pub fn load(config: &UiConfig) -> Self {
        let mut store = TemplateStore::default();
        for (name, element) in &config.ui_elements {
            match PreparedTemplate::open(&element.image_path) {
                Ok(t) => {
                    tracing::debug!("loaded template {name}: {}x{}", t.width, t.height);
                    store.templates.insert(name.clone(), Arc::new(t));
                }
                Err(e) => tracing::warn!("template {name} unavailable: {e:#}"),
            }
        }
        tracing::info!(
            "prepared {}/{} UI template(s)",
            store.templates.len(),
            config.ui_elements.len()
        );
        store
    }

    pub fn insert(&mut self, name: &str, template: PreparedTemplate) {
        self.templates.insert(name.to_string(), Arc::new(template));
    }

    pub fn get(&self, name: &str) -> Option<Arc<PreparedTemplate>> {
        self.templates.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
