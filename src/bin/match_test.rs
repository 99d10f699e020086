use std::path::Path;

use ruinbot::detector::{self, PreparedTemplate};
use ruinbot::ui_config::UiConfig;

/// Threshold used by flows when an element sets none.
const DEFAULT_THRESHOLD: f32 = 0.5;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: match_test <ui_config.json> <element> <screenshot.png> [screenshot2.png ...]");
        std::process::exit(1);
    }

    let config = UiConfig::load(Path::new(&args[1])).unwrap_or_else(|e| {
        eprintln!("Failed to load {}: {e:#}", args[1]);
        std::process::exit(1);
    });

    let name = &args[2];
    let Some(element) = config.element(name) else {
        eprintln!("Element {name} not in {}", args[1]);
        std::process::exit(1);
    };

    let template = PreparedTemplate::open(&element.image_path).unwrap_or_else(|e| {
        eprintln!("Failed to load template {}: {e:#}", element.image_path.display());
        std::process::exit(1);
    });
    let threshold = element.threshold.unwrap_or(DEFAULT_THRESHOLD);

    println!(
        "Template: {} ({}x{})",
        element.image_path.display(),
        template.width,
        template.height
    );
    match element.search_area {
        Some(a) => println!("Search area: [{}, {}, {}, {}]", a.x1, a.y1, a.x2, a.y2),
        None => println!("Search area: full screen"),
    }
    println!("Threshold: {threshold:.4}");
    println!();

    for screenshot_path in &args[3..] {
        let screenshot = match image::open(screenshot_path) {
            Ok(img) => img,
            Err(e) => {
                eprintln!("Failed to load {screenshot_path}: {e}");
                continue;
            }
        };

        match detector::find_best_match(&screenshot, &template, element.search_area) {
            Some(m) => {
                let status = if m.score >= threshold { "MATCH" } else { "no match" };
                println!(
                    "{screenshot_path}: {status} score={:.4} pixel=({}, {})",
                    m.score, m.x, m.y
                );
            }
            None => {
                println!("{screenshot_path}: no correlation result");
            }
        }
    }
}
