use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use crate::catalog::{Catalog, Coord, Site};
use crate::explored::ExploredSet;
use crate::screen::Pacing;
use crate::state::StopFlag;

/// Marches available when both slots are free.
pub const MAX_MARCHES: u8 = 2;

/// Budget from the two march-slot indicators: `Some(false)` (indicator absent)
/// costs one march, `None` means the indicator is not configured.
pub fn march_budget(slots: [Option<bool>; 2]) -> u8 {
    let absent = slots.iter().filter(|s| **s == Some(false)).count() as u8;
    MAX_MARCHES - absent
}

/// Per-coordinate UI interaction. Returns `true` when a march was sent.
pub trait RuinAttempt {
    fn attempt(&mut self, site: &Site) -> bool;
}

impl<F: FnMut(&Site) -> bool> RuinAttempt for F {
    fn attempt(&mut self, site: &Site) -> bool {
        self(site)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExplorationReport {
    pub budget: u8,
    pub marches_used: u8,
    /// Every coordinate tried in this run, in order.
    pub attempted: Vec<Coord>,
    /// The stop flag ended the run before the budget or catalog ran out.
    pub stopped: bool,
}

#[derive(Debug, Serialize)]
struct AttemptRecord<'a> {
    timestamp: String,
    level: &'a str,
    area: &'a str,
    x: u32,
    y: u32,
    started: bool,
    march: Option<u8>,
}

fn journal_attempt(journal: &Path, record: &AttemptRecord<'_>) {
    let line = match serde_json::to_string(record) {
        Ok(l) => l,
        Err(e) => {
            tracing::warn!("failed to serialize attempt record: {e}");
            return;
        }
    };

    match OpenOptions::new().create(true).append(true).open(journal) {
        Ok(mut f) => {
            if let Err(e) = writeln!(f, "{line}") {
                tracing::warn!("failed to write to {}: {e}", journal.display());
            }
        }
        Err(e) => {
            tracing::warn!("failed to open {}: {e}", journal.display());
        }
    }
}

/// Walk `catalog` in order and try every site not yet in `explored`, until
/// `budget` marches have been sent, the catalog runs out, or `stop` is raised.
///
/// Every tried coordinate is added to `explored` and persisted straight away,
/// whether or not the attempt succeeded, so a failed coordinate is not retried
/// on later runs either.
pub fn explore(
    catalog: &Catalog,
    budget: u8,
    explored: &mut ExploredSet,
    visit: &mut impl RuinAttempt,
    stop: &StopFlag,
    journal: Option<&Path>,
    pacing: &Pacing,
) -> ExplorationReport {
    let mut report = ExplorationReport {
        budget,
        ..Default::default()
    };

    if budget == 0 {
        return report;
    }

    let mut current_area = "";
    for site in catalog.sites() {
        if report.marches_used >= budget {
            break;
        }
        if explored.contains(site.coord) {
            continue;
        }
        if stop.is_raised() {
            tracing::info!("exploration stopped after {} attempt(s)", report.attempted.len());
            report.stopped = true;
            break;
        }

        if site.area != current_area {
            current_area = site.area;
            tracing::info!("checking {} / {}", site.level, site.area);
        }

        let started = visit.attempt(&site);
        if started {
            report.marches_used += 1;
            tracing::info!(
                "march {}/{budget} started at {}",
                report.marches_used,
                site.coord
            );
        }
        report.attempted.push(site.coord);

        if let Err(e) = explored.mark(site.coord) {
            tracing::warn!("error saving explored ruins: {e:#}");
        }

        if let Some(journal) = journal {
            journal_attempt(
                journal,
                &AttemptRecord {
                    timestamp: Utc::now().to_rfc3339(),
                    level: site.level,
                    area: site.area,
                    x: site.coord.x,
                    y: site.coord.y,
                    started,
                    march: started.then_some(report.marches_used),
                },
            );
        }

        pacing.wait(Duration::from_secs(1));
    }

    report
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::catalog::{Area, Level, RUINS};

    static SMALL: Catalog = Catalog {
        levels: &[
            Level {
                name: "Level A",
                areas: &[
                    Area {
                        name: "North",
                        coords: &[Coord::new(1, 1), Coord::new(2, 2), Coord::new(3, 3)],
                    },
                    Area {
                        name: "South",
                        coords: &[Coord::new(4, 4)],
                    },
                ],
            },
            Level {
                name: "Level B",
                areas: &[Area {
                    name: "East",
                    coords: &[Coord::new(5, 5), Coord::new(6, 6)],
                }],
            },
        ],
    };

    fn scratch() -> (tempfile::TempDir, ExploredSet) {
        let dir = tempfile::tempdir().unwrap();
        let set = ExploredSet::load(dir.path().join("explored_ruins.json"));
        (dir, set)
    }

    fn run(catalog: &Catalog, budget: u8, explored: &mut ExploredSet, visit: &mut impl RuinAttempt) -> ExplorationReport {
        explore(catalog, budget, explored, visit, &StopFlag::default(), None, &Pacing::none())
    }

    #[test]
    fn test_march_budget() {
        assert_eq!(march_budget([Some(true), Some(true)]), 2);
        assert_eq!(march_budget([Some(false), Some(true)]), 1);
        assert_eq!(march_budget([Some(true), Some(false)]), 1);
        assert_eq!(march_budget([Some(false), Some(false)]), 0);
        assert_eq!(march_budget([None, Some(false)]), 1);
        assert_eq!(march_budget([None, None]), 2);
    }

    #[test]
    fn test_zero_budget_touches_nothing() {
        let (_dir, mut explored) = scratch();
        let mut calls = 0;
        let report = run(&SMALL, 0, &mut explored, &mut |_: &Site| {
            calls += 1;
            true
        });
        assert_eq!(calls, 0);
        assert!(report.attempted.is_empty());
        assert!(explored.is_empty());
        assert!(!explored.path().exists());
    }

    #[test]
    fn test_stops_when_budget_spent() {
        let (_dir, mut explored) = scratch();
        let report = run(&SMALL, 2, &mut explored, &mut |_: &Site| true);
        assert_eq!(report.marches_used, 2);
        assert_eq!(report.attempted, vec![Coord::new(1, 1), Coord::new(2, 2)]);
        assert_eq!(explored.len(), 2);
    }

    #[test]
    fn test_failed_attempt_still_marked_and_not_counted() {
        let (_dir, mut explored) = scratch();
        // Only (4, 4) and (6, 6) hold ruins.
        let report = run(&SMALL, 2, &mut explored, &mut |s: &Site| s.coord.x % 2 == 0 && s.coord.x > 3);
        assert_eq!(report.marches_used, 2);
        assert_eq!(
            report.attempted,
            vec![
                Coord::new(1, 1),
                Coord::new(2, 2),
                Coord::new(3, 3),
                Coord::new(4, 4),
                Coord::new(5, 5),
                Coord::new(6, 6),
            ]
        );
        assert!(explored.contains(Coord::new(1, 1)));
        assert!(explored.contains(Coord::new(5, 5)));
    }

    #[test]
    fn test_explored_is_saved_after_each_attempt() {
        let (_dir, mut explored) = scratch();
        let path = explored.path().to_path_buf();
        let mut seen_on_disk = Vec::new();
        let report = run(&SMALL, 1, &mut explored, &mut |s: &Site| {
            seen_on_disk.push(ExploredSet::load(&path).len());
            s.coord == Coord::new(3, 3)
        });
        // Before each attempt the file holds every earlier attempt.
        assert_eq!(seen_on_disk, vec![0, 1, 2]);
        assert_eq!(report.attempted.len(), 3);
        assert_eq!(ExploredSet::load(&path).len(), 3);
    }

    #[test]
    fn test_rerun_skips_explored() {
        let (_dir, mut explored) = scratch();
        let first = run(&SMALL, 2, &mut explored, &mut |s: &Site| s.coord.x != 1);
        assert_eq!(first.attempted, vec![Coord::new(1, 1), Coord::new(2, 2), Coord::new(3, 3)]);

        let mut reloaded = ExploredSet::load(explored.path());
        let second = run(&SMALL, 2, &mut reloaded, &mut |_: &Site| true);
        assert_eq!(second.attempted, vec![Coord::new(4, 4), Coord::new(5, 5)]);

        let overlap: HashSet<_> = first.attempted.iter().collect();
        assert!(second.attempted.iter().all(|c| !overlap.contains(c)));
    }

    #[test]
    fn test_unwritable_explored_file_keeps_going_without_repeats() {
        let mut explored = ExploredSet::empty("/nonexistent/dir/explored_ruins.json");
        // Every save fails; only (3, 3) and (5, 5) start a march.
        let mut tried = Vec::new();
        let report = run(&SMALL, 2, &mut explored, &mut |s: &Site| {
            tried.push(s.coord);
            s.coord == Coord::new(3, 3) || s.coord == Coord::new(5, 5)
        });

        assert_eq!(report.marches_used, 2);
        assert!(!report.stopped);
        assert_eq!(tried, report.attempted);
        assert_eq!(
            report.attempted,
            vec![Coord::new(1, 1), Coord::new(2, 2), Coord::new(3, 3), Coord::new(4, 4), Coord::new(5, 5)]
        );
        let unique: HashSet<_> = report.attempted.iter().collect();
        assert_eq!(unique.len(), report.attempted.len());
        assert!(report.attempted.iter().all(|c| explored.contains(*c)));
        assert!(!explored.path().exists());
    }

    #[test]
    fn test_catalog_exhaustion() {
        let (_dir, mut explored) = scratch();
        let report = run(&SMALL, 2, &mut explored, &mut |_: &Site| false);
        assert_eq!(report.marches_used, 0);
        assert_eq!(report.attempted.len(), SMALL.len());
        assert_eq!(explored.len(), SMALL.len());

        let again = run(&SMALL, 2, &mut explored, &mut |_: &Site| true);
        assert!(again.attempted.is_empty());
    }

    #[test]
    fn test_stop_flag_ends_run() {
        let (_dir, mut explored) = scratch();
        let stop = StopFlag::default();
        let mut visit = |_: &Site| {
            stop.raise();
            false
        };
        let report = explore(&SMALL, 2, &mut explored, &mut visit, &stop, None, &Pacing::none());
        assert!(report.stopped);
        assert_eq!(report.attempted, vec![Coord::new(1, 1)]);
        assert_eq!(explored.len(), 1);
    }

    #[test]
    fn test_journal_lines() {
        let (dir, mut explored) = scratch();
        let journal = dir.path().join("exploration_log.jsonl");
        let mut visit = |s: &Site| s.coord == Coord::new(2, 2);
        explore(&SMALL, 1, &mut explored, &mut visit, &StopFlag::default(), Some(&journal), &Pacing::none());

        let lines: Vec<serde_json::Value> = std::fs::read_to_string(&journal)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["started"], false);
        assert_eq!(lines[0]["march"], serde_json::Value::Null);
        assert_eq!(lines[1]["area"], "North");
        assert_eq!(lines[1]["x"], 2);
        assert_eq!(lines[1]["march"], 1);
    }

    #[test]
    fn test_full_catalog_bounds() {
        for budget in 0..=MAX_MARCHES {
            let (_dir, mut explored) = scratch();
            let mut n = 0;
            // Every fifth coordinate holds a ruin.
            let report = run(&RUINS, budget, &mut explored, &mut |_: &Site| {
                n += 1;
                n % 5 == 0
            });
            assert_eq!(report.marches_used, budget);
            assert!(explored.len() >= budget as usize);
            assert!(explored.len() <= RUINS.len());
            assert_eq!(explored.len(), report.attempted.len());
        }
    }
}
