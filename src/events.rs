//! Motion event log.
//!
//! Every frame that ends with at least one surviving region becomes a
//! `MotionEvent`. Events are kept in memory, optionally appended to a CSV file
//! as they happen, and can be exported to (and reloaded from) pretty JSON.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::detect::{Detection, MotionRegion};

const CSV_HEADER: [&str; 4] = ["frame_index", "timestamp_epoch_s", "region_count", "total_area"];

/// Trailing window used for `events_per_hour`.
pub const RATE_WINDOW_HOURS: u32 = 24;
const SECS_PER_HOUR: f64 = 3600.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionEvent {
    pub frame_index: u64,
    pub timestamp_epoch_s: f64,
    pub region_count: usize,
    pub total_area: usize,
    pub regions: Vec<MotionRegion>,
}

#[derive(Serialize)]
struct CsvRow {
    frame_index: u64,
    timestamp_epoch_s: f64,
    region_count: usize,
    total_area: usize,
}

impl From<&MotionEvent> for CsvRow {
    fn from(event: &MotionEvent) -> Self {
        Self {
            frame_index: event.frame_index,
            timestamp_epoch_s: event.timestamp_epoch_s,
            region_count: event.region_count,
            total_area: event.total_area,
        }
    }
}

/// Summary over a set of events.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EventStats {
    pub total_events: usize,
    pub total_regions: usize,
    pub average_regions_per_event: f64,
    pub first_frame: Option<u64>,
    pub last_frame: Option<u64>,
    /// Events in the last `RATE_WINDOW_HOURS` hours divided by the window length.
    pub events_per_hour: f64,
}

impl EventStats {
    /// Statistics as of the current wall clock.
    pub fn from_events(events: &[MotionEvent]) -> Self {
        Self::as_of(events, now_epoch_s())
    }

    /// Statistics with the rate window ending at `now_epoch_s`.
    pub fn as_of(events: &[MotionEvent], now_epoch_s: f64) -> Self {
        let cutoff = now_epoch_s - RATE_WINDOW_HOURS as f64 * SECS_PER_HOUR;
        let in_window = events.iter().filter(|e| e.timestamp_epoch_s > cutoff).count();
        let total_regions: usize = events.iter().map(|e| e.region_count).sum();
        let average_regions_per_event = if events.is_empty() {
            0.0
        } else {
            total_regions as f64 / events.len() as f64
        };
        Self {
            total_events: events.len(),
            total_regions,
            average_regions_per_event,
            first_frame: events.iter().map(|e| e.frame_index).min(),
            last_frame: events.iter().map(|e| e.frame_index).max(),
            events_per_hour: in_window as f64 / RATE_WINDOW_HOURS as f64,
        }
    }
}

fn now_epoch_s() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs_f64()
}

pub struct EventLog {
    events: Vec<MotionEvent>,
    csv: Option<(PathBuf, csv::Writer<File>)>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// In-memory log only.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            csv: None,
        }
    }

    /// Log that also appends each event to `path`. The header is written only
    /// when the file is new or empty.
    pub fn with_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open event csv {}", path.display()))?;
        let is_empty = file.metadata()?.len() == 0;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_empty {
            writer.write_record(CSV_HEADER)?;
            writer.flush()?;
        }
        Ok(Self {
            events: Vec::new(),
            csv: Some((path.to_path_buf(), writer)),
        })
    }

    /// Record `detection` for `frame_index` stamped with the current wall clock.
    pub fn record(&mut self, frame_index: u64, detection: &Detection) -> Result<Option<&MotionEvent>> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| anyhow!("system clock before unix epoch: {}", e))?;
        self.record_at(frame_index, now.as_secs_f64(), detection)
    }

    /// Record with an explicit timestamp. Frames without regions produce no event.
    pub fn record_at(
        &mut self,
        frame_index: u64,
        timestamp_epoch_s: f64,
        detection: &Detection,
    ) -> Result<Option<&MotionEvent>> {
        if detection.regions.is_empty() {
            return Ok(None);
        }
        let event = MotionEvent {
            frame_index,
            timestamp_epoch_s,
            region_count: detection.regions.len(),
            total_area: detection.total_area(),
            regions: detection.regions.clone(),
        };
        log::info!(
            "motion at frame {}: {} region(s), {} px",
            event.frame_index,
            event.region_count,
            event.total_area
        );
        if let Some((path, writer)) = self.csv.as_mut() {
            writer
                .serialize(CsvRow::from(&event))
                .with_context(|| format!("failed to append to {}", path.display()))?;
            writer.flush()?;
        }
        self.events.push(event);
        Ok(self.events.last())
    }

    pub fn events(&self) -> &[MotionEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events stamped strictly after `since_epoch_s`, oldest first.
    pub fn recent(&self, since_epoch_s: f64) -> impl Iterator<Item = &MotionEvent> + '_ {
        self.events
            .iter()
            .filter(move |e| e.timestamp_epoch_s > since_epoch_s)
    }

    pub fn stats(&self) -> EventStats {
        EventStats::from_events(&self.events)
    }

    /// Write all events as pretty JSON, replacing `path`.
    pub fn export_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.events)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write events to {}", path.display()))?;
        log::info!("exported {} event(s) to {}", self.events.len(), path.display());
        Ok(())
    }

    /// Read events previously written by `export_json`.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Vec<MotionEvent>> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read events from {}", path.display()))?;
        serde_json::from_str(&contents)
            .map_err(|e| anyhow!("invalid event file {}: {}", path.display(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;
    use crate::frame::ForegroundMask;

    fn detection(areas: &[usize]) -> Detection {
        Detection {
            mask: ForegroundMask::empty(8, 8),
            regions: areas
                .iter()
                .enumerate()
                .map(|(i, &area)| MotionRegion {
                    bbox: BoundingBox::from_corners(i as u32, 0, i as u32, 0),
                    area,
                })
                .collect(),
        }
    }

    #[test]
    fn frames_without_regions_are_not_events() -> Result<()> {
        let mut log = EventLog::new();
        assert!(log.record_at(0, 1.0, &detection(&[]))?.is_none());
        assert!(log.is_empty());
        Ok(())
    }

    #[test]
    fn stats_summarize_recorded_events() -> Result<()> {
        let mut log = EventLog::new();
        log.record_at(4, 1.0, &detection(&[10, 20]))?;
        log.record_at(9, 2.0, &detection(&[5]))?;
        let stats = log.stats();
        assert_eq!(stats.total_events, 2);
        assert_eq!(stats.total_regions, 3);
        assert_eq!(stats.average_regions_per_event, 1.5);
        assert_eq!(stats.first_frame, Some(4));
        assert_eq!(stats.last_frame, Some(9));
        assert_eq!(log.events()[0].total_area, 30);
        Ok(())
    }

    #[test]
    fn recent_filters_by_timestamp() -> Result<()> {
        let mut log = EventLog::new();
        log.record_at(1, 100.0, &detection(&[3]))?;
        log.record_at(2, 200.0, &detection(&[3]))?;
        log.record_at(3, 300.0, &detection(&[3]))?;
        let frames: Vec<u64> = log.recent(200.0).map(|e| e.frame_index).collect();
        assert_eq!(frames, vec![3]);
        assert_eq!(log.recent(0.0).count(), 3);
        Ok(())
    }

    #[test]
    fn events_per_hour_counts_last_day_only() -> Result<()> {
        let now = 1_000_000.0;
        let day = RATE_WINDOW_HOURS as f64 * SECS_PER_HOUR;
        let mut log = EventLog::new();
        log.record_at(1, now - day - 1.0, &detection(&[2]))?;
        for (i, age) in [10.0, 600.0, 7200.0].into_iter().enumerate() {
            log.record_at(2 + i as u64, now - age, &detection(&[1]))?;
        }
        let stats = EventStats::as_of(log.events(), now);
        assert_eq!(stats.total_events, 4);
        assert_eq!(stats.events_per_hour, 3.0 / 24.0);
        Ok(())
    }

    #[test]
    fn empty_stats_are_zero() {
        let stats = EventStats::from_events(&[]);
        assert_eq!(stats, EventStats::default());
    }

    #[test]
    fn json_export_reloads() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("events.json");
        let mut log = EventLog::new();
        log.record_at(3, 12.5, &detection(&[7]))?;
        log.export_json(&path)?;
        assert_eq!(EventLog::load_json(&path)?, log.events());
        Ok(())
    }

    #[test]
    fn csv_header_written_once() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("events.csv");
        {
            let mut log = EventLog::with_csv(&path)?;
            log.record_at(1, 2.5, &detection(&[4, 6]))?;
        }
        {
            let mut log = EventLog::with_csv(&path)?;
            log.record_at(2, 3.0, &detection(&[1]))?;
        }
        let contents = std::fs::read_to_string(&path)?;
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec![
                "frame_index,timestamp_epoch_s,region_count,total_area",
                "1,2.5,2,10",
                "2,3.0,1,1",
            ]
        );
        Ok(())
    }
}
