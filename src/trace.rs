//! Bounded pointer position history.
//!
//! A consumer-side helper: feed it drained events and it integrates movement
//! deltas into an absolute position, keeping the most recent points for trails
//! and exports.
//!
//! ```
//! use rawtrail::trace::PointerTrace;
//! use rawtrail::PointerEvent;
//! use std::time::Instant;
//!
//! let mut trace = PointerTrace::new(3).starting_at(100, 100);
//! trace.record(&PointerEvent::movement(5, -5, Instant::now()));
//! assert_eq!(trace.position(), (105, 95));
//! ```

use crate::error::TraceError;
use crate::event::PointerEvent;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

/// One integrated position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracePoint {
    pub x: i32,
    pub y: i32,
    pub dx: i32,
    pub dy: i32,
    /// Milliseconds since the first recorded movement.
    pub elapsed_ms: u64,
}

/// Inclusive clamp rectangle for the integrated position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl Bounds {
    /// `0..width` by `0..height`.
    pub fn screen(width: u32, height: u32) -> Self {
        Self {
            min_x: 0,
            min_y: 0,
            max_x: width.saturating_sub(1) as i32,
            max_y: height.saturating_sub(1) as i32,
        }
    }

    fn clamp(&self, x: i32, y: i32) -> (i32, i32) {
        (x.clamp(self.min_x, self.max_x), y.clamp(self.min_y, self.max_y))
    }
}

#[derive(Debug, Clone)]
pub struct PointerTrace {
    capacity: usize,
    points: VecDeque<TracePoint>,
    position: (i32, i32),
    bounds: Option<Bounds>,
    origin: Option<Instant>,
}

impl PointerTrace {
    /// Keep at most `capacity` points (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            points: VecDeque::with_capacity(capacity.min(4096)),
            position: (0, 0),
            bounds: None,
            origin: None,
        }
    }

    pub fn starting_at(mut self, x: i32, y: i32) -> Self {
        self.position = (x, y);
        self
    }

    /// Clamp the integrated position to `bounds`.
    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.position = bounds.clamp(self.position.0, self.position.1);
        self.bounds = Some(bounds);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn position(&self) -> (i32, i32) {
        self.position
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Oldest first.
    pub fn points(&self) -> impl ExactSizeIterator<Item = &TracePoint> + DoubleEndedIterator + '_ {
        self.points.iter()
    }

    pub fn last(&self) -> Option<&TracePoint> {
        self.points.back()
    }

    /// Integrate a movement event. Other events are ignored; returns whether a
    /// point was added.
    pub fn record(&mut self, event: &PointerEvent) -> bool {
        let PointerEvent::Movement(m) = event else {
            return false;
        };
        let origin = *self.origin.get_or_insert(m.timestamp);
        let elapsed_ms = m.timestamp.saturating_duration_since(origin).as_millis() as u64;

        let mut x = self.position.0.saturating_add(m.delta_x);
        let mut y = self.position.1.saturating_add(m.delta_y);
        if let Some(b) = &self.bounds {
            (x, y) = b.clamp(x, y);
        }
        self.position = (x, y);

        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(TracePoint {
            x,
            y,
            dx: m.delta_x,
            dy: m.delta_y,
            elapsed_ms,
        });
        true
    }

    /// Record a batch; returns how many points were added.
    pub fn extend<'a>(&mut self, events: impl IntoIterator<Item = &'a PointerEvent>) -> usize {
        events.into_iter().filter(|e| self.record(e)).count()
    }

    /// Forget the history. The current position is kept.
    pub fn clear(&mut self) {
        self.points.clear();
        self.origin = None;
    }

    /// Human-readable listing, one numbered line per point.
    pub fn write_text<W: Write>(&self, mut w: W) -> Result<(), TraceError> {
        writeln!(w, "Mouse Position History")?;
        writeln!(w, "{}", "=".repeat(30))?;
        writeln!(w)?;
        for (i, p) in self.points.iter().enumerate() {
            writeln!(w, "{:3}: ({:4}, {:4}) at {} ms", i + 1, p.x, p.y, p.elapsed_ms)?;
        }
        w.flush()?;
        Ok(())
    }

    pub fn save_text(&self, path: impl AsRef<Path>) -> Result<(), TraceError> {
        let file = File::create(path)?;
        self.write_text(BufWriter::new(file))
    }

    /// Write the points as a JSON array.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), TraceError> {
        let mut w = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut w, &self.points)?;
        w.flush()?;
        Ok(())
    }

    /// Read points written by [`save_json`](Self::save_json).
    pub fn load_json(path: impl AsRef<Path>) -> Result<Vec<TracePoint>, TraceError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
