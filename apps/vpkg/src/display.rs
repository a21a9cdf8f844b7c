//! Output rendering and formatting

use console::{style, Term};
use std::collections::HashMap;
use std::io::{self, Write};
use vpkg_events::{ProgressEvent, ProgressKind};
use vpkg_ops::{ListEntry, OperationResult, SyncReport, TransactionOutcome};

/// Terminal operations the progress block is drawn with
pub trait BlockOutput {
    fn write_line(&mut self, line: &str) -> io::Result<()>;
    fn clear_line(&mut self) -> io::Result<()>;
    fn move_cursor_up(&mut self, n: usize) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

impl BlockOutput for Term {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        Term::write_line(self, line)
    }

    fn clear_line(&mut self) -> io::Result<()> {
        Term::clear_line(self)
    }

    fn move_cursor_up(&mut self, n: usize) -> io::Result<()> {
        Term::move_cursor_up(self, n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Term::flush(self)
    }
}

/// Fixed block of progress rows, one per running job.
///
/// Rows live in a ring of `slots` entries. The running jobs always occupy
/// the contiguous range starting at `base`, oldest first, so the block can
/// be redrawn in place with a fixed height. A worker's current row is
/// tracked in `slot_of` because finishing jobs swap rows around.
pub struct ProgressDisplay<O: BlockOutput> {
    out: O,
    rows: Vec<Option<Row>>,
    slot_of: HashMap<usize, usize>,
    base: usize,
    running: usize,
    /// Height of the block currently on screen
    drawn: usize,
    /// Lines to print above the block on the next redraw
    finished: Vec<String>,
    interactive: bool,
    colors: bool,
    failed: bool,
}

struct Row {
    worker: usize,
    package: String,
    state: RowState,
}

enum RowState {
    Initializing,
    Downloading { done: u64, total: Option<u64> },
    Converting,
    Finished,
    Failed(String),
}

impl Row {
    fn render(&self, colors: bool) -> String {
        let name = &self.package;
        match &self.state {
            RowState::Initializing => format!("{name} initializing"),
            RowState::Downloading {
                done,
                total: Some(total),
            } => format!("{name} downloading {done}/{total}"),
            RowState::Downloading { done, total: None } => format!("{name} downloading {done}"),
            RowState::Converting => format!("{name} xdeb"),
            RowState::Finished => format!("{name} finished"),
            RowState::Failed(message) => {
                let label = if colors {
                    style("error").red().bold().force_styling(true).to_string()
                } else {
                    "error".to_string()
                };
                format!("{name} {label} {message}")
            }
        }
    }
}

impl<O: BlockOutput> ProgressDisplay<O> {
    /// Create a display for a pool of `slots` workers. A non-interactive
    /// display prints only the final line of each job.
    pub fn new(slots: usize, out: O, interactive: bool, colors: bool) -> Self {
        let slots = slots.max(1);
        Self {
            out,
            rows: (0..slots).map(|_| None).collect(),
            slot_of: HashMap::new(),
            base: 0,
            running: 0,
            drawn: 0,
            finished: Vec::new(),
            interactive,
            colors,
            failed: false,
        }
    }

    /// Whether any job reported an error
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Update the rows for one event. Nothing is written until
    /// [`redraw`](Self::redraw).
    pub fn apply(&mut self, event: &ProgressEvent) {
        match &event.kind {
            ProgressKind::Init => self.start(event.worker, &event.package),
            ProgressKind::Downloading { done, total } => self.update(
                event.worker,
                RowState::Downloading {
                    done: *done,
                    total: *total,
                },
            ),
            ProgressKind::Converting => self.update(event.worker, RowState::Converting),
            ProgressKind::Done => self.finish(event.worker),
            ProgressKind::Error { message } => self.fail(event.worker, message),
        }
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn start(&mut self, worker: usize, package: &str) {
        if self.running >= self.len() {
            tracing::warn!(worker, package, "no free progress row");
            return;
        }
        let slot = (self.base + self.running) % self.len();
        self.rows[slot] = Some(Row {
            worker,
            package: package.to_string(),
            state: RowState::Initializing,
        });
        self.slot_of.insert(worker, slot);
        self.running += 1;
    }

    fn update(&mut self, worker: usize, state: RowState) {
        if let Some(row) = self
            .slot_of
            .get(&worker)
            .and_then(|slot| self.rows[*slot].as_mut())
        {
            row.state = state;
        }
    }

    /// Move the worker's row to the head of the ring and retire it
    fn finish(&mut self, worker: usize) {
        let Some(&slot) = self.slot_of.get(&worker) else {
            return;
        };
        let head = self.base;
        self.swap(slot, head);

        if let Some(mut row) = self.rows[head].take() {
            row.state = RowState::Finished;
            self.finished.push(row.render(self.colors));
        }
        self.slot_of.remove(&worker);
        self.base = (self.base + 1) % self.len();
        self.running -= 1;
    }

    /// Move the worker's row to the newest slot and keep it on screen
    fn fail(&mut self, worker: usize, message: &str) {
        self.failed = true;
        let Some(&slot) = self.slot_of.get(&worker) else {
            return;
        };
        let newest = (self.base + self.running - 1) % self.len();
        self.swap(slot, newest);

        let message = message.lines().collect::<Vec<_>>().join(" ");
        if let Some(row) = self.rows[newest].as_mut() {
            row.state = RowState::Failed(message);
            if !self.interactive {
                self.finished.push(row.render(self.colors));
            }
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.rows.swap(a, b);
        for slot in [a, b] {
            if let Some(row) = &self.rows[slot] {
                self.slot_of.insert(row.worker, slot);
            }
        }
    }

    /// Write pending output. An interactive display moves the cursor back
    /// to the top of its block, prints the lines of retired jobs there and
    /// then the running rows below them.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    pub fn redraw(&mut self) -> io::Result<()> {
        if !self.interactive {
            for line in self.finished.drain(..) {
                self.out.write_line(&line)?;
            }
            return self.out.flush();
        }

        // Every retired row adds a finished line, so the new output always
        // covers the old block.
        if self.drawn > 0 {
            self.out.move_cursor_up(self.drawn)?;
        }
        for line in self.finished.drain(..) {
            self.out.clear_line()?;
            self.out.write_line(&line)?;
        }
        for offset in 0..self.running {
            let slot = (self.base + offset) % self.rows.len();
            let line = self.rows[slot]
                .as_ref()
                .map(|row| row.render(self.colors))
                .unwrap_or_default();
            self.out.clear_line()?;
            self.out.write_line(&line)?;
        }
        self.drawn = self.running;
        self.out.flush()
    }

    #[cfg(test)]
    fn occupied(&self) -> Vec<usize> {
        let mut slots: Vec<usize> = (0..self.rows.len())
            .filter(|slot| self.rows[*slot].is_some())
            .collect();
        slots.sort_unstable();
        slots
    }

    #[cfg(test)]
    fn into_inner(self) -> O {
        self.out
    }
}

/// Output renderer for CLI results
pub struct OutputRenderer {
    json_output: bool,
    colors: bool,
}

impl OutputRenderer {
    pub fn new(json_output: bool, colors: bool) -> Self {
        Self {
            json_output,
            colors,
        }
    }

    /// Render operation result
    pub fn render_result(&self, result: &OperationResult) -> io::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        if self.json_output {
            let json = result.to_json().map_err(io::Error::other)?;
            writeln!(out, "{json}")
        } else {
            self.render_plain(&mut out, result)
        }
    }

    fn render_plain(&self, out: &mut impl Write, result: &OperationResult) -> io::Result<()> {
        match result {
            OperationResult::PackageList(entries) => {
                for entry in entries {
                    writeln!(out, "{}", entry.name)?;
                }
                Ok(())
            }
            OperationResult::PackageSet(entries) => render_package_set(out, entries),
            OperationResult::SyncReport(report) => self.render_sync_report(out, report),
        }
    }

    fn render_sync_report(&self, out: &mut impl Write, report: &SyncReport) -> io::Result<()> {
        if report.jobs.is_empty() {
            return Ok(());
        }
        let installed = match &report.transaction {
            TransactionOutcome::NothingToDo => 0,
            TransactionOutcome::Committed { changes } => changes.len(),
        };
        let summary = format!(
            "{} built, {} cached, {} installed",
            report.built, report.cached, installed
        );
        if self.colors {
            writeln!(out, "{}", style(summary).green())
        } else {
            writeln!(out, "{summary}")
        }
    }
}

fn render_package_set(out: &mut impl Write, entries: &[ListEntry]) -> io::Result<()> {
    for entry in entries {
        if entry.is_installed() {
            writeln!(out, "{}*", entry.name)?;
        } else {
            writeln!(out, "{}", entry.name)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    /// Records terminal operations instead of drawing them
    #[derive(Default)]
    struct Screen {
        ops: Vec<String>,
    }

    impl BlockOutput for Screen {
        fn write_line(&mut self, line: &str) -> io::Result<()> {
            self.ops.push(line.to_string());
            Ok(())
        }

        fn clear_line(&mut self) -> io::Result<()> {
            self.ops.push("<clear>".to_string());
            Ok(())
        }

        fn move_cursor_up(&mut self, n: usize) -> io::Result<()> {
            self.ops.push(format!("<up {n}>"));
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn event(worker: usize, package: &str, kind: ProgressKind) -> ProgressEvent {
        ProgressEvent {
            worker,
            position: 0,
            package: package.to_string(),
            kind,
        }
    }

    fn display(slots: usize, interactive: bool) -> ProgressDisplay<Screen> {
        ProgressDisplay::new(slots, Screen::default(), interactive, false)
    }

    /// The running rows must be exactly base..base+running, mod N
    fn assert_dense<O: BlockOutput>(display: &ProgressDisplay<O>) {
        let n = display.rows.len();
        let mut expected: Vec<usize> = (0..display.running)
            .map(|offset| (display.base + offset) % n)
            .collect();
        expected.sort_unstable();
        assert_eq!(display.occupied(), expected);

        let mut slots: Vec<usize> = display.slot_of.values().copied().collect();
        slots.sort_unstable();
        slots.dedup();
        assert_eq!(slots.len(), display.slot_of.len(), "two workers share a row");
        for (worker, slot) in &display.slot_of {
            let row = display.rows[*slot].as_ref().expect("mapped slot is empty");
            assert_eq!(row.worker, *worker);
        }
    }

    #[test]
    fn init_fills_consecutive_slots() {
        let mut d = display(3, true);
        d.apply(&event(0, "a", ProgressKind::Init));
        d.apply(&event(1, "b", ProgressKind::Init));
        assert_eq!(d.running, 2);
        assert_eq!(d.slot_of[&0], 0);
        assert_eq!(d.slot_of[&1], 1);
        assert_dense(&d);
    }

    #[test]
    fn out_of_order_finish_keeps_rows_dense() {
        let mut d = display(3, true);
        d.apply(&event(0, "a", ProgressKind::Init));
        d.apply(&event(1, "b", ProgressKind::Init));
        d.apply(&event(2, "c", ProgressKind::Init));

        // The newest job finishes first
        d.apply(&event(2, "c", ProgressKind::Done));
        assert_eq!(d.base, 1);
        assert_eq!(d.running, 2);
        assert_dense(&d);
        // a was moved into c's old row
        assert_eq!(d.slot_of[&0], 2);

        d.apply(&event(2, "d", ProgressKind::Init));
        assert_eq!(d.slot_of[&2], 0);
        assert_dense(&d);

        d.apply(&event(1, "b", ProgressKind::Done));
        d.apply(&event(0, "a", ProgressKind::Done));
        d.apply(&event(2, "d", ProgressKind::Done));
        assert_eq!(d.running, 0);
        assert!(d.slot_of.is_empty());
        assert_dense(&d);
        assert_eq!(
            d.finished,
            vec!["c finished", "b finished", "a finished", "d finished"]
        );
    }

    const SLOTS: usize = 4;

    #[derive(Debug, Clone)]
    enum Step {
        Start(usize),
        Finish(usize),
        Fail(usize),
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            3 => (0..SLOTS).prop_map(Step::Start),
            2 => (0..SLOTS).prop_map(Step::Finish),
            1 => (0..SLOTS).prop_map(Step::Fail),
        ]
    }

    proptest! {
        #[test]
        fn schedules_never_share_a_row(steps in proptest::collection::vec(step(), 0..300)) {
            let mut d = display(SLOTS, true);
            let mut active = BTreeSet::new();
            // A failed worker keeps its row and never reports again
            let mut failed = BTreeSet::new();

            for (i, step) in steps.into_iter().enumerate() {
                match step {
                    Step::Start(worker) => {
                        if active.contains(&worker) || failed.contains(&worker) {
                            continue;
                        }
                        d.apply(&event(worker, &format!("p{i}"), ProgressKind::Init));
                        active.insert(worker);
                    }
                    Step::Finish(worker) => {
                        if !active.remove(&worker) {
                            continue;
                        }
                        d.apply(&event(worker, "", ProgressKind::Done));
                    }
                    Step::Fail(worker) => {
                        if !active.remove(&worker) {
                            continue;
                        }
                        let message = "xdeb failed with 1:\nmissing tool".to_string();
                        d.apply(&event(worker, "", ProgressKind::Error { message }));
                        failed.insert(worker);
                    }
                }
                prop_assert_eq!(d.running, active.len() + failed.len());
                prop_assert_eq!(d.failed(), !failed.is_empty());
                assert_dense(&d);
            }
        }
    }

    #[test]
    fn error_moves_row_to_newest_slot() {
        let mut d = display(3, true);
        d.apply(&event(0, "a", ProgressKind::Init));
        d.apply(&event(1, "b", ProgressKind::Init));
        d.apply(&event(2, "c", ProgressKind::Init));
        d.apply(&event(
            0,
            "a",
            ProgressKind::Error {
                message: "xdeb failed with 1:\nmissing tool".to_string(),
            },
        ));

        assert!(d.failed());
        assert_eq!(d.running, 3);
        assert_eq!(d.slot_of[&0], 2);
        assert_eq!(d.slot_of[&2], 0);
        assert_dense(&d);
        let row = d.rows[2].as_ref().unwrap();
        assert_eq!(row.render(false), "a error xdeb failed with 1: missing tool");
    }

    #[test]
    fn progress_updates_row_in_place() {
        let mut d = display(2, true);
        d.apply(&event(1, "a", ProgressKind::Init));
        d.apply(&event(
            1,
            "a",
            ProgressKind::Downloading {
                done: 10,
                total: Some(40),
            },
        ));
        assert_eq!(d.rows[0].as_ref().unwrap().render(false), "a downloading 10/40");
        d.apply(&event(1, "a", ProgressKind::Converting));
        assert_eq!(d.rows[0].as_ref().unwrap().render(false), "a xdeb");
        assert_eq!(d.slot_of[&1], 0);
    }

    #[test]
    fn redraw_rewrites_block_in_place() {
        let mut d = display(2, true);
        d.apply(&event(0, "a", ProgressKind::Init));
        d.apply(&event(1, "b", ProgressKind::Init));
        d.redraw().unwrap();
        d.apply(&event(1, "b", ProgressKind::Done));
        d.redraw().unwrap();

        assert_eq!(
            d.into_inner().ops,
            vec![
                "<clear>",
                "a initializing",
                "<clear>",
                "b initializing",
                "<up 2>",
                "<clear>",
                "b finished",
                "<clear>",
                "a initializing",
            ]
        );
    }

    #[test]
    fn plain_output_prints_only_final_lines() {
        let mut d = display(2, false);
        d.apply(&event(0, "a", ProgressKind::Init));
        d.apply(&event(1, "b", ProgressKind::Init));
        d.apply(&event(0, "a", ProgressKind::Converting));
        d.apply(&event(0, "a", ProgressKind::Done));
        d.apply(&event(
            1,
            "b",
            ProgressKind::Error {
                message: "download failed".to_string(),
            },
        ));
        d.redraw().unwrap();

        assert_eq!(
            d.into_inner().ops,
            vec!["a finished", "b error download failed"]
        );
    }

    #[test]
    fn package_set_marks_installed() {
        let entries = vec![
            ListEntry {
                name: "discord".to_string(),
                pkgver: Some("discord-0.0.40_1".to_string()),
            },
            ListEntry {
                name: "slack".to_string(),
                pkgver: None,
            },
        ];
        let mut out = Vec::new();
        render_package_set(&mut out, &entries).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "discord*\nslack\n");
    }
}
