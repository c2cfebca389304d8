//! Plain-text sink for the command-line dashboard

use std::io::Write;

use super::render::{DisplaySink, RenderOp};

/// Writes each render instruction as one or more text lines
pub struct TerminalSink<W: Write + Send> {
    out: W,
}

impl TerminalSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_op(&mut self, op: &RenderOp) -> std::io::Result<()> {
        match op {
            RenderOp::ConnectionStatus { state } => writeln!(self.out, "● {}", state),
            RenderOp::Counter { kind, value, .. } => {
                writeln!(self.out, "{:<8} {}", format!("{:?}", kind).to_lowercase(), value)
            }
            RenderOp::Metrics {
                confidence,
                processing,
            } => writeln!(
                self.out,
                "avg confidence {}  avg processing {}",
                confidence, processing
            ),
            RenderOp::Chart { slices } => {
                let parts: Vec<String> = slices
                    .iter()
                    .map(|s| format!("{} {} ({})", s.category.label(), s.value, s.share))
                    .collect();
                writeln!(self.out, "distribution: {}", parts.join(", "))
            }
            RenderOp::Quality { panel } => {
                for bar in &panel.bars {
                    writeln!(self.out, "  {:<10} {:>3}% {:?}", bar.name, bar.percent, bar.tier)?;
                }
                writeln!(self.out, "  overall    {:>3}% {:?}", panel.overall, panel.overall_tier)
            }
            RenderOp::Probabilities { rows } => {
                for row in rows {
                    let star = if row.is_top { " ★" } else { "" };
                    writeln!(self.out, "  {} {:<14} {}{}", row.icon, row.label, row.percentage, star)?;
                }
                Ok(())
            }
            RenderOp::Recommendations { clauses } => {
                for clause in clauses {
                    writeln!(self.out, "  [{}] {}", clause.severity.as_str(), clause.message)?;
                }
                Ok(())
            }
            RenderOp::ActivityReplaced { items } => {
                writeln!(self.out, "activity ({} items)", items.len())?;
                for item in items {
                    write_item(&mut self.out, item)?;
                }
                Ok(())
            }
            RenderOp::ActivityPrepended { item, .. } => write_item(&mut self.out, item),
        }
    }
}

fn write_item<W: Write>(out: &mut W, item: &super::render::ActivityItem) -> std::io::Result<()> {
    writeln!(
        out,
        "  {} {:<14} {} {} {:>6} ({:?})",
        item.icon,
        item.title,
        item.time.as_deref().unwrap_or("--:--:--"),
        item.processing.as_deref().unwrap_or(""),
        item.confidence,
        item.badge
    )
}

impl<W: Write + Send> DisplaySink for TerminalSink<W> {
    fn render(&mut self, op: RenderOp) {
        if let Err(e) = self.write_op(&op).and_then(|_| self.out.flush()) {
            tracing::warn!(error = %e, "Failed to write dashboard output");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DisplayAggregator;
    use crate::model::{CategoryCounts, StatisticsSnapshot};

    #[test]
    fn test_writes_metrics_line() {
        let mut sink = TerminalSink::new(Vec::new());
        let mut agg = DisplayAggregator::default();
        let snapshot = StatisticsSnapshot {
            category_counts: CategoryCounts::new(3, 1, 0),
            total: 4,
            avg_confidence: 0.92,
            avg_processing_time: 0.15,
        };
        for op in agg.statistics(&snapshot) {
            sink.render(op);
        }

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert!(text.contains("avg confidence 92.0%  avg processing 150ms"));
        assert!(text.contains("total    4"));
        assert!(text.contains("Fresh Fruit 3 (75.0%)"));
    }
}
