use common::{Bar, IndicatorSnapshot};

/// Column views over a bar window, computed once per evaluation.
pub(crate) struct Columns {
    pub closes: Vec<f64>,
    pub volumes: Vec<f64>,
}

impl Columns {
    pub fn new(bars: &[Bar]) -> Self {
        Self {
            closes: bars.iter().map(|b| b.close).collect(),
            volumes: bars.iter().map(|b| b.volume).collect(),
        }
    }
}

/// Snapshot with the price/volume fields filled in and no indicators yet.
/// `None` for an empty window.
pub(crate) fn base_snapshot(bars: &[Bar]) -> Option<IndicatorSnapshot> {
    let last = bars.last()?;
    let prev_close = bars.len().checked_sub(2).map(|i| bars[i].close);
    Some(IndicatorSnapshot {
        close: last.close,
        prev_close,
        volume: last.volume,
        ..IndicatorSnapshot::default()
    })
}
