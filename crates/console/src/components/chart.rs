//! Bar chart component types.
//!
//! Charts are rendered server-side as proportional CSS bars. Each bar's
//! width is its share of the series maximum.

/// One bar of a chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bar {
    /// Display label.
    pub label: String,
    /// Value as printed next to the bar.
    pub value: String,
    /// Width in percent of the widest bar (0..=100).
    pub width_pct: u8,
    /// Optional CSS class (badge colour) for the bar fill.
    pub class: &'static str,
}

/// A titled list of bars.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BarChart {
    pub bars: Vec<Bar>,
}

impl BarChart {
    /// Build a chart from integer counts.
    pub fn from_counts<I, L>(series: I) -> Self
    where
        I: IntoIterator<Item = (L, u64)>,
        L: Into<String>,
    {
        let points: Vec<(String, u64)> = series.into_iter().map(|(l, v)| (l.into(), v)).collect();
        #[allow(clippy::cast_precision_loss)]
        let max = points.iter().map(|(_, v)| *v).max().unwrap_or(0) as f64;

        let bars = points
            .into_iter()
            .map(|(label, value)| {
                #[allow(clippy::cast_precision_loss)]
                let width_pct = scale(value as f64, max);
                Bar {
                    label,
                    value: value.to_string(),
                    width_pct,
                    class: "",
                }
            })
            .collect();
        Self { bars }
    }

    /// Build a chart from the `n` largest counts, ranked on the raw value
    /// (ties keep their original order).
    pub fn from_top_counts<I, L>(series: I, n: usize) -> Self
    where
        I: IntoIterator<Item = (L, u64)>,
        L: Into<String>,
    {
        let mut points: Vec<(String, u64)> =
            series.into_iter().map(|(l, v)| (l.into(), v)).collect();
        points.sort_by(|a, b| b.1.cmp(&a.1));
        points.truncate(n);
        Self::from_counts(points)
    }

    /// Build a chart from fractional values, printed with one decimal and
    /// `suffix`.
    pub fn from_values<I, L>(series: I, suffix: &str) -> Self
    where
        I: IntoIterator<Item = (L, f64)>,
        L: Into<String>,
    {
        let points: Vec<(String, f64)> = series.into_iter().map(|(l, v)| (l.into(), v)).collect();
        let max = points.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);

        let bars = points
            .into_iter()
            .map(|(label, value)| Bar {
                label,
                value: format!("{value:.1}{suffix}"),
                width_pct: scale(value, max),
                class: "",
            })
            .collect();
        Self { bars }
    }

    /// Attach a CSS class to each bar, chosen by label.
    #[must_use]
    pub fn with_classes<F>(mut self, class_for: F) -> Self
    where
        F: Fn(&str) -> &'static str,
    {
        for bar in &mut self.bars {
            bar.class = class_for(&bar.label);
        }
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Share of `max` as a whole percentage, 0 when `max` is not positive.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scale(value: f64, max: f64) -> u8 {
    if max <= 0.0 || value <= 0.0 {
        return 0;
    }
    ((value / max) * 100.0).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_against_max() {
        let chart = BarChart::from_counts([("open", 4), ("closed", 8), ("paused", 0)]);
        let widths: Vec<u8> = chart.bars.iter().map(|b| b.width_pct).collect();
        assert_eq!(widths, vec![50, 100, 0]);
    }

    #[test]
    fn test_all_zero_series() {
        let chart = BarChart::from_counts([("a", 0), ("b", 0)]);
        assert!(chart.bars.iter().all(|b| b.width_pct == 0));
    }

    #[test]
    fn test_empty_series() {
        let chart = BarChart::from_counts(Vec::<(String, u64)>::new());
        assert!(chart.is_empty());
    }

    #[test]
    fn test_fractional_values() {
        let chart = BarChart::from_values([("S1", 12.0), ("S2", 3.0)], " h");
        assert_eq!(chart.bars[0].value, "12.0 h");
        assert_eq!(chart.bars[1].width_pct, 25);
    }

    #[test]
    fn test_top_keeps_largest() {
        let chart = BarChart::from_top_counts([("ana", 2), ("luis", 9), ("eva", 5)], 2);
        let labels: Vec<&str> = chart.bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["luis", "eva"]);
    }

    #[test]
    fn test_top_ranks_on_raw_value() {
        // 996 and 1000 both scale to 100%; the ranking must still see 998 > 996.
        let chart = BarChart::from_top_counts(
            [("ana", 996), ("luis", 1000), ("eva", 998), ("pablo", 10)],
            2,
        );
        let labels: Vec<&str> = chart.bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["luis", "eva"]);
        assert_eq!(chart.bars[1].width_pct, 100);
    }

    #[test]
    fn test_with_classes() {
        let chart = BarChart::from_counts([("open", 1)]).with_classes(|_| "bar-blue");
        assert_eq!(chart.bars[0].class, "bar-blue");
    }
}
