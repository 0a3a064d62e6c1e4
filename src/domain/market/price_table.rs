use super::bar::{Bar, PriceSeries, Ticker};
use chrono::NaiveDate;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use std::collections::{BTreeSet, HashMap};

/// OHLCV field selector for table access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

/// Multi-ticker OHLCV table aligned on a common calendar.
///
/// Rows are the sorted union of every ticker's dates, columns are tickers.
/// A cell is `NaN` when the ticker has no bar on that date.
#[derive(Debug, Clone)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    tickers: Vec<Ticker>,
    columns: HashMap<Ticker, usize>,
    open: Array2<f64>,
    high: Array2<f64>,
    low: Array2<f64>,
    close: Array2<f64>,
    volume: Array2<f64>,
}

impl PriceTable {
    /// Aligns per-ticker series on the union of their dates.
    ///
    /// If the same ticker appears twice, the later series replaces the earlier one.
    pub fn align(series: Vec<PriceSeries>) -> Self {
        let dates: Vec<NaiveDate> = series
            .iter()
            .flat_map(|s| s.bars().iter().map(|b| b.date))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let row_of: HashMap<NaiveDate, usize> =
            dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        let mut tickers: Vec<Ticker> = Vec::new();
        let mut columns: HashMap<Ticker, usize> = HashMap::new();
        for s in &series {
            if !columns.contains_key(&s.ticker) {
                columns.insert(s.ticker.clone(), tickers.len());
                tickers.push(s.ticker.clone());
            }
        }

        let shape = (dates.len(), tickers.len());
        let mut open = Array2::from_elem(shape, f64::NAN);
        let mut high = Array2::from_elem(shape, f64::NAN);
        let mut low = Array2::from_elem(shape, f64::NAN);
        let mut close = Array2::from_elem(shape, f64::NAN);
        let mut volume = Array2::from_elem(shape, f64::NAN);

        for s in &series {
            let col = columns[&s.ticker];
            // A replaced ticker must not leave stale cells behind
            for arr in [&mut open, &mut high, &mut low, &mut close, &mut volume] {
                arr.column_mut(col).fill(f64::NAN);
            }
            for bar in s.bars() {
                let row = row_of[&bar.date];
                open[[row, col]] = bar.open;
                high[[row, col]] = bar.high;
                low[[row, col]] = bar.low;
                close[[row, col]] = bar.close;
                volume[[row, col]] = bar.volume;
            }
        }

        Self {
            dates,
            tickers,
            columns,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn n_bars(&self) -> usize {
        self.dates.len()
    }

    pub fn n_tickers(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.tickers.is_empty()
    }

    pub fn column_of(&self, ticker: &str) -> Option<usize> {
        self.columns.get(ticker).copied()
    }

    /// Whole field table, shape `(n_bars, n_tickers)`
    pub fn field(&self, field: PriceField) -> ArrayView2<'_, f64> {
        match field {
            PriceField::Open => self.open.view(),
            PriceField::High => self.high.view(),
            PriceField::Low => self.low.view(),
            PriceField::Close => self.close.view(),
            PriceField::Volume => self.volume.view(),
        }
    }

    pub fn close(&self) -> ArrayView2<'_, f64> {
        self.close.view()
    }

    /// One ticker's column of a field
    pub fn column(&self, ticker: &str, field: PriceField) -> Option<ArrayView1<'_, f64>> {
        let col = self.column_of(ticker)?;
        Some(self.field(field).index_axis_move(Axis(1), col))
    }

    /// Bar of `ticker` at `row`, if every field is present
    pub fn bar_at(&self, ticker: &str, row: usize) -> Option<Bar> {
        let col = self.column_of(ticker)?;
        let date = *self.dates.get(row)?;
        let bar = Bar {
            date,
            open: self.open[[row, col]],
            high: self.high[[row, col]],
            low: self.low[[row, col]],
            close: self.close[[row, col]],
            volume: self.volume[[row, col]],
        };
        bar.is_complete().then_some(bar)
    }

    /// Reconstructs a ticker's series, skipping incomplete rows
    pub fn series(&self, ticker: &str) -> Option<PriceSeries> {
        self.column_of(ticker)?;
        let bars = (0..self.n_bars())
            .filter_map(|row| self.bar_at(ticker, row))
            .collect();
        Some(PriceSeries::new(ticker, bars))
    }
}
