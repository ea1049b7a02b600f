use std::collections::BTreeMap;

use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::{as_object, first_number, first_str, format_large_number, number};
use crate::timestamps::parse_lenient_value;

const BILLION: f64 = 1e9;
const STATEMENT_PERIODS: usize = 4;

const POINT_VALUE_KEYS: &[&str] = &["close", "Close", "price", "value"];
const POINT_LABEL_KEYS: &[&str] = &["date", "Date", "Datetime", "timestamp", "time"];
const DATE_COLUMNS: &[&str] = &["date", "datetime", "index", "period"];

const INCOME_METRICS: &[&str] = &[
    "Total Revenue",
    "Gross Profit",
    "Operating Income",
    "EBITDA",
    "Net Income",
];
const BALANCE_METRICS: &[&str] = &[
    "Total Assets",
    "Total Liabilities Net Minority Interest",
    "Stockholders Equity",
    "Total Debt",
    "Cash And Cash Equivalents",
];
const CASH_FLOW_METRICS: &[&str] = &[
    "Operating Cash Flow",
    "Investing Cash Flow",
    "Financing Cash Flow",
    "Capital Expenditure",
    "Free Cash Flow",
];

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartableData {
    Line {
        data: Vec<SeriesPoint>,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Bar {
        data: Vec<CategoryValue>,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Pie {
        data: Vec<CategoryValue>,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    /// Grouped bars, one group per reporting period, values in billions.
    MultiBar {
        data: Vec<PeriodRow>,
        metrics: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryValue {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PeriodRow {
    pub period: String,
    pub values: BTreeMap<String, f64>,
    /// Unscaled values rendered for tooltips, e.g. `"100.0B"`.
    pub formatted: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Statement {
    Income,
    BalanceSheet,
    CashFlow,
}

impl Statement {
    const ALL: [Statement; 3] = [Statement::Income, Statement::BalanceSheet, Statement::CashFlow];

    fn from_declared(raw: &str) -> Option<Self> {
        let key = raw.to_ascii_lowercase();
        if key.contains("income") {
            Some(Self::Income)
        } else if key.contains("balance") {
            Some(Self::BalanceSheet)
        } else if key.contains("cash") {
            Some(Self::CashFlow)
        } else {
            None
        }
    }

    fn metrics(self) -> &'static [&'static str] {
        match self {
            Self::Income => INCOME_METRICS,
            Self::BalanceSheet => BALANCE_METRICS,
            Self::CashFlow => CASH_FLOW_METRICS,
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::Income => "Income Statement (Billions)",
            Self::BalanceSheet => "Balance Sheet (Billions)",
            Self::CashFlow => "Cash Flow (Billions)",
        }
    }
}

/// Classifies a tool output as a chart, or returns `None`.
///
/// Heuristics are tried in a fixed order and the first that yields data
/// wins: price history, indicators, allocation, then tabular
/// `data`/`columns` payloads (OHLC history or a financial statement).
pub fn detect_chartable_data(payload: &Value) -> Option<ChartableData> {
    let object = as_object(payload)?;
    let map: &Map<String, Value> = &object;

    price_series(map)
        .or_else(|| numeric_map(map, &["indicators"]).map(|(_, data)| ChartableData::Bar {
            data,
            title: Some("Technical Indicators".to_string()),
        }))
        .or_else(|| numeric_map(map, &["allocation", "distribution"]).map(|(key, data)| {
            ChartableData::Pie {
                data,
                title: Some(capitalize(key)),
            }
        }))
        .or_else(|| tabular(map))
}

fn price_series(map: &Map<String, Value>) -> Option<ChartableData> {
    let items = ["prices", "history"]
        .iter()
        .find_map(|k| map.get(*k).and_then(Value::as_array))?;

    let data: Vec<SeriesPoint> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let (label, value) = match item {
                Value::Object(point) => (
                    point_label(point).unwrap_or_else(|| i.to_string()),
                    first_number(point, POINT_VALUE_KEYS)?,
                ),
                other => (i.to_string(), number(other)?),
            };
            Some(SeriesPoint { label, value })
        })
        .collect();

    if data.is_empty() {
        return None;
    }

    let title = first_str(map, &["symbol", "ticker"]).map(|s| format!("{} Price History", s));
    Some(ChartableData::Line { data, title })
}

fn point_label(point: &Map<String, Value>) -> Option<String> {
    POINT_LABEL_KEYS.iter().find_map(|k| match point.get(*k)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// The first of `keys` holding an object with at least one numeric entry.
fn numeric_map<'k>(
    map: &Map<String, Value>,
    keys: &[&'k str],
) -> Option<(&'k str, Vec<CategoryValue>)> {
    keys.iter().find_map(|key| {
        let entries = map.get(*key)?.as_object()?;
        let data: Vec<CategoryValue> = entries
            .iter()
            .filter_map(|(name, v)| {
                number(v).map(|value| CategoryValue {
                    name: name.clone(),
                    value,
                })
            })
            .collect();
        (!data.is_empty()).then_some((*key, data))
    })
}

fn tabular(map: &Map<String, Value>) -> Option<ChartableData> {
    let rows: Vec<&Map<String, Value>> = map
        .get("data")?
        .as_array()?
        .iter()
        .filter_map(Value::as_object)
        .collect();
    let columns: Vec<&str> = map
        .get("columns")?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .collect();

    if rows.is_empty() || columns.is_empty() {
        return None;
    }

    let is_history = ["period", "interval", "symbol"].iter().all(|k| map.contains_key(*k));
    let close = columns.iter().find(|c| c.eq_ignore_ascii_case("close"));

    match (is_history, close) {
        (true, Some(close)) => ohlc_series(map, &rows, &columns, close),
        _ => statement(map, &rows, &columns),
    }
}

fn ohlc_series(
    map: &Map<String, Value>,
    rows: &[&Map<String, Value>],
    columns: &[&str],
    close: &str,
) -> Option<ChartableData> {
    let date_key = date_column(columns).unwrap_or("Date");
    let interval = first_str(map, &["interval"]).unwrap_or("1d");
    let intraday = interval.ends_with('m') || interval.ends_with('h');

    let mut points: Vec<(Option<DateTime<Utc>>, SeriesPoint)> = rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let value = row.get(close).and_then(number)?;
            let raw = row.get(date_key);
            let when = raw.and_then(parse_lenient_value);
            let label = date_label(raw, when, intraday).unwrap_or_else(|| i.to_string());
            Some((when, SeriesPoint { label, value }))
        })
        .collect();

    if points.is_empty() {
        return None;
    }

    // Ascending by date; unparsable dates keep their relative order at the end.
    points.sort_by_key(|(when, _)| (when.is_none(), *when));

    let symbol = first_str(map, &["symbol"]).unwrap_or_default();
    let period = first_str(map, &["period"]).unwrap_or_default();
    Some(ChartableData::Line {
        data: points.into_iter().map(|(_, p)| p).collect(),
        title: Some(format!("{} Close ({}, {})", symbol, period, interval)),
    })
}

fn statement(
    map: &Map<String, Value>,
    rows: &[&Map<String, Value>],
    columns: &[&str],
) -> Option<ChartableData> {
    let declared = first_str(map, &["statement_type"]).and_then(Statement::from_declared);
    let kind = declared.or_else(|| {
        Statement::ALL
            .into_iter()
            .map(|s| (s, present_metrics(s, columns).len()))
            .filter(|(_, hits)| *hits > 0)
            .max_by_key(|(s, hits)| (*hits, std::cmp::Reverse(*s as u8)))
            .map(|(s, _)| s)
    })?;

    let metrics = present_metrics(kind, columns);
    if metrics.is_empty() {
        return None;
    }

    let date_key = date_column(columns);
    let mut data: Vec<PeriodRow> = rows
        .iter()
        .take(STATEMENT_PERIODS)
        .enumerate()
        .map(|(i, row)| {
            let mut values = BTreeMap::new();
            let mut formatted = BTreeMap::new();
            for (column, metric) in &metrics {
                if let Some(raw) = row.get(*column).and_then(number) {
                    values.insert(metric.to_string(), raw / BILLION);
                    formatted.insert(metric.to_string(), format_large_number(raw));
                }
            }
            PeriodRow {
                period: period_label(row, date_key, i),
                values,
                formatted,
            }
        })
        .collect();
    if data.iter().all(|row| row.values.is_empty()) {
        tracing::debug!("Statement columns present but no numeric cells; not charting");
        return None;
    }
    data.reverse();

    Some(ChartableData::MultiBar {
        data,
        metrics: metrics.iter().map(|(_, m)| m.to_string()).collect(),
        title: Some(kind.title().to_string()),
    })
}

/// `(column as spelled in the payload, canonical metric)` in vocabulary order.
fn present_metrics<'c>(kind: Statement, columns: &[&'c str]) -> Vec<(&'c str, &'static str)> {
    kind.metrics()
        .iter()
        .filter_map(|metric| {
            columns
                .iter()
                .find(|c| c.trim().eq_ignore_ascii_case(metric))
                .map(|c| (*c, *metric))
        })
        .collect()
}

fn date_column<'c>(columns: &[&'c str]) -> Option<&'c str> {
    DATE_COLUMNS
        .iter()
        .find_map(|want| columns.iter().find(|c| c.eq_ignore_ascii_case(want)).copied())
}

fn period_label(row: &Map<String, Value>, date_key: Option<&str>, index: usize) -> String {
    let raw = date_key.and_then(|k| row.get(k));
    let when = raw.and_then(parse_lenient_value);
    date_label(raw, when, false)
        .or_else(|| raw.map(Value::to_string))
        .unwrap_or_else(|| format!("P{}", index + 1))
}

/// Display label for a date cell. Parsed strings keep the provider's local
/// date (no shift to UTC); epoch values are formatted in UTC.
fn date_label(raw: Option<&Value>, when: Option<DateTime<Utc>>, intraday: bool) -> Option<String> {
    match (raw?, when) {
        (Value::String(s), Some(_)) => {
            let width = if intraday { 16 } else { 10 };
            Some(s.get(..width).unwrap_or(s).replace('T', " "))
        }
        (Value::String(s), None) => Some(s.clone()),
        (_, Some(dt)) if intraday && (dt.hour() != 0 || dt.minute() != 0) => {
            Some(dt.format("%Y-%m-%d %H:%M").to_string())
        }
        (_, Some(dt)) => Some(dt.format("%Y-%m-%d").to_string()),
        (_, None) => None,
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prices_become_line() {
        let chart =
            detect_chartable_data(&json!({"prices": [{"close": 1.2, "date": "2024-01-01"}]}));
        assert_eq!(
            chart,
            Some(ChartableData::Line {
                data: vec![SeriesPoint {
                    label: "2024-01-01".to_string(),
                    value: 1.2
                }],
                title: None,
            })
        );
    }

    #[test]
    fn test_unrelated_payload_is_none() {
        assert!(detect_chartable_data(&json!({"foo": "bar"})).is_none());
        assert!(detect_chartable_data(&json!("{broken")).is_none());
        assert!(detect_chartable_data(&json!([1, 2])).is_none());
    }

    #[test]
    fn test_string_encoded_history() {
        let raw = json!(r#"{"symbol": "AAPL", "history": [10, 11.5, "n/a"]}"#);
        match detect_chartable_data(&raw) {
            Some(ChartableData::Line { data, title }) => {
                assert_eq!(data.len(), 2);
                assert_eq!(data[1].label, "1");
                assert_eq!(title.as_deref(), Some("AAPL Price History"));
            }
            other => panic!("expected line, got {:?}", other),
        }
    }

    #[test]
    fn test_indicators_win_over_allocation() {
        let chart = detect_chartable_data(&json!({
            "indicators": {"RSI": 61.2, "MACD": 1.4, "signal": "buy"},
            "allocation": {"AAPL": 0.5, "MSFT": 0.5}
        }));
        match chart {
            Some(ChartableData::Bar { data, .. }) => {
                let mut names: Vec<&str> = data.iter().map(|b| b.name.as_str()).collect();
                names.sort();
                assert_eq!(names, vec!["MACD", "RSI"]);
            }
            other => panic!("expected bar, got {:?}", other),
        }
    }

    #[test]
    fn test_distribution_becomes_pie() {
        match detect_chartable_data(&json!({"distribution": {"Equity": 60, "Bonds": 40}})) {
            Some(ChartableData::Pie { data, title }) => {
                assert_eq!(data.len(), 2);
                assert_eq!(title.as_deref(), Some("Distribution"));
            }
            other => panic!("expected pie, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_indicator_map_falls_through() {
        let chart = detect_chartable_data(&json!({
            "indicators": {"trend": "up"},
            "allocation": {"Cash": 100}
        }));
        assert!(matches!(chart, Some(ChartableData::Pie { .. })));
    }

    #[test]
    fn test_ohlc_history_sorted_ascending() {
        let chart = detect_chartable_data(&json!({
            "symbol": "MSFT",
            "period": "5d",
            "interval": "1d",
            "columns": ["Date", "Open", "Close"],
            "data": [
                {"Date": "2024-01-03 00:00:00-05:00", "Open": 2.0, "Close": 3.0},
                {"Date": "2024-01-02 00:00:00-05:00", "Open": 1.0, "Close": 2.0},
                {"Date": "garbage", "Open": 1.0, "Close": 9.0}
            ]
        }));
        match chart {
            Some(ChartableData::Line { data, title }) => {
                let values: Vec<f64> = data.iter().map(|p| p.value).collect();
                assert_eq!(values, vec![2.0, 3.0, 9.0]);
                assert_eq!(data[0].label, "2024-01-02");
                assert_eq!(title.as_deref(), Some("MSFT Close (5d, 1d)"));
            }
            other => panic!("expected line, got {:?}", other),
        }
    }

    #[test]
    fn test_revenue_statement_scaled_to_billions() {
        let chart = detect_chartable_data(&json!({
            "data": [{"Date": "2023-12-31", "Total Revenue": 1e11}],
            "columns": ["Date", "Total Revenue"]
        }));
        match chart {
            Some(ChartableData::MultiBar { data, metrics, title }) => {
                assert_eq!(metrics, vec!["Total Revenue".to_string()]);
                assert_eq!(data.len(), 1);
                assert_eq!(data[0].period, "2023-12-31");
                assert_eq!(data[0].values["Total Revenue"], 100.0);
                assert_eq!(data[0].formatted["Total Revenue"], "100.0B");
                assert_eq!(title.as_deref(), Some("Income Statement (Billions)"));
            }
            other => panic!("expected multi bar, got {:?}", other),
        }
    }

    #[test]
    fn test_statement_keeps_four_latest_ascending() {
        let rows: Vec<Value> = (0..6)
            .map(|i| {
                json!({
                    "Date": format!("{}-12-31", 2023 - i),
                    "Free Cash Flow": 2e9 * (i as f64 + 1.0)
                })
            })
            .collect();
        let chart = detect_chartable_data(&json!({
            "statement_type": "cashflow",
            "columns": ["Date", "Free Cash Flow", "Unrelated"],
            "data": rows
        }));
        match chart {
            Some(ChartableData::MultiBar { data, title, .. }) => {
                let periods: Vec<&str> = data.iter().map(|r| r.period.as_str()).collect();
                assert_eq!(periods, vec!["2020-12-31", "2021-12-31", "2022-12-31", "2023-12-31"]);
                assert_eq!(data[3].values["Free Cash Flow"], 2.0);
                assert_eq!(title.as_deref(), Some("Cash Flow (Billions)"));
            }
            other => panic!("expected multi bar, got {:?}", other),
        }
    }

    #[test]
    fn test_statement_without_numeric_cells_is_none() {
        let chart = detect_chartable_data(&json!({
            "columns": ["Date", "Total Revenue", "Net Income"],
            "data": [
                {"Date": "2023-12-31", "Total Revenue": null, "Net Income": "n/a"},
                {"Date": "2022-12-31", "Total Revenue": null}
            ]
        }));
        assert!(chart.is_none());
    }

    #[test]
    fn test_table_without_known_metrics_is_none() {
        let chart = detect_chartable_data(&json!({
            "columns": ["Date", "Headcount"],
            "data": [{"Date": "2023-12-31", "Headcount": 1200}]
        }));
        assert!(chart.is_none());
    }
}
