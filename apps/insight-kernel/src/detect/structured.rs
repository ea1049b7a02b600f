use chrono::DateTime;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{as_object, first_number, first_str, format_large_number};

const NAME_KEYS: &[&str] = &["longName", "shortName", "name", "company_name"];
const PRICE_KEYS: &[&str] = &["currentPrice", "regularMarketPrice", "price"];

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StructuredData {
    News {
        data: Vec<NewsItem>,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    CompanyInfo {
        data: CompanyProfile,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    PriceQuote {
        data: PriceQuote,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub title: String,
    pub publisher: Option<String>,
    pub link: Option<String>,
    pub published_at: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    pub name: String,
    pub symbol: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub website: Option<String>,
    pub employees: Option<u64>,
    pub market_cap: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub symbol: String,
    pub price: f64,
    pub currency: Option<String>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub volume: Option<String>,
    pub market_cap: Option<String>,
}

/// Recognises news lists, company profiles and price quotes. Independent of
/// [`super::detect_chartable_data`]; a payload may match both.
pub fn detect_structured_data(payload: &Value) -> Option<StructuredData> {
    let object = as_object(payload)?;
    let map: &Map<String, Value> = &object;

    news(map).or_else(|| company(map)).or_else(|| quote(map))
}

fn news(map: &Map<String, Value>) -> Option<StructuredData> {
    let items = ["news", "articles"]
        .iter()
        .find_map(|k| map.get(*k).and_then(Value::as_array))?;

    let data: Vec<NewsItem> = items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(news_item)
        .collect();
    if data.is_empty() {
        return None;
    }

    let title = first_str(map, &["symbol", "ticker", "query"])
        .map(|s| format!("{} News", s))
        .or_else(|| Some("Latest News".to_string()));
    Some(StructuredData::News { data, title })
}

/// Handles both flat items and the nested `{"content": {...}}` layout
/// newer Yahoo responses use.
fn news_item(item: &Map<String, Value>) -> Option<NewsItem> {
    let body = item.get("content").and_then(Value::as_object).unwrap_or(item);
    let title = first_str(body, &["title", "headline"])?.to_string();

    let publisher = first_str(body, &["publisher", "source"])
        .or_else(|| nested_str(body, "provider", "displayName"))
        .or_else(|| nested_str(body, "source", "name"))
        .map(str::to_string);
    let link = first_str(body, &["link", "url"])
        .or_else(|| nested_str(body, "canonicalUrl", "url"))
        .or_else(|| nested_str(body, "clickThroughUrl", "url"))
        .map(str::to_string);
    let published_at = first_str(body, &["pubDate", "published_at", "publishedAt", "date"])
        .map(str::to_string)
        .or_else(|| {
            body.get("providerPublishTime")
                .and_then(Value::as_i64)
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .map(|dt| dt.to_rfc3339())
        });
    let summary = first_str(body, &["summary", "description"]).map(str::to_string);

    Some(NewsItem {
        title,
        publisher,
        link,
        published_at,
        summary,
    })
}

fn company(map: &Map<String, Value>) -> Option<StructuredData> {
    let name = first_str(map, NAME_KEYS)?;
    let has_profile = ["sector", "industry", "longBusinessSummary"]
        .iter()
        .any(|k| first_str(map, &[*k]).is_some());
    if !has_profile {
        return None;
    }

    let data = CompanyProfile {
        name: name.to_string(),
        symbol: first_str(map, &["symbol"]).map(str::to_string),
        sector: first_str(map, &["sector"]).map(str::to_string),
        industry: first_str(map, &["industry"]).map(str::to_string),
        country: first_str(map, &["country"]).map(str::to_string),
        website: first_str(map, &["website"]).map(str::to_string),
        employees: map.get("fullTimeEmployees").and_then(Value::as_u64),
        market_cap: first_number(map, &["marketCap"]).map(format_large_number),
        summary: first_str(map, &["longBusinessSummary", "description"]).map(str::to_string),
    };
    let title = Some(format!("{} Profile", data.name));
    Some(StructuredData::CompanyInfo { data, title })
}

fn quote(map: &Map<String, Value>) -> Option<StructuredData> {
    let symbol = first_str(map, &["symbol"])?;
    let price = first_number(map, PRICE_KEYS)?;

    let data = PriceQuote {
        symbol: symbol.to_string(),
        price,
        currency: first_str(map, &["currency"]).map(str::to_string),
        change: first_number(map, &["change", "regularMarketChange"]),
        change_percent: first_number(
            map,
            &["change_percent", "changePercent", "regularMarketChangePercent"],
        ),
        day_high: first_number(map, &["dayHigh", "regularMarketDayHigh"]),
        day_low: first_number(map, &["dayLow", "regularMarketDayLow"]),
        volume: first_number(map, &["volume", "regularMarketVolume"]).map(format_large_number),
        market_cap: first_number(map, &["marketCap"]).map(format_large_number),
    };
    let title = Some(format!("{} Quote", data.symbol));
    Some(StructuredData::PriceQuote { data, title })
}

fn nested_str<'a>(map: &'a Map<String, Value>, outer: &str, inner: &str) -> Option<&'a str> {
    map.get(outer)?.as_object().and_then(|o| first_str(o, &[inner]))
}
