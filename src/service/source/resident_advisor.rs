//! Resident Advisor listing source.
//!
//! Listings are read from RA's public GraphQL endpoint, one area and one listing
//! date per request. Search has no upstream counterpart: it filters a date's
//! listings locally.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use crate::base::{
    config::Config,
    types::{Event, Res, SearchQuery},
};

use super::{EventSourceClient, GenericEventSource};

const LISTINGS_QUERY: &str = r#"
query GET_EVENT_LISTINGS($filters: FilterInputDtoInput, $pageSize: Int, $page: Int) {
    eventListings(filters: $filters, pageSize: $pageSize, page: $page) {
        data {
            event {
                id
                title
                date
                startTime
                endTime
                contentUrl
                venue { name }
            }
        }
        totalResults
    }
}
"#;

const EVENT_QUERY: &str = r#"
query GET_EVENT($id: ID!) {
    event(id: $id) {
        id
        title
        date
        startTime
        endTime
        contentUrl
        venue { name }
    }
}
"#;

// Extra methods on `EventSourceClient` applied by the resident advisor implementation.

impl EventSourceClient {
    /// Creates a new Resident Advisor event source.
    pub fn resident_advisor(config: &Config) -> Res<Self> {
        let source = ResidentAdvisorSource::new(config)?;
        Ok(Self { inner: Arc::new(source) })
    }
}

// Wire types.

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingsData {
    event_listings: EventListings,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListings {
    data: Vec<Listing>,
    total_results: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    event: RaEvent,
}

#[derive(Debug, Deserialize)]
struct EventData {
    event: Option<RaEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RaEvent {
    id: String,
    title: String,
    date: String,
    start_time: Option<String>,
    end_time: Option<String>,
    content_url: Option<String>,
    venue: Option<RaVenue>,
}

#[derive(Debug, Deserialize)]
struct RaVenue {
    name: Option<String>,
}

impl RaEvent {
    /// Normalize into an [`Event`]; an unparseable date makes the record malformed.
    fn into_event(self, site_url: &str) -> Res<Event> {
        let date = self
            .date
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .ok_or_else(|| anyhow!("Malformed date `{}` on event `{}`", self.date, self.id))?;

        Ok(Event {
            id: self.id,
            title: self.title,
            venue: self.venue.and_then(|v| v.name),
            date,
            start_time: self.start_time.as_deref().and_then(parse_timestamp),
            end_time: self.end_time.as_deref().and_then(parse_timestamp),
            url: self.content_url.map(|path| absolute_url(site_url, &path)),
        })
    }
}

// Specific implementations.

/// Resident Advisor event source implementation.
#[derive(Clone)]
pub struct ResidentAdvisorSource {
    client: reqwest::Client,
    endpoint: String,
    site_url: String,
    area_id: u32,
    page_size: u32,
}

impl ResidentAdvisorSource {
    /// Create a new Resident Advisor source.
    #[instrument(name = "ResidentAdvisorSource::new", skip_all)]
    pub fn new(config: &Config) -> Res<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.event_source_timeout_secs))
            .user_agent("Mozilla/5.0")
            .build()?;

        Ok(Self {
            client,
            endpoint: config.event_source_url.clone(),
            site_url: config.event_source_site_url.clone(),
            area_id: config.event_source_area_id,
            page_size: config.event_source_page_size,
        })
    }

    /// Run a GraphQL query, once, and return its `data`.
    async fn query<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Res<T> {
        let body = json!({ "query": query, "variables": variables });

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::REFERER, &self.site_url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Request to `{}` failed", self.endpoint))?
            .error_for_status()?;

        let response: GraphQlResponse<T> = response.json().await.context("Malformed listing response")?;

        unwrap_graphql(response)
    }
}

#[async_trait]
impl GenericEventSource for ResidentAdvisorSource {
    #[instrument(name = "ResidentAdvisorSource::fetch_events", skip(self))]
    async fn fetch_events(&self, date: NaiveDate) -> Res<Vec<Event>> {
        let variables = listing_variables(self.area_id, date, self.page_size);
        let data: ListingsData = self.query(LISTINGS_QUERY, variables).await?;

        let events = listings_into_events(data, &self.site_url)?;

        debug!("Fetched {} events for {}", events.len(), date);

        Ok(events)
    }

    #[instrument(name = "ResidentAdvisorSource::search_events", skip(self))]
    async fn search_events(&self, query: &SearchQuery) -> Res<Vec<Event>> {
        if query.text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let events = self.fetch_events(query.date).await?;

        Ok(events.into_iter().filter(|e| query.matches(e)).collect())
    }

    #[instrument(name = "ResidentAdvisorSource::get_event", skip(self))]
    async fn get_event(&self, event_id: &str) -> Res<Option<Event>> {
        let data: EventData = self.query(EVENT_QUERY, json!({ "id": event_id })).await?;

        data.event.map(|e| e.into_event(&self.site_url)).transpose()
    }
}

// Helpers.

/// Build the listing filter for one area and one day.
fn listing_variables(area_id: u32, date: NaiveDate, page_size: u32) -> Value {
    let day = date.format("%Y-%m-%d").to_string();

    json!({
        "filters": {
            "areas": { "eq": area_id },
            "listingDate": {
                "gte": format!("{day}T00:00:00.000Z"),
                "lte": format!("{day}T23:59:59.999Z"),
            },
        },
        "pageSize": page_size,
        "page": 1,
    })
}

/// Surface GraphQL errors, then require `data`.
fn unwrap_graphql<T>(response: GraphQlResponse<T>) -> Res<T> {
    if !response.errors.is_empty() {
        let messages = response.errors.into_iter().map(|e| e.message).collect::<Vec<_>>().join("; ");
        return Err(anyhow!("Listing source returned errors: {messages}"));
    }

    response.data.ok_or_else(|| anyhow!("Listing source returned no data"))
}

fn listings_into_events(data: ListingsData, site_url: &str) -> Res<Vec<Event>> {
    let listings = data.event_listings;

    if let Some(total) = listings.total_results
        && total > listings.data.len() as u64
    {
        warn!("Listing source has {} results, only {} were requested", total, listings.data.len());
    }

    listings.data.into_iter().map(|l| l.event.into_event(site_url)).collect()
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

fn absolute_url(site_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }

    format!("{}/{}", site_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

// Tests.

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
    };

    use super::*;

    /// Answer one request on a local port with a canned response; returns the endpoint.
    async fn serve_once(status: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_request(&mut stream).await;

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
        });

        format!("http://{addr}/graphql")
    }

    /// Read a full request, body included, so the client is not cut off mid-send.
    async fn read_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);

            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };

            let headers = String::from_utf8_lossy(&buf[..end]).to_string();
            let length = headers
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);

            if buf.len() >= end + 4 + length {
                return;
            }
        }
    }

    fn source_for(endpoint: String) -> ResidentAdvisorSource {
        let config = Config {
            inner: Arc::new(crate::base::config::ConfigInner {
                event_source_url: endpoint,
                event_source_timeout_secs: 5,
                ..Default::default()
            }),
        };

        ResidentAdvisorSource::new(&config).unwrap()
    }

    fn listings_response() -> Value {
        json!({
            "data": {
                "eventListings": {
                    "data": [
                        {
                            "event": {
                                "id": "1900001",
                                "title": "Klubnacht",
                                "date": "2024-05-01T00:00:00.000",
                                "startTime": "2024-05-01T23:59:00.000",
                                "endTime": "2024-05-03T09:00:00.000",
                                "contentUrl": "/events/1900001",
                                "venue": { "name": "Berghain" }
                            }
                        },
                        {
                            "event": {
                                "id": "1900002",
                                "title": "Open Air",
                                "date": "2024-05-01T00:00:00.000",
                                "startTime": null,
                                "endTime": null,
                                "contentUrl": null,
                                "venue": null
                            }
                        }
                    ],
                    "totalResults": 2
                }
            }
        })
    }

    #[test]
    fn test_normalizes_listings_in_source_order() {
        let response: GraphQlResponse<ListingsData> = serde_json::from_value(listings_response()).unwrap();
        let events = listings_into_events(unwrap_graphql(response).unwrap(), "https://ra.co").unwrap();

        assert_eq!(events.len(), 2);

        let first = &events[0];
        assert_eq!(first.id, "1900001");
        assert_eq!(first.title, "Klubnacht");
        assert_eq!(first.venue.as_deref(), Some("Berghain"));
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(first.start_time.unwrap().format("%H:%M").to_string(), "23:59");
        assert_eq!(first.end_time.unwrap().format("%Y-%m-%d %H:%M").to_string(), "2024-05-03 09:00");
        assert_eq!(first.url.as_deref(), Some("https://ra.co/events/1900001"));

        let second = &events[1];
        assert_eq!(second.id, "1900002");
        assert_eq!(second.venue, None);
        assert_eq!(second.start_time, None);
        assert_eq!(second.url, None);
    }

    #[test]
    fn test_graphql_errors_are_failures() {
        let response: GraphQlResponse<ListingsData> = serde_json::from_value(json!({
            "data": null,
            "errors": [{ "message": "rate limited" }]
        }))
        .unwrap();

        let err = unwrap_graphql(response).unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn test_missing_data_is_a_failure() {
        let response: GraphQlResponse<ListingsData> = serde_json::from_value(json!({})).unwrap();

        assert!(unwrap_graphql(response).is_err());
    }

    #[test]
    fn test_malformed_date_is_a_failure() {
        let mut value = listings_response();
        value["data"]["eventListings"]["data"][0]["event"]["date"] = json!("soon");

        let response: GraphQlResponse<ListingsData> = serde_json::from_value(value).unwrap();

        assert!(listings_into_events(unwrap_graphql(response).unwrap(), "https://ra.co").is_err());
    }

    #[test]
    fn test_listing_variables_cover_the_whole_day() {
        let variables = listing_variables(34, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), 20);

        assert_eq!(variables["filters"]["areas"]["eq"], 34);
        assert_eq!(variables["filters"]["listingDate"]["gte"], "2024-05-01T00:00:00.000Z");
        assert_eq!(variables["filters"]["listingDate"]["lte"], "2024-05-01T23:59:59.999Z");
        assert_eq!(variables["pageSize"], 20);
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(absolute_url("https://ra.co/", "/events/1"), "https://ra.co/events/1");
        assert_eq!(absolute_url("https://ra.co", "events/1"), "https://ra.co/events/1");
        assert_eq!(absolute_url("https://ra.co", "https://example.com/e"), "https://example.com/e");
    }

    #[tokio::test]
    async fn test_empty_search_skips_upstream() {
        let config = Config {
            inner: Arc::new(crate::base::config::ConfigInner {
                // Unroutable, so any request would fail.
                event_source_url: "http://127.0.0.1:9/graphql".to_string(),
                ..Default::default()
            }),
        };
        let source = ResidentAdvisorSource::new(&config).unwrap();

        let events = source.search_events(&SearchQuery::new("  ", NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())).await.unwrap();

        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_an_error() {
        let config = Config {
            inner: Arc::new(crate::base::config::ConfigInner {
                event_source_url: "http://127.0.0.1:9/graphql".to_string(),
                event_source_timeout_secs: 1,
                ..Default::default()
            }),
        };
        let source = ResidentAdvisorSource::new(&config).unwrap();

        assert!(source.fetch_events(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()).await.is_err());
    }

    #[tokio::test]
    async fn test_server_error_status_is_an_error() {
        let source = source_for(serve_once("500 Internal Server Error", "{}".to_string()).await);

        let err = source.fetch_events(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()).await.unwrap_err();

        assert!(format!("{err:#}").contains("500"));
    }

    #[tokio::test]
    async fn test_fetches_listings_over_http() {
        let source = source_for(serve_once("200 OK", listings_response().to_string()).await);

        let events = source.fetch_events(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()).await.unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].url.as_deref(), Some("https://ra.co/events/1900001"));
        assert_eq!(events[1].venue_name(), "Venue N/A");
    }

    #[tokio::test]
    async fn test_search_filters_fetched_listings() {
        let source = source_for(serve_once("200 OK", listings_response().to_string()).await);

        let events = source.search_events(&SearchQuery::new("BERGHAIN", NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())).await.unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Klubnacht");
    }
}
