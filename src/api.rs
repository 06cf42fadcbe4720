/// Synchronous client for the **MakStat PxWeb API**.
///
/// This module speaks the PxWeb table endpoint: a POST with a JSON query
/// (per-dimension `item` selections, `response.format: "json-stat2"`) returns
/// a JSON-stat dataset which is validated into a [`Cube`]. A GET on the same
/// URL returns the table's variable metadata.
///
/// ### Notes
/// - Older PxWeb exports wrap the payload as `{"dataset": {...}}` (JSON-stat
///   1.x); both shapes are accepted.
/// - An empty selection list requests the full table.
/// - Network timeouts use a sane default (30s) and can be adjusted by editing
///   the client builder.
///
/// Typical usage:
/// ```no_run
/// # use makstat_rs::{Client, api::QueryClause};
/// let client = Client::default();
/// let cube = client.fetch_table(
///     "MakStat/Zemjodelstvo/Dobitok/175_ZemBroj_Reg_Dobitok_ml.px",
///     &[QueryClause::items("Година", ["2023"])],
/// )?;
/// # Ok::<(), anyhow::Error>(())
/// ```
use crate::cube::Cube;
use crate::models::{Dataset, TableMeta};
use anyhow::{Context, Result, bail};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// One dimension selection of a PxWeb query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryClause {
    pub code: String,
    pub selection: Selection,
}

#[derive(Debug, Clone, Serialize)]
pub struct Selection {
    pub filter: String,
    pub values: Vec<String>,
}

impl QueryClause {
    /// Select explicit category codes (`"filter": "item"`), the only filter
    /// the MakStat tables need.
    pub fn items<I, S>(code: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            code: code.into(),
            selection: Selection {
                filter: "item".into(),
                values: values.into_iter().map(Into::into).collect(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct QueryBody<'a> {
    query: &'a [QueryClause],
    response: ResponseSpec,
}

#[derive(Debug, Serialize)]
struct ResponseSpec {
    format: &'static str,
}

/// Monotonic request-generation token for callers that overlap fetches.
///
/// A changed parameter (e.g. a year selector) may trigger a new fetch while
/// an older one is still in flight; without coordination the earliest
/// *arriving* response wins, not the most recently *requested* one. Tag each
/// request with [`RequestGeneration::begin`] and apply a response only if its
/// token still passes [`RequestGeneration::is_current`].
///
/// ```
/// # use makstat_rs::RequestGeneration;
/// let generation = RequestGeneration::new();
/// let stale = generation.begin();
/// let fresh = generation.begin();
/// assert!(!generation.is_current(stale));
/// assert!(generation.is_current(fresh));
/// ```
#[derive(Debug, Default)]
pub struct RequestGeneration(AtomicU64);

impl RequestGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, invalidating all earlier tokens.
    pub fn begin(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether `token` still belongs to the most recently started request.
    pub fn is_current(&self, token: u64) -> bool {
        self.0.load(Ordering::SeqCst) == token
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    pub base_url: String,
    /// API language segment (`mk` or `en`).
    pub lang: String,
    http: HttpClient,
}

impl Default for Client {
    fn default() -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30)) // total request timeout
            .connect_timeout(Duration::from_secs(10)) // connect timeout
            .redirect(Policy::limited(5)) // cap redirects
            .user_agent(concat!("makstat_rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("reqwest client build");
        Self {
            base_url: "https://makstat.stat.gov.mk/PXWeb/api/v1".into(),
            lang: "mk".into(),
            http,
        }
    }
}

// Allow -, _, . unescaped in path segments (common in PxWeb table names)
const SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

fn enc_path(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| percent_encoding::utf8_percent_encode(s.trim(), SAFE).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

impl Client {
    pub fn with_lang(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            ..Self::default()
        }
    }

    /// Full URL of a table path like
    /// `MakStat/PazarNaTrud/Plati/.../180_PazTrud_Mk_oddeli_neto_ml.px`.
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.lang, enc_path(table))
    }

    /// Fetch a table as a validated cube.
    ///
    /// - `table`: PxWeb table path below the language segment.
    /// - `selections`: per-dimension category selections; dimensions without
    ///   a clause return all their categories (subject to the table's
    ///   elimination rules).
    ///
    /// ### Errors
    /// - Network/HTTP error (5xx and transport errors retried with a short
    ///   backoff, then surfaced)
    /// - JSON decoding error
    /// - Structural or consistency errors in the returned dataset
    pub fn fetch_table(&self, table: &str, selections: &[QueryClause]) -> Result<Cube> {
        let url = self.table_url(table);
        let body = QueryBody {
            query: selections,
            response: ResponseSpec {
                format: "json-stat2",
            },
        };

        // Small retry for transient failures (5xx / network errors)
        let post_json = |u: &str| -> Result<Value> {
            let mut last_err: Option<anyhow::Error> = None;
            for backoff_ms in [100u64, 300, 700] {
                match self.http.post(u).json(&body).send() {
                    Ok(r) if r.status().is_success() => {
                        return r.json().context("decode json");
                    }
                    Ok(r) if r.status().is_server_error() => { /* retry */ }
                    Ok(r) => {
                        let status = r.status();
                        let detail = r.text().unwrap_or_default();
                        let detail: String = detail.trim().chars().take(200).collect();
                        if detail.is_empty() {
                            bail!("request failed with HTTP {}", status);
                        }
                        bail!("request failed with HTTP {}: {}", status, detail);
                    }
                    Err(e) => last_err = Some(e.into()),
                }
                std::thread::sleep(Duration::from_millis(backoff_ms));
            }
            bail!("network error: {:?}", last_err);
        };

        log::debug!("POST {} ({} selections)", url, selections.len());
        let v = post_json(&url).with_context(|| format!("POST {}", url))?;
        let dataset = Dataset::from_json(v).context("parse json-stat response")?;
        let cube = Cube::from_dataset(dataset).context("validate cube")?;
        log::info!("fetched {}: {} cells", table, cube.len());
        Ok(cube)
    }

    /// Fetch a table, but return `Ok(None)` if a newer request was started on
    /// `generation` while this one was in flight. The stale cube is dropped
    /// so it can never overwrite a fresher selection's result.
    pub fn fetch_table_latest(
        &self,
        generation: &RequestGeneration,
        table: &str,
        selections: &[QueryClause],
    ) -> Result<Option<Cube>> {
        let token = generation.begin();
        let cube = self.fetch_table(table, selections)?;
        if !generation.is_current(token) {
            log::debug!("dropping stale response for {}", table);
            return Ok(None);
        }
        Ok(Some(cube))
    }

    /// Fetch a table's variable metadata (dimension codes, category codes and
    /// labels) via GET, for discovering what a table offers before querying.
    pub fn fetch_table_meta(&self, table: &str) -> Result<TableMeta> {
        let url = self.table_url(table);

        let get_json = |u: &str| -> Result<Value> {
            let mut last_err: Option<anyhow::Error> = None;
            for backoff_ms in [100u64, 300, 700] {
                match self.http.get(u).send() {
                    Ok(r) if r.status().is_success() => {
                        return r.json().context("decode json");
                    }
                    Ok(r) if r.status().is_server_error() => { /* retry */ }
                    Ok(r) => bail!("request failed with HTTP {}", r.status()),
                    Err(e) => last_err = Some(e.into()),
                }
                std::thread::sleep(Duration::from_millis(backoff_ms));
            }
            bail!("network error: {:?}", last_err);
        };

        let v = get_json(&url).with_context(|| format!("GET {}", url))?;
        let meta: TableMeta = serde_json::from_value(v).context("parse table metadata")?;
        Ok(meta)
    }
}
