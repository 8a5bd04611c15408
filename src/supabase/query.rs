//! PostgREST query builder.
//!
//! Filters follow the `column=operator.value` URL convention; the terminal
//! methods pick the HTTP verb and the `Accept`/`Prefer` headers.

use reqwest::{
    Method, RequestBuilder,
    header::{ACCEPT, CONTENT_RANGE, HeaderValue},
};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Display;
use url::Url;

use super::{SupabaseClient, http};
use crate::error::ProviderError;
use crate::utils::logging::with_pretty_json_debug;

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const PREFER: &str = "Prefer";

pub struct Query<'a> {
    client: &'a SupabaseClient,
    table: String,
    select: Option<String>,
    params: Vec<(String, String)>,
}

impl<'a> Query<'a> {
    pub(super) fn new(client: &'a SupabaseClient, table: &str) -> Self {
        Self {
            client,
            table: table.to_string(),
            select: None,
            params: Vec::new(),
        }
    }

    /// Column list, including embedded resources such as `*,products:product_id(name)`.
    pub fn select(mut self, columns: &str) -> Self {
        self.select = Some(columns.to_string());
        self
    }

    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.params.push((column.to_string(), format!("eq.{value}")));
        self
    }

    pub fn in_<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Display,
    {
        let list = values
            .into_iter()
            .map(|v| quote_value(&v.to_string()))
            .collect::<Vec<_>>()
            .join(",");
        self.params.push((column.to_string(), format!("in.({list})")));
        self
    }

    pub fn not_null(mut self, column: &str) -> Self {
        self.params.push((column.to_string(), "not.is.null".to_string()));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let dir = if ascending { "asc" } else { "desc" };
        self.params.push(("order".to_string(), format!("{column}.{dir}")));
        self
    }

    pub fn limit(mut self, count: usize) -> Self {
        self.params.push(("limit".to_string(), count.to_string()));
        self
    }

    /// All matching rows.
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<T>, ProviderError> {
        let url = self.url()?;
        let client = self.client;
        let resp = http::send_rest_with_retry(client.read_retry, &self.table, || {
            client.request(Method::GET, &url)
        })
        .await?;
        Ok(resp.json().await?)
    }

    /// Exactly one row; zero or several rows is a `PGRST116` error.
    pub async fn fetch_single<T: DeserializeOwned>(self) -> Result<T, ProviderError> {
        let url = self.url()?;
        let client = self.client;
        let resp = http::send_rest_with_retry(client.read_retry, &self.table, || {
            client
                .request(Method::GET, &url)
                .header(ACCEPT, HeaderValue::from_static(SINGLE_OBJECT))
        })
        .await?;
        Ok(resp.json().await?)
    }

    /// Like [`Query::fetch_single`] but "no rows" is `None` instead of an error.
    pub async fn fetch_optional<T: DeserializeOwned>(self) -> Result<Option<T>, ProviderError> {
        match self.fetch_single().await {
            Ok(row) => Ok(Some(row)),
            Err(err) if err.is_no_rows() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Exact row count without transferring rows.
    pub async fn count(self) -> Result<u64, ProviderError> {
        let url = self.url()?;
        let client = self.client;
        let resp = http::send_rest_with_retry(client.read_retry, &self.table, || {
            client
                .request(Method::HEAD, &url)
                .header(PREFER, HeaderValue::from_static("count=exact"))
        })
        .await?;

        let header = resp
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ProviderError::ContentRange("<missing>".to_string()))?;
        parse_content_range(header)
    }

    /// Inserts one row or an array of rows and returns what was stored.
    pub async fn insert<B, T>(self, body: &B) -> Result<Vec<T>, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.write(Method::POST, body)?;
        let resp = http::send_rest(req).await?;
        Ok(resp.json().await?)
    }

    pub async fn insert_single<B, T>(self, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self
            .write(Method::POST, body)?
            .header(ACCEPT, HeaderValue::from_static(SINGLE_OBJECT));
        let resp = http::send_rest(req).await?;
        Ok(resp.json().await?)
    }

    pub async fn update<B, T>(self, body: &B) -> Result<Vec<T>, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.write(Method::PATCH, body)?;
        let resp = http::send_rest(req).await?;
        Ok(resp.json().await?)
    }

    /// Updates exactly one row; a filter matching nothing is a `PGRST116` error.
    pub async fn update_single<B, T>(self, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self
            .write(Method::PATCH, body)?
            .header(ACCEPT, HeaderValue::from_static(SINGLE_OBJECT));
        let resp = http::send_rest(req).await?;
        Ok(resp.json().await?)
    }

    /// Update without reading the rows back.
    pub async fn update_silent<B>(self, body: &B) -> Result<(), ProviderError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url()?;
        let req = self
            .client
            .request(Method::PATCH, &url)
            .header(PREFER, HeaderValue::from_static("return=minimal"))
            .json(body);
        http::send_rest(req).await?;
        Ok(())
    }

    pub async fn delete(self) -> Result<(), ProviderError> {
        let url = self.url()?;
        let req = self.client.request(Method::DELETE, &url);
        http::send_rest(req).await?;
        Ok(())
    }

    fn write<B>(&self, method: Method, body: &B) -> Result<RequestBuilder, ProviderError>
    where
        B: Serialize + ?Sized,
    {
        with_pretty_json_debug(body, |pretty| {
            tracing::debug!(table = %self.table, %method, body = %pretty, "Backend write");
        });

        let url = self.url()?;
        Ok(self
            .client
            .request(method, &url)
            .header(PREFER, HeaderValue::from_static("return=representation"))
            .json(body))
    }

    fn url(&self) -> Result<Url, ProviderError> {
        let mut url = self.client.rest_url.join(&self.table)?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(select) = &self.select {
                pairs.append_pair("select", select);
            }
            for (key, value) in &self.params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

impl SupabaseClient {
    /// REST call authorised with the project key; the service acts on behalf of users
    /// it has already verified.
    pub(super) fn request(&self, method: Method, url: &Url) -> RequestBuilder {
        self.http
            .request(method, url.clone())
            .bearer_auth(self.anon_key.as_ref())
    }
}

/// Quotes a value for an `in.(...)` list so commas and parentheses survive.
fn quote_value(raw: &str) -> String {
    let escaped = raw.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Total from a `Content-Range` header: `0-9/42` or `*/0`.
pub fn parse_content_range(header: &str) -> Result<u64, ProviderError> {
    header
        .rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse::<u64>().ok())
        .ok_or_else(|| ProviderError::ContentRange(header.to_string()))
}
