//! Supabase tables through the PostgREST endpoint at `{url}/rest/v1`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE, RANGE};
use serde_json::Value;

use super::{check_status, RangePage, RelationalBackend};
use crate::types::UserRecord;

pub struct SupabaseClient {
    http: reqwest::Client,
    rest_url: String,
}

impl SupabaseClient {
    pub fn new(url: &str, key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(key).context("Supabase key is not a valid header value")?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {key}"))
                .context("Supabase key is not a valid header value")?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("building Supabase HTTP client")?;

        Ok(Self {
            http,
            rest_url: format!("{}/rest/v1", url.trim_end_matches('/')),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }
}

/// PostgREST errors carry their text in `message`.
fn postgrest_message(value: &Value) -> Option<String> {
    value.get("message").and_then(Value::as_str).map(str::to_string)
}

/// Parses the total out of a `Content-Range` header such as `0-9999/100000`
/// or `*/0`. Returns `None` when the total is unknown (`0-9/*`).
pub fn parse_content_range_total(header: &str) -> Result<Option<usize>> {
    let Some((_, total)) = header.trim().split_once('/') else {
        bail!("malformed Content-Range header: {header}");
    };
    if total == "*" {
        return Ok(None);
    }
    total
        .parse()
        .map(Some)
        .with_context(|| format!("malformed Content-Range total: {header}"))
}

#[async_trait]
impl RelationalBackend for SupabaseClient {
    async fn insert(&self, table: &str, rows: &[UserRecord]) -> Result<()> {
        let response = self
            .http
            .post(self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await
            .with_context(|| format!("Supabase insert into {table}"))?;
        check_status(response, "Supabase", &format!("insert into {table}"), postgrest_message)
            .await?;
        Ok(())
    }

    async fn select_range(
        &self,
        table: &str,
        columns: &str,
        from: usize,
        to: usize,
    ) -> Result<RangePage> {
        let response = self
            .http
            .get(self.table_url(table))
            .query(&[("select", columns)])
            .header("Range-Unit", "items")
            .header(RANGE, format!("{from}-{to}"))
            .header("Prefer", "count=exact")
            .send()
            .await
            .with_context(|| format!("Supabase select from {table}"))?;
        let what = format!("select from {table}");
        let response = check_status(response, "Supabase", &what, postgrest_message).await?;

        let total = match response.headers().get(CONTENT_RANGE) {
            Some(value) => {
                let value = value
                    .to_str()
                    .context("Content-Range header is not valid text")?;
                parse_content_range_total(value)?
            }
            None => None,
        };
        let rows: Vec<Value> = response
            .json()
            .await
            .with_context(|| format!("decoding Supabase select from {table}"))?;

        Ok(RangePage { rows, total })
    }

    async fn select_limit(&self, table: &str, columns: &str, limit: usize) -> Result<Vec<Value>> {
        let limit = limit.to_string();
        let response = self
            .http
            .get(self.table_url(table))
            .query(&[("select", columns), ("limit", limit.as_str())])
            .send()
            .await
            .with_context(|| format!("Supabase select from {table}"))?;
        let what = format!("select from {table}");
        let response = check_status(response, "Supabase", &what, postgrest_message).await?;
        response
            .json()
            .await
            .with_context(|| format!("decoding Supabase select from {table}"))
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_content_range_total, postgrest_message, SupabaseClient};
    use crate::backends::error_message;

    #[test]
    fn content_range_totals() {
        assert_eq!(parse_content_range_total("0-9999/100000").unwrap(), Some(100_000));
        assert_eq!(parse_content_range_total("*/0").unwrap(), Some(0));
        assert_eq!(parse_content_range_total("0-9/*").unwrap(), None);
        assert!(parse_content_range_total("0-9").is_err());
        assert!(parse_content_range_total("0-9/many").is_err());
    }

    #[test]
    fn table_urls_point_at_the_rest_endpoint() {
        let client = SupabaseClient::new("https://project.supabase.co/", "anon-key").unwrap();
        assert_eq!(
            client.table_url("users"),
            "https://project.supabase.co/rest/v1/users"
        );
    }

    #[test]
    fn keys_with_control_characters_are_rejected() {
        assert!(SupabaseClient::new("https://project.supabase.co", "bad\nkey").is_err());
    }

    #[test]
    fn error_bodies_yield_the_postgrest_message() {
        let body = r#"{"code":"42P01","message":"relation \"public.users\" does not exist"}"#;
        assert_eq!(
            error_message(body, postgrest_message),
            "relation \"public.users\" does not exist"
        );
    }
}
