// Async HTTP client for the registry's PostgREST store.
//
// Base path: /rest/v1/
// Auth: `apikey` header + `Authorization: Bearer <key>`

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::query::{Direction, Query};
use crate::types;
use crate::{Error, TransportConfig};

// ── Error response shape from the store ──────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

const PREFER_REPRESENTATION: &str = "return=representation";

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the registry store.
///
/// Every resource lives under `/rest/v1/<Resource>`; reads take PostgREST
/// query strings built with [`Query`], writes ask for the affected rows back.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RestClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a project URL and API key.
    ///
    /// Injects `apikey` and `Authorization: Bearer` as default headers.
    pub fn from_api_key(
        base_url: &str,
        api_key: &secrecy::SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let key = api_key.expose_secret();
        if key.trim().is_empty() {
            return Err(Error::InvalidApiKey);
        }

        let mut headers = HeaderMap::new();
        let mut key_value = HeaderValue::from_str(key)
            .map_err(|e| Error::ClientBuild(format!("invalid API key header value: {e}")))?;
        key_value.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|e| Error::ClientBuild(format!("invalid API key header value: {e}")))?;
        bearer.set_sensitive(true);
        headers.insert("apikey", key_value);
        headers.insert(reqwest::header::AUTHORIZATION, bearer);

        let http = transport.build_client_with_headers(headers)?;
        let base_url = Self::normalize_base_url(base_url)?;

        Ok(Self { http, base_url })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Append `/rest/v1/` unless the URL already points there.
    ///
    /// `https://abc.supabase.co` -> `https://abc.supabase.co/rest/v1/`
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();

        if path.ends_with("/rest/v1") {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}/rest/v1/"));
        }

        Ok(url)
    }

    /// The normalized base URL (always ends with `/rest/v1/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn url(&self, resource: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(resource)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        resource: &str,
        params: &[(String, String)],
    ) -> Result<T, Error> {
        let url = self.url(resource)?;
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        resource: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(resource)?;
        debug!("POST {url}");

        let resp = self
            .http
            .post(url)
            .header("Prefer", PREFER_REPRESENTATION)
            .json(body)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn patch_with_params<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        resource: &str,
        params: &[(String, String)],
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(resource)?;
        debug!("PATCH {url} params={params:?}");

        let resp = self
            .http
            .patch(url)
            .header("Prefer", PREFER_REPRESENTATION)
            .query(params)
            .json(body)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn delete_with_params(
        &self,
        resource: &str,
        params: &[(String, String)],
    ) -> Result<(), Error> {
        let url = self.url(resource)?;
        debug!("DELETE {url} params={params:?}");

        let resp = self.http.delete(url).query(params).send().await?;
        self.handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Error::InvalidApiKey;
        }

        let raw = resp.text().await.unwrap_or_default();

        if let Ok(err) = serde_json::from_str::<ErrorResponse>(&raw) {
            Error::Api {
                status: status.as_u16(),
                message: err.message.unwrap_or_else(|| status.to_string()),
                code: err.code,
                hint: err.hint,
            }
        } else {
            Error::Api {
                status: status.as_u16(),
                message: if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                },
                code: None,
                hint: None,
            }
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Directory ────────────────────────────────────────────────────

    /// All technology families, ordered by title.
    pub async fn list_families(&self) -> Result<Vec<types::FamilyRow>, Error> {
        let query = Query::new().select("*").order("title", Direction::Asc);
        self.get_with_params(types::FAMILIES, &query.params()).await
    }

    /// Technologies ordered by title, restricted to one family when given.
    pub async fn list_technologies(
        &self,
        family_id: Option<&str>,
    ) -> Result<Vec<types::TechRow>, Error> {
        let mut query = Query::new().select("*");
        if let Some(family_id) = family_id {
            query = query.eq("tech_family_id", family_id);
        }
        let query = query.order("title", Direction::Asc);
        self.get_with_params(types::TECHNOLOGIES, &query.params())
            .await
    }

    // ── Controls ─────────────────────────────────────────────────────

    /// Controls matching `query`. The caller supplies filters, order and
    /// paging; the embedding select is added when absent.
    pub async fn list_controls(&self, query: &Query) -> Result<Vec<types::ControlRow>, Error> {
        let mut params = query.params();
        if !params.iter().any(|(k, _)| k == "select") {
            params.insert(0, ("select".into(), types::CONTROL_SELECT.into()));
        }
        self.get_with_params(types::CONTROLS, &params).await
    }

    /// Fetch one control by id. `Ok(None)` when no row matches.
    pub async fn get_control(&self, id: &str) -> Result<Option<types::ControlRow>, Error> {
        let query = Query::new()
            .select(types::CONTROL_SELECT)
            .eq("id", id)
            .limit(1);
        let rows: Vec<types::ControlRow> = self
            .get_with_params(types::CONTROLS, &query.params())
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Insert a control and return the stored row.
    pub async fn insert_control(
        &self,
        body: &types::ControlWrite,
    ) -> Result<Vec<types::ControlRow>, Error> {
        self.post(types::CONTROLS, body).await
    }

    /// Update the control with `id`. Returns the matched rows; an empty
    /// vec means no control had that id.
    pub async fn update_control(
        &self,
        id: &str,
        body: &types::ControlPatch,
    ) -> Result<Vec<types::ControlRow>, Error> {
        let query = Query::new().eq("id", id);
        self.patch_with_params(types::CONTROLS, &query.params(), body)
            .await
    }

    /// Delete the control with `id`. Deleting a missing id is not an error.
    pub async fn delete_control(&self, id: &str) -> Result<(), Error> {
        let query = Query::new().eq("id", id);
        self.delete_with_params(types::CONTROLS, &query.params())
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn normalize_appends_rest_prefix() {
        let url = RestClient::normalize_base_url("https://abc.supabase.co").unwrap();
        assert_eq!(url.as_str(), "https://abc.supabase.co/rest/v1/");
    }

    #[test]
    fn normalize_keeps_existing_prefix() {
        let url = RestClient::normalize_base_url("https://abc.supabase.co/rest/v1").unwrap();
        assert_eq!(url.as_str(), "https://abc.supabase.co/rest/v1/");
    }

    #[test]
    fn normalize_keeps_sub_path() {
        let url = RestClient::normalize_base_url("http://localhost:8000/store/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/store/rest/v1/");
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let key = secrecy::SecretString::from(String::from("  "));
        let err = RestClient::from_api_key(
            "https://abc.supabase.co",
            &key,
            &TransportConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidApiKey));
    }
}
