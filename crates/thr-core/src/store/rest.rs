// ── PostgREST-backed registry store ──

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use thr_api::types::{CONTROL_FAMILY_FILTER, CONTROL_SEARCH_COLUMNS, ControlWrite};
use thr_api::{Direction, Nulls, Query, RestClient};

use super::{ControlOrder, ControlQuery, RegistryStore, Scope};
use crate::config::RegistryConfig;
use crate::convert::control_patch;
use crate::error::CoreError;
use crate::model::{Control, ControlId, FamilyId, Technology, TechnologyFamily};
use crate::sort::{SortColumn, SortDirection};

/// Registry store backed by the remote PostgREST API.
pub struct RestStore {
    client: RestClient,
}

impl RestStore {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }

    /// Build the HTTP client from runtime config.
    pub fn connect(config: &RegistryConfig) -> Result<Self, CoreError> {
        let client = RestClient::from_api_key(
            config.url.as_str(),
            &config.api_key,
            &config.transport(),
        )?;
        debug!(base = %client.base_url(), "registry client ready");
        Ok(Self { client })
    }
}

fn direction(dir: SortDirection) -> Direction {
    match dir {
        SortDirection::Asc => Direction::Asc,
        SortDirection::Desc => Direction::Desc,
    }
}

/// Translate a resolved controls query into PostgREST parameters.
pub(crate) fn to_api_query(query: &ControlQuery) -> Query {
    let mut q = Query::new().select(thr_api::types::CONTROL_SELECT);

    q = match &query.scope {
        Scope::All => q,
        Scope::Family(family) => q.eq(CONTROL_FAMILY_FILTER, family),
        Scope::Technology(tech) => q.eq("tech_id", tech),
    };

    if let Some(term) = &query.search {
        q = q.any_ilike(&CONTROL_SEARCH_COLUMNS, term);
    }

    q = match query.order {
        ControlOrder::RankingThenId => q
            .order_nulls("ranking", Direction::Asc, Nulls::Last)
            .order("id", Direction::Asc),
        ControlOrder::By(sort) => {
            let q = q.order(sort.column.column_name(), direction(sort.direction));
            if sort.column == SortColumn::Id {
                q
            } else {
                q.order("id", Direction::Asc)
            }
        }
    };

    q.limit(query.limit)
}

#[async_trait]
impl RegistryStore for RestStore {
    async fn list_families(&self) -> Result<Vec<TechnologyFamily>, CoreError> {
        let rows = self.client.list_families().await?;
        Ok(rows.into_iter().map(TechnologyFamily::from).collect())
    }

    async fn list_technologies(
        &self,
        family: Option<&FamilyId>,
    ) -> Result<Vec<Technology>, CoreError> {
        let rows = self
            .client
            .list_technologies(family.map(FamilyId::as_str))
            .await?;
        Ok(rows.into_iter().map(Technology::from).collect())
    }

    async fn list_controls(&self, query: &ControlQuery) -> Result<Vec<Control>, CoreError> {
        let rows = self.client.list_controls(&to_api_query(query)).await?;
        Ok(rows.into_iter().map(Control::from).collect())
    }

    async fn get_control(&self, id: &ControlId) -> Result<Option<Control>, CoreError> {
        let row = self.client.get_control(id.as_str()).await?;
        Ok(row.map(Control::from))
    }

    async fn update_control(&self, control: &Control) -> Result<bool, CoreError> {
        let patch = control_patch(control, Utc::now());
        let rows = self
            .client
            .update_control(control.id.as_str(), &patch)
            .await?;
        Ok(!rows.is_empty())
    }

    async fn insert_control(&self, control: &Control) -> Result<(), CoreError> {
        let mut body = ControlWrite::from(control);
        body.updated_at = Some(Utc::now().to_rfc3339());
        self.client.insert_control(&body).await?;
        Ok(())
    }

    async fn delete_control(&self, id: &ControlId) -> Result<(), CoreError> {
        self.client.delete_control(id.as_str()).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::TechnologyId;
    use crate::sort::Sort;

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn base(scope: Scope) -> ControlQuery {
        ControlQuery {
            scope,
            search: None,
            order: ControlOrder::RankingThenId,
            limit: 50,
        }
    }

    #[test]
    fn technology_scope_filters_on_tech_id() {
        let params = to_api_query(&base(Scope::Technology(TechnologyId::from("mysql-8")))).params();
        assert_eq!(param(&params, "tech_id"), Some("eq.mysql-8"));
        assert_eq!(param(&params, "Tech.tech_family_id"), None);
        assert_eq!(param(&params, "order"), Some("ranking.asc.nullslast,id.asc"));
        assert_eq!(param(&params, "limit"), Some("50"));
    }

    #[test]
    fn family_scope_filters_through_embedded_technology() {
        let params = to_api_query(&base(Scope::Family(FamilyId::from("DB")))).params();
        assert_eq!(param(&params, "Tech.tech_family_id"), Some("eq.DB"));
        assert_eq!(param(&params, "tech_id"), None);
    }

    #[test]
    fn search_is_anded_with_scope() {
        let mut query = base(Scope::Technology(TechnologyId::from("mysql-8")));
        query.search = Some("TDE".into());
        let params = to_api_query(&query).params();
        assert_eq!(param(&params, "tech_id"), Some("eq.mysql-8"));
        assert_eq!(
            param(&params, "or"),
            Some(r#"(id.ilike."*TDE*",statement.ilike."*TDE*",description.ilike."*TDE*")"#)
        );
    }

    #[test]
    fn explicit_sort_adds_id_tiebreak() {
        let mut query = base(Scope::All);
        query.order = ControlOrder::By(Sort::desc(SortColumn::ControlFamily));
        let params = to_api_query(&query).params();
        assert_eq!(param(&params, "order"), Some("control_family.desc,id.asc"));

        query.order = ControlOrder::By(Sort::desc(SortColumn::Id));
        let params = to_api_query(&query).params();
        assert_eq!(param(&params, "order"), Some("id.desc"));
    }
}
