use crate::db::error::RepositoryError;
use crate::db::models::plan::Plan;
use crate::db::schema::plans;
use diesel::prelude::*;

pub struct PlanRepository;

impl PlanRepository {
    pub fn list(conn: &mut PgConnection) -> Result<Vec<Plan>, RepositoryError> {
        plans::table
            .order(plans::storage_limit_bytes.asc())
            .select(Plan::as_select())
            .load(conn)
            .map_err(Into::into)
    }

    pub fn find_by_name(
        conn: &mut PgConnection,
        name: &str,
    ) -> Result<Option<Plan>, RepositoryError> {
        plans::table
            .filter(plans::name.eq(name))
            .select(Plan::as_select())
            .first(conn)
            .optional()
            .map_err(Into::into)
    }

    pub fn find_by_id(conn: &mut PgConnection, id: i32) -> Result<Option<Plan>, RepositoryError> {
        plans::table
            .find(id)
            .select(Plan::as_select())
            .first(conn)
            .optional()
            .map_err(Into::into)
    }
}
