use crate::db::schema::plans;
use diesel::{Queryable, Selectable};
use reelbox_api::PlanResponse;

/// Nom du plan gratuit attribué à l'inscription
pub const FREE_PLAN: &str = "free";

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = plans)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Plan {
    pub id: i32,
    pub name: String,
    pub storage_limit_bytes: i64,
    pub price_cents: i64,
    pub description: Option<String>,
}

impl Plan {
    pub fn is_free(&self) -> bool {
        self.name.eq_ignore_ascii_case(FREE_PLAN)
    }
}

impl From<Plan> for PlanResponse {
    fn from(plan: Plan) -> Self {
        PlanResponse {
            id: plan.id,
            name: plan.name,
            storage_limit_bytes: plan.storage_limit_bytes,
            price_cents: plan.price_cents,
            description: plan.description,
        }
    }
}
