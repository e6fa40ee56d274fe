use crate::db::models::plan::Plan;
use crate::db::models::user::User;
use crate::db::store::Store;
use crate::error::AppError;
use chrono::{DateTime, Duration, Months, Utc};
use reelbox_api::StorageSummary;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Raison d'un refus d'upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadDenial {
    NoPlan,
    PlanExpired,
    NotEnoughStorage,
}

impl UploadDenial {
    pub fn code(self) -> &'static str {
        match self {
            Self::NoPlan => "NO_PLAN",
            Self::PlanExpired => "PLAN_EXPIRED",
            Self::NotEnoughStorage => "NOT_ENOUGH_STORAGE",
        }
    }
}

impl fmt::Display for UploadDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPlan => write!(f, "No storage plan assigned"),
            Self::PlanExpired => write!(f, "Your storage plan has expired"),
            Self::NotEnoughStorage => write!(f, "Not enough storage left for this file"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadDecision {
    Allowed,
    Denied(UploadDenial),
}

impl UploadDecision {
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Self::Allowed => Ok(()),
            Self::Denied(reason) => Err(AppError::QuotaExceeded(reason)),
        }
    }
}

/// Décision pure, sans effet de bord, sur l'état courant de l'utilisateur
pub fn evaluate_upload(user: &User, file_size: i64, now: DateTime<Utc>) -> UploadDecision {
    let Some(purchased) = user.purchased_memory_bytes.filter(|_| user.plan_id.is_some()) else {
        return UploadDecision::Denied(UploadDenial::NoPlan);
    };

    if user.plan_expiration.is_some_and(|expiration| expiration <= now) {
        return UploadDecision::Denied(UploadDenial::PlanExpired);
    }

    match user.used_memory_bytes.checked_add(file_size) {
        Some(total) if file_size >= 0 && total <= purchased => UploadDecision::Allowed,
        _ => UploadDecision::Denied(UploadDenial::NotEnoughStorage),
    }
}

/// Le plan gratuit dure un jour, les autres un mois
pub fn plan_expiration(plan: &Plan, now: DateTime<Utc>) -> DateTime<Utc> {
    if plan.is_free() {
        now + Duration::days(1)
    } else {
        now.checked_add_months(Months::new(1))
            .unwrap_or(now + Duration::days(30))
    }
}

#[derive(Clone)]
pub struct QuotaEngine {
    store: Arc<dyn Store>,
}

impl QuotaEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn list_plans(&self) -> Result<Vec<Plan>, AppError> {
        Ok(self.store.list_plans()?)
    }

    pub fn find_plan(&self, name: &str) -> Result<Plan, AppError> {
        self.store
            .find_plan_by_name(name)?
            .ok_or_else(|| AppError::not_found(format!("Plan {name}")))
    }

    /// Écrase l'affectation courante, sans prorata ni cumul
    pub fn assign_plan(
        &self,
        user_id: Uuid,
        plan_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Plan, AppError> {
        let plan = self.find_plan(plan_name)?;
        let expiration = plan_expiration(&plan, now);

        self.store.set_user_plan(user_id, &plan, expiration)?;
        tracing::info!(%user_id, plan = %plan.name, %expiration, "Plan assigned");
        Ok(plan)
    }

    /// Refuse par défaut. Un plan expiré est retiré au passage.
    pub fn can_upload(
        &self,
        user_id: Uuid,
        file_size: i64,
        now: DateTime<Utc>,
    ) -> Result<UploadDecision, AppError> {
        let user = self
            .store
            .find_user(user_id)?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        let decision = evaluate_upload(&user, file_size, now);
        if decision == UploadDecision::Denied(UploadDenial::PlanExpired) {
            self.store.unassign_plan(user_id)?;
            tracing::info!(%user_id, "Expired plan unassigned at upload time");
        }
        Ok(decision)
    }

    /// Réservation atomique, échoue si le quota ne suffit plus
    pub fn increase_used_memory(&self, user_id: Uuid, bytes: i64) -> Result<(), AppError> {
        if bytes <= 0 {
            return Err(AppError::validation("Invalid file size."));
        }
        if self.store.try_increase_used_memory(user_id, bytes)? {
            Ok(())
        } else {
            Err(AppError::QuotaExceeded(UploadDenial::NotEnoughStorage))
        }
    }

    pub fn decrease_used_memory(&self, user_id: Uuid, bytes: i64) -> Result<(), AppError> {
        Ok(self.store.decrease_used_memory(user_id, bytes.max(0))?)
    }

    pub fn storage_summary(&self, user: &User) -> Result<StorageSummary, AppError> {
        let plan = match user.plan_id {
            Some(id) => self.store.find_plan(id)?.map(|p| p.name),
            None => None,
        };
        Ok(StorageSummary {
            plan,
            used_memory_bytes: user.used_memory_bytes,
            purchased_memory_bytes: user.purchased_memory_bytes,
            plan_expiration: user.plan_expiration,
        })
    }
}
