//! Dataset registry
//!
//! Datasets are published by members and optionally tied to the tasks that
//! produced them. Access is open for public datasets; everything else is
//! gated on the owner's allow list, which buyers join by paying the price.
//! Subscription datasets sell time-limited access instead.

use super::{membership, record_content, token, DaoContext};
use crate::core::{
    AccessType, Address, Amount, Dataset, DatasetId, RewardShare, Task, TaskId, Timestamp,
    Visibility,
};
use crate::error::{DaoError, DaoResult};
use crate::storage::{keys, UnitOfWork};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDatasetParams {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub content_reference: String,
    #[serde(default)]
    pub metadata_reference: Option<String>,
    #[serde(default)]
    pub is_encrypted: bool,
    #[serde(default)]
    pub access_conditions: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub access_type: AccessType,
    #[serde(default)]
    pub price: Amount,
    #[serde(default)]
    pub reward_recipients: Vec<RewardShare>,
    #[serde(default)]
    pub linked_task_ids: Vec<TaskId>,
}

fn validate_params(params: &CreateDatasetParams) -> DaoResult<()> {
    let invalid = |msg: &str| Err(DaoError::InvalidParameters(msg.to_string()));

    if params.name.trim().is_empty() {
        return invalid("name is required");
    }
    if params.category.trim().is_empty() {
        return invalid("category is required");
    }
    if params.content_reference.trim().is_empty() {
        return invalid("content_reference is required");
    }
    let total_share: u32 = params
        .reward_recipients
        .iter()
        .map(|r| r.share_percentage as u32)
        .sum();
    if total_share > 100 {
        return Err(DaoError::InvalidParameters(format!(
            "reward shares add up to {}%",
            total_share
        )));
    }
    let gated = params.visibility != Visibility::Public || params.access_type != AccessType::Public;
    let has_conditions = params
        .access_conditions
        .as_deref()
        .map(|c| !c.trim().is_empty())
        .unwrap_or(false);
    if gated && !has_conditions {
        return invalid("gated datasets require access conditions");
    }
    if matches!(params.access_type, AccessType::PayPerUse | AccessType::Subscription) && params.price == 0 {
        return invalid("paid datasets require a price");
    }
    Ok(())
}

fn load_dataset(uow: &mut UnitOfWork<'_>, id: DatasetId) -> DaoResult<Dataset> {
    uow.load::<Dataset>(&keys::dataset(id))?
        .ok_or_else(|| DaoError::not_found("Dataset", id))
}

fn require_owner(dataset: &Dataset, caller: &Address) -> DaoResult<()> {
    if &dataset.owner != caller {
        return Err(DaoError::Unauthorized(format!(
            "only the owner can manage dataset {}",
            dataset.id
        )));
    }
    Ok(())
}

fn can_access(dataset: &Dataset, user: &Address, now: Timestamp) -> bool {
    &dataset.owner == user
        || dataset.is_public()
        || dataset.authorized_users.contains(user)
        || dataset.subscriptions.get(user).map_or(false, |&until| until > now)
}

/// Pay `amount` from `payer` to the dataset's reward recipients by share, the rest to the owner.
fn settle_payment(
    uow: &mut UnitOfWork<'_>,
    dataset: &mut Dataset,
    payer: &Address,
    amount: Amount,
) -> DaoResult<()> {
    if amount == 0 {
        return Ok(());
    }
    token::debit(uow, payer, amount)?;
    let mut remaining = amount;
    for recipient in &dataset.reward_recipients {
        let share = amount * recipient.share_percentage as Amount / 100;
        if share > 0 {
            token::credit(uow, &recipient.address, share)?;
            remaining -= share;
        }
    }
    token::credit(uow, &dataset.owner, remaining)?;
    dataset.revenue = dataset.revenue.saturating_add(amount);
    Ok(())
}

/// Mark a dataset validated without an owner check. Used by governance.
pub(crate) fn mark_validated(
    uow: &mut UnitOfWork<'_>,
    id: DatasetId,
    by: &Address,
    now: Timestamp,
) -> DaoResult<Dataset> {
    let mut dataset = load_dataset(uow, id)?;
    if dataset.validated {
        return Err(DaoError::InvalidState(format!("dataset {} is already validated", id)));
    }
    dataset.validated = true;
    dataset.validated_by = Some(by.clone());
    dataset.updated_at = now;
    uow.save(&dataset)?;
    info!(dataset_id = id, by = %by, "Dataset validated");
    Ok(dataset)
}

pub struct DatasetRegistry {
    ctx: Arc<DaoContext>,
}

impl DatasetRegistry {
    pub fn new(ctx: Arc<DaoContext>) -> Self {
        Self { ctx }
    }

    pub fn create_dataset(&self, caller: &Address, params: CreateDatasetParams) -> DaoResult<Dataset> {
        validate_params(&params)?;

        self.ctx.execute("create_dataset", |uow, now| {
            membership::require_member(uow, caller)?;
            for task_id in &params.linked_task_ids {
                if uow.load::<Task>(&keys::task(*task_id))?.is_none() {
                    return Err(DaoError::not_found("Task", task_id));
                }
            }

            let id = uow.next_id("datasets")?;
            let content_key = record_content(uow, &params.content_reference)?;
            let dataset = Dataset {
                id,
                owner: caller.clone(),
                name: params.name.trim().to_string(),
                description: params.description,
                category: params.category.trim().to_string(),
                content_reference: params.content_reference,
                content_key,
                metadata_reference: params.metadata_reference,
                is_encrypted: params.is_encrypted,
                access_conditions: params.access_conditions,
                visibility: params.visibility,
                access_type: params.access_type,
                price: params.price,
                authorized_users: Default::default(),
                subscriptions: Default::default(),
                reward_recipients: params.reward_recipients,
                validated: false,
                validated_by: None,
                linked_task_ids: params.linked_task_ids,
                usage_count: 0,
                revenue: 0,
                created_at: now,
                updated_at: now,
            };
            uow.insert(&dataset)?;

            info!(
                dataset_id = id,
                owner = %caller,
                category = %dataset.category,
                access_type = ?dataset.access_type,
                "Dataset registered"
            );
            Ok(dataset)
        })
    }

    /// Owner or admin sign-off, once per dataset.
    pub fn validate_dataset(&self, caller: &Address, id: DatasetId) -> DaoResult<Dataset> {
        self.ctx.execute("validate_dataset", |uow, now| {
            let dataset = load_dataset(uow, id)?;
            if &dataset.owner != caller && !self.ctx.config.is_admin(caller) {
                return Err(DaoError::Unauthorized(format!(
                    "{} cannot validate dataset {}",
                    caller, id
                )));
            }
            mark_validated(uow, id, caller, now)
        })
    }

    pub fn grant_access(&self, caller: &Address, id: DatasetId, user: &Address) -> DaoResult<Dataset> {
        self.ctx.execute("grant_access", |uow, now| {
            let mut dataset = load_dataset(uow, id)?;
            require_owner(&dataset, caller)?;
            if dataset.authorized_users.insert(user.clone()) {
                dataset.updated_at = now;
                uow.save(&dataset)?;
                info!(dataset_id = id, user = %user, "Dataset access granted");
            }
            Ok(dataset)
        })
    }

    pub fn revoke_access(&self, caller: &Address, id: DatasetId, user: &Address) -> DaoResult<Dataset> {
        self.ctx.execute("revoke_access", |uow, now| {
            let mut dataset = load_dataset(uow, id)?;
            require_owner(&dataset, caller)?;
            if dataset.authorized_users.remove(user) {
                dataset.updated_at = now;
                uow.save(&dataset)?;
                info!(dataset_id = id, user = %user, "Dataset access revoked");
            }
            Ok(dataset)
        })
    }

    /// Pay the price once and join the allow list. Subscriptions instead buy
    /// `duration_secs` of access, added to any time left on a live one.
    pub fn purchase_access(
        &self,
        buyer: &Address,
        id: DatasetId,
        duration_secs: Option<i64>,
    ) -> DaoResult<Dataset> {
        self.ctx.execute("purchase_access", |uow, now| {
            let mut dataset = load_dataset(uow, id)?;
            if dataset.access_type == AccessType::Subscription && &dataset.owner != buyer {
                let duration = duration_secs.filter(|secs| *secs > 0).ok_or_else(|| {
                    DaoError::InvalidParameters("subscriptions require a positive duration".to_string())
                })?;
                let start = dataset.subscriptions.get(buyer).copied().unwrap_or(now).max(now);
                let until = start.saturating_add(duration);
                let price = dataset.price;
                settle_payment(uow, &mut dataset, buyer, price)?;
                dataset.subscriptions.insert(buyer.clone(), until);
                dataset.updated_at = now;
                uow.save(&dataset)?;

                info!(dataset_id = id, buyer = %buyer, price, until, "Dataset subscription purchased");
                return Ok(dataset);
            }
            if can_access(&dataset, buyer, now) {
                return Err(DaoError::InvalidState(format!(
                    "{} already has access to dataset {}",
                    buyer, id
                )));
            }
            let price = dataset.price;
            settle_payment(uow, &mut dataset, buyer, price)?;
            dataset.authorized_users.insert(buyer.clone());
            dataset.updated_at = now;
            uow.save(&dataset)?;

            info!(dataset_id = id, buyer = %buyer, price, "Dataset access purchased");
            Ok(dataset)
        })
    }

    /// Count one use. Pay-per-use datasets charge the price on every call.
    pub fn record_usage(&self, user: &Address, id: DatasetId) -> DaoResult<Dataset> {
        self.ctx.execute("record_usage", |uow, now| {
            let mut dataset = load_dataset(uow, id)?;
            if !can_access(&dataset, user, now) {
                return Err(DaoError::Unauthorized(format!(
                    "{} has no access to dataset {}",
                    user, id
                )));
            }
            if dataset.access_type == AccessType::PayPerUse && &dataset.owner != user {
                let price = dataset.price;
                settle_payment(uow, &mut dataset, user, price)?;
            }
            dataset.usage_count += 1;
            dataset.updated_at = now;
            uow.save(&dataset)?;
            Ok(dataset)
        })
    }

    pub fn has_access(&self, id: DatasetId, user: &Address) -> DaoResult<bool> {
        Ok(can_access(&self.get(id)?, user, self.ctx.now()))
    }

    // ==================== Queries ====================

    pub fn get(&self, id: DatasetId) -> DaoResult<Dataset> {
        self.ctx
            .repo::<Dataset>()
            .get(&keys::dataset(id))?
            .ok_or_else(|| DaoError::not_found("Dataset", id))
    }

    pub fn list(&self) -> DaoResult<Vec<Dataset>> {
        Ok(self.ctx.repo::<Dataset>().list()?)
    }

    pub fn by_owner(&self, owner: &Address) -> DaoResult<Vec<Dataset>> {
        let prefix = keys::index_prefix(keys::USER_DATASETS, owner.as_str());
        Ok(self.ctx.repo::<Dataset>().list_indexed(&prefix)?)
    }

    pub fn by_category(&self, category: &str) -> DaoResult<Vec<Dataset>> {
        let prefix = keys::index_prefix(keys::DATASETS_BY_CATEGORY, &keys::scope(category));
        Ok(self.ctx.repo::<Dataset>().list_indexed(&prefix)?)
    }
}
