//! Project repository for database operations.
//!
//! Every write runs in one transaction together with the category
//! synchronization and the balance reconciliation it triggers, so a failure
//! anywhere leaves the project exactly as it was.

use std::collections::BTreeSet;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tally_core::balance::{BalanceCalculator, BalanceError, BalanceReconciler, Reconciliation};
use tally_core::relation::{
    JoinStore, MembershipError, MembershipRule, RelationSynchronizer, SyncError, SyncReport,
};
use tally_shared::AppError;
use tally_shared::types::{CategoryId, ProjectId};
use tracing::info;
use uuid::Uuid;

use super::display_ids;
use crate::entities::{categories, projects};
use crate::stores::{ProjectCategoryStore, SeaBalanceStore, unknown_members};

/// Projects may end up with no categories.
pub const PROJECT_CATEGORIES_RULE: MembershipRule =
    MembershipRule::unrestricted("project_categories");

/// Error types for project, payment and addition writes.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    /// Project name is empty.
    #[error("Project name cannot be empty")]
    EmptyName,

    /// Lookup, validation or reconciliation failure.
    #[error(transparent)]
    Balance(#[from] BalanceError),

    /// Desired category set violates the membership rule.
    #[error(transparent)]
    Membership(#[from] MembershipError),

    /// Desired categories that do not exist.
    #[error("Unknown categories: {}", display_ids(.0))]
    UnknownCategories(Vec<CategoryId>),

    /// Category synchronization failed. The transaction was rolled back.
    #[error("{}", .0.rolled_back())]
    Categories(#[from] SyncError<CategoryId>),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl ProjectError {
    /// Returns true if the whole operation may be retried as-is.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Balance(err) if err.is_retryable())
    }
}

impl From<ProjectError> for AppError {
    fn from(err: ProjectError) -> Self {
        match err {
            err @ (ProjectError::EmptyName | ProjectError::UnknownCategories(_)) => {
                Self::Validation(err.to_string())
            }
            ProjectError::Balance(e) => e.into(),
            ProjectError::Membership(e) => e.into(),
            ProjectError::Categories(e) => Self::Database(e.rolled_back()),
            ProjectError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Input for creating a project.
#[derive(Debug, Clone, Default)]
pub struct CreateProjectInput {
    /// Project name.
    pub name: String,
    /// Budget, if known.
    pub budget: Option<Decimal>,
    /// Categories to attach.
    pub category_ids: Vec<CategoryId>,
}

/// Input for updating a project. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateProjectInput {
    /// New name.
    pub name: Option<String>,
    /// New budget; `Some(None)` clears it.
    pub budget: Option<Option<Decimal>>,
    /// Full desired category set.
    pub category_ids: Option<Vec<CategoryId>>,
}

/// Outcome of a project write.
#[derive(Debug, Clone)]
pub struct SavedProject {
    /// Project row as committed, including the reconciled balance.
    pub project: projects::Model,
    /// Balance persisted by this write, if it reconciled.
    pub reconciliation: Option<Reconciliation>,
    /// Category changes, if categories were supplied.
    pub categories: Option<SyncReport<CategoryId>>,
}

/// Project repository.
#[derive(Debug, Clone)]
pub struct ProjectRepository {
    db: DatabaseConnection,
}

impl ProjectRepository {
    /// Creates a new project repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a project by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: ProjectId) -> Result<Option<projects::Model>, ProjectError> {
        Ok(projects::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?)
    }

    /// Lists the categories attached to a project.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn category_ids(&self, id: ProjectId) -> Result<BTreeSet<CategoryId>, ProjectError> {
        let store = ProjectCategoryStore::new(&self.db);
        store.list_members(id).await.map_err(|source| {
            ProjectError::Categories(SyncError::Read {
                relation: store.relation(),
                source,
            })
        })
    }

    /// Lists project IDs in ascending order, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_ids(
        &self,
        after: Option<ProjectId>,
        limit: u64,
    ) -> Result<Vec<ProjectId>, ProjectError> {
        let mut query = projects::Entity::find()
            .select_only()
            .column(projects::Column::Id)
            .order_by_asc(projects::Column::Id)
            .limit(limit);

        if let Some(after) = after {
            query = query.filter(projects::Column::Id.gt(after.into_inner()));
        }

        let ids: Vec<Uuid> = query.into_tuple().all(&self.db).await?;
        Ok(ids.into_iter().map(ProjectId::from_uuid).collect())
    }

    /// Creates a project, attaches its categories and reconciles its balance.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The name is empty or the budget is negative or not storable
    /// - A category does not exist
    /// - A category write fails
    /// - The database operation fails
    pub async fn create_project(
        &self,
        input: CreateProjectInput,
    ) -> Result<SavedProject, ProjectError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ProjectError::EmptyName);
        }
        BalanceCalculator::validate_budget(input.budget)?;
        let categories: BTreeSet<CategoryId> = input.category_ids.into_iter().collect();
        PROJECT_CATEGORIES_RULE.check(&categories)?;

        let txn = self.db.begin().await?;
        check_categories_exist(&txn, &categories).await?;

        let now = Utc::now().into();
        let project_id = ProjectId::new();

        projects::ActiveModel {
            id: Set(project_id.into_inner()),
            name: Set(name),
            budget: Set(input.budget),
            remaining_amount: Set(Decimal::ZERO),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let category_report = RelationSynchronizer::new(ProjectCategoryStore::new(&txn))
            .synchronize(project_id, categories, BTreeSet::new())
            .await?;

        let reconciliation = BalanceReconciler::new(SeaBalanceStore::new(&txn))
            .reconcile(project_id)
            .await?;
        let project = reload_project(&txn, project_id).await?;

        txn.commit().await?;

        info!(%project_id, remaining = %reconciliation.breakdown.remaining, "Project created");

        Ok(SavedProject {
            project,
            reconciliation: Some(reconciliation),
            categories: Some(category_report),
        })
    }

    /// Updates a project.
    ///
    /// Changing the budget bumps the project version and reconciles the
    /// balance; supplying categories converges them to exactly that set.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The project does not exist
    /// - The name is empty or the budget is negative or not storable
    /// - A category does not exist
    /// - A category write fails
    /// - The database operation fails
    pub async fn update_project(
        &self,
        id: ProjectId,
        input: UpdateProjectInput,
    ) -> Result<SavedProject, ProjectError> {
        let name = match input.name {
            Some(name) if name.trim().is_empty() => return Err(ProjectError::EmptyName),
            Some(name) => Some(name.trim().to_string()),
            None => None,
        };
        if let Some(budget) = input.budget {
            BalanceCalculator::validate_budget(budget)?;
        }
        let categories: Option<BTreeSet<CategoryId>> = input
            .category_ids
            .map(|ids| ids.into_iter().collect());
        if let Some(categories) = &categories {
            PROJECT_CATEGORIES_RULE.check(categories)?;
        }

        let txn = self.db.begin().await?;

        let existing = lock_project(&txn, id).await?;
        if let Some(categories) = &categories {
            check_categories_exist(&txn, categories).await?;
        }

        let budget_changed = input.budget.is_some();
        let version = existing.version;
        let mut active: projects::ActiveModel = existing.into();
        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(budget) = input.budget {
            active.budget = Set(budget);
            active.version = Set(version + 1);
        }
        active.updated_at = Set(Utc::now().into());
        let project = active.update(&txn).await?;

        let category_report = match categories {
            Some(categories) => Some(
                RelationSynchronizer::new(ProjectCategoryStore::new(&txn))
                    .converge(id, categories)
                    .await?,
            ),
            None => None,
        };

        let (project, reconciliation) = if budget_changed {
            let reconciliation = BalanceReconciler::new(SeaBalanceStore::new(&txn))
                .reconcile(id)
                .await?;
            (reload_project(&txn, id).await?, Some(reconciliation))
        } else {
            (project, None)
        };

        txn.commit().await?;

        Ok(SavedProject {
            project,
            reconciliation,
            categories: category_report,
        })
    }

    /// Recomputes and persists a project's balance on its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the project does not exist, its stored data is
    /// invalid, it was modified concurrently, or the database fails.
    pub async fn reconcile(&self, id: ProjectId) -> Result<Reconciliation, ProjectError> {
        let txn = self.db.begin().await?;
        let reconciliation = BalanceReconciler::new(SeaBalanceStore::new(&txn))
            .reconcile(id)
            .await?;
        txn.commit().await?;
        Ok(reconciliation)
    }
}

/// Locks a project row for the rest of the transaction.
///
/// Payment and addition writes take this lock first so concurrent writers on
/// the same project serialize instead of racing the version check.
pub(crate) async fn lock_project<C: ConnectionTrait>(
    conn: &C,
    id: ProjectId,
) -> Result<projects::Model, ProjectError> {
    projects::Entity::find_by_id(id.into_inner())
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| BalanceError::ProjectNotFound(id).into())
}

/// Reads a project back inside the transaction that just reconciled it.
async fn reload_project<C: ConnectionTrait>(
    conn: &C,
    id: ProjectId,
) -> Result<projects::Model, ProjectError> {
    projects::Entity::find_by_id(id.into_inner())
        .one(conn)
        .await?
        .ok_or_else(|| BalanceError::ProjectNotFound(id).into())
}

async fn check_categories_exist<C: ConnectionTrait>(
    conn: &C,
    desired: &BTreeSet<CategoryId>,
) -> Result<(), ProjectError> {
    let unknown = unknown_members::<categories::Entity, _, _>(
        conn,
        categories::Column::Id,
        |row| row.id,
        desired,
    )
    .await?;
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(ProjectError::UnknownCategories(unknown))
    }
}
