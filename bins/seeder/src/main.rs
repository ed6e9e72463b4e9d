//! Database seeder for Tally development and testing.
//!
//! Seeds the permission catalog, notification types, categories, an
//! administrator role and two demo projects. Catalog rows are skipped when
//! they already exist, so the seeder can be re-run safely.
//!
//! Usage: cargo run --bin seeder

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Iterable, QueryFilter, Set,
};
use tally_db::entities::sea_orm_active_enums::{NotificationsScope, PermissionType};
use tally_db::entities::{categories, notification_types, permissions, projects, roles};
use tally_db::repositories::{
    AdditionRepository, CreateAdditionInput, CreatePaymentInput, CreateProjectInput,
    CreateRoleInput, PaymentRepository, ProjectRepository, RoleRepository,
};
use tally_shared::AppConfig;
use tally_shared::types::{CategoryId, NotificationTypeId, PermissionId, ProjectId};

/// Screens of the admin tool that permissions are granted on.
const SCREENS: [&str; 5] = ["projects", "payments", "additions", "roles", "reports"];

const NOTIFICATION_TYPES: [&str; 3] = ["payment_recorded", "budget_changed", "project_overpaid"];

const CATEGORIES: [&str; 3] = ["Residential", "Commercial", "Renovation"];

const ADMIN_ROLE: &str = "Administrator";

/// A demo project and the activity recorded against it.
struct DemoProject {
    name: &'static str,
    budget: Option<Decimal>,
    categorized: bool,
    costs: &'static [Decimal],
    payments: &'static [Decimal],
}

/// A funded project with a balance left (100000 + 20000 - 80000 = 40000)
/// and one with no budget and no activity, which reconciles to zero.
const DEMO_PROJECTS: [DemoProject; 2] = [
    DemoProject {
        name: "Demo: Office fit-out",
        budget: Some(dec!(100000)),
        categorized: true,
        costs: &[dec!(8000), dec!(12000)],
        payments: &[dec!(50000), dec!(30000)],
    },
    DemoProject {
        name: "Demo: Site survey",
        budget: None,
        categorized: false,
        costs: &[],
        payments: &[],
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    println!("Connecting to database...");
    let db = tally_db::connect(&config.database).await?;

    println!("Seeding permissions...");
    seed_permissions(&db).await;

    println!("Seeding notification types...");
    seed_notification_types(&db).await;

    println!("Seeding categories...");
    seed_categories(&db).await;

    println!("Seeding administrator role...");
    seed_admin_role(&db).await?;

    println!("Seeding demo projects...");
    seed_demo_projects(&db).await?;

    println!("Seeding complete!");
    Ok(())
}

/// Seeds one permission per screen and permission type.
async fn seed_permissions(db: &DatabaseConnection) {
    let mut inserted = 0;
    for screen in SCREENS {
        for permission_type in PermissionType::iter() {
            let permission = permissions::ActiveModel {
                id: Set(PermissionId::new().into_inner()),
                screen_id: Set(screen.to_string()),
                permission_type: Set(permission_type),
                created_at: Set(Utc::now().into()),
            };

            if let Err(e) = permission.insert(db).await {
                // Ignore duplicate key errors (permission already exists)
                if !e.to_string().contains("duplicate key") {
                    eprintln!("Failed to insert permission {screen}/{permission_type:?}: {e}");
                }
            } else {
                inserted += 1;
            }
        }
    }

    println!("  Inserted {inserted} permissions");
}

async fn seed_notification_types(db: &DatabaseConnection) {
    let mut inserted = 0;
    for name in NOTIFICATION_TYPES {
        let notification_type = notification_types::ActiveModel {
            id: Set(NotificationTypeId::new().into_inner()),
            name: Set(name.to_string()),
            created_at: Set(Utc::now().into()),
        };

        if let Err(e) = notification_type.insert(db).await {
            if !e.to_string().contains("duplicate key") {
                eprintln!("Failed to insert notification type {name}: {e}");
            }
        } else {
            inserted += 1;
        }
    }

    println!("  Inserted {inserted} notification types");
}

async fn seed_categories(db: &DatabaseConnection) {
    let mut inserted = 0;
    for name in CATEGORIES {
        let category = categories::ActiveModel {
            id: Set(CategoryId::new().into_inner()),
            name: Set(name.to_string()),
            created_at: Set(Utc::now().into()),
        };

        if let Err(e) = category.insert(db).await {
            if !e.to_string().contains("duplicate key") {
                eprintln!("Failed to insert category {name}: {e}");
            }
        } else {
            inserted += 1;
        }
    }

    println!("  Inserted {inserted} categories");
}

/// Seeds a role holding every permission and notification type.
async fn seed_admin_role(db: &DatabaseConnection) -> anyhow::Result<()> {
    let existing = roles::Entity::find()
        .filter(roles::Column::Name.eq(ADMIN_ROLE))
        .one(db)
        .await?;
    if existing.is_some() {
        println!("  Administrator role already exists, skipping...");
        return Ok(());
    }

    let permission_ids = permissions::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|p| PermissionId::from_uuid(p.id))
        .collect();
    let notification_type_ids = notification_types::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|n| NotificationTypeId::from_uuid(n.id))
        .collect();

    let saved = RoleRepository::new(db.clone())
        .create_role(CreateRoleInput {
            name: ADMIN_ROLE.to_string(),
            notifications_scope: NotificationsScope::All,
            permission_ids,
            notification_type_ids,
        })
        .await?;

    println!(
        "  Created {ADMIN_ROLE} role with {} permissions",
        saved.permissions.map_or(0, |report| report.added.len())
    );
    Ok(())
}

async fn seed_demo_projects(db: &DatabaseConnection) -> anyhow::Result<()> {
    let category_ids: Vec<CategoryId> = categories::Entity::find()
        .filter(categories::Column::Name.eq("Renovation"))
        .all(db)
        .await?
        .into_iter()
        .map(|c| CategoryId::from_uuid(c.id))
        .collect();

    for demo in &DEMO_PROJECTS {
        let category_ids = if demo.categorized {
            category_ids.as_slice()
        } else {
            &[]
        };
        seed_demo_project(db, demo, category_ids).await?;
    }
    Ok(())
}

async fn seed_demo_project(
    db: &DatabaseConnection,
    demo: &DemoProject,
    category_ids: &[CategoryId],
) -> anyhow::Result<()> {
    let name = demo.name;
    let existing = projects::Entity::find()
        .filter(projects::Column::Name.eq(name))
        .one(db)
        .await?;
    if existing.is_some() {
        println!("  {name} already exists, skipping...");
        return Ok(());
    }

    let saved = ProjectRepository::new(db.clone())
        .create_project(CreateProjectInput {
            name: name.to_string(),
            budget: demo.budget,
            category_ids: category_ids.to_vec(),
        })
        .await?;
    let project_id = ProjectId::from_uuid(saved.project.id);

    let mut remaining = saved
        .reconciliation
        .map_or(Decimal::ZERO, |r| r.breakdown.remaining);

    let additions = AdditionRepository::new(db.clone());
    for cost in demo.costs {
        let change = additions
            .create_addition(CreateAdditionInput {
                project_id,
                description: Some("Change order".to_string()),
                cost: *cost,
            })
            .await?;
        remaining = change.reconciliation.breakdown.remaining;
    }

    let payments = PaymentRepository::new(db.clone());
    for amount in demo.payments {
        let change = payments
            .create_payment(CreatePaymentInput {
                project_id,
                amount_paid: *amount,
                payment_date: Some(Utc::now().date_naive()),
            })
            .await?;
        remaining = change.reconciliation.breakdown.remaining;
    }

    println!("  Created {name} (remaining {remaining})");
    Ok(())
}
