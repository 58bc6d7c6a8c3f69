use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use roadmaps::config::Config;
use roadmaps::db::Database;
use roadmaps::models::*;
use roadmaps::{tree_render, RoadmapResult};

#[derive(Parser)]
#[command(name = "roadmap")]
#[command(about = "Plan roadmaps of ordered activities, milestones and timeboxes")]
struct Cli {
    /// Database file (overrides ROADMAP_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Employee id to act as (overrides ROADMAP_EMPLOYEE_ID)
    #[arg(long = "as", global = true)]
    as_employee: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a roadmap. The acting employee manages it unless --manager is given
    Create {
        name: String,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        public: bool,
        #[arg(long = "manager")]
        managers: Vec<Uuid>,
    },
    /// List roadmaps
    List {
        /// Only roadmaps the acting employee manages
        #[arg(long)]
        mine: bool,
    },
    /// Print a roadmap's item tree
    Show {
        roadmap: u32,
        /// Print the full aggregate as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Change roadmap fields. Omitted fields keep their current value
    Update {
        roadmap: u32,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        visibility: Option<String>,
        /// Replace the manager set (repeatable)
        #[arg(long = "manager")]
        managers: Vec<Uuid>,
    },
    /// Add a roadmap manager
    AddManager { roadmap: u32, manager: Uuid },
    /// Remove a roadmap manager
    RemoveManager { roadmap: u32, manager: Uuid },
    /// Add an activity
    AddActivity {
        roadmap: u32,
        #[command(flatten)]
        item: ItemArgs,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
    },
    /// Add a milestone
    AddMilestone {
        roadmap: u32,
        #[command(flatten)]
        item: ItemArgs,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Add a timebox
    AddTimebox {
        roadmap: u32,
        #[command(flatten)]
        item: ItemArgs,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
    },
    /// Move an activity under another parent (or to the root without --parent)
    Move {
        roadmap: u32,
        activity: Uuid,
        #[arg(long)]
        parent: Option<Uuid>,
        #[arg(long)]
        order: u32,
    },
    /// Change an activity's position among its siblings
    Reorder {
        roadmap: u32,
        activity: Uuid,
        order: u32,
    },
    /// Delete an item; activities take their whole subtree with them
    Delete { roadmap: u32, item: Uuid },
}

#[derive(Args)]
struct ItemArgs {
    name: String,
    #[arg(long)]
    parent: Option<Uuid>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    color: Option<String>,
}

/// Initialize tracing on stderr so stdout only carries command output
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "roadmaps=info,roadmap_core=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load a roadmap by key, apply one aggregate operation and save it against
/// the loaded version.
fn mutate<T>(
    db: &Database,
    key: u32,
    op: impl FnOnce(&mut Roadmap) -> RoadmapResult<T>,
) -> Result<T> {
    let mut loaded = db
        .get_roadmap_by_key(key)?
        .ok_or_else(|| anyhow::anyhow!("Roadmap {} not found", key))?;

    let result = op(&mut loaded.roadmap)?;
    db.save_roadmap(&loaded.roadmap, Some(loaded.version))?;
    Ok(result)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::from_env()?.with_overrides(cli.db, cli.as_employee);
    let db = config.open_database()?;

    match cli.command {
        Commands::Create {
            name,
            start,
            end,
            description,
            public,
            managers,
        } => {
            let manager_ids = if managers.is_empty() {
                vec![config.employee()?]
            } else {
                managers
            };
            let input = UpsertRoadmapInput {
                name,
                description,
                date_range: DateRange::new(start, end)?,
                visibility: if public {
                    Visibility::Public
                } else {
                    Visibility::Private
                },
                manager_ids,
            };
            let roadmap = Roadmap::create(db.next_roadmap_key()?, &input)?;
            db.save_roadmap(&roadmap, None)?;
            println!("Created roadmap {} ({})", roadmap.key(), roadmap.id());
        }
        Commands::List { mine } => {
            let roadmaps = if mine {
                db.list_managed_roadmaps(config.employee()?)?
            } else {
                db.list_roadmaps()?
            };
            for summary in roadmaps {
                println!(
                    "{:>5}  {:<8} {}",
                    summary.key,
                    summary.visibility.as_str(),
                    summary.name
                );
            }
        }
        Commands::Show { roadmap, json } => {
            let loaded = db
                .get_roadmap_by_key(roadmap)?
                .ok_or_else(|| anyhow::anyhow!("Roadmap {} not found", roadmap))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&loaded.roadmap)?);
            } else {
                println!("{} (version {})", loaded.roadmap.name(), loaded.version);
                print!("{}", tree_render::render_tree(&loaded.roadmap.tree()));
            }
        }
        Commands::Update {
            roadmap,
            name,
            start,
            end,
            description,
            visibility,
            managers,
        } => {
            let employee = config.employee()?;
            let visibility = visibility
                .map(|v| {
                    Visibility::from_str(&v)
                        .ok_or_else(|| anyhow::anyhow!("Unknown visibility: {}", v))
                })
                .transpose()?;
            mutate(&db, roadmap, |r| {
                let date_range = DateRange::new(
                    start.unwrap_or(r.date_range().start()),
                    end.unwrap_or(r.date_range().end()),
                )?;
                let input = UpsertRoadmapInput {
                    name: name.unwrap_or_else(|| r.name().to_string()),
                    description: description.or_else(|| r.description().map(str::to_string)),
                    date_range,
                    visibility: visibility.unwrap_or(r.visibility()),
                    manager_ids: if managers.is_empty() {
                        r.managers().iter().map(|m| m.manager_id).collect()
                    } else {
                        managers
                    },
                };
                r.update(&input, employee)
            })?;
            println!("Updated roadmap {}", roadmap);
        }
        Commands::AddManager { roadmap, manager } => {
            let employee = config.employee()?;
            mutate(&db, roadmap, |r| r.add_manager(manager, employee))?;
            println!("Added manager {}", manager);
        }
        Commands::RemoveManager { roadmap, manager } => {
            let employee = config.employee()?;
            mutate(&db, roadmap, |r| r.remove_manager(manager, employee))?;
            println!("Removed manager {}", manager);
        }
        Commands::AddActivity {
            roadmap,
            item,
            start,
            end,
        } => {
            let employee = config.employee()?;
            let input = UpsertActivityInput {
                parent_id: item.parent,
                name: item.name,
                description: item.description,
                color: item.color,
                date_range: DateRange::new(start, end)?,
            };
            let created = mutate(&db, roadmap, |r| r.create_activity(input, employee))?;
            println!("Created activity {}", created.id());
        }
        Commands::AddMilestone {
            roadmap,
            item,
            date,
        } => {
            let employee = config.employee()?;
            let input = UpsertMilestoneInput {
                parent_id: item.parent,
                name: item.name,
                description: item.description,
                color: item.color,
                date,
            };
            let created = mutate(&db, roadmap, |r| r.create_milestone(input, employee))?;
            println!("Created milestone {}", created.id());
        }
        Commands::AddTimebox {
            roadmap,
            item,
            start,
            end,
        } => {
            let employee = config.employee()?;
            let input = UpsertTimeboxInput {
                parent_id: item.parent,
                name: item.name,
                description: item.description,
                color: item.color,
                date_range: DateRange::new(start, end)?,
            };
            let created = mutate(&db, roadmap, |r| r.create_timebox(input, employee))?;
            println!("Created timebox {}", created.id());
        }
        Commands::Move {
            roadmap,
            activity,
            parent,
            order,
        } => {
            let employee = config.employee()?;
            mutate(&db, roadmap, |r| r.move_activity(activity, parent, order, employee))?;
            println!("Moved activity {}", activity);
        }
        Commands::Reorder {
            roadmap,
            activity,
            order,
        } => {
            let employee = config.employee()?;
            mutate(&db, roadmap, |r| r.set_activity_order(activity, order, employee))?;
            println!("Activity {} is now at position {}", activity, order);
        }
        Commands::Delete { roadmap, item } => {
            let employee = config.employee()?;
            let removed = mutate(&db, roadmap, |r| r.delete_item(item, employee))?;
            println!("Deleted {} item(s)", removed.len());
        }
    }

    Ok(())
}
