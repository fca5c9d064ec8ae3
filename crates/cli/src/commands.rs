use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::Subcommand;
use db::{
    models::{
        brand::normalize_hex_color,
        project::{CreateProject, UpdateOverview},
        risk::CreateRisk,
        work_order::CreateWorkOrder,
    },
    types::{RiskSeverity, StatusMilestone, TaskColumn, WorkOrderStatus},
};
use services::services::{
    attachment::{CompressionOptions, normalize_file},
    config::Config,
    dashboard::{DashboardStats, ProjectSummary, partition_by_completion},
    project_sync::{AlwaysConfirm, ConfirmDeletion, ProjectSyncClient},
};

use crate::{EventflowError, prompt::StdinConfirm};

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(flatten)]
    Offline(OfflineCommand),
    #[command(flatten)]
    Store(StoreCommand),
}

/// Commands that never touch the store.
#[derive(Subcommand, Debug)]
pub enum OfflineCommand {
    /// Turn a file into an inline data URI
    Compress {
        path: PathBuf,
        #[arg(long)]
        max_width: Option<u32>,
        #[arg(long)]
        quality: Option<f32>,
    },

    /// Normalize a hex color
    Color { input: String },
}

#[derive(Subcommand, Debug)]
pub enum StoreCommand {
    /// List projects, active first
    #[command(alias = "ls")]
    List,

    /// Create a project
    Create {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        client: String,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        next_step: String,
    },

    /// Print a project as JSON
    Show { id: String },

    /// Edit the overview: dates and next step
    Set {
        project: String,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long)]
        next_step: Option<String>,
    },

    /// Delete a project
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    #[command(subcommand)]
    Task(TaskCommand),

    #[command(subcommand)]
    Risk(RiskCommand),

    #[command(subcommand)]
    WorkOrder(WorkOrderCommand),

    #[command(subcommand)]
    Note(NoteCommand),

    #[command(subcommand)]
    Link(LinkCommand),

    /// Venue plans
    #[command(subcommand)]
    Venue(AssetCommand),

    /// Shared images
    #[command(subcommand)]
    Image(AssetCommand),

    #[command(subcommand)]
    Brand(BrandCommand),

    /// Toggle a status milestone (brief, design, produktion, leverans, klar)
    Status {
        project: String,
        milestone: StatusMilestone,
    },

    /// Dashboard totals
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Add a task
    Add {
        project: String,
        text: String,
        #[arg(long, default_value = "todo")]
        column: TaskColumn,
    },
    /// Move a task between columns (todo, inProgress, done)
    Move {
        project: String,
        task: String,
        from: TaskColumn,
        to: TaskColumn,
    },
    /// Delete a task
    Delete { project: String, task: String },
}

#[derive(Subcommand, Debug)]
pub enum RiskCommand {
    /// Add a risk (severity: låg, medel, hög)
    Add {
        project: String,
        description: String,
        #[arg(long, default_value = "medel")]
        severity: RiskSeverity,
        #[arg(long)]
        mitigation: Option<String>,
    },
    /// Delete a risk
    Delete { project: String, risk: String },
}

#[derive(Subcommand, Debug)]
pub enum WorkOrderCommand {
    /// Add a work order, optionally with a picture
    Add {
        project: String,
        title: String,
        #[arg(long)]
        material: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Set the status (planerad, pågående, klar)
    Status {
        project: String,
        order: String,
        status: WorkOrderStatus,
    },
    /// Replace the picture, or clear it when no file is given
    Image {
        project: String,
        order: String,
        path: Option<PathBuf>,
    },
    /// Delete a work order
    Delete { project: String, order: String },
}

#[derive(Subcommand, Debug)]
pub enum NoteCommand {
    /// Add a note
    Add { project: String, text: String },
    /// Delete a note
    Delete { project: String, note: String },
}

#[derive(Subcommand, Debug)]
pub enum LinkCommand {
    /// Add a link
    Add {
        project: String,
        title: String,
        url: String,
    },
    /// Delete a link
    Delete { project: String, link: String },
}

#[derive(Subcommand, Debug)]
pub enum AssetCommand {
    /// Upload a file
    Add { project: String, path: PathBuf },
    /// Delete an uploaded file
    Delete { project: String, asset: String },
}

#[derive(Subcommand, Debug)]
pub enum BrandCommand {
    /// Add a brand color
    Color { project: String, color: String },
    /// Remove a brand color
    RemoveColor { project: String, color: String },
    /// Upload a logo
    Logo { project: String, path: PathBuf },
    /// Remove the logo at a position
    RemoveLogo { project: String, index: usize },
    /// Upload a reference image
    Reference { project: String, path: PathBuf },
    /// Remove the reference image at a position
    RemoveReference { project: String, index: usize },
}

fn compression(config: &Config, max_width: Option<u32>, quality: Option<f32>) -> CompressionOptions {
    let mut attachments = config.attachments.clone();
    if let Some(max_width) = max_width {
        attachments.max_width = max_width;
    }
    if let Some(quality) = quality {
        attachments.quality = quality;
    }
    let normalized = Config {
        attachments,
        ..Config::default()
    }
    .normalized();
    CompressionOptions::from(&normalized.attachments)
}

async fn attachment(
    path: &Path,
    options: CompressionOptions,
) -> Result<String, EventflowError> {
    Ok(normalize_file(path, options)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub async fn run_offline(command: OfflineCommand, config: &Config) -> Result<String, EventflowError> {
    match command {
        OfflineCommand::Color { input } => {
            Ok(normalize_hex_color(&input).map_err(anyhow::Error::from)?)
        }
        OfflineCommand::Compress {
            path,
            max_width,
            quality,
        } => attachment(&path, compression(config, max_width, quality)).await,
    }
}

fn summary_line(summary: &ProjectSummary) -> String {
    let critical = if summary.has_critical_risk {
        "  critical risk"
    } else {
        ""
    };
    format!(
        "{}  {} ({})  {} .. {}  [{}]  {}/{} tasks{critical}",
        summary.id,
        summary.name,
        summary.client,
        summary.start_date,
        summary.end_date,
        summary.badge,
        summary.tasks_done,
        summary.tasks_total,
    )
}

fn render_stats(stats: &DashboardStats) -> String {
    format!(
        "active projects: {}\ncompleted projects: {}\ntasks done: {}/{}\ncritical risks: {}",
        stats.active_projects,
        stats.completed_projects,
        stats.done_tasks,
        stats.total_tasks,
        stats.critical_risks
    )
}

pub async fn run(
    client: &ProjectSyncClient,
    config: &Config,
    command: StoreCommand,
) -> Result<String, EventflowError> {
    let uploads = compression(config, None, None);
    match command {
        StoreCommand::List => {
            let projects = client.projects().await;
            let (active, completed) = partition_by_completion(&projects);
            let mut out = String::new();
            for (title, group) in [("Active", active), ("Completed", completed)] {
                if group.is_empty() {
                    continue;
                }
                out.push_str(&format!("{title}:\n"));
                for project in group {
                    out.push_str(&format!("  {}\n", summary_line(&ProjectSummary::of(project))));
                }
            }
            if out.is_empty() {
                out.push_str("No projects");
            }
            Ok(out.trim_end().to_string())
        }
        StoreCommand::Create {
            name,
            client: customer,
            start,
            end,
            next_step,
        } => {
            let project = client
                .create(&CreateProject {
                    name,
                    client: customer,
                    start_date: start,
                    end_date: end,
                    next_step,
                    ..Default::default()
                })
                .await?;
            Ok(format!("Created project {}", project.id))
        }
        StoreCommand::Show { id } => {
            let project = client.open(&id).await?;
            Ok(serde_json::to_string_pretty(&project).map_err(anyhow::Error::from)?)
        }
        StoreCommand::Set {
            project,
            start,
            end,
            next_step,
        } => {
            client.open(&project).await?;
            client
                .edit(|p| {
                    p.update_overview(UpdateOverview {
                        start_date: start,
                        end_date: end,
                        next_step,
                    });
                    Ok(())
                })
                .await?;
            Ok(format!("Updated project {project}"))
        }
        StoreCommand::Delete { id, yes } => {
            let confirm: &dyn ConfirmDeletion = if yes { &AlwaysConfirm } else { &StdinConfirm };
            if client.delete(&id, confirm).await? {
                Ok(format!("Deleted project {id}"))
            } else {
                Ok("Cancelled".to_string())
            }
        }
        StoreCommand::Task(TaskCommand::Add {
            project,
            text,
            column,
        }) => {
            client.open(&project).await?;
            let task_id = client
                .edit(|p| Ok(p.add_task(column, text).id.clone()))
                .await?;
            Ok(format!("Added task {task_id} to {column}"))
        }
        StoreCommand::Task(TaskCommand::Move {
            project,
            task,
            from,
            to,
        }) => {
            client.open(&project).await?;
            client.edit(|p| p.move_task(&task, from, to)).await?;
            Ok(format!("Moved task {task} from {from} to {to}"))
        }
        StoreCommand::Task(TaskCommand::Delete { project, task }) => {
            client.open(&project).await?;
            let removed = client.edit(|p| p.delete_task(&task)).await?;
            Ok(format!("Deleted task {}", removed.text))
        }
        StoreCommand::Risk(RiskCommand::Add {
            project,
            description,
            severity,
            mitigation,
        }) => {
            client.open(&project).await?;
            let risk_id = client
                .edit(|p| {
                    Ok(p.add_risk(CreateRisk {
                        description,
                        severity,
                        mitigation,
                    })
                    .id
                    .clone())
                })
                .await?;
            Ok(format!("Added {severity} risk {risk_id}"))
        }
        StoreCommand::Risk(RiskCommand::Delete { project, risk }) => {
            client.open(&project).await?;
            let removed = client.edit(|p| p.remove_risk(&risk)).await?;
            Ok(format!("Deleted risk {}", removed.description))
        }
        StoreCommand::WorkOrder(WorkOrderCommand::Add {
            project,
            title,
            material,
            description,
            image,
        }) => {
            let image = match image {
                Some(path) => Some(attachment(&path, uploads).await?),
                None => None,
            };
            client.open(&project).await?;
            let order_id = client
                .edit(|p| {
                    Ok(p.add_work_order(CreateWorkOrder {
                        title,
                        material,
                        description,
                        image,
                    })
                    .id
                    .clone())
                })
                .await?;
            Ok(format!("Added work order {order_id}"))
        }
        StoreCommand::WorkOrder(WorkOrderCommand::Status {
            project,
            order,
            status,
        }) => {
            client.open(&project).await?;
            client
                .edit(|p| p.set_work_order_status(&order, status))
                .await?;
            Ok(format!("Work order {order} is {status}"))
        }
        StoreCommand::WorkOrder(WorkOrderCommand::Image {
            project,
            order,
            path,
        }) => {
            let image = match &path {
                Some(path) => Some(attachment(path, uploads).await?),
                None => None,
            };
            client.open(&project).await?;
            client
                .edit(|p| p.set_work_order_image(&order, image))
                .await?;
            Ok(match path {
                Some(path) => format!("Attached {} to work order {order}", path.display()),
                None => format!("Cleared image of work order {order}"),
            })
        }
        StoreCommand::WorkOrder(WorkOrderCommand::Delete { project, order }) => {
            client.open(&project).await?;
            let removed = client.edit(|p| p.remove_work_order(&order)).await?;
            Ok(format!("Deleted work order {}", removed.title))
        }
        StoreCommand::Note(NoteCommand::Add { project, text }) => {
            client.open(&project).await?;
            let note_id = client.edit(|p| Ok(p.add_note(text).id.clone())).await?;
            Ok(format!("Added note {note_id}"))
        }
        StoreCommand::Note(NoteCommand::Delete { project, note }) => {
            client.open(&project).await?;
            client.edit(|p| p.remove_note(&note)).await?;
            Ok(format!("Deleted note {note}"))
        }
        StoreCommand::Link(LinkCommand::Add {
            project,
            title,
            url,
        }) => {
            client.open(&project).await?;
            let link_id = client
                .edit(|p| Ok(p.add_link(title, url).id.clone()))
                .await?;
            Ok(format!("Added link {link_id}"))
        }
        StoreCommand::Link(LinkCommand::Delete { project, link }) => {
            client.open(&project).await?;
            let removed = client.edit(|p| p.remove_link(&link)).await?;
            Ok(format!("Deleted link {}", removed.title))
        }
        StoreCommand::Venue(AssetCommand::Add { project, path }) => {
            let data = attachment(&path, uploads).await?;
            client.open(&project).await?;
            let asset_id = client
                .edit(|p| Ok(p.add_venue(file_name(&path), data).id.clone()))
                .await?;
            Ok(format!("Added venue plan {asset_id}"))
        }
        StoreCommand::Venue(AssetCommand::Delete { project, asset }) => {
            client.open(&project).await?;
            let removed = client.edit(|p| p.remove_venue(&asset)).await?;
            Ok(format!("Deleted venue plan {}", removed.name))
        }
        StoreCommand::Image(AssetCommand::Add { project, path }) => {
            let data = attachment(&path, uploads).await?;
            client.open(&project).await?;
            let asset_id = client
                .edit(|p| Ok(p.add_shared_image(file_name(&path), data).id.clone()))
                .await?;
            Ok(format!("Attached {} as {asset_id}", path.display()))
        }
        StoreCommand::Image(AssetCommand::Delete { project, asset }) => {
            client.open(&project).await?;
            let removed = client.edit(|p| p.remove_shared_image(&asset)).await?;
            Ok(format!("Deleted image {}", removed.name))
        }
        StoreCommand::Brand(command) => brand(client, uploads, command).await,
        StoreCommand::Status { project, milestone } => {
            client.open(&project).await?;
            let checked = client.edit(|p| Ok(p.toggle_status(milestone))).await?;
            let state = if checked { "checked" } else { "unchecked" };
            Ok(format!("{milestone} {state}"))
        }
        StoreCommand::Stats => Ok(render_stats(&client.stats().await)),
    }
}

async fn brand(
    client: &ProjectSyncClient,
    uploads: CompressionOptions,
    command: BrandCommand,
) -> Result<String, EventflowError> {
    match command {
        BrandCommand::Color { project, color } => {
            client.open(&project).await?;
            let added = client
                .edit(|p| p.add_brand_color(&color).map(|c| c.to_string()))
                .await?;
            Ok(format!("Brand color {added}"))
        }
        BrandCommand::RemoveColor { project, color } => {
            client.open(&project).await?;
            if client.edit(|p| p.remove_brand_color(&color)).await? {
                Ok(format!("Removed brand color {color}"))
            } else {
                Ok(format!("Brand color {color} was not set"))
            }
        }
        BrandCommand::Logo { project, path } => {
            let data = attachment(&path, uploads).await?;
            client.open(&project).await?;
            let index = client.edit(|p| Ok(p.add_brand_logo(data))).await?;
            Ok(format!("Added logo #{index}"))
        }
        BrandCommand::RemoveLogo { project, index } => {
            client.open(&project).await?;
            client.edit(|p| p.remove_brand_logo(index)).await?;
            Ok(format!("Removed logo #{index}"))
        }
        BrandCommand::Reference { project, path } => {
            let data = attachment(&path, uploads).await?;
            client.open(&project).await?;
            let index = client.edit(|p| Ok(p.add_reference_image(data))).await?;
            Ok(format!("Added reference image #{index}"))
        }
        BrandCommand::RemoveReference { project, index } => {
            client.open(&project).await?;
            client.edit(|p| p.remove_reference_image(index)).await?;
            Ok(format!("Removed reference image #{index}"))
        }
    }
}
