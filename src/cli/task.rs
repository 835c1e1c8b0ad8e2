//! Task subcommand implementations: add, list, complete, remove,
//! reassign, users, categories.
//!
//! The store reports domain refusals (missing task, wrong owner, repeat
//! completion) as `false`; these commands translate that into an
//! `OperationFailed` error so scripts get a non-zero exit.

use serde::Serialize;

use super::Context;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::task::Task;
use crate::user::{non_empty, User};

fn options(ctx: &Context) -> OutputOptions {
    OutputOptions {
        json: ctx.json,
        quiet: ctx.quiet,
    }
}

fn acting_user(ctx: &Context) -> Result<&str> {
    non_empty(ctx.user.as_deref()).ok_or_else(|| {
        Error::InvalidArgument("no acting user (set --user or COTASK_USER)".to_string())
    })
}

fn attach_save_warning(ctx: &Context, human: &mut HumanOutput) {
    if let Some(warning) = ctx.store.take_save_warning() {
        human.push_warning(warning);
    }
}

pub fn run_add(
    ctx: &Context,
    description: &str,
    category: Option<&str>,
    assignee: Option<&str>,
) -> Result<()> {
    let assignee = match non_empty(assignee) {
        Some(name) => name,
        None => acting_user(ctx)?,
    };
    let category = non_empty(category).unwrap_or(&ctx.config.tasks.default_category);

    let task = ctx.store.add_task(description, Some(category), assignee)?;

    let mut human = HumanOutput::new(format!("Added task {}", task.id));
    human.push_summary("description", task.description.clone());
    human.push_summary("category", task.category.clone());
    human.push_summary("assignee", task.assigned_user.clone());
    attach_save_warning(ctx, &mut human);

    emit_success(options(ctx), "add", &task, Some(&human))
}

#[derive(Serialize)]
struct ListReport {
    count: usize,
    tasks: Vec<Task>,
}

pub fn run_list(
    ctx: &Context,
    assignee: Option<&str>,
    category: Option<&str>,
    pending: bool,
) -> Result<()> {
    let mut tasks = match (non_empty(assignee), pending) {
        (Some(name), true) => ctx.store.incomplete_tasks_by_user(name),
        (Some(name), false) => ctx.store.user_tasks(name),
        (None, true) => ctx.store.incomplete_tasks(),
        (None, false) => ctx.store.all_tasks(),
    };
    if let Some(category) = non_empty(category) {
        let wanted = category.to_lowercase();
        tasks.retain(|task| task.category.trim().to_lowercase() == wanted);
    }

    let report = ListReport {
        count: tasks.len(),
        tasks,
    };

    let mut human = HumanOutput::new(format!(
        "{} task{}",
        report.count,
        if report.count == 1 { "" } else { "s" }
    ));
    for task in &report.tasks {
        human.push_detail(task.to_string());
    }

    emit_success(options(ctx), "list", &report, Some(&human))
}

#[derive(Serialize)]
struct MutationReport {
    id: u64,
    changed: bool,
}

pub fn run_complete(ctx: &Context, id: u64) -> Result<()> {
    let user = acting_user(ctx)?;
    if !ctx.store.mark_task_completed(id, user) {
        return Err(Error::OperationFailed(format!(
            "task {id} was not completed (missing, already completed, or assigned to someone else)"
        )));
    }

    let report = MutationReport { id, changed: true };
    let mut human = HumanOutput::new(format!("Completed task {id}"));
    attach_save_warning(ctx, &mut human);
    emit_success(options(ctx), "complete", &report, Some(&human))
}

pub fn run_remove(ctx: &Context, id: u64) -> Result<()> {
    if !ctx.store.remove_task(id) {
        return Err(Error::OperationFailed(format!("no task with id {id}")));
    }

    let report = MutationReport { id, changed: true };
    let mut human = HumanOutput::new(format!("Removed task {id}"));
    attach_save_warning(ctx, &mut human);
    emit_success(options(ctx), "remove", &report, Some(&human))
}

pub fn run_reassign(ctx: &Context, id: u64, from: Option<&str>, to: &str) -> Result<()> {
    if non_empty(Some(to)).is_none() {
        return Err(Error::InvalidArgument(
            "reassign target must not be empty".to_string(),
        ));
    }
    if !ctx.store.reassign_task(id, from, to) {
        return Err(Error::OperationFailed(format!(
            "task {id} was not reassigned (missing or assigned to someone else)"
        )));
    }

    let report = MutationReport { id, changed: true };
    let mut human = HumanOutput::new(format!("Reassigned task {id}"));
    human.push_summary("to", to.trim());
    attach_save_warning(ctx, &mut human);
    emit_success(options(ctx), "reassign", &report, Some(&human))
}

#[derive(Serialize)]
struct UsersReport {
    count: usize,
    users: Vec<User>,
}

pub fn run_users(ctx: &Context) -> Result<()> {
    let users = ctx.store.users();
    let report = UsersReport {
        count: users.len(),
        users,
    };

    let mut human = HumanOutput::new(format!(
        "{} user{}",
        report.count,
        if report.count == 1 { "" } else { "s" }
    ));
    for user in &report.users {
        human.push_detail(format!(
            "{} (since {})",
            user.username,
            user.created_at.format("%Y-%m-%d")
        ));
    }

    emit_success(options(ctx), "users", &report, Some(&human))
}

#[derive(Serialize)]
struct CategoriesReport {
    count: usize,
    categories: Vec<String>,
}

pub fn run_categories(ctx: &Context) -> Result<()> {
    let categories: Vec<String> = ctx.store.categories().into_iter().collect();
    let report = CategoriesReport {
        count: categories.len(),
        categories,
    };

    let mut human = HumanOutput::new(format!(
        "{} categor{}",
        report.count,
        if report.count == 1 { "y" } else { "ies" }
    ));
    for category in &report.categories {
        human.push_detail(category.clone());
    }

    emit_success(options(ctx), "categories", &report, Some(&human))
}
