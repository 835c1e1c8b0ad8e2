//! cotask demo command: run N scripted sessions concurrently against
//! one shared store and report what each one saw.

use std::sync::Arc;

use serde::Serialize;

use super::Context;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::session::{run_concurrent_sessions, SessionReport};

#[derive(Serialize)]
struct DemoReport {
    sessions: usize,
    tasks_per_session: usize,
    total_tasks: usize,
    reports: Vec<SessionReport>,
}

pub fn run(ctx: &Context, sessions: Option<usize>, tasks_per_session: Option<usize>) -> Result<()> {
    let sessions = sessions.unwrap_or(ctx.config.demo.sessions).max(1);
    let tasks_per_session = tasks_per_session
        .unwrap_or(ctx.config.demo.tasks_per_session)
        .max(1);

    let usernames: Vec<String> = (1..=sessions).map(|n| format!("user{n}")).collect();
    let reports = run_concurrent_sessions(Arc::clone(&ctx.store), &usernames, tasks_per_session)?;

    let report = DemoReport {
        sessions,
        tasks_per_session,
        total_tasks: ctx.store.all_tasks().len(),
        reports,
    };

    let mut human = HumanOutput::new(format!(
        "Ran {} concurrent session{}",
        report.sessions,
        if report.sessions == 1 { "" } else { "s" }
    ));
    human.push_summary("tasks per session", report.tasks_per_session.to_string());
    human.push_summary("tasks in store", report.total_tasks.to_string());
    for session in &report.reports {
        human.push_detail(format!(
            "{}: added {:?}, completed {}, saw {} tasks",
            session.username,
            session.added,
            session.completed.len(),
            session.visible
        ));
    }

    emit_success(
        OutputOptions {
            json: ctx.json,
            quiet: ctx.quiet,
        },
        "demo",
        &report,
        Some(&human),
    )
}
