//! `check`: one reconciliation pass.

use anyhow::{Context, Result};

use crate::cli::display::{flag, list_table, or_dash, print_json, render_list};
use crate::cli::AppContext;

pub async fn execute(context: AppContext, json_mode: bool) -> Result<()> {
    let reconciler = context.reconciler();
    let state = reconciler
        .check_all()
        .await
        .context("Reconciliation pass failed")?;

    if json_mode {
        return print_json(&state);
    }

    let mut table = list_table(&["name", "last push", "commits", "updated"]);
    for (name, entry) in &state {
        table.add_row(vec![
            name.clone(),
            or_dash(entry.last_known_pushed_at.as_deref()),
            entry
                .commits_count
                .map_or_else(|| "-".to_string(), |c| c.to_string()),
            flag(entry.updated_since_view()).to_string(),
        ]);
    }
    println!("{}", render_list("student", &table, state.len()));
    Ok(())
}
