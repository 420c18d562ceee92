//! `list`: roster overview.

use anyhow::{Context, Result};

use crate::cli::display::{flag, list_table, print_json, render_list, truncate_ellipsis};
use crate::cli::AppContext;

pub async fn execute(context: AppContext, json_mode: bool) -> Result<()> {
    let rows = context
        .views()
        .list()
        .await
        .context("Failed to load students")?;

    if json_mode {
        return print_json(&rows);
    }

    let mut table = list_table(&["name", "repo", "scores", "avg", "commits", "badges", "updated"]);
    for row in &rows {
        let scores = row
            .scores
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join("/");
        table.add_row(vec![
            row.name.clone(),
            truncate_ellipsis(&row.repo, 48),
            scores,
            format!("{:.1}", row.avg_score),
            row.commits_count.to_string(),
            row.badges.len().to_string(),
            flag(row.updated_since_view).to_string(),
        ]);
    }
    println!("{}", render_list("student", &table, rows.len()));
    Ok(())
}
