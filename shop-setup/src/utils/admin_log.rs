//! Admin change log: writes the statements issued from the admin area to `log/admin.log`.

use anyhow::{Context, Result};
use log::debug;
use std::fs::OpenOptions;
use std::io::Write;

use crate::context::ShopContext;

const UNKNOWN_USER: &str = "-";

pub struct AdminQueryLogger<'a> {
    ctx: &'a ShopContext,
}

impl<'a> AdminQueryLogger<'a> {
    pub fn new(ctx: &'a ShopContext) -> Self {
        Self { ctx }
    }

    /// Append `query` to the admin log. Returns `false` when logging is off or the query is skipped.
    pub fn log_query(&self, query: &str) -> Result<bool> {
        if !self.ctx.is_admin_query_log_enabled() {
            return Ok(false);
        }
        let tags = self.ctx.skip_log_tags()?;
        if should_skip(query, &tags) {
            debug!("[PHASE: admin] [STEP: query_log] Query skipped by tag");
            return Ok(false);
        }

        let user = self
            .ctx
            .admin_user_id()
            .unwrap_or_else(|_| UNKNOWN_USER.to_string());
        let line = format_entry(
            &chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            &user,
            query,
        );

        let path = self.ctx.admin_log_file_path();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create admin log folder: {:?}", dir))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open admin log: {:?}", path))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("Failed to write admin log: {:?}", path))?;
        Ok(true)
    }
}

/// Case-insensitive substring match against the configured skip tags.
pub fn should_skip(query: &str, tags: &[String]) -> bool {
    let query = query.to_lowercase();
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .any(|t| query.contains(&t.to_lowercase()))
}

pub fn format_entry(timestamp: &str, user: &str, query: &str) -> String {
    let query = query.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("[{}] [{}] {}\n", timestamp, user, query)
}
