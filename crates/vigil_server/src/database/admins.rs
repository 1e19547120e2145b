//! Group and admin queries for the roster reload.

use sqlx::{Row, SqlitePool};

use crate::backend::{AdminRow, BackendError, GroupRow};

/// Phase one: the group table. Empty names are filtered later, during the
/// merge.
pub async fn fetch_groups(pool: &SqlitePool, prefix: &str) -> Result<Vec<GroupRow>, BackendError> {
    let rows = sqlx::query(&format!("SELECT name, flags, immunity FROM {prefix}_groups"))
        .fetch_all(pool)
        .await
        .map_err(|e| BackendError(format!("Failed to fetch admin groups: {}", e)))?;

    Ok(rows
        .into_iter()
        .map(|row| GroupRow {
            name: row.get("name"),
            flags: row.get("flags"),
            immunity: row.get("immunity"),
        })
        .collect())
}

/// Phase two: admins assigned to this server directly or through any server
/// group the server belongs to. `require_site_login` restricts the result to
/// accounts that have visited the web panel at least once.
pub async fn fetch_admins(
    pool: &SqlitePool,
    prefix: &str,
    server_id: i64,
    require_site_login: bool,
) -> Result<Vec<AdminRow>, BackendError> {
    let login_filter = if require_site_login {
        " AND a.last_visit IS NOT NULL"
    } else {
        ""
    };

    let rows = sqlx::query(&format!(
        "SELECT DISTINCT a.identity, a.flags, a.immunity, a.group_name
           FROM {prefix}_admins a
           JOIN {prefix}_admin_servers s ON s.admin_id = a.id
          WHERE (s.server_id = ?1 OR s.server_group_id IN (
                    SELECT server_group_id FROM {prefix}_server_groups WHERE server_id = ?1)){login_filter}"
    ))
    .bind(server_id)
    .fetch_all(pool)
    .await
    .map_err(|e| BackendError(format!("Failed to fetch admins: {}", e)))?;

    Ok(rows
        .into_iter()
        .map(|row| AdminRow {
            identity: row.get("identity"),
            flags: row.get("flags"),
            immunity: row.get("immunity"),
            group_name: row.get("group_name"),
        })
        .collect())
}
