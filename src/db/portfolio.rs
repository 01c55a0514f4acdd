//! Portfolio entry queries. Public reads see published entries only.

use anyhow::Result;

use super::{Database, PortfolioRow};

const PORTFOLIO_COLUMNS: &str =
    "id, title, summary, image_url, project_id, published, created_at";

impl Database {
    pub async fn create_portfolio_entry(
        &self,
        title: &str,
        summary: Option<&str>,
        image_url: Option<&str>,
        project_id: Option<i64>,
        published: bool,
    ) -> Result<PortfolioRow> {
        let row = sqlx::query_as::<_, PortfolioRow>(&format!(
            "INSERT INTO portfolio_entries (title, summary, image_url, project_id, published)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {PORTFOLIO_COLUMNS}"
        ))
        .bind(title)
        .bind(summary)
        .bind(image_url)
        .bind(project_id)
        .bind(published)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    /// List entries. `published_only` is set for unauthenticated reads.
    pub async fn get_portfolio_entries(&self, published_only: bool) -> Result<Vec<PortfolioRow>> {
        let rows = if published_only {
            sqlx::query_as::<_, PortfolioRow>(&format!(
                "SELECT {PORTFOLIO_COLUMNS} FROM portfolio_entries
                 WHERE published ORDER BY created_at DESC"
            ))
            .fetch_all(self.pool())
            .await?
        } else {
            sqlx::query_as::<_, PortfolioRow>(&format!(
                "SELECT {PORTFOLIO_COLUMNS} FROM portfolio_entries ORDER BY created_at DESC"
            ))
            .fetch_all(self.pool())
            .await?
        };
        Ok(rows)
    }

    pub async fn set_portfolio_published(&self, entry_id: i64, published: bool) -> Result<bool> {
        let result =
            sqlx::query("UPDATE portfolio_entries SET published = $2 WHERE id = $1")
                .bind(entry_id)
                .bind(published)
                .execute(self.pool())
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_portfolio_entry(&self, entry_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM portfolio_entries WHERE id = $1")
            .bind(entry_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
