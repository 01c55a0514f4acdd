//! Material-expense queries — per-project purchase log with cost totals.

use anyhow::Result;

use super::{Database, ExpenseRow};

const EXPENSE_COLUMNS: &str = "id, project_id, material, quantity, unit, unit_cost, total_cost,
                               purchased_at, created_by, created_at";

impl Database {
    /// Record a material purchase. `total_cost` is computed here rather than
    /// trusted from the caller.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_expense(
        &self,
        project_id: i64,
        material: &str,
        quantity: f64,
        unit: Option<&str>,
        unit_cost: f64,
        purchased_at: Option<chrono::NaiveDate>,
        created_by: Option<uuid::Uuid>,
    ) -> Result<ExpenseRow> {
        let row = sqlx::query_as::<_, ExpenseRow>(&format!(
            "INSERT INTO expenses (project_id, material, quantity, unit, unit_cost, total_cost,
                                   purchased_at, created_by)
             VALUES ($1, $2, $3, $4, $5, $3 * $5, $6, $7)
             RETURNING {EXPENSE_COLUMNS}"
        ))
        .bind(project_id)
        .bind(material)
        .bind(quantity)
        .bind(unit)
        .bind(unit_cost)
        .bind(purchased_at)
        .bind(created_by)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    /// All expenses for a project, newest purchase first.
    pub async fn get_expenses(&self, project_id: i64) -> Result<Vec<ExpenseRow>> {
        let rows = sqlx::query_as::<_, ExpenseRow>(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses
             WHERE project_id = $1
             ORDER BY purchased_at DESC NULLS LAST, id DESC"
        ))
        .bind(project_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Summed material cost for a project.
    pub async fn expense_total(&self, project_id: i64) -> Result<f64> {
        let total = sqlx::query_scalar::<_, f64>(
            "SELECT COALESCE(SUM(total_cost), 0)::FLOAT8 FROM expenses WHERE project_id = $1",
        )
        .bind(project_id)
        .fetch_one(self.pool())
        .await?;
        Ok(total)
    }

    /// Delete an expense entry.
    pub async fn delete_expense(&self, expense_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(expense_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
