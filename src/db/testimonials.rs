//! Testimonial queries. Public reads see approved testimonials only.

use anyhow::Result;

use super::{Database, TestimonialRow};

const TESTIMONIAL_COLUMNS: &str =
    "id, author_name, quote, rating, project_id, approved, created_at";

impl Database {
    /// Submit a testimonial. Ratings clamp to 1..=5; entries start
    /// unapproved until an admin reviews them.
    pub async fn create_testimonial(
        &self,
        author_name: &str,
        quote: &str,
        rating: i32,
        project_id: Option<i64>,
    ) -> Result<TestimonialRow> {
        let row = sqlx::query_as::<_, TestimonialRow>(&format!(
            "INSERT INTO testimonials (author_name, quote, rating, project_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {TESTIMONIAL_COLUMNS}"
        ))
        .bind(author_name)
        .bind(quote)
        .bind(rating.clamp(1, 5))
        .bind(project_id)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn get_testimonials(&self, approved_only: bool) -> Result<Vec<TestimonialRow>> {
        let rows = if approved_only {
            sqlx::query_as::<_, TestimonialRow>(&format!(
                "SELECT {TESTIMONIAL_COLUMNS} FROM testimonials
                 WHERE approved ORDER BY created_at DESC"
            ))
            .fetch_all(self.pool())
            .await?
        } else {
            sqlx::query_as::<_, TestimonialRow>(&format!(
                "SELECT {TESTIMONIAL_COLUMNS} FROM testimonials ORDER BY created_at DESC"
            ))
            .fetch_all(self.pool())
            .await?
        };
        Ok(rows)
    }

    pub async fn set_testimonial_approved(
        &self,
        testimonial_id: i64,
        approved: bool,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE testimonials SET approved = $2 WHERE id = $1")
            .bind(testimonial_id)
            .bind(approved)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_testimonial(&self, testimonial_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM testimonials WHERE id = $1")
            .bind(testimonial_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
