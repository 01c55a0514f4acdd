//! Article queries. Slugs are unique; public reads see published articles.

use anyhow::Result;

use super::{ArticleRow, Database};

const ARTICLE_COLUMNS: &str =
    "id, title, slug, body, published, published_at, created_at, updated_at";

/// Lowercase, hyphenate, strip everything that isn't alphanumeric.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut prev_hyphen = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            prev_hyphen = false;
        } else if !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

impl Database {
    pub async fn create_article(
        &self,
        title: &str,
        body: &str,
        published: bool,
    ) -> Result<ArticleRow> {
        let slug = slugify(title);
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "INSERT INTO articles (title, slug, body, published, published_at)
             VALUES ($1, $2, $3, $4, CASE WHEN $4 THEN NOW() END)
             RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(title)
        .bind(&slug)
        .bind(body)
        .bind(published)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn get_articles(&self, published_only: bool) -> Result<Vec<ArticleRow>> {
        let rows = if published_only {
            sqlx::query_as::<_, ArticleRow>(&format!(
                "SELECT {ARTICLE_COLUMNS} FROM articles
                 WHERE published ORDER BY published_at DESC NULLS LAST"
            ))
            .fetch_all(self.pool())
            .await?
        } else {
            sqlx::query_as::<_, ArticleRow>(&format!(
                "SELECT {ARTICLE_COLUMNS} FROM articles ORDER BY created_at DESC"
            ))
            .fetch_all(self.pool())
            .await?
        };
        Ok(rows)
    }

    pub async fn get_article_by_slug(&self, slug: &str) -> Result<Option<ArticleRow>> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn delete_article(&self, article_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(article_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Pouring the Foundation"), "pouring-the-foundation");
        assert_eq!(slugify("Q3 Site Report: Phase 2!"), "q3-site-report-phase-2");
    }

    #[test]
    fn slugify_collapses_separators_and_trims() {
        assert_eq!(slugify("  -- Roof // Deck --  "), "roof-deck");
        assert_eq!(slugify("!!!"), "");
    }
}
