//! Mask repository, including relation loading and user ownership

use std::collections::HashMap;

use super::models::{ExtraField, Feature, Mask, MaskDetails, MaskFields, Review, UserMask};
use super::Database;

const MASK_COLUMNS: &str = "id, name, description, image_url, price, instructions, created_at, updated_at";

/// Mask repository
pub struct MaskRepo<'a> {
    db: &'a Database,
}

impl<'a> MaskRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<MaskDetails>, sqlx::Error> {
        let sql = format!("SELECT {MASK_COLUMNS} FROM masks ORDER BY id");
        let masks = self
            .db
            .run(|| sqlx::query_as::<_, Mask>(&sql).fetch_all(self.db.pool()))
            .await?;
        self.with_relations(masks).await
    }

    pub async fn find(&self, id: i32) -> Result<Option<Mask>, sqlx::Error> {
        let sql = format!("SELECT {MASK_COLUMNS} FROM masks WHERE id = $1");
        self.db
            .run(|| sqlx::query_as::<_, Mask>(&sql).bind(id).fetch_optional(self.db.pool()))
            .await
    }

    pub async fn find_details(&self, id: i32) -> Result<Option<MaskDetails>, sqlx::Error> {
        let Some(mask) = self.find(id).await? else {
            return Ok(None);
        };
        Ok(self.with_relations(vec![mask]).await?.pop())
    }

    /// Masks owned by the user, with relations, in the order they were added.
    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<MaskDetails>, sqlx::Error> {
        let sql = r#"
            SELECT m.id, m.name, m.description, m.image_url, m.price, m.instructions, m.created_at, m.updated_at
            FROM masks m
            JOIN user_masks um ON um.mask_id = m.id
            WHERE um.user_id = $1
            ORDER BY um.created_at, um.id
        "#;
        let masks = self
            .db
            .run(|| sqlx::query_as::<_, Mask>(sql).bind(user_id).fetch_all(self.db.pool()))
            .await?;
        self.with_relations(masks).await
    }

    /// Idempotently links a mask to a user and returns the (single) link row.
    pub async fn add_to_user(&self, user_id: i32, mask_id: i32) -> Result<UserMask, sqlx::Error> {
        // DO NOTHING would return no row on conflict; the no-op update returns the existing one.
        let sql = r#"
            INSERT INTO user_masks (user_id, mask_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, mask_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id, user_id, mask_id, created_at
        "#;
        self.db
            .run(|| {
                sqlx::query_as::<_, UserMask>(sql)
                    .bind(user_id)
                    .bind(mask_id)
                    .fetch_one(self.db.pool())
            })
            .await
    }

    pub async fn create(&self, name: &str, fields: &MaskFields) -> Result<Mask, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO masks (name, description, image_url, price, instructions)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {MASK_COLUMNS}
            "#
        );
        self.db
            .run(|| {
                sqlx::query_as::<_, Mask>(&sql)
                    .bind(name)
                    .bind(fields.description.as_deref())
                    .bind(fields.image_url.as_deref())
                    .bind(fields.price)
                    .bind(fields.instructions.as_deref())
                    .fetch_one(self.db.pool())
            })
            .await
    }

    pub async fn update(&self, id: i32, fields: &MaskFields) -> Result<Option<Mask>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE masks SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                image_url = COALESCE($4, image_url),
                price = COALESCE($5, price),
                instructions = COALESCE($6, instructions),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {MASK_COLUMNS}
            "#
        );
        self.db
            .run(|| {
                sqlx::query_as::<_, Mask>(&sql)
                    .bind(id)
                    .bind(fields.name.as_deref())
                    .bind(fields.description.as_deref())
                    .bind(fields.image_url.as_deref())
                    .bind(fields.price)
                    .bind(fields.instructions.as_deref())
                    .fetch_optional(self.db.pool())
            })
            .await
    }

    pub async fn delete(&self, id: i32) -> Result<bool, sqlx::Error> {
        let result = self
            .db
            .run(|| sqlx::query("DELETE FROM masks WHERE id = $1").bind(id).execute(self.db.pool()))
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Loads features, reviews and extra fields for `masks` in three queries.
    async fn with_relations(&self, masks: Vec<Mask>) -> Result<Vec<MaskDetails>, sqlx::Error> {
        if masks.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = masks.iter().map(|m| m.id).collect();

        let features = self
            .db
            .run(|| {
                sqlx::query_as::<_, Feature>(
                    "SELECT id, mask_id, title, description FROM features WHERE mask_id = ANY($1) ORDER BY id",
                )
                .bind(&ids)
                .fetch_all(self.db.pool())
            })
            .await?;
        let reviews = self
            .db
            .run(|| {
                sqlx::query_as::<_, Review>(
                    "SELECT id, mask_id, author, text, rating, created_at FROM reviews WHERE mask_id = ANY($1) ORDER BY id",
                )
                .bind(&ids)
                .fetch_all(self.db.pool())
            })
            .await?;
        let extra_fields = self
            .db
            .run(|| {
                sqlx::query_as::<_, ExtraField>(
                    "SELECT id, mask_id, name, value FROM extra_fields WHERE mask_id = ANY($1) ORDER BY id",
                )
                .bind(&ids)
                .fetch_all(self.db.pool())
            })
            .await?;

        Ok(assemble(masks, features, reviews, extra_fields))
    }
}

/// Groups relation rows under their masks, keeping the masks' order.
fn assemble(
    masks: Vec<Mask>,
    features: Vec<Feature>,
    reviews: Vec<Review>,
    extra_fields: Vec<ExtraField>,
) -> Vec<MaskDetails> {
    let mut features_by_mask: HashMap<i32, Vec<Feature>> = HashMap::new();
    for feature in features {
        features_by_mask.entry(feature.mask_id).or_default().push(feature);
    }
    let mut reviews_by_mask: HashMap<i32, Vec<Review>> = HashMap::new();
    for review in reviews {
        reviews_by_mask.entry(review.mask_id).or_default().push(review);
    }
    let mut extras_by_mask: HashMap<i32, Vec<ExtraField>> = HashMap::new();
    for extra in extra_fields {
        extras_by_mask.entry(extra.mask_id).or_default().push(extra);
    }

    masks
        .into_iter()
        .map(|mask| MaskDetails {
            features: features_by_mask.remove(&mask.id).unwrap_or_default(),
            reviews: reviews_by_mask.remove(&mask.id).unwrap_or_default(),
            extra_fields: extras_by_mask.remove(&mask.id).unwrap_or_default(),
            mask,
        })
        .collect()
}
