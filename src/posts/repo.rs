use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{Post, PostActivity, PostChanges, RatedPost, Rating};
use crate::error::AppResult;

/// Persistence seam for posts, their views and ratings.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Inserts the post and counts the author as its first viewer.
    async fn create(
        &self,
        user_id: i64,
        title: &str,
        description: &str,
        image: Option<(&str, &str)>,
    ) -> AppResult<Post>;
    async fn find(&self, id: i64) -> AppResult<Option<Post>>;
    async fn find_rated(&self, id: i64) -> AppResult<Option<RatedPost>>;
    /// Snapshots the current title/description, then applies the changes.
    /// `None` when the post no longer exists.
    async fn update(&self, id: i64, changes: &PostChanges) -> AppResult<Option<Post>>;
    async fn delete(&self, id: i64) -> AppResult<bool>;
    /// Idempotent: a second visit by the same user is not counted.
    async fn record_view(&self, post_id: i64, user_id: i64) -> AppResult<()>;
    async fn count_views(&self, post_id: i64) -> AppResult<i64>;
    /// One rating per user and post; rating again replaces the previous value.
    async fn upsert_rating(&self, post_id: i64, user_id: i64, rating: Rating) -> AppResult<()>;
    /// Oldest posts first. Comment totals include soft-deleted comments.
    async fn activity(&self, limit: i64) -> AppResult<Vec<PostActivity>>;
}

const POST_COLUMNS: &str =
    "id, user_id, title, description, image_url, image_key, created_at, updated_at";

#[derive(Clone)]
pub struct PgPostStore {
    db: PgPool,
}

impl PgPostStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn create(
        &self,
        user_id: i64,
        title: &str,
        description: &str,
        image: Option<(&str, &str)>,
    ) -> AppResult<Post> {
        let (image_url, image_key) = image.unzip();
        let mut tx = self.db.begin().await?;
        let post = sqlx::query_as::<_, Post>(&format!(
            r#"
            INSERT INTO posts (user_id, title, description, image_url, image_key)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(image_url)
        .bind(image_key)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO post_views (post_id, user_id) VALUES ($1, $2)")
            .bind(post.id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(post)
    }

    async fn find(&self, id: i64) -> AppResult<Option<Post>> {
        let row = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_rated(&self, id: i64) -> AppResult<Option<RatedPost>> {
        let row = sqlx::query_as::<_, RatedPost>(
            r#"
            SELECT p.id, p.user_id, p.title, p.description, p.image_url, p.image_key,
                   p.created_at, p.updated_at,
                   COUNT(r.user_id) FILTER (WHERE r.rating = 'like')    AS likes,
                   COUNT(r.user_id) FILTER (WHERE r.rating = 'dislike') AS dislikes
            FROM posts p
            LEFT JOIN post_rates r ON r.post_id = p.id
            WHERE p.id = $1
            GROUP BY p.id
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: i64, changes: &PostChanges) -> AppResult<Option<Post>> {
        let mut tx = self.db.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO post_history (post_id, title, description)
            SELECT id, title, description FROM posts WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let post = sqlx::query_as::<_, Post>(&format!(
            r#"
            UPDATE posts
            SET title       = COALESCE($2, title),
                description = COALESCE($3, description),
                image_url   = COALESCE($4, image_url),
                image_key   = COALESCE($5, image_key),
                updated_at  = now()
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.title.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.image_url.as_deref())
        .bind(changes.image_key.as_deref())
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(post)
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn record_view(&self, post_id: i64, user_id: i64) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO post_views (post_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (post_id, user_id) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn count_views(&self, post_id: i64) -> AppResult<i64> {
        let (n,) =
            sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM post_views WHERE post_id = $1")
                .bind(post_id)
                .fetch_one(&self.db)
                .await?;
        Ok(n)
    }

    async fn upsert_rating(&self, post_id: i64, user_id: i64, rating: Rating) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO post_rates (post_id, user_id, rating)
            VALUES ($1, $2, $3)
            ON CONFLICT (post_id, user_id)
            DO UPDATE SET rating = EXCLUDED.rating, updated_at = now()
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .bind(rating.as_str())
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn activity(&self, limit: i64) -> AppResult<Vec<PostActivity>> {
        let rows = sqlx::query_as::<_, PostActivity>(
            r#"
            SELECT p.title,
                   (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS number_of_comments,
                   (SELECT COUNT(*) FROM post_views v WHERE v.post_id = p.id) AS views,
                   (SELECT COUNT(*) FROM post_rates r
                     WHERE r.post_id = p.id AND r.rating = 'like') AS likes,
                   (SELECT COUNT(*) FROM post_rates r
                     WHERE r.post_id = p.id AND r.rating = 'dislike') AS dislikes
            FROM posts p
            ORDER BY p.created_at ASC, p.id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::{BTreeMap, HashMap, HashSet};

    use async_trait::async_trait;
    use time::OffsetDateTime;
    use tokio::sync::Mutex;

    use super::PostStore;
    use crate::comments::repo::CommentStore;
    use crate::comments::repo_types::{Comment, CommentOwnership};
    use crate::error::{AppError, AppResult};
    use crate::posts::repo_types::{Post, PostActivity, PostChanges, RatedPost, Rating};

    struct StoredComment {
        comment: Comment,
        deleted_by: Option<i64>,
    }

    #[derive(Default)]
    struct Tables {
        posts: BTreeMap<i64, Post>,
        history: Vec<(i64, String, String)>,
        views: HashSet<(i64, i64)>,
        rates: HashMap<(i64, i64), Rating>,
        comments: BTreeMap<i64, StoredComment>,
    }

    impl Tables {
        fn tally(&self, post_id: i64, rating: Rating) -> i64 {
            self.rates
                .iter()
                .filter(|((p, _), r)| *p == post_id && **r == rating)
                .count() as i64
        }
    }

    /// Posts and comments in one place so cascades and joins behave like Postgres.
    #[derive(Default)]
    pub struct MemoryContentStore {
        tables: Mutex<Tables>,
    }

    impl MemoryContentStore {
        /// `(title, description)` snapshots taken before each update of `post_id`.
        pub async fn history(&self, post_id: i64) -> Vec<(String, String)> {
            self.tables
                .lock()
                .await
                .history
                .iter()
                .filter(|(id, _, _)| *id == post_id)
                .map(|(_, t, d)| (t.clone(), d.clone()))
                .collect()
        }

        pub async fn deleted_by(&self, comment_id: i64) -> Option<i64> {
            self.tables
                .lock()
                .await
                .comments
                .get(&comment_id)
                .and_then(|c| c.deleted_by)
        }
    }

    #[async_trait]
    impl PostStore for MemoryContentStore {
        async fn create(
            &self,
            user_id: i64,
            title: &str,
            description: &str,
            image: Option<(&str, &str)>,
        ) -> AppResult<Post> {
            let mut t = self.tables.lock().await;
            let id = t.posts.keys().next_back().copied().unwrap_or(0) + 1;
            let now = OffsetDateTime::now_utc();
            let post = Post {
                id,
                user_id,
                title: title.to_string(),
                description: description.to_string(),
                image_url: image.map(|(url, _)| url.to_string()),
                image_key: image.map(|(_, key)| key.to_string()),
                created_at: now,
                updated_at: now,
            };
            t.posts.insert(id, post.clone());
            t.views.insert((id, user_id));
            Ok(post)
        }

        async fn find(&self, id: i64) -> AppResult<Option<Post>> {
            Ok(self.tables.lock().await.posts.get(&id).cloned())
        }

        async fn find_rated(&self, id: i64) -> AppResult<Option<RatedPost>> {
            let t = self.tables.lock().await;
            Ok(t.posts.get(&id).cloned().map(|post| RatedPost {
                likes: t.tally(id, Rating::Like),
                dislikes: t.tally(id, Rating::Dislike),
                post,
            }))
        }

        async fn update(&self, id: i64, changes: &PostChanges) -> AppResult<Option<Post>> {
            let mut t = self.tables.lock().await;
            let Some(post) = t.posts.get_mut(&id) else {
                return Ok(None);
            };
            let snapshot = (id, post.title.clone(), post.description.clone());
            if let Some(title) = &changes.title {
                post.title = title.clone();
            }
            if let Some(description) = &changes.description {
                post.description = description.clone();
            }
            if let Some(url) = &changes.image_url {
                post.image_url = Some(url.clone());
            }
            if let Some(key) = &changes.image_key {
                post.image_key = Some(key.clone());
            }
            post.updated_at = OffsetDateTime::now_utc();
            let updated = post.clone();
            t.history.push(snapshot);
            Ok(Some(updated))
        }

        async fn delete(&self, id: i64) -> AppResult<bool> {
            let mut t = self.tables.lock().await;
            if t.posts.remove(&id).is_none() {
                return Ok(false);
            }
            t.views.retain(|(p, _)| *p != id);
            t.rates.retain(|(p, _), _| *p != id);
            t.comments.retain(|_, c| c.comment.post_id != id);
            t.history.retain(|(p, _, _)| *p != id);
            Ok(true)
        }

        async fn record_view(&self, post_id: i64, user_id: i64) -> AppResult<()> {
            self.tables.lock().await.views.insert((post_id, user_id));
            Ok(())
        }

        async fn count_views(&self, post_id: i64) -> AppResult<i64> {
            let t = self.tables.lock().await;
            Ok(t.views.iter().filter(|(p, _)| *p == post_id).count() as i64)
        }

        async fn upsert_rating(&self, post_id: i64, user_id: i64, rating: Rating) -> AppResult<()> {
            self.tables.lock().await.rates.insert((post_id, user_id), rating);
            Ok(())
        }

        async fn activity(&self, limit: i64) -> AppResult<Vec<PostActivity>> {
            let t = self.tables.lock().await;
            let mut posts: Vec<&Post> = t.posts.values().collect();
            posts.sort_by_key(|p| (p.created_at, p.id));
            Ok(posts
                .into_iter()
                .take(usize::try_from(limit).unwrap_or(0))
                .map(|p| PostActivity {
                    title: p.title.clone(),
                    number_of_comments: t
                        .comments
                        .values()
                        .filter(|c| c.comment.post_id == p.id)
                        .count() as i64,
                    views: t.views.iter().filter(|(id, _)| *id == p.id).count() as i64,
                    likes: t.tally(p.id, Rating::Like),
                    dislikes: t.tally(p.id, Rating::Dislike),
                })
                .collect())
        }
    }

    #[async_trait]
    impl CommentStore for MemoryContentStore {
        async fn insert(&self, post_id: i64, user_id: i64, description: &str) -> AppResult<Comment> {
            let mut t = self.tables.lock().await;
            if !t.posts.contains_key(&post_id) {
                return Err(AppError::validation("post_id not found."));
            }
            let id = t.comments.keys().next_back().copied().unwrap_or(0) + 1;
            let now = OffsetDateTime::now_utc();
            let comment = Comment {
                id,
                post_id,
                user_id,
                description: description.to_string(),
                created_at: now,
                updated_at: now,
            };
            t.comments.insert(
                id,
                StoredComment {
                    comment: comment.clone(),
                    deleted_by: None,
                },
            );
            Ok(comment)
        }

        async fn update_own(
            &self,
            id: i64,
            user_id: i64,
            description: &str,
        ) -> AppResult<Option<Comment>> {
            let mut t = self.tables.lock().await;
            Ok(match t.comments.get_mut(&id) {
                Some(c) if c.deleted_by.is_none() && c.comment.user_id == user_id => {
                    c.comment.description = description.to_string();
                    c.comment.updated_at = OffsetDateTime::now_utc();
                    Some(c.comment.clone())
                }
                _ => None,
            })
        }

        async fn ownership(&self, id: i64) -> AppResult<Option<CommentOwnership>> {
            let t = self.tables.lock().await;
            Ok(t.comments
                .get(&id)
                .filter(|c| c.deleted_by.is_none())
                .and_then(|c| {
                    t.posts.get(&c.comment.post_id).map(|p| CommentOwnership {
                        comment_author: c.comment.user_id,
                        post_author: p.user_id,
                    })
                }))
        }

        async fn soft_delete(&self, id: i64, deleted_by: i64) -> AppResult<()> {
            let mut t = self.tables.lock().await;
            if let Some(c) = t.comments.get_mut(&id) {
                if c.deleted_by.is_none() {
                    c.deleted_by = Some(deleted_by);
                }
            }
            Ok(())
        }

        async fn list_visible(&self, post_id: i64) -> AppResult<Vec<Comment>> {
            let t = self.tables.lock().await;
            Ok(t.comments
                .values()
                .filter(|c| c.comment.post_id == post_id && c.deleted_by.is_none())
                .map(|c| c.comment.clone())
                .collect())
        }
    }

    #[tokio::test]
    async fn deleting_a_post_cascades() {
        let store = MemoryContentStore::default();
        let post = store.create(1, "t", "d", None).await.unwrap();
        store.insert(post.id, 2, "hi").await.unwrap();
        store.upsert_rating(post.id, 2, Rating::Like).await.unwrap();
        assert!(store.delete(post.id).await.unwrap());
        assert!(!store.delete(post.id).await.unwrap());
        assert!(store.list_visible(post.id).await.unwrap().is_empty());
        assert_eq!(store.count_views(post.id).await.unwrap(), 0);
    }
}
