use tracing::{info, warn};

use super::{
    dto::{ImageUpload, NewPost, PostDetails},
    repo_types::{Post, PostChanges, RatedPost, Rating},
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
    storage::image_key,
};

/// Uploaded image: (public url, object key).
async fn upload_image(state: &AppState, image: ImageUpload) -> AppResult<(String, String)> {
    let key = image_key(&image.content_type);
    let url = state
        .storage
        .put_object(&key, image.body, &image.content_type)
        .await?;
    Ok((url, key))
}

/// Failed removals only leave an orphaned object behind.
async fn discard_image(state: &AppState, key: Option<&str>) {
    if let Some(key) = key {
        if let Err(e) = state.storage.delete_object(key).await {
            warn!(error = %e, key, "image delete failed");
        }
    }
}

async fn owned_post(state: &AppState, post_id: i64, user_id: i64) -> AppResult<Post> {
    let post = state
        .posts
        .find(post_id)
        .await?
        .ok_or_else(|| AppError::not_found("post"))?;
    if post.user_id != user_id {
        warn!(post_id, user_id, "post owned by another user");
        return Err(AppError::AccessDenied);
    }
    Ok(post)
}

pub async fn create_post(state: &AppState, user_id: i64, new: NewPost) -> AppResult<RatedPost> {
    let image = match new.image {
        Some(img) => Some(upload_image(state, img).await?),
        None => None,
    };

    let created = state
        .posts
        .create(
            user_id,
            &new.title,
            &new.description,
            image.as_ref().map(|(url, key)| (url.as_str(), key.as_str())),
        )
        .await;
    let post = match created {
        Ok(p) => p,
        Err(e) => {
            discard_image(state, image.as_ref().map(|(_, key)| key.as_str())).await;
            return Err(e);
        }
    };

    info!(post_id = post.id, user_id, "post created");
    Ok(post.into())
}

pub async fn update_post(
    state: &AppState,
    post_id: i64,
    user_id: i64,
    mut changes: PostChanges,
    image: Option<ImageUpload>,
) -> AppResult<RatedPost> {
    let current = owned_post(state, post_id, user_id).await?;

    if let Some(img) = image {
        let (url, key) = upload_image(state, img).await?;
        changes.image_url = Some(url);
        changes.image_key = Some(key);
    }

    let updated = match state.posts.update(post_id, &changes).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(AppError::not_found("post")),
        Err(e) => Err(e),
    };
    if let Err(e) = updated {
        discard_image(state, changes.image_key.as_deref()).await;
        return Err(e);
    }

    if changes.image_key.is_some() {
        discard_image(state, current.image_key.as_deref()).await;
    }
    info!(post_id, user_id, "post updated");

    state
        .posts
        .find_rated(post_id)
        .await?
        .ok_or_else(|| AppError::not_found("post"))
}

/// Reading a post counts the caller as a viewer.
pub async fn get_post(state: &AppState, post_id: i64, user_id: i64) -> AppResult<PostDetails> {
    let post = state
        .posts
        .find_rated(post_id)
        .await?
        .ok_or_else(|| AppError::not_found("post"))?;
    state.posts.record_view(post_id, user_id).await?;
    let comments = state.comments.list_visible(post_id).await?;
    let views = state.posts.count_views(post_id).await?;
    Ok(PostDetails {
        post,
        comments,
        views,
    })
}

pub async fn rate_post(
    state: &AppState,
    post_id: i64,
    user_id: i64,
    rating: Rating,
) -> AppResult<bool> {
    if state.posts.find(post_id).await?.is_none() {
        return Err(AppError::not_found("post"));
    }
    state.posts.upsert_rating(post_id, user_id, rating).await?;
    info!(post_id, user_id, %rating, "post rated");
    Ok(true)
}

pub async fn delete_post(state: &AppState, post_id: i64, user_id: i64) -> AppResult<bool> {
    let post = owned_post(state, post_id, user_id).await?;
    if !state.posts.delete(post_id).await? {
        return Err(AppError::not_found("post"));
    }
    discard_image(state, post.image_key.as_deref()).await;
    info!(post_id, user_id, "post deleted");
    Ok(true)
}
