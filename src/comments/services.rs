use tracing::{info, warn};

use super::repo_types::Comment;
use crate::{
    error::{AppError, AppResult},
    mailer::{Mailer, Notification},
    state::AppState,
};

pub async fn create_comment(
    state: &AppState,
    user_id: i64,
    post_id: i64,
    description: &str,
) -> AppResult<Comment> {
    let comment = state.comments.insert(post_id, user_id, description).await?;
    info!(comment_id = comment.id, post_id, user_id, "comment created");

    match post_author(state, post_id).await {
        Ok(author) => {
            let sent = notify_post_author(state.mailer.as_ref(), user_id, author).await;
            info!(comment_id = comment.id, sent, "new comment notification");
        }
        Err(e) => warn!(error = %e, post_id, "post author lookup failed; skipping notification"),
    }
    Ok(comment)
}

/// `(user id, email)` of the post's author.
async fn post_author(state: &AppState, post_id: i64) -> AppResult<Option<(i64, String)>> {
    let Some(post) = state.posts.find(post_id).await? else {
        return Ok(None);
    };
    let author = state.sessions.store().find_by_id(post.user_id).await?;
    Ok(author.map(|u| (u.id, u.email)))
}

/// Mails the post's author unless they commented on their own post.
/// Delivery problems are logged and never reach the caller.
pub async fn notify_post_author(
    mailer: &dyn Mailer,
    commenter_id: i64,
    author: Option<(i64, String)>,
) -> bool {
    let Some((author_id, email)) = author else {
        return false;
    };
    if author_id == commenter_id {
        return false;
    }
    match mailer.send(Notification::new_comment(&email)).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, author_id, "new comment notification failed");
            false
        }
    }
}

pub async fn update_comment(
    state: &AppState,
    id: i64,
    user_id: i64,
    description: &str,
) -> AppResult<Comment> {
    state
        .comments
        .update_own(id, user_id, description)
        .await?
        .ok_or_else(|| AppError::not_found("comment"))
}

pub async fn delete_comment(state: &AppState, id: i64, user_id: i64) -> AppResult<bool> {
    let ownership = state
        .comments
        .ownership(id)
        .await?
        .ok_or_else(|| AppError::not_found("comment"))?;
    if !ownership.may_delete(user_id) {
        warn!(comment_id = id, user_id, "comment delete denied");
        return Err(AppError::AccessDenied);
    }
    state.comments.soft_delete(id, user_id).await?;
    info!(comment_id = id, user_id, "comment deleted");
    Ok(true)
}
