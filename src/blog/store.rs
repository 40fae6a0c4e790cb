use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use crate::{
    error::{EcoShareError, Result},
    storage::{Comment, Database, NewPost, Post},
};
use tracing::{debug, info};
use uuid::Uuid;

/// A post together with its comments, oldest comment first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostDetails {
    pub post: Post,
    pub comments: Vec<Comment>,
}

/// Community posts and the comments under them. Only authors may delete
/// what they wrote.
#[derive(Clone)]
pub struct BlogStore {
    db: Arc<Database>,
}

impl BlogStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, author_id: &str, new: NewPost) -> Result<String> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(EcoShareError::Validation("title is required".to_string()));
        }
        let content = new.content.trim();
        if content.is_empty() {
            return Err(EcoShareError::Validation("content is required".to_string()));
        }

        let post = Post {
            id: Uuid::new_v4().to_string(),
            author_id: author_id.to_string(),
            author_name: String::new(),
            title: title.to_string(),
            content: content.to_string(),
            image_ref: new.image_ref.filter(|r| !r.trim().is_empty()),
            created_at: Utc::now(),
        };
        self.db.insert_post(&post)?;

        info!("Post {} published by {}: {}", post.id, author_id, post.title);
        Ok(post.id)
    }

    pub fn list(&self) -> Result<Vec<Post>> {
        self.db.get_posts()
    }

    pub fn get(&self, id: &str) -> Result<PostDetails> {
        let post = self.find(id)?;
        let comments = self.db.get_comments(id)?;
        Ok(PostDetails { post, comments })
    }

    pub fn delete(&self, id: &str, requester_id: &str) -> Result<()> {
        let post = self.find(id)?;
        if post.author_id != requester_id {
            debug!("{} tried to delete post {} by {}", requester_id, id, post.author_id);
            return Err(EcoShareError::Forbidden(format!("only the author may delete post {}", id)));
        }

        if !self.db.delete_post(id, requester_id)? {
            return Err(EcoShareError::NotFound(format!("post {}", id)));
        }

        info!("Post {} deleted by its author", id);
        Ok(())
    }

    pub fn add_comment(&self, post_id: &str, author_id: &str, text: &str) -> Result<Comment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EcoShareError::Validation("comment text is required".to_string()));
        }
        self.find(post_id)?;

        let id = Uuid::new_v4().to_string();
        self.db.insert_comment(&Comment {
            id: id.clone(),
            post_id: post_id.to_string(),
            author_id: author_id.to_string(),
            author_name: String::new(),
            text: text.to_string(),
            created_at: Utc::now(),
        })?;

        debug!("Comment {} added to post {} by {}", id, post_id, author_id);
        self.db
            .get_comment(&id)?
            .ok_or_else(|| EcoShareError::NotFound(format!("comment {}", id)))
    }

    pub fn delete_comment(&self, post_id: &str, comment_id: &str, requester_id: &str) -> Result<()> {
        let comment = self
            .db
            .get_comment(comment_id)?
            .filter(|c| c.post_id == post_id)
            .ok_or_else(|| EcoShareError::NotFound(format!("comment {} on post {}", comment_id, post_id)))?;

        if comment.author_id != requester_id {
            return Err(EcoShareError::Forbidden(format!(
                "only the author may delete comment {}",
                comment_id
            )));
        }

        if !self.db.delete_comment(comment_id, requester_id)? {
            return Err(EcoShareError::NotFound(format!("comment {}", comment_id)));
        }
        Ok(())
    }

    fn find(&self, id: &str) -> Result<Post> {
        self.db
            .get_post(id)?
            .ok_or_else(|| EcoShareError::NotFound(format!("post {}", id)))
    }
}
