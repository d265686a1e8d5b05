#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use blog_admin::{
    AppConfig, AppError, AppState,
    moderation::{CommentState, ModerationConfig, ModerationLevel},
    models::{
        Actor, Comment, CommentRow, CommentVisibility, CreatePostRequest, Post, Role, Tag,
        UpdatePostRequest,
    },
    repository::Repository,
};
use chrono::Utc;
use uuid::Uuid;

pub const AUTHOR_ID: Uuid = Uuid::from_u128(0xa1);
pub const OTHER_ID: Uuid = Uuid::from_u128(0xb2);
pub const ADMIN_ID: Uuid = Uuid::from_u128(0xc3);

pub fn author() -> Actor {
    Actor::new(AUTHOR_ID, vec![Role::User])
}

pub fn other_user() -> Actor {
    Actor::new(OTHER_ID, vec![Role::User])
}

pub fn admin() -> Actor {
    Actor::new(ADMIN_ID, vec![Role::User, Role::Admin])
}

/// An administrator who shares `AUTHOR_ID`, for backend routes on the author's own posts.
pub fn admin_author() -> Actor {
    Actor::new(AUTHOR_ID, vec![Role::User, Role::Admin])
}

pub fn post_request(title: &str, tags: &[&str]) -> CreatePostRequest {
    CreatePostRequest {
        title: title.to_string(),
        slug: title.to_lowercase().replace(' ', "-"),
        summary: format!("{} summary", title),
        content: format!("{} content", title),
        published_at: Some(Utc::now()),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

#[derive(Default)]
struct Inner {
    actors: BTreeMap<Uuid, Actor>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    config: ModerationConfig,
    next_id: i64,
    tags_at_delete: Vec<usize>,
    comment_saves: usize,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn tags_from(&mut self, names: &[String]) -> Vec<Tag> {
        names
            .iter()
            .map(|name| Tag {
                id: self.next_id(),
                name: name.clone(),
            })
            .collect()
    }
}

/// InMemoryRepo
///
/// `Repository` over plain maps, seeded with the author, another user and an admin.
#[derive(Clone)]
pub struct InMemoryRepo {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        let mut inner = Inner::default();
        for actor in [author(), other_user(), admin()] {
            inner.actors.insert(actor.id, actor);
        }
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    pub fn with_level(self, level: ModerationLevel) -> Self {
        self.inner.lock().unwrap().config = ModerationConfig::new(level);
        self
    }

    pub fn level(&self) -> ModerationLevel {
        self.inner.lock().unwrap().config.get()
    }

    pub fn insert_post(&self, author_id: Uuid, title: &str, tags: &[&str]) -> Post {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let req = post_request(title, tags);
        let tags = inner.tags_from(&req.tags);
        let mut post = Post::new(id, author_id, req);
        post.tags = tags;
        inner.posts.insert(id, post.clone());
        post
    }

    pub fn insert_comment(&self, post_id: i64, author_id: Uuid, state: CommentState) -> Comment {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let comment = Comment::new(id, post_id, author_id, "hello".to_string(), Utc::now(), state);
        inner.comments.insert(id, comment.clone());
        comment
    }

    pub fn stored_comment(&self, id: i64) -> Option<Comment> {
        self.inner.lock().unwrap().comments.get(&id).cloned()
    }

    pub fn has_post(&self, id: i64) -> bool {
        self.inner.lock().unwrap().posts.contains_key(&id)
    }

    pub fn post_count(&self) -> usize {
        self.inner.lock().unwrap().posts.len()
    }

    /// Tag count of each post at the moment `delete_post` received it.
    pub fn tags_at_delete(&self) -> Vec<usize> {
        self.inner.lock().unwrap().tags_at_delete.clone()
    }

    pub fn comment_saves(&self) -> usize {
        self.inner.lock().unwrap().comment_saves
    }

    pub fn state(&self) -> AppState {
        AppState {
            repo: Arc::new(self.clone()),
            config: AppConfig::default(),
        }
    }
}

#[async_trait]
impl Repository for InMemoryRepo {
    async fn get_actor(&self, id: Uuid) -> Result<Option<Actor>, AppError> {
        Ok(self.inner.lock().unwrap().actors.get(&id).cloned())
    }

    async fn get_moderation_config(&self) -> Result<ModerationConfig, AppError> {
        Ok(self.inner.lock().unwrap().config)
    }

    async fn save_moderation_config(&self, config: &ModerationConfig) -> Result<(), AppError> {
        self.inner.lock().unwrap().config = *config;
        Ok(())
    }

    async fn get_posts_by_author(&self, author_id: Uuid) -> Result<Vec<Post>, AppError> {
        let inner = self.inner.lock().unwrap();
        let mut posts: Vec<Post> = inner
            .posts
            .values()
            .filter(|p| p.author_id() == author_id)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(posts)
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>, AppError> {
        Ok(self.inner.lock().unwrap().posts.get(&id).cloned())
    }

    async fn create_post(&self, author_id: Uuid, req: CreatePostRequest) -> Result<Post, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let tags = inner.tags_from(&req.tags);
        let mut post = Post::new(id, author_id, req);
        post.tags = tags;
        inner.posts.insert(id, post.clone());
        Ok(post)
    }

    async fn update_post(&self, id: i64, req: UpdatePostRequest) -> Result<Option<Post>, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let tags = req.tags.as_ref().map(|names| inner.tags_from(names));
        let Some(post) = inner.posts.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = req.title {
            post.title = title;
        }
        if let Some(summary) = req.summary {
            post.summary = summary;
        }
        if let Some(content) = req.content {
            post.content = content;
        }
        if let Some(published_at) = req.published_at {
            post.published_at = Some(published_at);
        }
        if let Some(tags) = tags {
            post.tags = tags;
        }
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, post: &Post) -> Result<bool, AppError> {
        let mut inner = self.inner.lock().unwrap();
        inner.tags_at_delete.push(post.tags.len());
        inner.comments.retain(|_, c| c.post_id != post.id);
        Ok(inner.posts.remove(&post.id).is_some())
    }

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>, AppError> {
        Ok(self.inner.lock().unwrap().comments.get(&id).cloned())
    }

    async fn get_comments(&self, post_id: i64) -> Result<Vec<Comment>, AppError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn get_visible_comments(&self, post_id: i64) -> Result<Vec<Comment>, AppError> {
        Ok(self
            .get_comments(post_id)
            .await?
            .into_iter()
            .filter(|c| c.allowed())
            .collect())
    }

    async fn add_comment(
        &self,
        post_id: i64,
        author_id: Uuid,
        content: String,
        initial: CommentVisibility,
    ) -> Result<Comment, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let comment: Comment = CommentRow {
            id,
            post_id,
            author_id,
            content,
            published_at: Utc::now(),
            allowed: initial.allowed,
            allowed_by: initial.allowed_by,
            allowed_at: initial.allowed_at,
        }
        .into();
        inner.comments.insert(id, comment.clone());
        Ok(comment)
    }

    async fn save_comment_state(&self, comment: &Comment) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        inner.comment_saves += 1;
        inner.comments.insert(comment.id, comment.clone());
        Ok(())
    }

    async fn count_approved_comments(&self, author_id: Uuid) -> Result<u64, AppError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .comments
            .values()
            .filter(|c| c.author_id == author_id && c.is_approved())
            .count() as u64)
    }
}
