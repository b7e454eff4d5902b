//! Community posts, comments and likes

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use super::{new_id, require_text};
use crate::models::{Comment, Post, User};
use crate::store::{Collection, Store};
use crate::{OnTymError, Result};

#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub author: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorRef {
    pub id: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub author: AuthorRef,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A post with author usernames populated
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: AuthorRef,
    pub tags: Vec<String>,
    pub likes: u64,
    pub comments: Vec<CommentView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !cleaned.contains(&tag) {
            cleaned.push(tag);
        }
    }
    cleaned
}

#[derive(Clone)]
pub struct Blog {
    posts: Collection<Post>,
    users: Collection<User>,
}

impl Blog {
    #[must_use]
    pub fn new(store: &Store) -> Self {
        Self {
            posts: store.posts.clone(),
            users: store.users.clone(),
        }
    }

    async fn ensure_author(&self, author_id: &str) -> Result<()> {
        if self.users.get(author_id).await?.is_none() {
            return Err(OnTymError::validation("author does not exist"));
        }
        Ok(())
    }

    #[instrument(skip(self, draft), fields(author = %draft.author))]
    pub async fn create(&self, draft: PostDraft) -> Result<Post> {
        require_text("title", &draft.title)?;
        require_text("content", &draft.content)?;
        self.ensure_author(&draft.author).await?;

        let now = Utc::now();
        let post = Post {
            id: new_id(),
            title: draft.title,
            content: draft.content,
            author: draft.author,
            tags: clean_tags(draft.tags),
            likes: 0,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.posts.put(&post.id, &post).await?;

        info!(post_id = %post.id, "Created post");
        Ok(post)
    }

    /// All posts, newest first
    pub async fn list(&self) -> Result<Vec<Post>> {
        let mut posts = self.posts.list().await?;
        posts.reverse();
        Ok(posts)
    }

    pub async fn get(&self, post_id: &str) -> Result<Post> {
        self.posts
            .get(post_id)
            .await?
            .ok_or_else(|| OnTymError::not_found("Post"))
    }

    #[instrument(skip(self, changes))]
    pub async fn update(&self, post_id: &str, changes: PostChanges) -> Result<Post> {
        if let Some(title) = &changes.title {
            require_text("title", title)?;
        }
        if let Some(content) = &changes.content {
            require_text("content", content)?;
        }

        self.posts
            .update(post_id, move |post| {
                if let Some(title) = changes.title {
                    post.title = title;
                }
                if let Some(content) = changes.content {
                    post.content = content;
                }
                if let Some(tags) = changes.tags {
                    post.tags = clean_tags(tags);
                }
                post.updated_at = Utc::now();
                Ok(())
            })
            .await?
            .ok_or_else(|| OnTymError::not_found("Post"))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, post_id: &str) -> Result<()> {
        if !self.posts.remove(post_id).await? {
            return Err(OnTymError::not_found("Post"));
        }
        info!("Deleted post");
        Ok(())
    }

    #[instrument(skip(self, content))]
    pub async fn comment(&self, post_id: &str, author_id: &str, content: &str) -> Result<Post> {
        require_text("content", content)?;
        self.ensure_author(author_id).await?;

        let comment = Comment {
            author: author_id.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.posts
            .update(post_id, move |post| {
                post.updated_at = comment.created_at;
                post.comments.push(comment);
                Ok(())
            })
            .await?
            .ok_or_else(|| OnTymError::not_found("Post"))
    }

    /// Increment the like counter and return the new total
    pub async fn like(&self, post_id: &str) -> Result<u64> {
        let post = self
            .posts
            .update(post_id, |post| {
                post.likes = post.likes.saturating_add(1);
                Ok(())
            })
            .await?
            .ok_or_else(|| OnTymError::not_found("Post"))?;
        Ok(post.likes)
    }

    async fn usernames(&self, ids: Vec<String>) -> Result<HashMap<String, String>> {
        let mut names = HashMap::new();
        for id in ids {
            if names.contains_key(&id) {
                continue;
            }
            if let Some(user) = self.users.get(&id).await? {
                names.insert(id, user.username);
            }
        }
        Ok(names)
    }

    /// Populate author usernames for a batch of posts
    pub async fn view(&self, posts: Vec<Post>) -> Result<Vec<PostView>> {
        let ids = posts
            .iter()
            .flat_map(|post| {
                std::iter::once(post.author.clone())
                    .chain(post.comments.iter().map(|c| c.author.clone()))
            })
            .collect();
        let names = self.usernames(ids).await?;
        let author = |id: String| AuthorRef {
            username: names.get(&id).cloned(),
            id,
        };

        Ok(posts
            .into_iter()
            .map(|post| PostView {
                id: post.id,
                title: post.title,
                content: post.content,
                author: author(post.author),
                tags: post.tags,
                likes: post.likes,
                comments: post
                    .comments
                    .into_iter()
                    .map(|c| CommentView {
                        author: author(c.author),
                        content: c.content,
                        created_at: c.created_at,
                    })
                    .collect(),
                created_at: post.created_at,
                updated_at: post.updated_at,
            })
            .collect())
    }

    pub async fn view_one(&self, post: Post) -> Result<PostView> {
        let mut views = self.view(vec![post]).await?;
        views.pop().ok_or_else(|| OnTymError::not_found("Post"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::{Accounts, NewAccount};
    use crate::models::{Profile, SupplierProfile, SupplyScale};

    async fn setup() -> (Blog, User) {
        let store = Store::temporary().unwrap();
        let author = Accounts::new(&store)
            .register(NewAccount {
                username: "writer".into(),
                email: "writer@ontym.in".into(),
                password: "long enough".into(),
                phone_number: None,
                profile: Profile::Supplier(SupplierProfile {
                    scale_served: SupplyScale::Small,
                    products_offered: vec![],
                    description: None,
                    location: None,
                }),
            })
            .await
            .unwrap();
        (Blog::new(&store), author)
    }

    fn draft(author: &str, title: &str) -> PostDraft {
        PostDraft {
            title: title.into(),
            content: "Why bagasse beats foam".into(),
            author: author.into(),
            tags: vec!["bagasse".into(), " bagasse ".into(), "".into(), "food".into()],
        }
    }

    #[tokio::test]
    async fn test_create_list_and_view() {
        let (blog, author) = setup().await;
        blog.create(draft(&author.id, "First")).await.unwrap();
        let second = blog.create(draft(&author.id, "Second")).await.unwrap();
        assert_eq!(second.tags, vec!["bagasse", "food"]);

        let posts = blog.list().await.unwrap();
        assert_eq!(posts[0].title, "Second");

        let views = blog.view(posts).await.unwrap();
        assert_eq!(views[1].author.username.as_deref(), Some("writer"));
    }

    #[tokio::test]
    async fn test_unknown_author_rejected() {
        let (blog, _) = setup().await;
        let result = blog.create(draft("0123456789abcdef", "Ghost")).await;
        assert!(matches!(result, Err(OnTymError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_comments_and_likes() {
        let (blog, author) = setup().await;
        let post = blog.create(draft(&author.id, "Post")).await.unwrap();

        let commented = blog.comment(&post.id, &author.id, "Great read").await.unwrap();
        assert_eq!(commented.comments.len(), 1);

        assert_eq!(blog.like(&post.id).await.unwrap(), 1);
        assert_eq!(blog.like(&post.id).await.unwrap(), 2);

        let view = blog.view_one(blog.get(&post.id).await.unwrap()).await.unwrap();
        assert_eq!(view.likes, 2);
        assert_eq!(view.comments[0].author.username.as_deref(), Some("writer"));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (blog, author) = setup().await;
        let post = blog.create(draft(&author.id, "Draft title")).await.unwrap();

        let updated = blog
            .update(
                &post.id,
                PostChanges {
                    title: Some("Final title".into()),
                    ..PostChanges::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Final title");
        assert_eq!(updated.content, post.content);

        blog.delete(&post.id).await.unwrap();
        assert!(matches!(blog.delete(&post.id).await, Err(OnTymError::NotFound { .. })));
        assert!(matches!(blog.like(&post.id).await, Err(OnTymError::NotFound { .. })));
    }
}
