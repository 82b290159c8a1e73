//! Category service

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::category::{Category, CreateCategory, UpdateCategory},
    repository::Repository,
};

#[derive(Clone)]
pub struct CategoriesService {
    repository: Repository,
}

impl CategoriesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<Category>> {
        self.repository.categories.list().await
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Category> {
        self.repository.categories.get_by_id(id).await
    }

    pub async fn create(&self, data: &CreateCategory) -> AppResult<Category> {
        if self.repository.categories.name_exists(&data.name, None).await? {
            return Err(AppError::Conflict(format!("Category {} already exists", data.name)));
        }
        self.repository.categories.create(data).await
    }

    pub async fn update(&self, id: Uuid, data: &UpdateCategory) -> AppResult<Category> {
        if let Some(ref name) = data.name {
            if self.repository.categories.name_exists(name, Some(id)).await? {
                return Err(AppError::Conflict(format!("Category {} already exists", name)));
            }
        }
        self.repository.categories.update(id, data).await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.repository.categories.delete(id).await
    }
}
