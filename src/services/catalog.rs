//! Book catalog service

use crate::{
    error::AppResult,
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    pub async fn list_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        self.repository.books.list(query).await
    }

    pub async fn create_book(&self, book: &CreateBook) -> AppResult<Book> {
        let created = self.repository.books.create(book).await?;
        tracing::info!(book_id = created.id, isbn = %created.isbn, "book created");
        Ok(created)
    }

    pub async fn update_book(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        self.repository.books.update(id, update).await
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.soft_delete(id).await?;
        tracing::info!(book_id = id, "book deleted");
        Ok(())
    }
}
