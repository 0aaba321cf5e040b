pub mod client;
pub mod model;
pub mod request;

pub use client::{CopiedDocument, DocumentService, GoogleDocsClient};
pub use model::Document;
pub use request::{BatchUpdateResponse, Request};
