pub mod app;
pub mod config;
pub mod error;
pub mod api {
    pub mod documents;
    pub mod errors;
    pub mod search;
}
pub mod db {
    pub mod models;
    pub mod repository;
    pub mod schema;
}
pub mod models {
    pub mod document;
    pub mod search;
}
pub mod search {
    pub mod classifier;
    pub mod mapper;
    pub mod projector;
    pub mod query;
}
pub mod storage {
    pub mod client;
}
