pub mod crawl;
pub mod extract;
pub mod sites;

// Re-export command functions for convenience
pub use crawl::crawl;
pub use extract::extract;
pub use sites::sites;
