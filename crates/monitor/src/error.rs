#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to read procfs info: {0}")]
    Procfs(#[from] procfs::ProcError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to apply database migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("{what} is not available for pid {pid}")]
    Unavailable { pid: u32, what: &'static str },
}
