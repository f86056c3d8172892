use thiserror::Error;

#[derive(Error, Debug)]
pub enum NewsfeedError {
    #[error("Configuration error: {0}")]
    Config(String),
}
