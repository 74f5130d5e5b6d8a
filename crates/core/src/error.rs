use thiserror::Error;

#[derive(Error, Debug)]
pub enum DogMirrorError {
    #[error("Invalid configuration: {key}={value} ({reason})")]
    Config {
        key: String,
        value: String,
        reason: String,
    },
}
