#[derive(thiserror::Error, Debug, serde::Deserialize, serde::Serialize)]
pub enum Error {
    /// Any failure to reach or complete against the model server.
    #[error("Model unreachable at {url}: {reason}")]
    ModelUnreachable { url: String, reason: String },

    #[error("{path} is not a valid {role}: {reason}")]
    InvalidVerdict {
        path: String,
        role: String,
        reason: String,
    },

    #[error("Unknown file role: {0} (expected architecture, code, tests or documentation)")]
    UnknownRole(String),
}
