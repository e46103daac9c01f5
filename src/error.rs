use thiserror::Error;

/// Failures raised by the projection core before or while simulating.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// A club scheduled in an unplayed fixture has no entry in the rating table.
    #[error("no rating for club `{club}`")]
    MissingRating { club: String },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl SimError {
    pub fn missing_rating(club: impl Into<String>) -> Self {
        Self::MissingRating { club: club.into() }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}
