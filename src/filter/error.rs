use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// Field name → first violation message
    #[error("Invalid list parameters: {0:?}")]
    InvalidParams(HashMap<String, String>),
}

impl FilterError {
    pub fn fields(&self) -> &HashMap<String, String> {
        match self {
            FilterError::InvalidParams(fields) => fields,
        }
    }
}
