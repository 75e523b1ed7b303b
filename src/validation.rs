use rocket::serde::json::{self, Json};
use tracing::instrument;
use validator::Validate;

use crate::error::AppError;

/// A JSON request body whose parse failure is handed to the handler instead
/// of being turned into Rocket's default 422.
pub type JsonBody<'r, T> = Result<Json<T>, json::Error<'r>>;

pub trait JsonBodyExt<T> {
    fn into_body(self) -> Result<T, AppError>;
}

impl<T> JsonBodyExt<T> for JsonBody<'_, T> {
    fn into_body(self) -> Result<T, AppError> {
        self.map(Json::into_inner)
            .map_err(|err| AppError::Validation(format!("Invalid JSON body: {}", err)))
    }
}

pub trait ValidateExt: Sized {
    fn validated(self) -> Result<Self, AppError>;
}

impl<T: Validate> ValidateExt for T {
    #[instrument(skip_all)]
    fn validated(self) -> Result<Self, AppError> {
        self.validate()?;
        Ok(self)
    }
}
