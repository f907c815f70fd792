use salvo::http::StatusCode;
use salvo::prelude::Json;
use salvo::{Depot, Request, Response, Writer, async_trait};
use serde_json::json;
use thiserror::Error;

use arbor_db::error::{DbError, TreeError};
use arbor_service::error::ServiceError;

/// Application-level errors (HTTP layer)
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    ServiceError(#[from] ServiceError),

    #[error(transparent)]
    DatabaseError(#[from] DbError),

    #[error(transparent)]
    CoreError(#[from] arbor_core::error::CoreError),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    /// ## Summary
    /// Maps the error onto a status code and JSON body.
    ///
    /// Validation failures render as `{"errors": {field: message}}`. Anything
    /// that points at a deployment or storage fault renders an opaque 500.
    pub fn render_into(self, res: &mut Response) {
        let (status, body) = match self {
            Self::ServiceError(ServiceError::Validation(errors)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "errors": errors }))
            }
            Self::ServiceError(ServiceError::NotFound(what)) => {
                (StatusCode::NOT_FOUND, json!({ "error": format!("{what} not found") }))
            }
            Self::ServiceError(ServiceError::BadRequest(message)) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            Self::ServiceError(ServiceError::NotAuthenticated) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "authentication required" }),
            ),
            Self::ServiceError(ServiceError::PermissionDenied(permission)) => {
                tracing::debug!(%permission, "Request forbidden");
                (StatusCode::FORBIDDEN, json!({ "error": "forbidden" }))
            }
            Self::ServiceError(ServiceError::DatabaseError(db))
            | Self::DatabaseError(db) => return render_db_error(db, res),
            other => {
                tracing::error!(error = %other, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal server error" }),
                )
            }
        };
        res.status_code(status);
        res.render(Json(body));
    }
}

fn render_db_error(error: DbError, res: &mut Response) {
    let (status, body) = match error {
        DbError::Tree(TreeError::NodeNotFound(id)) => (
            StatusCode::NOT_FOUND,
            json!({ "error": format!("resource {id} not found") }),
        ),
        DbError::Tree(tree) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "errors": { "tree": tree.to_string() } }),
        ),
        other => {
            tracing::error!(error = %other, "Storage failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "internal server error" }),
            )
        }
    };
    res.status_code(status);
    res.render(Json(body));
}

#[async_trait]
impl Writer for AppError {
    async fn write(self, _req: &mut Request, _depot: &mut Depot, res: &mut Response) {
        self.render_into(res);
    }
}
